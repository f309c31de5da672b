//! ECDSA recovery and signing over secp256k1.
//!
//! Purpose: prove that a 65-byte `r ‖ s ‖ v` signature was produced by the claimed signer over
//! the exact transaction identifier being aggregated.

use alloy_primitives::{keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};

const ETH_SIGN_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Digest an `eth_sign` signer actually signed for a 32-byte hash.
pub fn eth_sign_digest(hash: B256) -> B256 {
    let mut buf = Vec::with_capacity(ETH_SIGN_PREFIX.len() + 32);
    buf.extend_from_slice(ETH_SIGN_PREFIX);
    buf.extend_from_slice(hash.as_slice());
    keccak256(buf)
}

/// Address of a secp256k1 public key: last 20 bytes of `keccak256(x ‖ y)`.
pub fn public_key_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Recover the signer of `digest` from `r ‖ s` and a recovery byte.
///
/// Accepts recovery bytes in {0, 1} or {27, 28}; anything else does not recover. High-`s`
/// signatures recover like the `ecrecover` precompile does: `(r, n - s, v ^ 1)` is the same
/// signer.
pub fn ecrecover_address(digest: B256, rs: &[u8], v: u8) -> Option<Address> {
    let recovery = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return None,
    };
    let signature = EcdsaSignature::from_slice(rs).ok()?;
    let (signature, recovery) = match signature.normalize_s() {
        Some(low) => (low, recovery ^ 1),
        None => (signature, recovery),
    };
    let recovery_id = RecoveryId::from_byte(recovery)?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id).ok()?;
    Some(public_key_address(&key))
}

/// Sign a 32-byte digest, producing `r ‖ s ‖ v` with `v ∈ {27, 28}`.
pub fn sign_digest(key: &SigningKey, digest: B256) -> Result<[u8; 65], k256::ecdsa::Error> {
    let (signature, recovery_id) = key.sign_prehash_recoverable(digest.as_slice())?;
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = 27 + recovery_id.to_byte();
    Ok(out)
}
