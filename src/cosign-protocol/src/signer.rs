use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use cosign_types::{
    SafeDomain, SafeTransactionParams, SignError, Signature, TypedDataSigner, ETH_SIGN_V_OFFSET,
};
use k256::ecdsa::SigningKey;

use crate::{
    eip712::transaction_hash_in,
    utils::{
        bytes::parse_hex_bytes,
        crypto::{eth_sign_digest, public_key_address, sign_digest},
    },
};

/// In-process signing capability over a raw secp256k1 key.
#[derive(Clone)]
pub struct LocalKeySigner {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalKeySigner {
    pub fn new(key: SigningKey) -> Self {
        let address = public_key_address(key.verifying_key());
        Self { key, address }
    }

    pub fn from_bytes(secret: &[u8]) -> Result<Self, SignError> {
        let key = SigningKey::from_slice(secret)
            .map_err(|e| SignError::Failed(format!("invalid private key: {e}")))?;
        Ok(Self::new(key))
    }

    /// `0x`-prefixed 32-byte hex secret.
    pub fn from_hex(secret: &str) -> Result<Self, SignError> {
        let bytes = parse_hex_bytes(secret.trim())
            .map_err(|e| SignError::Failed(format!("invalid private key: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Sign the transaction identifier directly (`v ∈ {27, 28}`).
    pub fn sign_hash(&self, hash: B256) -> Result<Signature, SignError> {
        let sig = sign_digest(&self.key, hash).map_err(|e| SignError::Failed(e.to_string()))?;
        Ok(Signature::ecdsa(self.address, sig.to_vec()))
    }

    /// Sign through the `eth_sign` prefix (`v ∈ {31, 32}`), as wallets without typed-data support
    /// do.
    pub fn sign_eth_message(&self, hash: B256) -> Result<Signature, SignError> {
        let mut sig = sign_digest(&self.key, eth_sign_digest(hash))
            .map_err(|e| SignError::Failed(e.to_string()))?;
        sig[64] += ETH_SIGN_V_OFFSET;
        Ok(Signature::ecdsa(self.address, sig.to_vec()))
    }
}

#[async_trait]
impl TypedDataSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(
        &self,
        domain: &SafeDomain,
        message: &SafeTransactionParams,
    ) -> Result<Signature, SignError> {
        self.sign_hash(transaction_hash_in(message, domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::recover_signer;
    use alloy_primitives::{keccak256, U256};
    use cosign_types::{MetaTransaction, SignatureKind};

    #[test]
    fn parses_hex_secret() {
        let signer = LocalKeySigner::from_hex(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(
            signer.address(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".parse::<Address>().unwrap()
        );
        assert!(LocalKeySigner::from_hex("0x00").is_err());
        assert!(LocalKeySigner::from_hex("01").is_err());
        assert!(format!("{signer:?}").contains("address"));
    }

    #[test]
    fn eth_sign_variant_recovers() {
        let signer = LocalKeySigner::from_bytes(&[0x21; 32]).unwrap();
        let hash = keccak256(b"eth-sign");
        let sig = signer.sign_eth_message(hash).unwrap();
        assert_eq!(sig.kind, SignatureKind::EthSign);
        assert_eq!(recover_signer(hash, &sig.data), Some(signer.address()));
    }

    #[tokio::test]
    async fn typed_data_signature_binds_domain() {
        let signer = LocalKeySigner::from_bytes(&[0x22; 32]).unwrap();
        let params = SafeTransactionParams::from_meta(
            MetaTransaction::call(Address::repeat_byte(1), U256::ZERO, vec![0xaa]),
            U256::from(3u64),
        );
        let domain = SafeDomain::new(10, Address::repeat_byte(2));
        let sig = signer.sign_typed_data(&domain, &params).await.unwrap();
        assert_eq!(sig.kind, SignatureKind::Ecdsa);
        let hash = transaction_hash_in(&params, &domain);
        assert_eq!(recover_signer(hash, &sig.data), Some(signer.address()));

        let other_chain = SafeDomain::new(11, Address::repeat_byte(2));
        assert_ne!(
            recover_signer(transaction_hash_in(&params, &other_chain), &sig.data),
            Some(signer.address())
        );
    }
}
