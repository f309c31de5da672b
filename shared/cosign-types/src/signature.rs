use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

/// Width of one static signature entry (`r ‖ s ‖ v`).
pub const SIGNATURE_LEN: usize = 65;

/// `v` byte telling the verifier to consult its approved-hash storage instead of running
/// `ecrecover`.
pub const APPROVED_HASH_MARKER: u8 = 1;

/// `v` offset applied to `eth_sign` signatures (`v + 4`).
pub const ETH_SIGN_V_OFFSET: u8 = 4;

/// What a signature payload proves and how the verifier checks it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignatureKind {
    /// Typed-data ECDSA signature over the transaction identifier (`v ∈ {27, 28}`).
    Ecdsa,
    /// ECDSA over the `eth_sign` prefixed identifier (`v ∈ {31, 32}`).
    EthSign,
    /// On-chain `approveHash` by the signer. Not a cryptographic proof: the payload is a fixed
    /// sentinel and the verifier checks storage.
    ApprovedHash,
    /// Contract signer (ERC-1271). The payload is appended out of line.
    Contract,
}

/// A single signer's contribution to the aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireSignature", try_from = "WireSignature")]
pub struct Signature {
    pub signer: Address,
    pub data: Bytes,
    pub kind: SignatureKind,
}

impl Signature {
    pub fn ecdsa(signer: Address, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let kind = match data.get(SIGNATURE_LEN - 1) {
            Some(v) if data.len() == SIGNATURE_LEN && *v > 30 => SignatureKind::EthSign,
            _ => SignatureKind::Ecdsa,
        };
        Self { signer, data, kind }
    }

    /// Sentinel entry for a signer that approved the hash on-chain:
    /// `r = signer (left-padded)`, `s = 0`, `v = 1`.
    pub fn approved_hash(signer: Address) -> Self {
        let mut data = [0u8; SIGNATURE_LEN];
        data[12..32].copy_from_slice(signer.as_slice());
        data[SIGNATURE_LEN - 1] = APPROVED_HASH_MARKER;
        Self {
            signer,
            data: Bytes::copy_from_slice(&data),
            kind: SignatureKind::ApprovedHash,
        }
    }

    pub fn contract(signer: Address, payload: impl Into<Bytes>) -> Self {
        Self {
            signer,
            data: payload.into(),
            kind: SignatureKind::Contract,
        }
    }

    /// Dynamic signatures carry their payload in the tail of the aggregate.
    pub fn dynamic(&self) -> bool {
        self.kind == SignatureKind::Contract
    }

    /// Classify an untagged `{ signer, data, dynamic }` triple by its `v` byte, the way the
    /// on-chain verifier does.
    pub fn classify(signer: Address, data: Bytes, dynamic: bool) -> Self {
        if dynamic {
            return Self::contract(signer, data);
        }
        if data.len() == SIGNATURE_LEN && data[SIGNATURE_LEN - 1] == APPROVED_HASH_MARKER {
            return Self {
                signer,
                data,
                kind: SignatureKind::ApprovedHash,
            };
        }
        Self::ecdsa(signer, data)
    }

    /// Check that the payload has the layout its kind requires.
    pub fn check_layout(&self) -> Result<(), SignatureFormatError> {
        let kind = self.kind;
        let eth_sign = [27 + ETH_SIGN_V_OFFSET, 28 + ETH_SIGN_V_OFFSET];
        let allowed: &[u8] = match kind {
            SignatureKind::Contract => return Ok(()),
            SignatureKind::ApprovedHash => &[APPROVED_HASH_MARKER],
            SignatureKind::Ecdsa => &[27, 28],
            SignatureKind::EthSign => &eth_sign,
        };
        if self.data.len() != SIGNATURE_LEN {
            return Err(SignatureFormatError::Length {
                kind,
                len: self.data.len(),
            });
        }
        let v = self.data[SIGNATURE_LEN - 1];
        if !allowed.contains(&v) {
            return Err(SignatureFormatError::RecoveryByte { kind, v });
        }
        if kind == SignatureKind::ApprovedHash
            && (self.data[..12] != [0u8; 12] || &self.data[12..32] != self.signer.as_slice())
        {
            return Err(SignatureFormatError::ApprovedHashOwner);
        }
        Ok(())
    }
}

/// A tagged signature whose payload contradicts its kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureFormatError {
    #[error("`dynamic: {dynamic}` contradicts kind {kind:?}")]
    DynamicMismatch { kind: SignatureKind, dynamic: bool },
    #[error("{kind:?} signature must be 65 bytes, got {len}")]
    Length { kind: SignatureKind, len: usize },
    #[error("{kind:?} signature cannot have v = {v}")]
    RecoveryByte { kind: SignatureKind, v: u8 },
    #[error("approved-hash entry does not carry its owner in r")]
    ApprovedHashOwner,
}

/// Portable form: `{ signer, data, dynamic, kind }`. Untagged triples are still accepted and
/// classified by `v`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct WireSignature {
    signer: Address,
    data: Bytes,
    #[serde(default)]
    dynamic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<SignatureKind>,
}

impl From<Signature> for WireSignature {
    fn from(sig: Signature) -> Self {
        let dynamic = sig.dynamic();
        Self {
            signer: sig.signer,
            data: sig.data,
            dynamic,
            kind: Some(sig.kind),
        }
    }
}

impl TryFrom<WireSignature> for Signature {
    type Error = SignatureFormatError;

    fn try_from(wire: WireSignature) -> Result<Self, Self::Error> {
        let Some(kind) = wire.kind else {
            return Ok(Signature::classify(wire.signer, wire.data, wire.dynamic));
        };
        if wire.dynamic != (kind == SignatureKind::Contract) {
            return Err(SignatureFormatError::DynamicMismatch {
                kind,
                dynamic: wire.dynamic,
            });
        }
        let sig = Signature {
            signer: wire.signer,
            data: wire.data,
            kind,
        };
        sig.check_layout()?;
        Ok(sig)
    }
}
