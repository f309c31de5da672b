use alloy_primitives::{Address, B256, U256};
use cosign_types::{ReadError, SignError, SubmitError};
use thiserror::Error;

/// Malformed byte widths, bad hex, or layouts the account would reject. Always fatal to the
/// operation; never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("expected {expected} bytes, got {actual}")]
    WrongWidth { expected: usize, actual: usize },
    #[error("truncated input: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("hex string must start with 0x")]
    MissingHexPrefix,
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("unknown operation byte {0}")]
    UnknownOperation(u8),
    #[error("length {0} is out of range")]
    LengthOverflow(U256),
    #[error("batch is empty")]
    EmptyBatch,
    #[error("sub-call {index} is a delegate call, which a call-only batch target refuses")]
    DelegateCallNotAllowed { index: usize },
    #[error("unsupported EIP-712 domain type hash {0}")]
    UnsupportedDomain(B256),
    #[error("not a batch call: {0}")]
    NotMultiSend(String),
    #[error("dynamic signature for {signer} points at offset {found}, expected {expected}")]
    OffsetMismatch {
        signer: Address,
        expected: usize,
        found: usize,
    },
    #[error("signature entry {index} has unrecognised recovery byte {v} or does not recover")]
    InvalidSignature { index: usize, v: u8 },
    #[error("ABI encoding failed: {0}")]
    Abi(String),
}

/// A signature that must not be counted towards the threshold. Only the offending signature is
/// rejected; the rest of the set is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature from {0} could not be recovered")]
    Unrecoverable(Address),
    #[error("signature claims signer {claimed} but recovers to {recovered}")]
    SignerMismatch { claimed: Address, recovered: Address },
    #[error("{0} is not an owner of this account")]
    NotOwner(Address),
    #[error("duplicate signature from {0}")]
    Duplicate(Address),
    #[error("{0} has not approved this transaction hash on-chain")]
    NotApproved(Address),
    #[error("contract signer {0} rejected the signature")]
    ContractRejected(Address),
    #[error("signature from {signer} is malformed: {source}")]
    Malformed {
        signer: Address,
        source: EncodingError,
    },
    #[error("could not verify signature from {signer}: {source}")]
    Unverifiable { signer: Address, source: ReadError },
}

/// The locally computed identifier disagrees with the one the account reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("transaction hash mismatch: computed {local}, account reports {remote}")]
pub struct HashMismatchError {
    pub local: B256,
    pub remote: B256,
}

/// The portable artifact could not be imported. Nothing from it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("envelope is not valid hex: {0}")]
    InvalidHex(String),
    #[error("envelope is not valid UTF-8")]
    InvalidUtf8,
    #[error("envelope is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("envelope is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("envelope field `{field}` is invalid: {reason}")]
    InvalidField { field: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    HashMismatch(#[from] HashMismatchError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("chain read failed: {0}")]
    Read(#[from] ReadError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Sign(#[from] SignError),
    #[error("{collected} of {threshold} required signatures collected")]
    BelowThreshold { collected: usize, threshold: usize },
}
