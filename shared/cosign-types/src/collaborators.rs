//! Contracts for the services the protocol core calls but does not implement: chain reads and
//! writes, the signing capability, and persistence.
//!
//! Providers only implement what they support; everything else answers `NotImplemented`.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::{AddressBookEntry, DraftRecord, SafeTransactionParams, Signature};

/// Errors from a chain read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// Used by offline or partially implemented providers.
    #[error("read not supported by this provider")]
    NotImplemented,
    /// The underlying call failed or reverted.
    #[error("call failed: {0}")]
    CallFailed(String),
    /// Return data was malformed or could not be decoded.
    #[error("malformed return data")]
    MalformedReturn,
}

/// Errors from submitting an execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("submission not supported by this provider")]
    NotImplemented,
    #[error("submission rejected: {0}")]
    Rejected(String),
}

/// Errors from the signing capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignError {
    #[error("signer refused the request: {0}")]
    Rejected(String),
    #[error("signing failed: {0}")]
    Failed(String),
}

/// Errors from the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage I/O failed: {0}")]
    Io(String),
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

/// Which EIP-712 domain layout the account uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DomainKind {
    /// `EIP712Domain(uint256 chainId,address verifyingContract)` (v1.3.0 and later).
    #[default]
    ChainBound,
    /// `EIP712Domain(address verifyingContract)` (before v1.3.0).
    Legacy,
}

impl DomainKind {
    /// Select the layout from an account version string such as `"1.3.0"`.
    pub fn for_version(version: &str) -> Self {
        let mut parts = version
            .trim()
            .trim_start_matches('v')
            .split(|c: char| c == '.' || c == '+' || c == '-')
            .map(|p| p.parse::<u32>().unwrap_or(0));
        let major = parts.next().unwrap_or(0);
        let minor = parts.next().unwrap_or(0);
        if (major, minor) < (1, 3) {
            DomainKind::Legacy
        } else {
            DomainKind::ChainBound
        }
    }
}

/// The verifying account a typed-data signature is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SafeDomain {
    pub chain_id: u64,
    pub verifying_contract: Address,
    pub kind: DomainKind,
}

impl SafeDomain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
            kind: DomainKind::ChainBound,
        }
    }
}

/// Opaque handle returned after submitting an execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxReceiptHandle {
    pub transaction_hash: B256,
}

/// Chain reads, implemented differently by live and offline providers.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn read_nonce(&self, _account: Address) -> Result<U256, ReadError> {
        Err(ReadError::NotImplemented)
    }

    /// The account's own view of the transaction identifier (`getTransactionHash`).
    async fn read_transaction_hash(
        &self,
        _account: Address,
        _params: &SafeTransactionParams,
    ) -> Result<B256, ReadError> {
        Err(ReadError::NotImplemented)
    }

    /// Whether `signer` called `approveHash(hash)` on `account`.
    async fn read_approval_status(
        &self,
        _account: Address,
        _signer: Address,
        _hash: B256,
    ) -> Result<bool, ReadError> {
        Err(ReadError::NotImplemented)
    }

    async fn read_balance(&self, _address: Address) -> Result<U256, ReadError> {
        Err(ReadError::NotImplemented)
    }

    /// `eth_call` of ABI-encoded calldata against `address`.
    async fn call_view(&self, _address: Address, _call: Bytes) -> Result<Bytes, ReadError> {
        Err(ReadError::NotImplemented)
    }
}

/// Chain writes.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    async fn submit(&self, account: Address, exec_payload: Bytes) -> Result<TxReceiptHandle, SubmitError>;
}

/// A signing capability (local key, hardware wallet, remote signer...). Invoked once per local
/// signer per transaction identifier.
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_typed_data(
        &self,
        domain: &SafeDomain,
        message: &SafeTransactionParams,
    ) -> Result<Signature, SignError>;
}

/// Draft persistence keyed by opaque id.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn save_draft(&self, draft: DraftRecord) -> Result<(), StoreError>;

    async fn load_draft(&self, id: &str) -> Result<DraftRecord, StoreError>;

    async fn list_drafts(
        &self,
        account: Option<Address>,
        chain_id: Option<u64>,
    ) -> Result<Vec<DraftRecord>, StoreError>;

    async fn delete_draft(&self, id: &str) -> Result<(), StoreError>;
}

/// Address book keyed by `(address, chain_id)`.
#[async_trait]
pub trait AddressBook: Send + Sync {
    async fn upsert_entry(&self, entry: AddressBookEntry) -> Result<(), StoreError>;

    async fn remove_entry(&self, address: Address, chain_id: u64) -> Result<(), StoreError>;

    async fn entries(&self, chain_id: Option<u64>) -> Result<Vec<AddressBookEntry>, StoreError>;
}
