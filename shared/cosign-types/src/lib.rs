//! Shared types for co-signed account transactions: the portable data model exchanged between
//! co-signers and the narrow collaborator contracts the protocol core calls out through.

pub mod collaborators;
pub mod decimal;
pub mod draft;
pub mod envelope;
pub mod signature;
pub mod transaction;

pub use collaborators::{
    AddressBook, ChainReader, ChainWriter, DomainKind, DraftStore, ReadError, SafeDomain,
    SignError, StoreError, SubmitError, TxReceiptHandle, TypedDataSigner,
};
pub use draft::{AddressBookEntry, DraftRecord};
pub use envelope::TransferEnvelope;
pub use signature::{
    Signature, SignatureFormatError, SignatureKind, APPROVED_HASH_MARKER, ETH_SIGN_V_OFFSET,
    SIGNATURE_LEN,
};
pub use transaction::{MetaTransaction, Operation, SafeTransactionParams};
