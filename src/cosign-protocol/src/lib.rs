//! Protocol core for accounts controlled by several independent key-holders.
//!
//! - [`eip712`]: the canonical transaction identifier every signer must agree on.
//! - [`multisend`]: packing a batch of sub-calls into one routable payload.
//! - [`predict`]: the deployment address of an account that does not exist yet.
//! - [`signatures`] / [`collector`]: verifying and aggregating signatures collected out of band.
//! - [`envelope`]: the portable artifact co-signers exchange.
//! - [`execution`]: glue between the above and the chain collaborators.

pub mod collector;
pub mod eip712;
pub mod envelope;
pub mod errors;
pub mod execution;
pub mod interfaces;
pub mod multisend;
pub mod predict;
pub mod signatures;
pub mod signer;
pub mod utils;

pub use collector::PendingTransaction;
pub use eip712::{domain_separator, safe_domain_separator, transaction_hash, transaction_hash_in};
pub use envelope::{decode_envelope, encode_envelope, verify_envelope};
pub use errors::{EncodingError, EnvelopeError, HashMismatchError, ProtocolError, SignatureError};
pub use multisend::{batch_transactions, decode_multisend, encode_multisend, unpack_batch};
pub use predict::{create2_address, predict_address, PROXY_CREATION_CODE_V1_3_0};
pub use signatures::{aggregate, decode_signatures, recover_signer};
pub use signer::LocalKeySigner;

pub use cosign_types;
