use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::{MetaTransaction, SafeTransactionParams, Signature};

/// Portable artifact exchanged out of band between co-signers.
///
/// Phase one of the signing protocol exports the batch (and, once proposed, the exact
/// transaction and its identifier); later phases carry one signer's signature back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEnvelope {
    pub transactions: Vec<MetaTransaction>,
    pub account: Address,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::decimal::chain_id")]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_transaction: Option<SafeTransactionParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_transaction_hash: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl TransferEnvelope {
    pub fn new(account: Address, chain_id: Option<u64>, transactions: Vec<MetaTransaction>) -> Self {
        Self {
            transactions,
            account,
            chain_id,
            safe_transaction: None,
            safe_transaction_hash: None,
            signature: None,
        }
    }
}
