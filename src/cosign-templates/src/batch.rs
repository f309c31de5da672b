//! The active batch: finalized sub-calls waiting to be wrapped into one account transaction.

use alloy_primitives::Address;
use cosign_types::{MetaTransaction, TransferEnvelope};

use crate::errors::TemplateError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchItem {
    /// Id of the template that produced this item.
    pub template: String,
    pub transaction: MetaTransaction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionBatch {
    account: Address,
    chain_id: u64,
    items: Vec<BatchItem>,
}

impl TransactionBatch {
    pub fn new(account: Address, chain_id: u64) -> Self {
        Self {
            account,
            chain_id,
            items: Vec::new(),
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, template: impl Into<String>, transaction: MetaTransaction) {
        self.items.push(BatchItem {
            template: template.into(),
            transaction,
        });
    }

    pub fn remove(&mut self, index: usize) -> Result<BatchItem, TemplateError> {
        self.bounds(index)?;
        Ok(self.items.remove(index))
    }

    /// Move the item at `from` so it ends up at `to`, shifting the items in between.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), TemplateError> {
        self.bounds(from)?;
        self.bounds(to)?;
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn transactions(&self) -> Vec<MetaTransaction> {
        self.items.iter().map(|i| i.transaction.clone()).collect()
    }

    /// An unsigned envelope carrying the sub-calls in order.
    pub fn to_envelope(&self) -> TransferEnvelope {
        TransferEnvelope::new(self.account, Some(self.chain_id), self.transactions())
    }

    fn bounds(&self, index: usize) -> Result<(), TemplateError> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(TemplateError::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }
}
