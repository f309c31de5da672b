use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// How the account dispatches a sub-call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Operation {
    #[default]
    Call = 0,
    DelegateCall = 1,
}

impl TryFrom<u8> for Operation {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Operation::Call),
            1 => Ok(Operation::DelegateCall),
            other => Err(format!("unknown operation {other}")),
        }
    }
}

impl From<Operation> for u8 {
    fn from(op: Operation) -> Self {
        op as u8
    }
}

/// One atomic sub-call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTransaction {
    pub to: Address,
    #[serde(with = "crate::decimal")]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub operation: Operation,
}

impl MetaTransaction {
    pub fn call(to: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value,
            data: data.into(),
            operation: Operation::Call,
        }
    }

    pub fn delegate_call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data: data.into(),
            operation: Operation::DelegateCall,
        }
    }
}

/// The exact payload that produces one transaction identifier. Every field is hashed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTransactionParams {
    pub to: Address,
    #[serde(with = "crate::decimal")]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub operation: Operation,
    #[serde(with = "crate::decimal")]
    pub safe_tx_gas: U256,
    #[serde(with = "crate::decimal")]
    pub base_gas: U256,
    #[serde(with = "crate::decimal")]
    pub gas_price: U256,
    pub gas_token: Address,
    pub refund_receiver: Address,
    #[serde(with = "crate::decimal")]
    pub nonce: U256,
}

impl SafeTransactionParams {
    /// Wrap a sub-call with zero gas/refund settings (the account pays no relayer refund).
    pub fn from_meta(meta: MetaTransaction, nonce: U256) -> Self {
        Self {
            to: meta.to,
            value: meta.value,
            data: meta.data,
            operation: meta.operation,
            safe_tx_gas: U256::ZERO,
            base_gas: U256::ZERO,
            gas_price: U256::ZERO,
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            nonce,
        }
    }

    pub fn meta(&self) -> MetaTransaction {
        MetaTransaction {
            to: self.to,
            value: self.value,
            data: self.data.clone(),
            operation: self.operation,
        }
    }
}
