//! Batch packing for the MultiSend entry point.
//!
//! Each sub-call is packed as `operation (1) ‖ to (20) ‖ value (32) ‖ dataLength (32) ‖ data`,
//! concatenated in input order with no separators. Order is execution order on-chain; the
//! encoder never reorders.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use cosign_types::{MetaTransaction, Operation};

use crate::{
    errors::EncodingError,
    interfaces::IMultiSend,
    utils::bytes::{read_address, read_len, read_u256_be, read_u8, read_vec, word_usize},
};

/// Pack sub-calls into the MultiSend payload.
pub fn encode_multisend(subcalls: &[MetaTransaction]) -> Bytes {
    let capacity = subcalls.iter().map(|tx| 1 + 20 + 32 + 32 + tx.data.len()).sum();
    let mut buf = Vec::with_capacity(capacity);
    for tx in subcalls {
        buf.push(u8::from(tx.operation));
        buf.extend_from_slice(tx.to.as_slice());
        buf.extend_from_slice(&tx.value.to_be_bytes::<32>());
        buf.extend_from_slice(&word_usize(tx.data.len()));
        buf.extend_from_slice(&tx.data);
    }
    buf.into()
}

/// Exact inverse of [`encode_multisend`]; for inspection and debugging.
pub fn decode_multisend(bytes: &[u8]) -> Result<Vec<MetaTransaction>, EncodingError> {
    let mut subcalls = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let op_byte = read_u8(bytes, &mut i)?;
        let operation =
            Operation::try_from(op_byte).map_err(|_| EncodingError::UnknownOperation(op_byte))?;
        let to = read_address(bytes, &mut i)?;
        let value = read_u256_be(bytes, &mut i)?;
        let data_len = read_len(bytes, &mut i)?;
        let data = read_vec(bytes, &mut i, data_len)?;
        subcalls.push(MetaTransaction {
            to,
            value,
            data: data.into(),
            operation,
        });
    }

    Ok(subcalls)
}

/// Turn a list of sub-calls into the single call the account executes.
///
/// One sub-call is submitted as-is. Two or more are always wrapped as one `DELEGATE_CALL` to
/// `multisend` carrying `multiSend(packed)`. Changing this policy changes the identifier of
/// every multi-call batch.
pub fn batch_transactions(
    subcalls: &[MetaTransaction],
    multisend: Address,
) -> Result<MetaTransaction, EncodingError> {
    match subcalls {
        [] => Err(EncodingError::EmptyBatch),
        [single] => Ok(single.clone()),
        many => {
            let call = IMultiSend::multiSendCall {
                transactions: encode_multisend(many),
            };
            Ok(MetaTransaction {
                to: multisend,
                value: U256::ZERO,
                data: call.abi_encode().into(),
                operation: Operation::DelegateCall,
            })
        }
    }
}

/// Like [`batch_transactions`] for a call-only batch target, which refuses nested delegate
/// calls.
pub fn batch_call_only(
    subcalls: &[MetaTransaction],
    multisend_call_only: Address,
) -> Result<MetaTransaction, EncodingError> {
    if subcalls.len() > 1 {
        if let Some(index) = subcalls
            .iter()
            .position(|tx| tx.operation == Operation::DelegateCall)
        {
            return Err(EncodingError::DelegateCallNotAllowed { index });
        }
    }
    batch_transactions(subcalls, multisend_call_only)
}

/// Recover the sub-calls carried by `meta`. A call to anything other than `multisend` is a
/// batch of one.
pub fn unpack_batch(
    meta: &MetaTransaction,
    multisend: Address,
) -> Result<Vec<MetaTransaction>, EncodingError> {
    if meta.to != multisend {
        return Ok(vec![meta.clone()]);
    }
    if meta.operation != Operation::DelegateCall {
        return Err(EncodingError::NotMultiSend(
            "batch target must be reached through a delegate call".to_string(),
        ));
    }
    let call = IMultiSend::multiSendCall::abi_decode(&meta.data, true)
        .map_err(|e| EncodingError::NotMultiSend(e.to_string()))?;
    decode_multisend(&call.transactions)
}
