//! Glue between the pure protocol and the chain collaborators.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use cosign_types::{
    ChainReader, ChainWriter, MetaTransaction, SafeTransactionParams, TxReceiptHandle,
};
use tracing::{debug, error, info};

use crate::{
    collector::PendingTransaction,
    errors::{HashMismatchError, ProtocolError},
    interfaces::ISafe,
    multisend::batch_transactions,
};

/// Wrap a batch into the account transaction at the account's current nonce.
pub async fn build_safe_transaction(
    reader: &dyn ChainReader,
    account: Address,
    subcalls: &[MetaTransaction],
    multisend: Address,
) -> Result<SafeTransactionParams, ProtocolError> {
    let meta = batch_transactions(subcalls, multisend)?;
    let nonce = reader.read_nonce(account).await?;
    debug!(%account, %nonce, subcalls = subcalls.len(), "built account transaction");
    Ok(SafeTransactionParams::from_meta(meta, nonce))
}

/// The account's own `getTransactionHash` must equal the identifier everyone signed.
pub async fn verify_remote_hash(
    reader: &dyn ChainReader,
    pending: &PendingTransaction,
) -> Result<(), ProtocolError> {
    let remote = reader
        .read_transaction_hash(pending.account(), pending.params())
        .await?;
    if remote != pending.hash() {
        error!(local = %pending.hash(), %remote, "transaction hash mismatch");
        return Err(HashMismatchError {
            local: pending.hash(),
            remote,
        }
        .into());
    }
    Ok(())
}

pub fn exec_transaction_calldata(params: &SafeTransactionParams, signatures: Bytes) -> Bytes {
    ISafe::execTransactionCall {
        to: params.to,
        value: params.value,
        data: params.data.clone(),
        operation: params.operation.into(),
        safeTxGas: params.safe_tx_gas,
        baseGas: params.base_gas,
        gasPrice: params.gas_price,
        gasToken: params.gas_token,
        refundReceiver: params.refund_receiver,
        signatures,
    }
    .abi_encode()
    .into()
}

/// Check the identifier against the account, check the threshold, then submit.
pub async fn execute(
    reader: &dyn ChainReader,
    writer: &dyn ChainWriter,
    pending: &PendingTransaction,
) -> Result<TxReceiptHandle, ProtocolError> {
    verify_remote_hash(reader, pending).await?;
    if !pending.is_executable() {
        return Err(ProtocolError::BelowThreshold {
            collected: pending.collected(),
            threshold: pending.threshold(),
        });
    }
    let signatures = pending.aggregate()?;
    let payload = exec_transaction_calldata(pending.params(), signatures);
    let receipt = writer.submit(pending.account(), payload).await?;
    info!(
        account = %pending.account(),
        safe_tx_hash = %pending.hash(),
        tx = %receipt.transaction_hash,
        "submitted execution"
    );
    Ok(receipt)
}
