use async_trait::async_trait;
use cosign_types::ChainReader;

/// A reader with no chain behind it. Every read reports `ReadError::NotImplemented`, which
/// template sessions surface as per-rule errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineChainReader;

#[async_trait]
impl ChainReader for OfflineChainReader {}
