//! Per-network contract addresses.
//!
//! Defaults are the canonical v1.3.0 deployments, which share one address on every chain they
//! were deployed to. A JSON file passed with `--config` overrides any subset of them.

use std::path::Path;

use alloy_primitives::{address, Address, Bytes};
use anyhow::{Context, Result};
use cosign_protocol::PROXY_CREATION_CODE_V1_3_0;
use serde::{Deserialize, Serialize};

pub const SINGLETON: Address = address!("d9Db270c1B5E3Bd161E8c8503c55cEABeE709552");
pub const PROXY_FACTORY: Address = address!("a6B71E26C5e0845f74c812102Ca7114b6a896AB2");
pub const MULTISEND: Address = address!("A238CBeb142c10Ef7Ad8442C6D1f9E89e07e7761");
pub const MULTISEND_CALL_ONLY: Address = address!("40A2aCCbd92BCA938b02010E17A5b8929b49130D");
pub const FALLBACK_HANDLER: Address = address!("f48f2B2d2a534e402487b3ee7C18c33Aec0Fe5e4");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    pub singleton: Address,
    pub proxy_factory: Address,
    pub multisend: Address,
    pub multisend_call_only: Address,
    pub fallback_handler: Address,
    /// Proxy creation code the factory deploys, used for address prediction.
    pub proxy_creation_code: Bytes,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            singleton: SINGLETON,
            proxy_factory: PROXY_FACTORY,
            multisend: MULTISEND,
            multisend_call_only: MULTISEND_CALL_ONLY,
            fallback_handler: FALLBACK_HANDLER,
            proxy_creation_code: Bytes::from_static(PROXY_CREATION_CODE_V1_3_0),
        }
    }
}

impl NetworkConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing JSON in {}", path.display()))
    }
}
