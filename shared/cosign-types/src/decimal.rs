//! Serde adapters that carry 256-bit integers as decimal strings. Every big integer on the wire
//! is a string, never a JSON number.

use alloy_primitives::U256;
use serde::{de, Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// Accepts decimal strings, and `0x`-prefixed hex strings for compatibility with tooling that
/// emits quantities in hex.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_u256(&raw).map_err(de::Error::custom)
}

pub fn parse_u256(raw: &str) -> Result<U256, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty integer string".to_string());
    }
    if trimmed.starts_with('-') {
        return Err(format!("negative value {trimmed} is not a valid unsigned integer"));
    }
    trimmed
        .parse::<U256>()
        .map_err(|e| format!("invalid unsigned integer {trimmed:?}: {e}"))
}

/// Chain identifiers as optional decimal strings.
pub mod chain_id {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|s| {
            s.trim()
                .parse::<u64>()
                .map_err(|e| de::Error::custom(format!("invalid chain id {s:?}: {e}")))
        })
        .transpose()
    }
}
