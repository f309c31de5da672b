use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::MetaTransaction;

/// A named, not-yet-proposed batch kept by the persistence collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub id: String,
    pub account: Address,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::decimal::chain_id")]
    pub chain_id: Option<u64>,
    pub name: String,
    pub transactions: Vec<MetaTransaction>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Address-book entry, unique per `(address, chain_id)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBookEntry {
    pub address: Address,
    #[serde(with = "chain_id_string")]
    pub chain_id: u64,
    pub name: String,
}

mod chain_id_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.trim().parse().map_err(de::Error::custom)
    }
}
