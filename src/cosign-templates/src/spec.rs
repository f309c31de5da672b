//! Template documents as they appear on disk.
//!
//! One JSON document per transaction group:
//!
//! ```json
//! { "group": "Tokens", "description": "...", "transactions": [ { "id": "erc20-transfer", ... } ] }
//! ```
//!
//! These types only describe shape. [`crate::template::Template::compile`] checks meaning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecGroup {
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub transactions: Vec<TransactionSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSpec {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    /// Initial context values.
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub on_input_update: Vec<RefreshRule>,
    #[serde(default)]
    pub on_update_validations: Vec<ValidationRule>,
    pub on_finalize: FinalizeSpec,
    #[serde(default)]
    pub details_view: Vec<DetailSpec>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Address,
    /// Decimal amount with at most `options.decimals` fractional digits when that is set.
    Amount,
    Uint,
    Int,
    Bool,
    String,
    Bytes,
    Select,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: InputKind,
    #[serde(default)]
    pub options: InputOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputOptions {
    /// Precision limit for `amount` inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    /// Pre-fills the input without marking it touched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

/// Refreshes one context key from an external read when a watched input changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRule {
    pub id: String,
    /// Inputs that trigger this rule; empty means any input.
    #[serde(default)]
    pub watch: Vec<String>,
    pub read: ReadSpec,
    /// Context key the formatted result is stored under.
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReadSpec {
    /// `method` is a human-readable signature with outputs; `to` and `args` are expressions.
    #[serde(rename_all = "camelCase")]
    ContractRead {
        to: String,
        method: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// ERC-20 `balanceOf(owner)` on `token`, or the native balance when `token` is absent.
    #[serde(rename_all = "camelCase")]
    BalanceRead {
        owner: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub id: String,
    /// The input this rule is bound to.
    pub input: String,
    #[serde(flatten)]
    pub check: RuleCheck,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleCheck {
    /// Tested against the raw input string.
    Regex { pattern: String },
    /// Falsy result means the rule fails.
    Expression { expression: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeSpec {
    pub to: String,
    /// Defaults to zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Defaults to empty calldata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DataSpec {
    /// Must evaluate to a `0x` string.
    Raw { expression: String },
    Call {
        signature: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSpec {
    pub label: String,
    pub expression: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_shapes() {
        let json = r#"{
            "group": "Tokens",
            "transactions": [{
                "id": "erc20-transfer",
                "name": "Send tokens",
                "inputs": [
                    { "name": "token", "type": "address" },
                    { "name": "amount", "type": "amount", "options": { "decimals": 6, "default": "0" } }
                ],
                "context": { "balance": "0" },
                "onInputUpdate": [{
                    "id": "balance",
                    "watch": ["token"],
                    "read": { "type": "balanceRead", "owner": "safe.address", "token": "inputs.token" },
                    "target": "balance"
                }],
                "onUpdateValidations": [
                    { "id": "token-format", "input": "token", "type": "regex", "pattern": "^0x[0-9a-fA-F]{40}$", "message": "Invalid address" }
                ],
                "onFinalize": {
                    "to": "inputs.token",
                    "data": { "type": "call", "signature": "transfer(address,uint256)", "args": ["safe.address", "inputs.amount"] }
                }
            }]
        }"#;
        let group: SpecGroup = serde_json::from_str(json).unwrap();
        let spec = &group.transactions[0];
        assert_eq!(spec.inputs[1].kind, InputKind::Amount);
        assert_eq!(spec.inputs[1].options.decimals, Some(6));
        assert!(matches!(
            &spec.on_input_update[0].read,
            ReadSpec::BalanceRead { token: Some(t), .. } if t == "inputs.token"
        ));
        assert!(matches!(&spec.on_update_validations[0].check, RuleCheck::Regex { .. }));
        assert!(matches!(&spec.on_finalize.data, Some(DataSpec::Call { args, .. }) if args.len() == 2));
        assert!(spec.on_finalize.value.is_none());
    }

    #[test]
    fn unknown_rule_type_is_rejected() {
        let json = r#"{ "id": "x", "input": "a", "type": "script", "source": "1", "message": "m" }"#;
        assert!(serde_json::from_str::<ValidationRule>(json).is_err());
    }
}
