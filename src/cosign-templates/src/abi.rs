//! Dynamic ABI coding for human-readable signatures such as
//! `"function balanceOf(address owner) view returns (uint256)"`.
//!
//! Arguments arrive as strings (expression results) and are coerced to the declared parameter
//! types.

use alloy_dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy_json_abi::Function;

use crate::errors::AbiError;

pub fn parse_function(signature: &str) -> Result<Function, AbiError> {
    Function::parse(signature.trim()).map_err(|e| AbiError::InvalidSignature {
        signature: signature.to_string(),
        reason: e.to_string(),
    })
}

fn coerce(index: usize, ty: &DynSolType, raw: &str) -> Result<DynSolValue, AbiError> {
    ty.coerce_str(raw.trim())
        .map_err(|e| AbiError::InvalidArgument {
            index,
            ty: ty.sol_type_name().into_owned(),
            reason: e.to_string(),
        })
}

/// Selector-prefixed calldata.
pub fn encode_call(function: &Function, args: &[String]) -> Result<Vec<u8>, AbiError> {
    if function.inputs.len() != args.len() {
        return Err(AbiError::ArgumentCount {
            expected: function.inputs.len(),
            actual: args.len(),
        });
    }
    let values = function
        .inputs
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (param, raw))| {
            let ty = param.resolve().map_err(|e| AbiError::InvalidSignature {
                signature: function.signature(),
                reason: e.to_string(),
            })?;
            coerce(index, &ty, raw)
        })
        .collect::<Result<Vec<_>, _>>()?;
    function
        .abi_encode_input(&values)
        .map_err(|e| AbiError::Encode(e.to_string()))
}

/// Plain parameter encoding for a comma-separated type list, e.g. `"address,uint256"`.
pub fn encode_params(types: &str, args: &[String]) -> Result<Vec<u8>, AbiError> {
    let tuple = DynSolType::parse(&format!("({types})")).map_err(|e| AbiError::InvalidTypes {
        types: types.to_string(),
        reason: e.to_string(),
    })?;
    let DynSolType::Tuple(tys) = tuple else {
        return Err(AbiError::InvalidTypes {
            types: types.to_string(),
            reason: "expected a type list".to_string(),
        });
    };
    if tys.len() != args.len() {
        return Err(AbiError::ArgumentCount {
            expected: tys.len(),
            actual: args.len(),
        });
    }
    let values = tys
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (ty, raw))| coerce(index, ty, raw))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DynSolValue::Tuple(values).abi_encode_params())
}

/// Decode return data and render the first output the way context values are stored.
pub fn decode_first_output(function: &Function, data: &[u8]) -> Result<String, AbiError> {
    if function.outputs.is_empty() {
        return Err(AbiError::NoOutputs(function.name.clone()));
    }
    let values = function
        .abi_decode_output(data, true)
        .map_err(|e| AbiError::Decode(e.to_string()))?;
    values
        .first()
        .map(format_value)
        .ok_or_else(|| AbiError::Decode("no values returned".to_string()))
}

/// Integers in decimal, addresses checksummed, byte strings as `0x` hex.
pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
        DynSolValue::Address(a) => a.to_checksum(None),
        DynSolValue::Function(f) => format!("0x{}", hex::encode(f.as_slice())),
        DynSolValue::Bytes(b) => format!("0x{}", hex::encode(b)),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            let inner: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", inner.join(","))
        }
        #[allow(unreachable_patterns)]
        other => format!("{other:?}"),
    }
}
