//! The closed builtin set. Anything not listed here does not parse.
//!
//! `big*`, `parseUnits`, `formatUnits` and `toHex` work on 256-bit unsigned integers given as
//! decimal or `0x` strings (or small whole numbers). They never wrap.

use alloy_primitives::{Address, U256};
use cosign_types::decimal::parse_u256;

use super::value::Value;
use crate::{abi, errors::EvalError};

pub const BUILTINS: &[&str] = &[
    "bigAdd",
    "bigSub",
    "bigMul",
    "bigDiv",
    "bigMod",
    "bigEq",
    "bigGt",
    "bigGte",
    "bigLt",
    "bigLte",
    "parseUnits",
    "formatUnits",
    "toHex",
    "isAddress",
    "checksum",
    "lower",
    "len",
    "concat",
    "startsWith",
    "abiEncode",
];

/// Largest whole number a double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// 10^77 is the largest power of ten below 2^256.
pub const MAX_DECIMALS: usize = 77;

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

pub fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    match name {
        "bigAdd" => {
            let (a, b) = two_uints(name, &args)?;
            a.checked_add(b)
                .map(big)
                .ok_or_else(|| EvalError::Overflow(name.to_string()))
        }
        "bigSub" => {
            let (a, b) = two_uints(name, &args)?;
            a.checked_sub(b)
                .map(big)
                .ok_or_else(|| EvalError::Underflow(name.to_string()))
        }
        "bigMul" => {
            let (a, b) = two_uints(name, &args)?;
            a.checked_mul(b)
                .map(big)
                .ok_or_else(|| EvalError::Overflow(name.to_string()))
        }
        "bigDiv" => {
            let (a, b) = two_uints(name, &args)?;
            a.checked_div(b).map(big).ok_or(EvalError::DivisionByZero)
        }
        "bigMod" => {
            let (a, b) = two_uints(name, &args)?;
            a.checked_rem(b).map(big).ok_or(EvalError::DivisionByZero)
        }
        "bigEq" => two_uints(name, &args).map(|(a, b)| Value::Bool(a == b)),
        "bigGt" => two_uints(name, &args).map(|(a, b)| Value::Bool(a > b)),
        "bigGte" => two_uints(name, &args).map(|(a, b)| Value::Bool(a >= b)),
        "bigLt" => two_uints(name, &args).map(|(a, b)| Value::Bool(a < b)),
        "bigLte" => two_uints(name, &args).map(|(a, b)| Value::Bool(a <= b)),
        "parseUnits" => {
            arity(name, &args, 2)?;
            let decimals = decimals_arg(&args[1])?;
            parse_units(&args[0].to_string(), decimals).map(big)
        }
        "formatUnits" => {
            arity(name, &args, 2)?;
            let value = uint_arg(&args[0])?;
            let decimals = decimals_arg(&args[1])?;
            Ok(Value::String(format_units(value, decimals)))
        }
        "toHex" => {
            arity(name, &args, 1)?;
            Ok(Value::String(format!("0x{:x}", uint_arg(&args[0])?)))
        }
        "isAddress" => {
            arity(name, &args, 1)?;
            Ok(Value::Bool(is_address(&args[0].to_string())))
        }
        "checksum" => {
            arity(name, &args, 1)?;
            let raw = args[0].to_string();
            if !is_address(&raw) {
                return Err(EvalError::Type(format!("{raw:?} is not an address")));
            }
            raw.parse::<Address>()
                .map(|a| Value::String(a.to_checksum(None)))
                .map_err(|e| EvalError::Type(format!("{raw:?} is not an address: {e}")))
        }
        "lower" => {
            arity(name, &args, 1)?;
            Ok(Value::String(args[0].to_string().to_lowercase()))
        }
        "len" => {
            arity(name, &args, 1)?;
            let n = match &args[0] {
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                Value::Null => 0,
                other => other.to_string().chars().count(),
            };
            Ok(Value::Number(n as f64))
        }
        "concat" => Ok(Value::String(args.iter().map(|a| a.to_string()).collect())),
        "startsWith" => {
            arity(name, &args, 2)?;
            Ok(Value::Bool(args[0].to_string().starts_with(&args[1].to_string())))
        }
        "abiEncode" => {
            if args.is_empty() {
                return Err(EvalError::Arity {
                    function: name.to_string(),
                    expected: "at least 1".to_string(),
                    actual: 0,
                });
            }
            let types = args[0].to_string();
            let values: Vec<String> = args[1..].iter().map(|a| a.to_string()).collect();
            let encoded = abi::encode_params(&types, &values)?;
            Ok(Value::String(format!("0x{}", hex::encode(encoded))))
        }
        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

fn big(v: U256) -> Value {
    Value::String(v.to_string())
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() != expected {
        return Err(EvalError::Arity {
            function: name.to_string(),
            expected: expected.to_string(),
            actual: args.len(),
        });
    }
    Ok(())
}

fn two_uints(name: &str, args: &[Value]) -> Result<(U256, U256), EvalError> {
    arity(name, args, 2)?;
    Ok((uint_arg(&args[0])?, uint_arg(&args[1])?))
}

fn uint_arg(value: &Value) -> Result<U256, EvalError> {
    match value {
        Value::String(s) => parse_u256(s).map_err(|_| EvalError::InvalidInteger(s.clone())),
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= MAX_SAFE_INTEGER => {
            Ok(U256::from(*n as u64))
        }
        other => Err(EvalError::InvalidInteger(other.to_string())),
    }
}

fn decimals_arg(value: &Value) -> Result<usize, EvalError> {
    let d = uint_arg(value)?;
    usize::try_from(d)
        .ok()
        .filter(|d| *d <= MAX_DECIMALS)
        .ok_or_else(|| EvalError::Type(format!("decimals {d} out of range 0..={MAX_DECIMALS}")))
}

fn pow10(decimals: usize) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// `"1.5"` with 6 decimals is `1500000`. More fractional digits than `decimals` is an error
/// rather than a silent truncation.
pub fn parse_units(amount: &str, decimals: usize) -> Result<U256, EvalError> {
    let trimmed = amount.trim();
    let invalid = || EvalError::InvalidInteger(amount.to_string());
    let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if (whole.is_empty() && frac.is_empty())
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }
    let frac = frac.trim_end_matches('0');
    if frac.len() > decimals {
        return Err(EvalError::Type(format!(
            "{amount:?} has more than {decimals} fractional digits"
        )));
    }

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        whole.parse::<U256>().map_err(|_| invalid())?
    };
    let frac_value = if frac.is_empty() {
        U256::ZERO
    } else {
        let digits = frac.parse::<U256>().map_err(|_| invalid())?;
        digits * pow10(decimals - frac.len())
    };
    whole
        .checked_mul(pow10(decimals))
        .and_then(|w| w.checked_add(frac_value))
        .ok_or_else(|| EvalError::Overflow("parseUnits".to_string()))
}

/// Inverse of [`parse_units`], without trailing fractional zeros.
pub fn format_units(value: U256, decimals: usize) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let unit = pow10(decimals);
    let whole = value / unit;
    let frac = value % unit;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

fn is_address(raw: &str) -> bool {
    raw.len() == 42
        && (raw.starts_with("0x") || raw.starts_with("0X"))
        && raw[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    #[test]
    fn big_arithmetic_is_exact() {
        // 2^200 + 1 is far outside a double's exact range.
        let two_200 = (U256::from(1u64) << 200usize).to_string();
        assert_eq!(
            call("bigAdd", vec![s(&two_200), Value::Number(1.0)]).unwrap(),
            s(&((U256::from(1u64) << 200usize) + U256::from(1u64)).to_string())
        );
        assert_eq!(call("bigGt", vec![s(&two_200), s("0x1")]).unwrap(), Value::Bool(true));
        assert_eq!(call("bigLte", vec![s("5"), s("5")]).unwrap(), Value::Bool(true));
        assert_eq!(call("bigMod", vec![s("10"), s("3")]).unwrap(), s("1"));
    }

    #[test]
    fn big_arithmetic_never_wraps() {
        assert_eq!(
            call("bigSub", vec![s("1"), s("2")]),
            Err(EvalError::Underflow("bigSub".into()))
        );
        assert_eq!(
            call("bigAdd", vec![s(&U256::MAX.to_string()), s("1")]),
            Err(EvalError::Overflow("bigAdd".into()))
        );
        assert_eq!(call("bigDiv", vec![s("1"), s("0")]), Err(EvalError::DivisionByZero));
        assert!(matches!(
            call("bigAdd", vec![s("-1"), s("1")]),
            Err(EvalError::InvalidInteger(_))
        ));
        assert!(matches!(
            call("bigAdd", vec![Value::Number(1e300), s("1")]),
            Err(EvalError::InvalidInteger(_))
        ));
    }

    #[test]
    fn units() {
        assert_eq!(parse_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_units(".25", 2).unwrap(), U256::from(25u64));
        assert_eq!(parse_units("3", 0).unwrap(), U256::from(3u64));
        assert_eq!(parse_units("1.50", 1).unwrap(), U256::from(15u64));
        assert!(parse_units("1.234", 2).is_err());
        assert!(parse_units("1e18", 18).is_err());
        assert!(parse_units("", 18).is_err());
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(2_000_000u64), 6), "2");
        assert_eq!(format_units(U256::from(5u64), 3), "0.005");
        assert_eq!(
            call("formatUnits", vec![call("parseUnits", vec![s("12.0345"), Value::Number(18.0)]).unwrap(), Value::Number(18.0)]).unwrap(),
            s("12.0345")
        );
    }

    #[test]
    fn address_helpers() {
        let lower = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
        assert_eq!(call("isAddress", vec![s(lower)]).unwrap(), Value::Bool(true));
        assert_eq!(call("isAddress", vec![s("0x1234")]).unwrap(), Value::Bool(false));
        assert_eq!(
            call("checksum", vec![s(lower)]).unwrap(),
            s("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
        );
        assert_eq!(call("toHex", vec![s("255")]).unwrap(), s("0xff"));
    }

    #[test]
    fn string_helpers() {
        assert_eq!(call("concat", vec![s("a"), Value::Number(1.0), Value::Bool(true)]).unwrap(), s("a1true"));
        assert_eq!(call("len", vec![s("0x1234")]).unwrap(), Value::Number(6.0));
        assert_eq!(call("startsWith", vec![s("0xab"), s("0x")]).unwrap(), Value::Bool(true));
        assert!(matches!(call("lower", vec![]), Err(EvalError::Arity { .. })));
    }

    #[test]
    fn abi_encode_params() {
        let out = call("abiEncode", vec![s("address,uint256"), s("0x0000000000000000000000000000000000000001"), s("2")]).unwrap();
        let expected = format!("0x{}{}", format!("{:0>64}", "1"), format!("{:0>64}", "2"));
        assert_eq!(out, s(&expected));
    }
}
