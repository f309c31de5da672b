use std::{cmp::Ordering, collections::BTreeMap};

use super::{
    builtins,
    parser::{BinaryOp, Expr, UnaryOp},
    value::Value,
    Scope,
};
use crate::errors::EvalError;

pub fn eval(expr: &Expr, scope: &Scope<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Ident(root) => root_value(root, scope),
        Expr::Member(base, name) => match base.as_ref() {
            Expr::Ident(root) => root_member(root, name, scope),
            other => Ok(eval(other, scope)?.member(name)),
        },
        Expr::Index(base, index) => {
            let base = eval(base, scope)?;
            let index = eval(index, scope)?;
            base.index(&index)
        }
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|a| eval(a, scope))
                .collect::<Result<Vec<_>, _>>()?;
            builtins::call(name, args)
        }
        Expr::Unary(op, operand) => {
            let v = eval(operand, scope)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
                UnaryOp::Neg => Ok(Value::Number(-v.to_number()?)),
            }
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            let l = eval(lhs, scope)?;
            if l.truthy() {
                eval(rhs, scope)
            } else {
                Ok(l)
            }
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            let l = eval(lhs, scope)?;
            if l.truthy() {
                Ok(l)
            } else {
                eval(rhs, scope)
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let l = eval(lhs, scope)?;
            let r = eval(rhs, scope)?;
            binary(*op, l, r)
        }
        Expr::Conditional(cond, then, otherwise) => {
            if eval(cond, scope)?.truthy() {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
    }
}

fn root_value(root: &str, scope: &Scope<'_>) -> Result<Value, EvalError> {
    match root {
        "context" => Ok(Value::Map(scope.context.clone())),
        "inputs" => Ok(Value::Map(
            scope
                .inputs
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )),
        "safe" => Ok(Value::Map(BTreeMap::from([
            ("address".to_string(), Value::String(scope.safe.address.to_checksum(None))),
            ("chainId".to_string(), Value::Number(scope.safe.chain_id as f64)),
        ]))),
        other => Err(EvalError::UnknownIdentifier(other.to_string())),
    }
}

fn root_member(root: &str, name: &str, scope: &Scope<'_>) -> Result<Value, EvalError> {
    match root {
        "context" => Ok(scope.context.get(name).cloned().unwrap_or(Value::Null)),
        "inputs" => Ok(scope
            .inputs
            .get(name)
            .map(|v| Value::String(v.clone()))
            .unwrap_or(Value::Null)),
        _ => Ok(root_value(root, scope)?.member(name)),
    }
}

fn binary(op: BinaryOp, l: Value, r: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => match (&l, &r) {
            (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::String(format!("{l}{r}"))),
            _ => Ok(Value::Number(l.to_number()? + r.to_number()?)),
        },
        BinaryOp::Sub => Ok(Value::Number(l.to_number()? - r.to_number()?)),
        BinaryOp::Mul => Ok(Value::Number(l.to_number()? * r.to_number()?)),
        BinaryOp::Div | BinaryOp::Rem => {
            let (a, b) = (l.to_number()?, r.to_number()?);
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Number(if op == BinaryOp::Div { a / b } else { a % b }))
        }
        BinaryOp::Eq => Ok(Value::Bool(l == r)),
        BinaryOp::Ne => Ok(Value::Bool(l != r)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&l, &r)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Some(Ordering::Less),
                BinaryOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                BinaryOp::Gt => ordering == Some(Ordering::Greater),
                _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            }))
        }
        // Reached only if both sides were already evaluated.
        BinaryOp::And => Ok(if l.truthy() { r } else { l }),
        BinaryOp::Or => Ok(if l.truthy() { l } else { r }),
    }
}

/// Two strings compare lexically; anything else compares as numbers (NaN is unordered).
fn compare(l: &Value, r: &Value) -> Result<Option<Ordering>, EvalError> {
    match (l, r) {
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        _ => Ok(l.to_number()?.partial_cmp(&r.to_number()?)),
    }
}
