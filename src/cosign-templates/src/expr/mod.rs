//! The template expression language.
//!
//! A fixed grammar (literals, `context.*` / `inputs.*` / `safe.*` paths, member and index access,
//! the usual unary, binary and conditional operators) plus a closed set of builtins. Evaluation
//! is total and side-effect free: no assignment, no user-defined functions, no I/O.

mod builtins;
mod eval;
mod lexer;
mod parser;
mod value;

use std::collections::BTreeMap;

use alloy_primitives::Address;

pub use builtins::{is_builtin, parse_units, BUILTINS, MAX_DECIMALS};
pub use parser::{BinaryOp, Expr, UnaryOp};
pub use value::Value;

use crate::errors::EvalError;

pub const MAX_EXPRESSION_LEN: usize = 4096;
pub const MAX_DEPTH: usize = 64;

/// Roots an expression may read from.
pub const ROOTS: [&str; 3] = ["context", "inputs", "safe"];

/// The account a session composes transactions for, exposed as `safe.address` / `safe.chainId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SafeContext {
    pub address: Address,
    pub chain_id: u64,
}

/// Everything an expression can see.
pub struct Scope<'a> {
    pub context: &'a BTreeMap<String, Value>,
    pub inputs: &'a BTreeMap<String, String>,
    pub safe: &'a SafeContext,
}

/// A parsed expression together with its source text.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, EvalError> {
        if source.len() > MAX_EXPRESSION_LEN {
            return Err(EvalError::TooLong(source.len()));
        }
        Ok(Self {
            source: source.to_string(),
            ast: parser::parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    pub fn eval(&self, scope: &Scope<'_>) -> Result<Value, EvalError> {
        eval::eval(&self.ast, scope)
    }

    /// Evaluate and render as the string form used for addresses, amounts and ABI arguments.
    pub fn eval_string(&self, scope: &Scope<'_>) -> Result<String, EvalError> {
        self.eval(scope).map(|v| v.to_string())
    }
}
