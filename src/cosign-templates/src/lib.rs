//! Declarative transaction templates.
//!
//! A template describes, as data, which inputs to collect, which on-chain values to fetch into
//! context, which rules to check as values change, and how to combine the result into one
//! `to / value / data` sub-call. [`SpecRegistry`] loads and compiles templates once; each
//! [`Session`] runs one of them against one account.

pub mod abi;
pub mod batch;
pub mod errors;
pub mod expr;
pub mod registry;
pub mod session;
pub mod spec;
pub mod template;

pub use batch::{BatchItem, TransactionBatch};
pub use errors::{AbiError, EvalError, SpecError, TemplateError};
pub use expr::{Expression, SafeContext, Value};
pub use registry::{GroupSummary, SpecRegistry};
pub use session::{
    execute_intent, DetailEntry, FieldError, ReadRequest, ReadResponse, RefreshIntent, Session,
    SessionState,
};
pub use spec::{SpecGroup, TransactionSpec};
pub use template::Template;
