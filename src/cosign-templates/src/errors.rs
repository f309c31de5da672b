use cosign_protocol::EncodingError;
use thiserror::Error;

/// Expression parse or evaluation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("expression is {0} bytes long, limit is {limit}", limit = crate::expr::MAX_EXPRESSION_LEN)]
    TooLong(usize),
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("`{function}` expects {expected} arguments, got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },
    #[error("type error: {0}")]
    Type(String),
    #[error("invalid unsigned integer {0:?}")]
    InvalidInteger(String),
    #[error("overflow in `{0}`")]
    Overflow(String),
    #[error("underflow in `{0}`")]
    Underflow(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error(transparent)]
    Abi(#[from] AbiError),
}

/// Human-readable signature parsing and dynamic ABI coding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("invalid function signature {signature:?}: {reason}")]
    InvalidSignature { signature: String, reason: String },
    #[error("invalid type list {types:?}: {reason}")]
    InvalidTypes { types: String, reason: String },
    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("argument {index} ({ty}) is invalid: {reason}")]
    InvalidArgument {
        index: usize,
        ty: String,
        reason: String,
    },
    #[error("encoding failed: {0}")]
    Encode(String),
    #[error("return data could not be decoded: {0}")]
    Decode(String),
    #[error("function `{0}` declares no outputs")]
    NoOutputs(String),
}

/// A spec document that cannot be loaded. Raised at startup, never mid-session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("{source_name} is not a valid spec document: {reason}")]
    Json { source_name: String, reason: String },
    #[error("spec id `{0}` is defined more than once")]
    DuplicateSpec(String),
    #[error("spec `{spec}`: input `{input}` is declared more than once")]
    DuplicateInput { spec: String, input: String },
    #[error("spec `{spec}`: rule id `{rule}` is used more than once")]
    DuplicateRule { spec: String, rule: String },
    #[error("spec `{spec}`: `{location}` refers to unknown input `{input}`")]
    UnknownInput {
        spec: String,
        location: String,
        input: String,
    },
    #[error("spec `{spec}`: select input `{input}` has no choices")]
    EmptyChoices { spec: String, input: String },
    #[error("spec `{spec}`: rule `{rule}` has an invalid pattern: {reason}")]
    InvalidRegex {
        spec: String,
        rule: String,
        reason: String,
    },
    #[error("spec `{spec}`: `{location}` is not a valid expression: {source}")]
    InvalidExpression {
        spec: String,
        location: String,
        source: EvalError,
    },
    #[error("spec `{spec}`: `{location}`: {source}")]
    InvalidAbi {
        spec: String,
        location: String,
        source: AbiError,
    },
}

/// Session operations that cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown input `{0}`")]
    UnknownInput(String),
    #[error("`{value}` is not one of the choices for `{input}`")]
    InvalidChoice { input: String, value: String },
    #[error("validation errors outstanding on: {}", .0.join(", "))]
    ValidationPending(Vec<String>),
    #[error("`{location}` failed to evaluate: {source}")]
    Eval { location: String, source: EvalError },
    #[error("finalize target {0:?} is not an address")]
    InvalidTarget(String),
    #[error("finalize value {0:?} is not an unsigned integer")]
    InvalidValue(String),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Abi(#[from] AbiError),
    #[error("batch index {index} is out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no template with id `{0}`")]
    UnknownTemplate(String),
}
