//! Per-interaction interpreter state.
//!
//! A [`Session`] owns the mutable maps (context, inputs, touched flags, errors) for one run of a
//! [`Template`]. Data flows one way: an input change enqueues refresh rules, a refresh completion
//! writes context and clears that rule's error, and nothing but another input change enqueues a
//! rule again.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use alloy_json_abi::Function;
use alloy_primitives::{Address, Bytes, I256, U256};
use cosign_protocol::utils::bytes::parse_hex_bytes;
use cosign_types::{decimal::parse_u256, ChainReader, MetaTransaction, ReadError};
use tracing::{debug, warn};

use crate::{
    abi,
    batch::TransactionBatch,
    errors::{EvalError, TemplateError},
    expr::{parse_units, Expression, SafeContext, Scope, Value, MAX_DECIMALS},
    spec::{InputKind, InputSpec},
    template::{CompiledCheck, CompiledData, CompiledRead, CompiledRefresh, Template},
};

/// One failed rule, keyed by the rule that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub rule_id: String,
    pub message: String,
}

/// Rule id of the error raised when a value does not parse as its input's declared type.
pub const TYPE_RULE_ID: &str = "type";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No input touched yet. Refresh is suppressed.
    Idle,
    /// Refresh rules are queued but not yet planned.
    InputsChanged,
    /// Planned reads have not all been applied.
    ContextRefreshing,
    /// Every input is well-formed and passes its rules.
    Ready,
    /// At least one input is malformed or fails a rule.
    Blocked,
}

/// The read a refresh rule needs, detached from the session so it can run without a borrow.
#[derive(Clone, Debug, PartialEq)]
pub enum ReadRequest {
    Call {
        to: Address,
        data: Bytes,
        function: Function,
    },
    NativeBalance {
        owner: Address,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RefreshIntent {
    pub rule_id: String,
    pub target: String,
    pub request: ReadRequest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadResponse {
    Returned(Bytes),
    Balance(U256),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetailEntry {
    pub label: String,
    pub value: Result<String, EvalError>,
}

/// Perform the read an intent describes.
pub async fn execute_intent(
    reader: &dyn ChainReader,
    intent: &RefreshIntent,
) -> Result<ReadResponse, ReadError> {
    match &intent.request {
        ReadRequest::Call { to, data, .. } => reader
            .call_view(*to, data.clone())
            .await
            .map(ReadResponse::Returned),
        ReadRequest::NativeBalance { owner } => {
            reader.read_balance(*owner).await.map(ReadResponse::Balance)
        }
    }
}

#[derive(Debug)]
pub struct Session {
    template: Arc<Template>,
    safe: SafeContext,
    context: BTreeMap<String, Value>,
    inputs: BTreeMap<String, String>,
    touched: BTreeSet<String>,
    errors: BTreeMap<String, Vec<FieldError>>,
    refresh_errors: BTreeMap<String, FieldError>,
    pending: BTreeSet<String>,
    in_flight: Vec<String>,
}

impl Session {
    pub fn open(template: Arc<Template>, safe: SafeContext) -> Self {
        let mut session = Self {
            template,
            safe,
            context: BTreeMap::new(),
            inputs: BTreeMap::new(),
            touched: BTreeSet::new(),
            errors: BTreeMap::new(),
            refresh_errors: BTreeMap::new(),
            pending: BTreeSet::new(),
            in_flight: Vec::new(),
        };
        session.reset();
        session
    }

    /// Back to the state right after `open`: context and inputs from their defaults, nothing
    /// touched, no errors, no queued reads.
    pub fn reset(&mut self) {
        let spec = self.template.spec();
        self.context = spec
            .context
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v)))
            .collect();
        self.inputs = spec
            .inputs
            .iter()
            .filter_map(|i| i.options.default.clone().map(|d| (i.name.clone(), d)))
            .collect();
        self.touched.clear();
        self.errors.clear();
        self.refresh_errors.clear();
        self.pending.clear();
        self.in_flight.clear();
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn safe(&self) -> &SafeContext {
        &self.safe
    }

    pub fn context(&self) -> &BTreeMap<String, Value> {
        &self.context
    }

    pub fn inputs(&self) -> &BTreeMap<String, String> {
        &self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&str> {
        self.inputs.get(name).map(String::as_str)
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }

    /// Validation errors by input name.
    pub fn errors(&self) -> &BTreeMap<String, Vec<FieldError>> {
        &self.errors
    }

    pub fn errors_for(&self, input: &str) -> &[FieldError] {
        self.errors.get(input).map(Vec::as_slice).unwrap_or_default()
    }

    /// Failed context reads by rule id.
    pub fn refresh_errors(&self) -> &BTreeMap<String, FieldError> {
        &self.refresh_errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum::<usize>() + self.refresh_errors.len()
    }

    pub fn state(&self) -> SessionState {
        if self.touched.is_empty() {
            SessionState::Idle
        } else if !self.pending.is_empty() {
            SessionState::InputsChanged
        } else if !self.in_flight.is_empty() {
            SessionState::ContextRefreshing
        } else if self.blocking_inputs().is_empty() {
            SessionState::Ready
        } else {
            SessionState::Blocked
        }
    }

    fn scope(&self) -> Scope<'_> {
        Scope {
            context: &self.context,
            inputs: &self.inputs,
            safe: &self.safe,
        }
    }

    pub fn set_input(&mut self, name: &str, value: impl Into<String>) -> Result<(), TemplateError> {
        let value = value.into();
        let spec = self
            .template
            .input(name)
            .ok_or_else(|| TemplateError::UnknownInput(name.to_string()))?;
        let allowed = match spec.kind {
            InputKind::Select => spec.options.choices.iter().any(|c| c.value == value),
            InputKind::Bool => value == "true" || value == "false",
            _ => true,
        };
        if !allowed {
            return Err(TemplateError::InvalidChoice {
                input: name.to_string(),
                value,
            });
        }

        debug!(template = self.template.id(), input = name, "input changed");
        self.inputs.insert(name.to_string(), value);
        self.touched.insert(name.to_string());
        for rule in &self.template.refresh {
            if rule.watch.is_empty() || rule.watch.iter().any(|w| w == name) {
                self.pending.insert(rule.id.clone());
            }
        }
        self.revalidate_touched();
        Ok(())
    }

    /// Write a context value directly, as a caller without chain access would after reading it
    /// elsewhere. Touched inputs are re-validated; no refresh is enqueued.
    pub fn set_context(&mut self, key: &str, value: impl Into<Value>) {
        self.context.insert(key.to_string(), value.into());
        self.revalidate_touched();
    }

    /// Run every rule bound to `input` against the current state without recording anything.
    fn check(&self, input: &str) -> Vec<FieldError> {
        let raw = self.input(input).unwrap_or_default();
        let malformed = self
            .template
            .input(input)
            .and_then(|spec| type_error(spec, raw))
            .map(|message| FieldError {
                rule_id: TYPE_RULE_ID.to_string(),
                message,
            });
        let scope = self.scope();
        let failed = self
            .template
            .rules
            .iter()
            .filter(|r| r.input == input)
            .filter(|r| match &r.check {
                CompiledCheck::Regex(re) => !re.is_match(raw),
                // An expression that cannot be evaluated counts as failing.
                CompiledCheck::Expression(e) => !e.eval(&scope).is_ok_and(|v| v.truthy()),
            })
            .map(|r| FieldError {
                rule_id: r.id.clone(),
                message: r.message.clone(),
            });
        malformed.into_iter().chain(failed).collect()
    }

    fn validate(&mut self, input: &str) {
        let found = self.check(input);
        if found.is_empty() {
            self.errors.remove(input);
        } else {
            self.errors.insert(input.to_string(), found);
        }
    }

    fn revalidate_touched(&mut self) {
        let touched: Vec<String> = self.touched.iter().cloned().collect();
        for input in touched {
            self.validate(&input);
        }
    }

    /// Inputs that are malformed or fail a rule, touched or not.
    fn blocking_inputs(&self) -> Vec<String> {
        self.template
            .inputs()
            .iter()
            .map(|spec| spec.name.as_str())
            .filter(|input| !self.check(input).is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Drain queued refresh rules into reads. Returns nothing until an input has been touched.
    pub fn plan_refresh(&mut self) -> Vec<RefreshIntent> {
        if self.touched.is_empty() {
            return Vec::new();
        }
        let queued = std::mem::take(&mut self.pending);
        let mut intents = Vec::with_capacity(queued.len());
        for id in queued {
            let Some(rule) = self.template.refresh.iter().find(|r| r.id == id) else {
                continue;
            };
            match self.build_request(rule) {
                Ok(request) => {
                    self.in_flight.push(id.clone());
                    intents.push(RefreshIntent {
                        rule_id: id,
                        target: rule.target.clone(),
                        request,
                    });
                }
                Err(reason) => {
                    let message = rule.error_message.clone().unwrap_or(reason);
                    warn!(rule = %id, %message, "refresh rule could not be planned");
                    self.refresh_errors.insert(id.clone(), FieldError { rule_id: id, message });
                }
            }
        }
        intents
    }

    fn build_request(&self, rule: &CompiledRefresh) -> Result<ReadRequest, String> {
        let scope = self.scope();
        let address = |expr: &Expression| -> Result<Address, String> {
            let raw = expr
                .eval_string(&scope)
                .map_err(|e| format!("`{}` failed: {e}", expr.source()))?;
            raw.parse::<Address>()
                .map_err(|_| format!("`{}` is not an address: {raw:?}", expr.source()))
        };
        match &rule.read {
            CompiledRead::Contract { to, function, args } => {
                let to = address(to)?;
                let args = args
                    .iter()
                    .map(|a| a.eval_string(&scope))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| e.to_string())?;
                let data = abi::encode_call(function, &args).map_err(|e| e.to_string())?;
                Ok(ReadRequest::Call {
                    to,
                    data: data.into(),
                    function: function.clone(),
                })
            }
            CompiledRead::NativeBalance { owner } => Ok(ReadRequest::NativeBalance {
                owner: address(owner)?,
            }),
        }
    }

    /// Record the outcome of a planned read. The latest completion for a target wins.
    pub fn apply_refresh(&mut self, intent: &RefreshIntent, result: Result<ReadResponse, ReadError>) {
        if let Some(at) = self.in_flight.iter().position(|id| *id == intent.rule_id) {
            self.in_flight.remove(at);
        }
        let formatted = result.map_err(|e| e.to_string()).and_then(|response| {
            match (response, &intent.request) {
                (ReadResponse::Returned(data), ReadRequest::Call { function, .. }) => {
                    abi::decode_first_output(function, &data).map_err(|e| e.to_string())
                }
                (ReadResponse::Balance(balance), _) => Ok(balance.to_string()),
                (ReadResponse::Returned(_), ReadRequest::NativeBalance { .. }) => {
                    Err("unexpected return data for a balance read".to_string())
                }
            }
        });

        match formatted {
            Ok(value) => {
                debug!(rule = %intent.rule_id, target = %intent.target, %value, "context refreshed");
                self.context.insert(intent.target.clone(), Value::String(value));
                self.refresh_errors.remove(&intent.rule_id);
                self.revalidate_touched();
            }
            Err(reason) => {
                let message = self
                    .template
                    .refresh
                    .iter()
                    .find(|r| r.id == intent.rule_id)
                    .and_then(|r| r.error_message.clone())
                    .unwrap_or_else(|| format!("could not load {}: {reason}", intent.target));
                warn!(rule = %intent.rule_id, %reason, "context refresh failed");
                self.refresh_errors.insert(
                    intent.rule_id.clone(),
                    FieldError {
                        rule_id: intent.rule_id.clone(),
                        message,
                    },
                );
            }
        }
    }

    /// Plan and apply every queued read in order.
    pub async fn refresh(&mut self, reader: &dyn ChainReader) {
        for intent in self.plan_refresh() {
            let result = execute_intent(reader, &intent).await;
            self.apply_refresh(&intent, result);
        }
    }

    pub fn details(&self) -> Vec<DetailEntry> {
        let scope = self.scope();
        self.template
            .details
            .iter()
            .map(|(label, expr)| DetailEntry {
                label: label.clone(),
                value: expr.eval_string(&scope),
            })
            .collect()
    }

    /// Combine the collected state into one sub-call.
    ///
    /// Every input is validated first, touched or not, and any failure blocks. Failed context
    /// reads do not block on their own.
    pub fn finalize(&mut self) -> Result<MetaTransaction, TemplateError> {
        let names: Vec<String> = self.template.inputs().iter().map(|i| i.name.clone()).collect();
        for input in &names {
            self.touched.insert(input.clone());
            self.validate(input);
        }
        if !self.errors.is_empty() {
            return Err(TemplateError::ValidationPending(self.errors.keys().cloned().collect()));
        }

        let template = Arc::clone(&self.template);
        let scope = self.scope();
        let eval = |location: &str, expr: &Expression| {
            expr.eval_string(&scope).map_err(|source| TemplateError::Eval {
                location: location.to_string(),
                source,
            })
        };

        let finalize = &template.finalize;
        let raw_to = eval("onFinalize.to", &finalize.to)?;
        let to = raw_to
            .parse::<Address>()
            .map_err(|_| TemplateError::InvalidTarget(raw_to.clone()))?;
        let value = match &finalize.value {
            None => U256::ZERO,
            Some(expr) => {
                let raw = eval("onFinalize.value", expr)?;
                parse_u256(&raw).map_err(|_| TemplateError::InvalidValue(raw))?
            }
        };
        let data = match &finalize.data {
            CompiledData::Empty => Bytes::new(),
            CompiledData::Raw(expr) => parse_hex_bytes(&eval("onFinalize.data", expr)?)?,
            CompiledData::Call { function, args } => {
                let args = args
                    .iter()
                    .map(|a| eval("onFinalize.data", a))
                    .collect::<Result<Vec<_>, _>>()?;
                abi::encode_call(function, &args)?.into()
            }
        };

        debug!(template = template.id(), %to, %value, data_len = data.len(), "finalized");
        Ok(MetaTransaction::call(to, value, data))
    }

    /// Finalize, append to `batch`, and reset for the next transaction.
    pub fn finalize_into(&mut self, batch: &mut TransactionBatch) -> Result<(), TemplateError> {
        let transaction = self.finalize()?;
        batch.push(self.template.id(), transaction);
        self.reset();
        Ok(())
    }
}

/// Why `raw` does not parse as `spec`'s declared type. Empty values are left to rules.
fn type_error(spec: &InputSpec, raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let (well_formed, expected) = match spec.kind {
        InputKind::Address => (
            raw.starts_with("0x") && raw.parse::<Address>().is_ok(),
            "a 0x-prefixed 20-byte address".to_string(),
        ),
        InputKind::Uint => (parse_u256(raw).is_ok(), "an unsigned integer".to_string()),
        InputKind::Int => (raw.trim().parse::<I256>().is_ok(), "an integer".to_string()),
        InputKind::Amount => match spec.options.decimals {
            Some(decimals) => (
                parse_units(raw, usize::from(decimals).min(MAX_DECIMALS)).is_ok(),
                format!("a decimal amount with at most {decimals} fractional digits"),
            ),
            None => {
                let digits = raw.split_once('.').map_or(0, |(_, frac)| frac.len());
                (
                    parse_units(raw, digits.min(MAX_DECIMALS)).is_ok(),
                    "a decimal amount".to_string(),
                )
            }
        },
        InputKind::Bytes => (parse_hex_bytes(raw).is_ok(), "0x-prefixed hex bytes".to_string()),
        InputKind::Bool | InputKind::String | InputKind::Select => return None,
    };
    (!well_formed).then(|| format!("`{}` expects {expected}", spec.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::TransactionSpec;
    use alloy_primitives::address;

    const SAFE: SafeContext = SafeContext {
        address: address!("00000000000000000000000000000000000000c0"),
        chain_id: 1,
    };

    fn template(json: serde_json::Value) -> Arc<Template> {
        let spec: TransactionSpec = serde_json::from_value(json).unwrap();
        Arc::new(Template::compile(spec).unwrap())
    }

    fn native() -> Arc<Template> {
        template(serde_json::json!({
            "id": "native",
            "name": "Send native",
            "inputs": [
                { "name": "to", "type": "address" },
                { "name": "amount", "type": "amount", "options": { "decimals": 18, "default": "0" } },
                { "name": "speed", "type": "select", "options": { "choices": [
                    { "label": "Slow", "value": "slow" }, { "label": "Fast", "value": "fast" }
                ] } }
            ],
            "context": { "balance": "0" },
            "onInputUpdate": [{
                "id": "load-balance",
                "watch": ["amount"],
                "read": { "type": "balanceRead", "owner": "safe.address" },
                "target": "balance"
            }],
            "onUpdateValidations": [
                { "id": "to-format", "input": "to", "type": "regex",
                  "pattern": "^0x[0-9a-fA-F]{40}$", "message": "not an address" },
                { "id": "amount-funded", "input": "amount", "type": "expression",
                  "expression": "bigLte(parseUnits(inputs.amount, 18), context.balance)",
                  "message": "insufficient balance" }
            ],
            "onFinalize": { "to": "inputs.to", "value": "parseUnits(inputs.amount, 18)" },
            "detailsView": [
                { "label": "Recipient", "expression": "checksum(inputs.to)" },
                { "label": "Balance", "expression": "formatUnits(context.balance, 18)" }
            ]
        }))
    }

    #[test]
    fn opens_idle_with_defaults() {
        let s = Session::open(native(), SAFE);
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.input("amount"), Some("0"));
        assert!(!s.is_touched("amount"));
        assert_eq!(s.context()["balance"], Value::from("0"));
    }

    #[test]
    fn refresh_is_suppressed_until_touched() {
        let mut s = Session::open(native(), SAFE);
        assert!(s.plan_refresh().is_empty());

        s.set_input("to", "0x1234").unwrap();
        // `to` is not watched by the balance rule.
        assert!(s.plan_refresh().is_empty());

        s.set_input("amount", "1").unwrap();
        assert_eq!(s.state(), SessionState::InputsChanged);
        let intents = s.plan_refresh();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].request, ReadRequest::NativeBalance { owner: SAFE.address });
        assert_eq!(s.state(), SessionState::ContextRefreshing);
    }

    #[test]
    fn rejects_unknown_inputs_and_choices() {
        let mut s = Session::open(native(), SAFE);
        assert_eq!(
            s.set_input("memo", "x").unwrap_err(),
            TemplateError::UnknownInput("memo".into())
        );
        assert!(matches!(
            s.set_input("speed", "warp"),
            Err(TemplateError::InvalidChoice { .. })
        ));
        s.set_input("speed", "fast").unwrap();
    }

    #[test]
    fn validation_and_refresh_drive_state() {
        let mut s = Session::open(native(), SAFE);
        s.set_input("to", "0x00000000000000000000000000000000000000aa").unwrap();
        s.set_input("amount", "1.5").unwrap();
        assert_eq!(s.errors_for("amount").len(), 1);

        let intent = s.plan_refresh().remove(0);
        s.apply_refresh(&intent, Ok(ReadResponse::Balance(U256::from(2u64) * U256::from(10u64).pow(U256::from(18)))));
        assert_eq!(s.context()["balance"], Value::from("2000000000000000000"));
        assert!(s.errors().is_empty());
        assert_eq!(s.state(), SessionState::Ready);

        let details = s.details();
        assert_eq!(details[1].value, Ok("2".to_string()));

        let tx = s.finalize().unwrap();
        assert_eq!(tx.value, U256::from(1_500_000_000_000_000_000u64));
        assert!(tx.data.is_empty());
    }

    #[test]
    fn failed_read_keeps_rule_error_until_next_success() {
        let mut s = Session::open(native(), SAFE);
        s.set_input("amount", "1").unwrap();
        let intent = s.plan_refresh().remove(0);
        s.apply_refresh(&intent, Err(ReadError::CallFailed("timeout".into())));
        assert_eq!(s.refresh_errors().len(), 1);
        assert!(s.refresh_errors()["load-balance"].message.contains("balance"));

        // No re-planning without another input change.
        assert!(s.plan_refresh().is_empty());

        s.set_input("amount", "0").unwrap();
        let intent = s.plan_refresh().remove(0);
        s.apply_refresh(&intent, Ok(ReadResponse::Balance(U256::from(5u64))));
        assert!(s.refresh_errors().is_empty());
    }

    #[test]
    fn manual_context_revalidates_without_reads() {
        let mut s = Session::open(native(), SAFE);
        s.set_input("amount", "1").unwrap();
        assert_eq!(s.errors_for("amount").len(), 1);
        let queued = s.plan_refresh();
        s.set_context("balance", "1000000000000000000");
        assert!(s.errors_for("amount").is_empty());
        assert!(s.plan_refresh().is_empty());
        s.apply_refresh(&queued[0], Err(ReadError::NotImplemented));
        assert_eq!(s.refresh_errors().len(), 1);
    }

    #[test]
    fn finalize_validates_untouched_ruled_inputs() {
        let mut s = Session::open(native(), SAFE);
        let err = s.finalize().unwrap_err();
        assert_eq!(err, TemplateError::ValidationPending(vec!["to".to_string()]));
        assert!(s.is_touched("to"));
        assert_eq!(s.state(), SessionState::Blocked);
    }

    #[test]
    fn raw_data_needs_hex_prefix() {
        let t = template(serde_json::json!({
            "id": "raw",
            "name": "Raw call",
            "inputs": [{ "name": "data", "type": "bytes" }],
            "onFinalize": {
                "to": "safe.address",
                "value": "'0x10'",
                "data": { "type": "raw", "expression": "inputs.data" }
            }
        }));
        let mut s = Session::open(t, SAFE);
        s.set_input("data", "deadbeef").unwrap();
        assert_eq!(s.errors_for("data")[0].rule_id, TYPE_RULE_ID);
        assert_eq!(
            s.finalize().unwrap_err(),
            TemplateError::ValidationPending(vec!["data".into()])
        );

        s.set_input("data", "0xdeadbeef").unwrap();
        let tx = s.finalize().unwrap();
        assert_eq!(tx.to, SAFE.address);
        assert_eq!(tx.value, U256::from(16u64));
        assert_eq!(tx.data.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn values_must_parse_as_their_declared_type() {
        let t = template(serde_json::json!({
            "id": "typed",
            "name": "Typed inputs",
            "inputs": [
                { "name": "who", "type": "address" },
                { "name": "count", "type": "uint" },
                { "name": "delta", "type": "int" },
                { "name": "usdc", "type": "amount", "options": { "decimals": 6 } },
                { "name": "loose", "type": "amount" },
                { "name": "blob", "type": "bytes" },
                { "name": "memo", "type": "string" }
            ],
            "onFinalize": { "to": "safe.address" }
        }));
        let mut s = Session::open(t, SAFE);
        let bad = [
            ("who", "0x1234"),
            ("who", "00000000000000000000000000000000000000aa"),
            ("count", "-1"),
            ("delta", "1.5"),
            ("usdc", "1.0000001"),
            ("loose", "1.2.3"),
            ("blob", "0xabc"),
        ];
        for (name, value) in bad {
            s.set_input(name, value).unwrap();
            let errors = s.errors_for(name);
            assert_eq!(errors.len(), 1, "{name}={value}");
            assert_eq!(errors[0].rule_id, TYPE_RULE_ID);
            assert!(errors[0].message.contains(name));
        }
        assert!(s.errors_for("usdc")[0].message.contains("6 fractional digits"));
        assert_eq!(s.state(), SessionState::Blocked);

        let good = [
            ("who", "0x00000000000000000000000000000000000000aa"),
            ("count", "0x2a"),
            ("delta", "-17"),
            ("usdc", "1.000001"),
            ("loose", "0.000000000000000000000001"),
            ("blob", "0x"),
            ("memo", "anything"),
        ];
        for (name, value) in good {
            s.set_input(name, value).unwrap();
            assert!(s.errors_for(name).is_empty(), "{name}={value}");
        }
        // Clearing a value leaves required-ness to rules.
        s.set_input("count", "").unwrap();
        assert!(s.errors().is_empty());
        assert_eq!(s.state(), SessionState::Ready);
        assert_eq!(s.finalize().unwrap().to, SAFE.address);
    }

    #[test]
    fn non_address_target_is_rejected() {
        let t = template(serde_json::json!({
            "id": "bad-target",
            "name": "Bad target",
            "inputs": [{ "name": "to", "type": "string" }],
            "onFinalize": { "to": "inputs.to" }
        }));
        let mut s = Session::open(t, SAFE);
        s.set_input("to", "vitalik").unwrap();
        assert_eq!(
            s.finalize().unwrap_err(),
            TemplateError::InvalidTarget("vitalik".into())
        );
    }
}
