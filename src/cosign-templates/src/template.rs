//! Load-time compilation of a [`TransactionSpec`]: patterns compiled, expressions parsed,
//! signatures parsed, and every `inputs.*` reference resolved. A spec that compiles cannot fail
//! mid-session for structural reasons.

use std::collections::BTreeSet;

use alloy_json_abi::Function;
use regex::Regex;

use crate::{
    abi::parse_function,
    errors::{AbiError, EvalError, SpecError},
    expr::{Expression, ROOTS},
    session::TYPE_RULE_ID,
    spec::{DataSpec, InputKind, InputSpec, ReadSpec, RuleCheck, TransactionSpec},
};

const ERC20_BALANCE_OF: &str = "function balanceOf(address owner) view returns (uint256)";
const SAFE_MEMBERS: [&str; 2] = ["address", "chainId"];

#[derive(Debug)]
pub(crate) enum CompiledCheck {
    Regex(Regex),
    Expression(Expression),
}

#[derive(Debug)]
pub(crate) struct CompiledRule {
    pub id: String,
    pub input: String,
    pub check: CompiledCheck,
    pub message: String,
}

#[derive(Debug)]
pub(crate) enum CompiledRead {
    Contract {
        to: Expression,
        function: Function,
        args: Vec<Expression>,
    },
    NativeBalance {
        owner: Expression,
    },
}

#[derive(Debug)]
pub(crate) struct CompiledRefresh {
    pub id: String,
    pub watch: Vec<String>,
    pub target: String,
    pub error_message: Option<String>,
    pub read: CompiledRead,
}

#[derive(Debug)]
pub(crate) enum CompiledData {
    Empty,
    Raw(Expression),
    Call {
        function: Function,
        args: Vec<Expression>,
    },
}

#[derive(Debug)]
pub(crate) struct CompiledFinalize {
    pub to: Expression,
    pub value: Option<Expression>,
    pub data: CompiledData,
}

/// An immutable, validated spec shared by any number of sessions.
#[derive(Debug)]
pub struct Template {
    spec: TransactionSpec,
    pub(crate) rules: Vec<CompiledRule>,
    pub(crate) refresh: Vec<CompiledRefresh>,
    pub(crate) finalize: CompiledFinalize,
    pub(crate) details: Vec<(String, Expression)>,
}

struct Compiler<'a> {
    spec: &'a TransactionSpec,
    inputs: BTreeSet<&'a str>,
}

impl<'a> Compiler<'a> {
    fn expression(&self, location: &str, source: &str) -> Result<Expression, SpecError> {
        let invalid = |source: EvalError| SpecError::InvalidExpression {
            spec: self.spec.id.clone(),
            location: location.to_string(),
            source,
        };
        let expr = Expression::parse(source).map_err(invalid)?;
        for (root, member) in expr.ast().paths() {
            if !ROOTS.contains(&root.as_str()) {
                return Err(invalid(EvalError::UnknownIdentifier(root)));
            }
            match (root.as_str(), member) {
                ("inputs", Some(name)) if !self.inputs.contains(name.as_str()) => {
                    return Err(SpecError::UnknownInput {
                        spec: self.spec.id.clone(),
                        location: location.to_string(),
                        input: name,
                    });
                }
                ("safe", Some(name)) if !SAFE_MEMBERS.contains(&name.as_str()) => {
                    return Err(invalid(EvalError::UnknownIdentifier(format!("safe.{name}"))));
                }
                _ => {}
            }
        }
        Ok(expr)
    }

    fn function(&self, location: &str, signature: &str, argc: usize) -> Result<Function, SpecError> {
        let invalid = |source: AbiError| SpecError::InvalidAbi {
            spec: self.spec.id.clone(),
            location: location.to_string(),
            source,
        };
        let function = parse_function(signature).map_err(invalid)?;
        if function.inputs.len() != argc {
            return Err(invalid(AbiError::ArgumentCount {
                expected: function.inputs.len(),
                actual: argc,
            }));
        }
        Ok(function)
    }

    fn input(&self, location: &str, name: &str) -> Result<(), SpecError> {
        if self.inputs.contains(name) {
            Ok(())
        } else {
            Err(SpecError::UnknownInput {
                spec: self.spec.id.clone(),
                location: location.to_string(),
                input: name.to_string(),
            })
        }
    }
}

impl Template {
    pub fn compile(spec: TransactionSpec) -> Result<Self, SpecError> {
        let mut inputs = BTreeSet::new();
        for input in &spec.inputs {
            if !inputs.insert(input.name.as_str()) {
                return Err(SpecError::DuplicateInput {
                    spec: spec.id.clone(),
                    input: input.name.clone(),
                });
            }
            if input.kind == InputKind::Select && input.options.choices.is_empty() {
                return Err(SpecError::EmptyChoices {
                    spec: spec.id.clone(),
                    input: input.name.clone(),
                });
            }
        }
        let c = Compiler { spec: &spec, inputs };

        // Validation and refresh rules share one id space: errors are cleared by rule id. Type
        // errors use a reserved id.
        let mut ids = BTreeSet::from([TYPE_RULE_ID.to_string()]);
        let mut claim = |id: &str| {
            if ids.insert(id.to_string()) {
                Ok(())
            } else {
                Err(SpecError::DuplicateRule {
                    spec: spec.id.clone(),
                    rule: id.to_string(),
                })
            }
        };

        let mut rules = Vec::with_capacity(spec.on_update_validations.len());
        for rule in &spec.on_update_validations {
            claim(&rule.id)?;
            let location = format!("onUpdateValidations[{}]", rule.id);
            c.input(&location, &rule.input)?;
            let check = match &rule.check {
                RuleCheck::Regex { pattern } => {
                    CompiledCheck::Regex(Regex::new(pattern).map_err(|e| SpecError::InvalidRegex {
                        spec: spec.id.clone(),
                        rule: rule.id.clone(),
                        reason: e.to_string(),
                    })?)
                }
                RuleCheck::Expression { expression } => {
                    CompiledCheck::Expression(c.expression(&location, expression)?)
                }
            };
            rules.push(CompiledRule {
                id: rule.id.clone(),
                input: rule.input.clone(),
                check,
                message: rule.message.clone(),
            });
        }

        let mut refresh = Vec::with_capacity(spec.on_input_update.len());
        for rule in &spec.on_input_update {
            claim(&rule.id)?;
            let location = format!("onInputUpdate[{}]", rule.id);
            for watched in &rule.watch {
                c.input(&location, watched)?;
            }
            let read = match &rule.read {
                ReadSpec::ContractRead { to, method, args } => {
                    let function = c.function(&location, method, args.len())?;
                    if function.outputs.is_empty() {
                        return Err(SpecError::InvalidAbi {
                            spec: spec.id.clone(),
                            location,
                            source: AbiError::NoOutputs(function.name),
                        });
                    }
                    CompiledRead::Contract {
                        to: c.expression(&location, to)?,
                        function,
                        args: args
                            .iter()
                            .map(|a| c.expression(&location, a))
                            .collect::<Result<_, _>>()?,
                    }
                }
                ReadSpec::BalanceRead {
                    owner,
                    token: Some(token),
                } => CompiledRead::Contract {
                    to: c.expression(&location, token)?,
                    function: c.function(&location, ERC20_BALANCE_OF, 1)?,
                    args: vec![c.expression(&location, owner)?],
                },
                ReadSpec::BalanceRead { owner, token: None } => CompiledRead::NativeBalance {
                    owner: c.expression(&location, owner)?,
                },
            };
            refresh.push(CompiledRefresh {
                id: rule.id.clone(),
                watch: rule.watch.clone(),
                target: rule.target.clone(),
                error_message: rule.error_message.clone(),
                read,
            });
        }

        let finalize = &spec.on_finalize;
        let data = match &finalize.data {
            None => CompiledData::Empty,
            Some(DataSpec::Raw { expression }) => {
                CompiledData::Raw(c.expression("onFinalize.data", expression)?)
            }
            Some(DataSpec::Call { signature, args }) => CompiledData::Call {
                function: c.function("onFinalize.data", signature, args.len())?,
                args: args
                    .iter()
                    .map(|a| c.expression("onFinalize.data", a))
                    .collect::<Result<_, _>>()?,
            },
        };
        let finalize = CompiledFinalize {
            to: c.expression("onFinalize.to", &finalize.to)?,
            value: finalize
                .value
                .as_deref()
                .map(|v| c.expression("onFinalize.value", v))
                .transpose()?,
            data,
        };

        let details = spec
            .details_view
            .iter()
            .map(|d| {
                c.expression(&format!("detailsView[{}]", d.label), &d.expression)
                    .map(|e| (d.label.clone(), e))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            spec,
            rules,
            refresh,
            finalize,
            details,
        })
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &TransactionSpec {
        &self.spec
    }

    pub fn inputs(&self) -> &[InputSpec] {
        &self.spec.inputs
    }

    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.spec.inputs.iter().find(|i| i.name == name)
    }

    pub fn has_rules(&self, input: &str) -> bool {
        self.rules.iter().any(|r| r.input == input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{FinalizeSpec, RefreshRule, ValidationRule};

    fn base() -> TransactionSpec {
        serde_json::from_value(serde_json::json!({
            "id": "native",
            "name": "Send native",
            "inputs": [
                { "name": "to", "type": "address" },
                { "name": "amount", "type": "amount", "options": { "decimals": 18 } }
            ],
            "onFinalize": { "to": "inputs.to", "value": "parseUnits(inputs.amount, 18)" }
        }))
        .unwrap()
    }

    #[test]
    fn compiles_minimal_spec() {
        let t = Template::compile(base()).unwrap();
        assert_eq!(t.id(), "native");
        assert!(matches!(t.finalize.data, CompiledData::Empty));
        assert!(t.input("amount").is_some());
        assert!(!t.has_rules("to"));
    }

    #[test]
    fn rejects_unknown_input_reference() {
        let mut spec = base();
        spec.on_finalize = FinalizeSpec {
            to: "inputs.recipient".into(),
            value: None,
            data: None,
        };
        assert_eq!(
            Template::compile(spec).unwrap_err(),
            SpecError::UnknownInput {
                spec: "native".into(),
                location: "onFinalize.to".into(),
                input: "recipient".into()
            }
        );
    }

    #[test]
    fn rejects_bad_regex_and_duplicate_rule_ids() {
        let mut spec = base();
        spec.on_update_validations.push(ValidationRule {
            id: "r".into(),
            input: "to".into(),
            check: RuleCheck::Regex { pattern: "(".into() },
            message: "bad".into(),
        });
        assert!(matches!(Template::compile(spec), Err(SpecError::InvalidRegex { .. })));

        let mut spec = base();
        let rule = ValidationRule {
            id: "r".into(),
            input: "to".into(),
            check: RuleCheck::Expression {
                expression: "isAddress(inputs.to)".into(),
            },
            message: "bad".into(),
        };
        spec.on_update_validations.push(rule.clone());
        spec.on_update_validations.push(rule.clone());
        assert!(matches!(Template::compile(spec), Err(SpecError::DuplicateRule { .. })));

        let mut spec = base();
        spec.on_update_validations.push(ValidationRule {
            id: TYPE_RULE_ID.into(),
            ..rule
        });
        assert!(matches!(Template::compile(spec), Err(SpecError::DuplicateRule { .. })));
    }

    #[test]
    fn rejects_unknown_roots_and_functions() {
        let mut spec = base();
        spec.on_finalize.to = "window.to".into();
        assert!(matches!(
            Template::compile(spec),
            Err(SpecError::InvalidExpression {
                source: EvalError::UnknownIdentifier(_),
                ..
            })
        ));

        let mut spec = base();
        spec.on_finalize.to = "safe.owner".into();
        assert!(Template::compile(spec).is_err());

        let mut spec = base();
        spec.on_finalize.to = "fetch(inputs.to)".into();
        assert!(matches!(
            Template::compile(spec),
            Err(SpecError::InvalidExpression {
                source: EvalError::UnknownFunction(_),
                ..
            })
        ));
    }

    #[test]
    fn checks_call_arity_and_read_outputs() {
        let mut spec = base();
        spec.on_finalize.data = Some(DataSpec::Call {
            signature: "transfer(address,uint256)".into(),
            args: vec!["inputs.to".into()],
        });
        assert!(matches!(Template::compile(spec), Err(SpecError::InvalidAbi { .. })));

        let mut spec = base();
        spec.on_input_update.push(RefreshRule {
            id: "poke".into(),
            watch: vec!["to".into()],
            read: ReadSpec::ContractRead {
                to: "inputs.to".into(),
                method: "function poke()".into(),
                args: vec![],
            },
            target: "x".into(),
            error_message: None,
        });
        assert!(matches!(
            Template::compile(spec),
            Err(SpecError::InvalidAbi {
                source: AbiError::NoOutputs(_),
                ..
            })
        ));
    }
}
