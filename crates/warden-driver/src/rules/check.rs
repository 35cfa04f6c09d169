//! Field checks for the `rules` engine
//!
//! A rule set is a list of checks. Each check names a dotted path into the
//! reviewed object, an operator, and (for comparing operators) an operand
//! taken either from a literal `value` or from a constraint parameter named
//! by `param`. A `*` path segment fans out over list elements or map values.

use crate::error::{DriverError, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;
use warden_types::PolicyTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Required,
    Forbidden,
    Equals,
    NotEquals,
    OneOf,
    NotOneOf,
    Matches,
    NotMatches,
}

impl Operator {
    fn takes_operand(self) -> bool {
        !matches!(self, Self::Required | Self::Forbidden)
    }

    fn default_message(self) -> &'static str {
        match self {
            Self::Required => "{{path}} is required",
            Self::Forbidden => "{{path}} is forbidden",
            Self::Equals => "{{path}} must equal {{expected}}, found {{value}}",
            Self::NotEquals => "{{path}} must not equal {{expected}}",
            Self::OneOf => "{{path}} must be one of {{expected}}, found {{value}}",
            Self::NotOneOf => "{{path}} must not be one of {{expected}}, found {{value}}",
            Self::Matches => "{{path}} must match {{expected}}, found {{value}}",
            Self::NotMatches => "{{path}} must not match {{expected}}, found {{value}}",
        }
    }
}

/// A check as written in template source.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckSpec {
    pub path: String,
    pub op: Operator,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Any,
}

#[derive(Debug)]
enum Operand {
    None,
    Literal(Value),
    Param(Vec<String>),
}

/// A compiled check.
#[derive(Debug)]
pub struct Check {
    path: Vec<Segment>,
    op: Operator,
    operand: Operand,
    // Literal patterns are compiled once; parameter patterns per query.
    pattern: Option<Regex>,
    message: String,
}

impl Check {
    pub fn compile(spec: CheckSpec) -> std::result::Result<Self, String> {
        let path = parse_path(&spec.path)?;
        let op = spec.op;

        let operand = match (op.takes_operand(), spec.value, spec.param) {
            (false, None, None) => Operand::None,
            (false, _, _) => return Err(format!("operator {op:?} takes no operand")),
            (true, Some(_), Some(_)) => {
                return Err("set either value or param, not both".to_string())
            }
            (true, Some(value), None) => Operand::Literal(value),
            (true, None, Some(param)) if !param.is_empty() => {
                Operand::Param(param.split('.').map(str::to_string).collect())
            }
            (true, None, _) => return Err(format!("operator {op:?} needs a value or param")),
        };

        let mut pattern = None;
        if let Operand::Literal(value) = &operand {
            match op {
                Operator::OneOf | Operator::NotOneOf if !value.is_array() => {
                    return Err(format!("operator {op:?} needs a list value"));
                }
                Operator::Matches | Operator::NotMatches => {
                    let raw = value
                        .as_str()
                        .ok_or_else(|| format!("operator {op:?} needs a string value"))?;
                    pattern = Some(compile_pattern(raw)?);
                }
                _ => {}
            }
        }

        Ok(Self {
            path,
            op,
            operand,
            pattern,
            message: spec
                .message
                .unwrap_or_else(|| op.default_message().to_string()),
        })
    }

    /// Messages for every location that violates the check.
    ///
    /// An error means the check could not run (a missing or ill-typed
    /// parameter, or an invalid parameter pattern).
    pub fn evaluate(&self, object: &Value, params: &Value) -> std::result::Result<Vec<String>, String> {
        let expected: Option<Cow<'_, Value>> = match &self.operand {
            Operand::None => None,
            Operand::Literal(value) => Some(Cow::Borrowed(value)),
            Operand::Param(path) => Some(Cow::Owned(lookup_param(params, path)?)),
        };

        let list: &[Value] = match (self.op, expected.as_deref()) {
            (Operator::OneOf | Operator::NotOneOf, Some(Value::Array(items))) => items.as_slice(),
            (Operator::OneOf | Operator::NotOneOf, _) => {
                return Err(format!("{} expects a list operand", self.describe()))
            }
            _ => &[],
        };

        let pattern: Option<Cow<'_, Regex>> = match (self.op, &self.pattern) {
            (_, Some(compiled)) => Some(Cow::Borrowed(compiled)),
            (Operator::Matches | Operator::NotMatches, None) => {
                let raw = expected
                    .as_deref()
                    .and_then(Value::as_str)
                    .ok_or_else(|| format!("{} expects a string pattern", self.describe()))?;
                Some(Cow::Owned(compile_pattern(raw)?))
            }
            _ => None,
        };
        let is_match = |v: &Value| pattern.as_ref().is_some_and(|re| re.is_match(&render(v)));

        let mut messages = Vec::new();
        for located in resolve(object, &self.path) {
            let value = located.value.filter(|v| !v.is_null());
            let violated = match self.op {
                Operator::Required => value.is_none(),
                Operator::Forbidden => value.is_some(),
                Operator::Equals => value != expected.as_deref(),
                Operator::NotEquals => value.is_some() && value == expected.as_deref(),
                Operator::OneOf => !value.is_some_and(|v| list.contains(v)),
                Operator::NotOneOf => value.is_some_and(|v| list.contains(v)),
                Operator::Matches => !value.is_some_and(is_match),
                Operator::NotMatches => value.is_some_and(is_match),
            };
            if violated {
                messages.push(self.render_message(&located.path, value, expected.as_deref()));
            }
        }
        Ok(messages)
    }

    fn describe(&self) -> String {
        format!("check {:?} on {}", self.op, display_path(&self.path))
    }

    fn render_message(&self, path: &str, value: Option<&Value>, expected: Option<&Value>) -> String {
        self.message
            .replace("{{path}}", path)
            .replace("{{value}}", &value.map(render).unwrap_or_else(|| "<missing>".into()))
            .replace("{{expected}}", &expected.map(render).unwrap_or_default())
    }
}

/// The compiled checks of one template.
#[derive(Debug)]
pub struct RuleSet {
    kind: String,
    checks: Vec<Check>,
}

impl RuleSet {
    /// Compile the `rules` source of a template: a list of check specs.
    pub fn compile(template: &PolicyTemplate, source: &Value) -> Result<Self> {
        let specs: Vec<CheckSpec> = serde_json::from_value(source.clone())
            .map_err(|e| DriverError::invalid_template(template.name(), e.to_string()))?;
        let checks = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                Check::compile(spec).map_err(|reason| {
                    DriverError::invalid_template(template.name(), format!("check {i}: {reason}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            kind: template.kind().to_string(),
            checks,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every check in order and collect the violation messages.
    pub fn evaluate(&self, object: &Value, params: &Value) -> std::result::Result<Vec<String>, String> {
        let mut messages = Vec::new();
        for check in &self.checks {
            messages.extend(check.evaluate(object, params)?);
        }
        Ok(messages)
    }
}

fn parse_path(raw: &str) -> std::result::Result<Vec<Segment>, String> {
    if raw.is_empty() {
        return Err("empty path".to_string());
    }
    raw.split('.')
        .map(|segment| match segment {
            "" => Err(format!("empty segment in path {raw:?}")),
            "*" => Ok(Segment::Any),
            name => Ok(Segment::Field(name.to_string())),
        })
        .collect()
}

fn display_path(path: &[Segment]) -> String {
    path.iter()
        .map(|s| match s {
            Segment::Field(name) => name.as_str(),
            Segment::Any => "*",
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn compile_pattern(raw: &str) -> std::result::Result<Regex, String> {
    Regex::new(raw).map_err(|e| format!("invalid pattern {raw:?}: {e}"))
}

fn lookup_param(params: &Value, path: &[String]) -> std::result::Result<Value, String> {
    path.iter()
        .try_fold(params, |current, segment| current.get(segment.as_str()))
        .filter(|v| !v.is_null())
        .cloned()
        .ok_or_else(|| format!("parameter {:?} is not set", path.join(".")))
}

/// Strings render bare, everything else as JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

struct Located<'a> {
    path: String,
    value: Option<&'a Value>,
}

fn resolve<'a>(root: &'a Value, segments: &[Segment]) -> Vec<Located<'a>> {
    let mut out = Vec::new();
    walk(Some(root), segments, String::new(), &mut out);
    out
}

// A missing field still yields a location so that `required` can report it;
// a wildcard over anything but a list or map yields nothing.
fn walk<'a>(
    current: Option<&'a Value>,
    segments: &[Segment],
    prefix: String,
    out: &mut Vec<Located<'a>>,
) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(Located {
            path: prefix,
            value: current,
        });
        return;
    };
    match head {
        Segment::Field(name) => {
            let next = current.and_then(|v| v.get(name.as_str()));
            walk(next, rest, join(&prefix, name), out);
        }
        Segment::Any => match current {
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    walk(Some(item), rest, join(&prefix, &i.to_string()), out);
                }
            }
            Some(Value::Object(map)) => {
                for (key, item) in map {
                    walk(Some(item), rest, join(&prefix, key), out);
                }
            }
            _ => {}
        },
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}
