//! Value acceptors: validate a raw string and convert it into a typed [`Value`].

use std::fmt;

use crate::Value;

/// Result of a successful [`Acceptor::accept`] call, handed to [`Acceptor::convert`].
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptMatch {
    /// No value was supplied (e.g. an optional-value flag given nothing).
    Absent,
    /// The raw text, to be converted later.
    Text(String),
    /// A value already produced while matching.
    Parsed(Value),
}

/// Validates and converts raw argument values.
///
/// `accept` decides whether a value is acceptable at all; `convert` turns the
/// match into the value that gets stored.
pub trait Acceptor: fmt::Debug + Send + Sync {
    /// Short human-readable description of what is accepted (e.g. `integer`).
    fn describe(&self) -> String;

    fn accept(&self, raw: Option<&str>) -> Option<AcceptMatch>;

    fn convert(&self, matched: AcceptMatch) -> Value {
        match matched {
            AcceptMatch::Absent => Value::Null,
            AcceptMatch::Text(s) => Value::String(s),
            AcceptMatch::Parsed(v) => v,
        }
    }
}

/// Acceptors available without writing any code.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinAcceptor {
    String,
    Integer,
    Float,
    /// `true/yes/on/1` and `false/no/off/0`, case-insensitive. Absent means `true`.
    Boolean,
    OneOf(Vec<String>),
    IntegerRange { min: i64, max: i64 },
}

impl fmt::Display for BuiltinAcceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::OneOf(values) => write!(f, "one of: {}", values.join(", ")),
            Self::IntegerRange { min, max } => write!(f, "integer in {min}..={max}"),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl Acceptor for BuiltinAcceptor {
    fn describe(&self) -> String {
        self.to_string()
    }

    fn accept(&self, raw: Option<&str>) -> Option<AcceptMatch> {
        let Some(raw) = raw else {
            return Some(match self {
                Self::Boolean => AcceptMatch::Parsed(Value::Bool(true)),
                _ => AcceptMatch::Absent,
            });
        };

        match self {
            Self::String => Some(AcceptMatch::Text(raw.to_string())),
            Self::Integer => raw
                .trim()
                .parse::<i64>()
                .ok()
                .map(|n| AcceptMatch::Parsed(Value::from(n))),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(|n| AcceptMatch::Parsed(Value::Number(n))),
            Self::Boolean => parse_bool(raw).map(|b| AcceptMatch::Parsed(Value::Bool(b))),
            Self::OneOf(values) => values
                .iter()
                .any(|v| v == raw)
                .then(|| AcceptMatch::Text(raw.to_string())),
            Self::IntegerRange { min, max } => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|n| (*min..=*max).contains(n))
                .map(|n| AcceptMatch::Parsed(Value::from(n))),
        }
    }
}
