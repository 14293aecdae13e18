use std::fmt;

use thiserror::Error;

/// Invalid tool definition. Raised while building a [`crate::ToolSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("invalid flag syntax '{0}'")]
    InvalidSyntax(String),

    #[error("flag '{key}' has no syntax")]
    NoSyntax { key: String },

    #[error("flag '{key}' mixes boolean and value syntaxes")]
    MixedFlagTypes { key: String },

    #[error("boolean flag '{key}' cannot have an acceptor")]
    BooleanAcceptor { key: String },

    #[error("duplicate key '{0}'")]
    DuplicateKey(String),

    #[error("flag definition conflict: {spelling} maps to both '{first}' and '{second}'")]
    SpellingConflict {
        spelling: String,
        first: String,
        second: String,
    },

    #[error("positional argument '{key}' cannot follow a remaining argument")]
    AfterRemaining { key: String },

    #[error("required argument '{key}' cannot follow an optional argument")]
    RequiredAfterOptional { key: String },

    #[error("flag group '{group}' refers to unknown flag '{key}'")]
    UnknownGroupMember { group: String, key: String },
}

/// Contract violation while driving an [`crate::ArgParser`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParserError {
    #[error("parser has already finished; no more arguments can be added")]
    Finished,
}

/// Whether an unacceptable value was given to a flag or a positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Flag,
    Arg,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag => f.write_str("flag"),
            Self::Arg => f.write_str("argument"),
        }
    }
}

fn quote_all(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("\"{v}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_value(value: &Option<String>) -> String {
    match value {
        Some(v) => format!("\"{v}\""),
        None => "(none)".to_string(),
    }
}

/// A usage problem found while parsing. These are accumulated, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("flag \"{flag}\" is not recognized")]
    FlagUnrecognized { flag: String },

    #[error("flag prefix \"{flag}\" is ambiguous; possible flags: {}", .candidates.join(", "))]
    FlagAmbiguous {
        flag: String,
        candidates: Vec<String>,
    },

    #[error("flag \"{flag}\" is missing a value")]
    FlagValueMissing { flag: String },

    #[error("flag \"{flag}\" should not take an argument")]
    FlagValueNotAllowed { flag: String },

    #[error("unacceptable value {} for {kind} \"{name}\" (expected {expected})", describe_value(.value))]
    UnacceptableValue {
        kind: ValueKind,
        name: String,
        value: Option<String>,
        expected: String,
    },

    #[error("required positional argument \"{name}\" is missing")]
    ArgMissing { name: String },

    #[error("extra arguments: {}", quote_all(.values))]
    ExtraArguments { values: Vec<String> },

    #[error("tool not found: \"{}\"", .words.join(" "))]
    ToolNotFound { words: Vec<String> },

    #[error("flag \"{flag}\" is required")]
    FlagRequired { flag: String },

    #[error("exactly one flag out of group \"{group}\" is required, but none was provided")]
    ExactlyOneMissing { group: String },

    #[error("exactly one flag out of group \"{group}\" is required, but {} were provided: {}", .seen.len(), .seen.join(", "))]
    ExactlyOneConflict { group: String, seen: Vec<String> },

    #[error("at least one flag out of group \"{group}\" is required, but none was provided")]
    AtLeastOneMissing { group: String },

    #[error("at most one flag out of group \"{group}\" may be provided, but {} were provided: {}", .seen.len(), .seen.join(", "))]
    AtMostOneConflict { group: String, seen: Vec<String> },
}
