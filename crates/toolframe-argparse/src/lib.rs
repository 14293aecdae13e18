//! Incremental argument parsing for toolframe tools.
//!
//! A tool describes its flags, positional arguments and flag groups through the
//! [`ArgSpec`] contract. [`ArgParser`] consumes argv tokens one at a time against
//! that contract and accumulates:
//! - a data map (seeded from the tool's default data)
//! - an ordered list of [`UsageError`]s
//! - the positional tokens that did not fit any declared argument
//!
//! Parse errors never abort parsing; they are collected and reported together
//! after [`ArgParser::finish`]. Misuse of the parser itself (adding tokens after
//! finishing) is reported through [`ParserError`].

pub mod acceptor;
pub mod error;
pub mod group;
pub mod parser;
pub mod spec;
pub mod syntax;

pub use acceptor::{AcceptMatch, Acceptor, BuiltinAcceptor};
pub use error::{ParserError, SpecError, UsageError, ValueKind};
pub use group::{FlagGroup, GroupKind, GroupMember};
pub use parser::ArgParser;
pub use spec::{
    ArgSpec, ArgType, FlagDefinition, FlagResolution, PositionalArg, ToolSpec, ValueHandler,
};
pub use syntax::{FlagStyle, FlagSyntax, FlagType, ValueDelim, ValueType};

/// A single parsed value.
pub type Value = serde_json::Value;

/// Parsed data keyed by flag/argument key, in insertion order.
pub type Data = indexmap::IndexMap<String, Value>;
