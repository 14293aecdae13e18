//! Structural errors raised while loading or resolving tools.
//!
//! Unlike parse errors these are fatal: the load or lookup in progress stops
//! at the first one.

use std::path::PathBuf;

use thiserror::Error;
use toolframe_argparse::SpecError;

fn words(path: &[String]) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.join(" ")
    }
}

fn format_chain(names: &[Vec<String>]) -> String {
    names
        .iter()
        .map(|n| format!("\"{}\"", words(n)))
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration in {source_name}: {message}")]
    Malformed {
        source_name: String,
        message: String,
    },

    #[error("invalid definition of tool \"{}\" in {source_name}: {error}", words(.tool))]
    InvalidSpec {
        source_name: String,
        tool: Vec<String>,
        #[source]
        error: SpecError,
    },

    #[error("circular alias: {}", format_chain(.chain))]
    CircularAlias { chain: Vec<Vec<String>> },

    #[error(
        "cannot define \"{}\" as {new_kind} at priority {priority}: already defined as {existing_kind}",
        words(.name)
    )]
    KindConflict {
        name: Vec<String>,
        priority: i32,
        existing_kind: &'static str,
        new_kind: &'static str,
    },

    #[error("illegal configuration source {}: {reason}", .path.display())]
    IllegalPath { path: PathBuf, reason: String },

    /// `None` when the next automatic priority would overflow.
    #[error("priority out of range: {}", .priority.map_or("overflow".to_string(), |p| p.to_string()))]
    PriorityOutOfRange { priority: Option<i32> },
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_message_lists_chain() {
        let err = LoadError::CircularAlias {
            chain: vec![vec!["a".into()], vec!["b".into()], vec!["a".into()]],
        };
        assert_eq!(err.to_string(), "circular alias: \"a\" -> \"b\" -> \"a\"");

        let err = LoadError::KindConflict {
            name: Vec::new(),
            priority: -1,
            existing_kind: "alias",
            new_kind: "tool",
        };
        assert!(err.to_string().contains("\"(root)\""));
    }
}
