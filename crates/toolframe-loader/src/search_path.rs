//! Library directories contributed by config sources.
//!
//! The search path is carried explicitly through a directory walk and
//! recorded on every tool defined there, so nothing touches process-wide
//! state until a tool is actually spawned.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `dir` unless it is already present.
    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.dirs.contains(&dir) {
            self.dirs.push(dir);
        }
    }

    pub fn with(mut self, dir: impl Into<PathBuf>) -> Self {
        self.push(dir);
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.dirs.iter().any(|d| d == dir)
    }

    /// A `PATH`-style value with these directories in front of `existing`.
    pub fn prepend_to(&self, existing: Option<OsString>) -> Result<OsString, env::JoinPathsError> {
        let tail: Vec<PathBuf> = existing
            .as_deref()
            .map(|p| env::split_paths(p).collect())
            .unwrap_or_default();
        env::join_paths(self.dirs.iter().cloned().chain(tail))
    }
}
