//! Shared configuration model for toolframe tool sources.
//!
//! Tools are described statically in JSON or TOML files. The types here are
//! plain serde records; turning them into parser definitions is done by
//! `toolframe-loader`, which also owns the directory conventions that decide
//! where these files are looked up.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// File stem of the config that defines a directory's own tool.
pub const INDEX_FILE_STEM: &str = ".toolframe";

/// File stem of the config read before anything else in a directory.
pub const PRELOAD_FILE_STEM: &str = ".preload";

/// Directory appended to the search path when present in a source directory.
pub const LIB_DIR_NAME: &str = ".lib";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub const EXTENSIONS: [&'static str; 2] = ["json", "toml"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

fn decode<T: for<'de> Deserialize<'de>>(text: &str, format: ConfigFormat) -> Result<T, MetadataError> {
    Ok(match format {
        ConfigFormat::Json => serde_json::from_str(text)?,
        ConfigFormat::Toml => toml::from_str(text)?,
    })
}

/// One tool, plus any tools and aliases nested beneath it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ToolConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub long_desc: Vec<String>,
    /// Defaults to whether `exec` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runnable: Option<bool>,
    /// Program and leading arguments to spawn when the tool runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub flags_before_args: bool,
    #[serde(default)]
    pub handles_interrupts: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub subtools: IndexMap<String, ToolConfig>,
    /// Word -> target word path, relative to this tool, separated by whitespace.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub aliases: IndexMap<String, String>,
}

impl ToolConfig {
    pub fn from_str(text: &str, format: ConfigFormat) -> Result<Self, MetadataError> {
        decode(text, format)
    }

    pub fn from_json(text: &str) -> Result<Self, MetadataError> {
        Self::from_str(text, ConfigFormat::Json)
    }

    pub fn from_toml(text: &str) -> Result<Self, MetadataError> {
        Self::from_str(text, ConfigFormat::Toml)
    }

    pub fn is_runnable(&self) -> bool {
        self.runnable.unwrap_or(self.exec.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct FlagConfig {
    pub key: String,
    /// Spellings such as `-v`, `--[no-]color`, `-o FILE` or `--level[=N]`.
    pub syntax: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<AcceptConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<HandlerConfig>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ArgKind {
    #[default]
    Required,
    Optional,
    Remaining,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ArgConfig {
    pub key: String,
    #[serde(default)]
    pub kind: ArgKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<AcceptConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<HandlerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKindConfig {
    #[default]
    Optional,
    Required,
    ExactlyOne,
    AtLeastOne,
    AtMostOne,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct GroupConfig {
    pub kind: GroupKindConfig,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
    /// Keys of member flags.
    pub flags: Vec<String>,
}

/// Built-in value acceptors.
///
/// `"integer"`, `{ "one-of": ["a", "b"] }`, `{ "range": { "min": 1, "max": 9 } }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum AcceptConfig {
    String,
    Integer,
    Float,
    Boolean,
    OneOf(Vec<String>),
    Range { min: i64, max: i64 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HandlerConfig {
    Set,
    Push,
}

/// Contents of a directory's preload file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct PreloadConfig {
    /// Directories, relative to the source directory, added to the search path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lib_dirs: Vec<String>,
}

impl PreloadConfig {
    pub fn from_str(text: &str, format: ConfigFormat) -> Result<Self, MetadataError> {
        decode(text, format)
    }
}
