//! Configuration sources and the files and directories they expand to.

use std::fs;
use std::path::{Path, PathBuf};

use toolframe_metadata::{ConfigFormat, PreloadConfig, ToolConfig};
use tracing::trace;

use crate::error::LoadError;

#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// A config file, or a directory walked by naming convention.
    Path(PathBuf),
    /// An already-decoded config, e.g. built in code.
    Inline { name: String, config: Box<ToolConfig> },
}

impl ConfigSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn inline(name: impl Into<String>, config: ToolConfig) -> Self {
        Self::Inline {
            name: name.into(),
            config: Box::new(config),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Inline { name, .. } => name.clone(),
        }
    }

    /// Checks that a path source is something the loader can walk.
    /// Nothing is read yet.
    pub(crate) fn validate(&self) -> Result<(), LoadError> {
        let Self::Path(path) = self else {
            return Ok(());
        };
        let illegal = |reason: &str| LoadError::IllegalPath {
            path: path.clone(),
            reason: reason.to_string(),
        };
        let meta = fs::metadata(path).map_err(|_| illegal("does not exist"))?;
        if meta.is_dir() {
            return Ok(());
        }
        if !meta.is_file() {
            return Err(illegal("neither a file nor a directory"));
        }
        if ConfigFormat::from_path(path).is_none() {
            return Err(illegal("expected a .json or .toml file"));
        }
        Ok(())
    }
}

/// A walkable child of a source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Child {
    pub path: PathBuf,
    pub word: String,
}

/// Names the loader gives meaning to inside a source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirLayout {
    pub index_stem: String,
    pub preload_stem: String,
    pub lib_dir: String,
}

impl Default for DirLayout {
    fn default() -> Self {
        Self {
            index_stem: toolframe_metadata::INDEX_FILE_STEM.to_string(),
            preload_stem: toolframe_metadata::PRELOAD_FILE_STEM.to_string(),
            lib_dir: toolframe_metadata::LIB_DIR_NAME.to_string(),
        }
    }
}

impl DirLayout {
    pub(crate) fn index_file(&self, dir: &Path) -> Option<PathBuf> {
        find_config(dir, &self.index_stem)
    }

    pub(crate) fn preload_file(&self, dir: &Path) -> Option<PathBuf> {
        find_config(dir, &self.preload_stem)
    }

    fn is_reserved(&self, stem: &str) -> bool {
        stem == self.index_stem || stem == self.preload_stem || stem == self.lib_dir
    }

    /// Children to walk, sorted by file name. Hidden entries, reserved names
    /// and files that are not configs are skipped.
    pub(crate) fn children(&self, dir: &Path) -> Result<Vec<Child>, LoadError> {
        let mut entries = fs::read_dir(dir)
            .map_err(|e| LoadError::io(dir, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LoadError::io(dir, e))?;
        entries.sort_by_key(|e| e.file_name());

        let mut children = Vec::new();
        for entry in entries {
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with('.') {
                trace!(path = %path.display(), "skipping hidden entry");
                continue;
            }
            let file_type = entry.file_type().map_err(|e| LoadError::io(&path, e))?;
            let word = if file_type.is_dir() {
                file_name
            } else if ConfigFormat::from_path(&path).is_some() {
                match path.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) => stem.to_string(),
                    None => continue,
                }
            } else {
                trace!(path = %path.display(), "skipping non-config file");
                continue;
            };
            if self.is_reserved(&word) {
                continue;
            }
            children.push(Child { path, word });
        }
        Ok(children)
    }
}

fn find_config(dir: &Path, stem: &str) -> Option<PathBuf> {
    ConfigFormat::EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
}

fn read_text(path: &Path) -> Result<(String, ConfigFormat), LoadError> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| LoadError::IllegalPath {
        path: path.to_path_buf(),
        reason: "expected a .json or .toml file".to_string(),
    })?;
    let text = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    Ok((text, format))
}

fn malformed(path: &Path, err: impl std::fmt::Display) -> LoadError {
    LoadError::Malformed {
        source_name: path.display().to_string(),
        message: err.to_string(),
    }
}

pub(crate) fn read_tool_config(path: &Path) -> Result<ToolConfig, LoadError> {
    let (text, format) = read_text(path)?;
    ToolConfig::from_str(&text, format).map_err(|e| malformed(path, e))
}

pub(crate) fn read_preload_config(path: &Path) -> Result<PreloadConfig, LoadError> {
    let (text, format) = read_text(path)?;
    PreloadConfig::from_str(&text, format).map_err(|e| malformed(path, e))
}
