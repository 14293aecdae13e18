//! Decides which config sources a run uses and in what priority order.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;
use toolframe_loader::{ConfigSource, DirLayout, Loader};
use toolframe_metadata::ConfigFormat;
use tracing::{debug, warn};

use crate::manifest::LoadedManifest;

/// Environment variable holding extra source paths, separated like `PATH`.
pub const PATH_ENV: &str = "TOOLFRAME_PATH";

/// Per-user source directory under `$HOME`.
pub const HOME_SOURCE_DIR: &str = ".toolframe";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSource {
    pub path: PathBuf,
    pub high_priority: bool,
    /// Explicitly requested sources must exist; discovered ones are skipped when absent.
    pub required: bool,
}

#[derive(Debug, Default)]
pub struct Discovery<'a> {
    pub cwd: PathBuf,
    pub home: Option<PathBuf>,
    pub path_env: Option<OsString>,
    pub manifest: Option<&'a LoadedManifest>,
    pub configs: &'a [PathBuf],
    pub high_priority_configs: &'a [PathBuf],
    pub layout: DirLayout,
}

impl Discovery<'_> {
    /// Sources in priority order, highest first within each class:
    /// `--config` paths, `.toolframe` sources from the current directory up,
    /// manifest sources, `TOOLFRAME_PATH` entries, then `$HOME/.toolframe`.
    pub fn plan(&self) -> Vec<PlannedSource> {
        let mut plan = Vec::new();
        let mut seen = HashSet::new();
        let mut add = |path: PathBuf, high_priority: bool, required: bool| {
            if !required && !path.exists() {
                return;
            }
            if seen.insert(path.clone()) {
                plan.push(PlannedSource {
                    path,
                    high_priority,
                    required,
                });
            }
        };

        for path in self.high_priority_configs {
            add(self.cwd.join(path), true, true);
        }
        for path in self.configs {
            add(self.cwd.join(path), false, true);
        }

        let search_hierarchy = self
            .manifest
            .is_none_or(|m| m.manifest.search_hierarchy);
        if search_hierarchy {
            for dir in self.cwd.ancestors() {
                for ext in ConfigFormat::EXTENSIONS {
                    add(dir.join(format!("{}.{ext}", self.layout.index_stem)), false, false);
                }
                add(dir.join(&self.layout.index_stem), false, false);
            }
        }

        if let Some(loaded) = self.manifest {
            for source in &loaded.manifest.sources {
                add(loaded.resolve(&source.path), source.high_priority, true);
            }
        }

        if let Some(value) = &self.path_env {
            for path in std::env::split_paths(value).filter(|p| !p.as_os_str().is_empty()) {
                if !path.exists() {
                    warn!(path = %path.display(), "ignoring missing {PATH_ENV} entry");
                    continue;
                }
                add(path, false, false);
            }
        }

        if let Some(home) = &self.home {
            add(home.join(HOME_SOURCE_DIR), false, false);
        }
        plan
    }
}

pub fn build_loader(plan: &[PlannedSource], layout: DirLayout) -> Result<Loader> {
    let mut loader = Loader::with_layout(layout);
    for source in plan {
        let config = ConfigSource::path(&source.path);
        let priority = if source.high_priority {
            loader.add_high_priority_source(config)
        } else {
            loader.add_source(config)
        }
        .with_context(|| format!("failed to add config source {}", source.path.display()))?;
        debug!(path = %source.path.display(), priority, "added source");
    }
    Ok(loader)
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}
