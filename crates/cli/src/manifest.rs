use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toolframe_loader::DirLayout;

pub const DEFAULT_MANIFEST_NAME: &str = "toolframe.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,

    /// Extra config sources, relative to the manifest's directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceEntry>,

    /// Look for `.toolframe` sources in the current directory and its ancestors.
    #[serde(default = "default_true")]
    pub search_hierarchy: bool,

    /// File stem of directory index configs (default `.toolframe`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_file_name: Option<String>,

    /// File stem of directory preload configs (default `.preload`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preload_file_name: Option<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            schema_version: None,
            sources: Vec::new(),
            search_hierarchy: true,
            index_file_name: None,
            preload_file_name: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub high_priority: bool,
}

impl Manifest {
    pub fn layout(&self) -> DirLayout {
        let mut layout = DirLayout::default();
        if let Some(index) = &self.index_file_name {
            layout.index_stem = index.clone();
        }
        if let Some(preload) = &self.preload_file_name {
            layout.preload_stem = preload.clone();
        }
        layout
    }
}

#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub base_dir: PathBuf,
    pub manifest: Manifest,
}

impl LoadedManifest {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        resolve_against(&self.base_dir, path)
    }
}

pub fn load_manifest(cwd: &Path, manifest_path: Option<&Path>) -> Result<Option<LoadedManifest>> {
    let (path, explicit) = match manifest_path {
        Some(p) => (resolve_against(cwd, p), true),
        None => (cwd.join(DEFAULT_MANIFEST_NAME), false),
    };

    if !path.exists() {
        if explicit {
            bail!("manifest not found: {}", path.display());
        }
        return Ok(None);
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    let manifest: Manifest = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse manifest JSON: {}", path.display()))?;

    let base_dir = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| cwd.to_path_buf());

    Ok(Some(LoadedManifest { base_dir, manifest }))
}

pub fn write_default_manifest(project_dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let dest = project_dir.join(DEFAULT_MANIFEST_NAME);
    if dest.exists() && !overwrite {
        return Ok(dest);
    }

    let manifest = Manifest {
        schema_version: Some(1),
        sources: vec![SourceEntry {
            path: PathBuf::from("tools"),
            high_priority: false,
        }],
        ..Default::default()
    };

    let bytes = serde_json::to_vec_pretty(&manifest).context("failed to serialize manifest")?;
    let mut out = String::from_utf8(bytes).context("manifest is not valid UTF-8")?;
    out.push('\n');

    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if overwrite && dest.exists() {
        fs::remove_file(&dest).with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::rename(&tmp, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(dest)
}

pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn manifest_deserializes_camel_case() {
        let json = r#"{
  "schemaVersion": 1,
  "sources": [
    { "path": "tools" },
    { "path": "/opt/shared-tools", "highPriority": true }
  ],
  "searchHierarchy": false,
  "indexFileName": "_index"
}"#;
        let m: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(m.schema_version, Some(1));
        assert!(!m.search_hierarchy);
        assert_eq!(m.sources.len(), 2);
        assert!(!m.sources[0].high_priority);
        assert!(m.sources[1].high_priority);

        let layout = m.layout();
        assert_eq!(layout.index_stem, "_index");
        assert_eq!(layout.preload_stem, ".preload");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let m: Manifest = serde_json::from_str("{}").unwrap();
        assert!(m.search_hierarchy);
        assert!(m.sources.is_empty());
        assert_eq!(m.layout(), DirLayout::default());
    }

    #[test]
    fn write_default_manifest_round_trips_and_resolves_sources() {
        let dir = TempDir::new().unwrap();
        let dest = write_default_manifest(dir.path(), false).unwrap();
        assert_eq!(dest, dir.path().join(DEFAULT_MANIFEST_NAME));

        let loaded = load_manifest(dir.path(), None).unwrap().unwrap();
        assert_eq!(loaded.manifest.schema_version, Some(1));
        assert_eq!(
            loaded.resolve(&loaded.manifest.sources[0].path),
            dir.path().join("tools")
        );
    }

    #[test]
    fn explicit_missing_manifest_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_manifest(dir.path(), None).unwrap().is_none());
        assert!(load_manifest(dir.path(), Some(Path::new("nope.json"))).is_err());
    }
}
