//! Lazy loading of config sources and tool resolution.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use toolframe_argparse::ArgSpec;
use toolframe_metadata::ToolConfig;
use tracing::{debug, trace};

use crate::builder::{alias_target, build_definition};
use crate::definition::{Alias, Entry, ToolDefinition};
use crate::error::LoadError;
use crate::search_path::SearchPath;
use crate::source::{ConfigSource, DirLayout, read_preload_config, read_tool_config};
use crate::tree::{ConfigTree, NAMESPACE_PRIORITY};

/// Config not yet walked because no lookup has needed it.
#[derive(Debug, Clone)]
struct WorkItem {
    source: ConfigSource,
    words: Vec<String>,
    priority: i32,
    search_path: SearchPath,
}

/// A tool found by [`Loader::lookup`] and the arguments left for it to parse.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub tool: Arc<ToolDefinition>,
    /// Number of leading words that named the tool (possibly through an alias).
    pub consumed: usize,
    pub remaining: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum SubtoolKind {
    Tool(Arc<ToolDefinition>),
    Alias(Vec<String>),
    /// Implicit ancestor with no definition of its own.
    Namespace,
}

#[derive(Debug, Clone)]
pub struct Subtool {
    pub name: Vec<String>,
    pub kind: SubtoolKind,
}

impl Subtool {
    pub fn is_runnable(&self) -> bool {
        match &self.kind {
            SubtoolKind::Tool(tool) => tool.runnable(),
            SubtoolKind::Alias(_) => true,
            SubtoolKind::Namespace => false,
        }
    }

    pub fn desc(&self) -> String {
        match &self.kind {
            SubtoolKind::Tool(tool) => tool.desc().to_string(),
            SubtoolKind::Alias(target) => format!("(alias of \"{}\")", target.join(" ")),
            SubtoolKind::Namespace => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Include every descendant, not only direct children.
    pub recursive: bool,
    /// Include tools whose last word starts with `_`.
    pub include_hidden: bool,
    /// Include tools that cannot be run themselves.
    pub include_namespaces: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            include_hidden: false,
            include_namespaces: true,
        }
    }
}

/// Words of `prefix` still to match below a source already consumed down to
/// `consumed`.
///
/// `Some(rest)` when `consumed` is a prefix of `prefix`, `Some([])` when
/// `prefix` runs out first (everything below is relevant) and `None` when the
/// two diverge.
pub fn calc_remaining_words(prefix: &[String], consumed: &[String]) -> Option<Vec<String>> {
    for (i, word) in consumed.iter().enumerate() {
        match prefix.get(i) {
            None => return Some(Vec::new()),
            Some(p) if p != word => return None,
            Some(_) => {}
        }
    }
    Some(prefix[consumed.len()..].to_vec())
}

/// Remaining words after descending into the child named `word`.
pub fn next_remaining_words(remaining: Option<&[String]>, word: &str) -> Option<Vec<String>> {
    match remaining? {
        [] => Some(Vec::new()),
        [first, rest @ ..] if first == word => Some(rest.to_vec()),
        _ => None,
    }
}

fn check_priority(priority: Option<i32>) -> Result<i32, LoadError> {
    match priority {
        Some(p) if p > NAMESPACE_PRIORITY => Ok(p),
        _ => Err(LoadError::PriorityOutOfRange { priority }),
    }
}

#[derive(Debug, Default)]
pub struct Loader {
    layout: DirLayout,
    tree: ConfigTree,
    worklist: Vec<WorkItem>,
    min_priority: i32,
    max_priority: i32,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: DirLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    /// Number of sources and directory children not yet walked.
    pub fn pending(&self) -> usize {
        self.worklist.len()
    }

    /// Register a source below every source added so far. Returns its priority.
    pub fn add_source(&mut self, source: ConfigSource) -> Result<i32, LoadError> {
        source.validate()?;
        let priority = check_priority(self.min_priority.checked_sub(1))?;
        self.min_priority = priority;
        self.enqueue(source, priority);
        Ok(priority)
    }

    /// Register a source above every source added so far. Returns its priority.
    pub fn add_high_priority_source(&mut self, source: ConfigSource) -> Result<i32, LoadError> {
        source.validate()?;
        let priority = check_priority(self.max_priority.checked_add(1))?;
        self.max_priority = priority;
        self.enqueue(source, priority);
        Ok(priority)
    }

    /// Register a source at an explicit priority, which must lie above
    /// [`NAMESPACE_PRIORITY`].
    pub fn add_source_at(&mut self, source: ConfigSource, priority: i32) -> Result<(), LoadError> {
        check_priority(Some(priority))?;
        source.validate()?;
        self.min_priority = self.min_priority.min(priority);
        self.max_priority = self.max_priority.max(priority);
        self.enqueue(source, priority);
        Ok(())
    }

    fn enqueue(&mut self, source: ConfigSource, priority: i32) {
        debug!(source = %source.name(), priority, "registered config source");
        self.worklist.push(WorkItem {
            source,
            words: Vec::new(),
            priority,
            search_path: SearchPath::default(),
        });
    }

    /// Define a tool directly. Returns whether it is now the active definition.
    pub fn register_tool(&mut self, tool: ToolDefinition) -> Result<bool, LoadError> {
        check_priority(Some(tool.priority()))?;
        self.tree.define_tool(tool)
    }

    pub fn register_alias(
        &mut self,
        name: Vec<String>,
        target: Vec<String>,
        priority: i32,
    ) -> Result<bool, LoadError> {
        check_priority(Some(priority))?;
        self.tree.define_alias(Alias::new(name, target), priority)
    }

    /// Walk every pending source relevant to `prefix`; the rest stay queued.
    pub fn load_for_prefix(&mut self, prefix: &[String]) -> Result<(), LoadError> {
        let mut pending = std::mem::take(&mut self.worklist).into_iter();
        while let Some(item) = pending.next() {
            let Some(remaining) = calc_remaining_words(prefix, &item.words) else {
                trace!(source = %item.source.name(), words = ?item.words, "deferring");
                self.worklist.push(item);
                continue;
            };
            if let Err(err) = self.load_item(item, &remaining) {
                self.worklist.extend(pending);
                return Err(err);
            }
        }
        Ok(())
    }

    fn load_item(&mut self, item: WorkItem, remaining: &[String]) -> Result<(), LoadError> {
        debug!(source = %item.source.name(), words = ?item.words, priority = item.priority, "loading");
        match item.source {
            ConfigSource::Inline { name, config } => {
                self.apply_config(&config, &item.words, item.priority, &item.search_path, &name)
            }
            ConfigSource::Path(path) => self.load_path(
                &path,
                item.words,
                Some(remaining),
                item.priority,
                item.search_path,
            ),
        }
    }

    fn load_path(
        &mut self,
        path: &Path,
        words: Vec<String>,
        remaining: Option<&[String]>,
        priority: i32,
        search_path: SearchPath,
    ) -> Result<(), LoadError> {
        let meta = fs::metadata(path).map_err(|e| LoadError::io(path, e))?;
        if !meta.is_dir() {
            let config = read_tool_config(path)?;
            let name = path.display().to_string();
            return self.apply_config(&config, &words, priority, &search_path, &name);
        }

        let mut search_path = search_path;
        if let Some(preload) = self.layout.preload_file(path) {
            for dir in read_preload_config(&preload)?.lib_dirs {
                search_path.push(path.join(dir));
            }
        }
        let lib = path.join(&self.layout.lib_dir);
        if lib.is_dir() {
            search_path.push(lib);
        }

        match self.layout.index_file(path) {
            Some(index) => {
                let config = read_tool_config(&index)?;
                let name = index.display().to_string();
                self.apply_config(&config, &words, priority, &search_path, &name)?;
            }
            None if !words.is_empty() => {
                self.tree.ensure_namespace(&words)?;
            }
            None => {}
        }

        for child in self.layout.children(path)? {
            let mut child_words = words.clone();
            child_words.push(child.word.clone());
            match next_remaining_words(remaining, &child.word) {
                Some(next) => self.load_path(
                    &child.path,
                    child_words,
                    Some(next.as_slice()),
                    priority,
                    search_path.clone(),
                )?,
                None => {
                    trace!(path = %child.path.display(), words = ?child_words, "deferring child");
                    self.worklist.push(WorkItem {
                        source: ConfigSource::Path(child.path),
                        words: child_words,
                        priority,
                        search_path: search_path.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Register a tool and everything nested in its config.
    fn apply_config(
        &mut self,
        config: &ToolConfig,
        words: &[String],
        priority: i32,
        search_path: &SearchPath,
        source_name: &str,
    ) -> Result<(), LoadError> {
        let tool = build_definition(config, words.to_vec(), priority, search_path, source_name)
            .map_err(|error| LoadError::InvalidSpec {
                source_name: source_name.to_string(),
                tool: words.to_vec(),
                error,
            })?;
        self.tree.define_tool(tool)?;

        for (word, target) in &config.aliases {
            let mut name = words.to_vec();
            name.push(word.clone());
            let target = alias_target(words, target);
            self.tree.define_alias(Alias::new(name, target), priority)?;
        }
        for (word, sub) in &config.subtools {
            let mut name = words.to_vec();
            name.push(word.clone());
            self.apply_config(sub, &name, priority, search_path, source_name)?;
        }
        Ok(())
    }

    /// The tool active at `name`, following aliases. Placeholders and missing
    /// names yield `None`.
    pub fn get_active_tool(&mut self, name: &[String]) -> Result<Option<Arc<ToolDefinition>>, LoadError> {
        let mut visited: Vec<Vec<String>> = Vec::new();
        let mut current = name.to_vec();
        loop {
            if visited.contains(&current) {
                visited.push(current);
                return Err(LoadError::CircularAlias { chain: visited });
            }
            let target = match self.tree.entry(&current) {
                Some(Entry::Tool(tool)) => return Ok(Some(Arc::clone(tool))),
                Some(Entry::Alias(alias)) => alias.target().to_vec(),
                Some(Entry::Placeholder) | None => return Ok(None),
            };
            trace!(alias = ?current, target = ?target, "following alias");
            visited.push(current);
            self.load_for_prefix(&target)?;
            current = target;
        }
    }

    /// Find the tool that handles `args` and the arguments left for it.
    ///
    /// The longest run of leading non-flag words that names a defined tool
    /// wins; `None` means not even a root tool is defined.
    pub fn lookup(&mut self, args: &[String]) -> Result<Option<Resolved>, LoadError> {
        let words = args.iter().take_while(|a| !a.starts_with('-')).count();
        let mut candidate = &args[..words];
        loop {
            self.load_for_prefix(candidate)?;
            for len in (0..=candidate.len()).rev() {
                if let Some(tool) = self.get_active_tool(&candidate[..len])? {
                    debug!(tool = %tool.display_name(), consumed = len, "resolved");
                    return Ok(Some(Resolved {
                        tool,
                        consumed: len,
                        remaining: args[len..].to_vec(),
                    }));
                }
            }
            match candidate.split_last() {
                Some((_, shorter)) => candidate = shorter,
                None => return Ok(None),
            }
        }
    }

    /// Resolve exactly `name`, with no argument capture.
    pub fn lookup_specific(&mut self, name: &[String]) -> Result<Option<Arc<ToolDefinition>>, LoadError> {
        self.load_for_prefix(name)?;
        self.get_active_tool(name)
    }

    pub fn list_subtools(&mut self, prefix: &[String], options: ListOptions) -> Result<Vec<Subtool>, LoadError> {
        self.load_for_prefix(prefix)?;
        let found = self
            .tree
            .descendants(prefix)
            .filter(|(name, _)| options.recursive || name.len() == prefix.len() + 1)
            .filter(|(name, _)| {
                options.include_hidden || !name.last().is_some_and(|w| w.starts_with('_'))
            })
            .map(|(name, slot)| Subtool {
                name: name.clone(),
                kind: match &slot.entry {
                    Entry::Tool(tool) => SubtoolKind::Tool(Arc::clone(tool)),
                    Entry::Alias(alias) => SubtoolKind::Alias(alias.target().to_vec()),
                    Entry::Placeholder => SubtoolKind::Namespace,
                },
            })
            .filter(|sub| options.include_namespaces || sub.is_runnable())
            .collect();
        Ok(found)
    }

    /// Whether anything is defined below `prefix`.
    pub fn has_subtools(&mut self, prefix: &[String]) -> Result<bool, LoadError> {
        self.load_for_prefix(prefix)?;
        Ok(self
            .tree
            .descendants(prefix)
            .any(|(_, slot)| !slot.entry.is_placeholder()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolframe_argparse::ToolSpec;

    fn w(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn runnable(name: &str, priority: i32) -> ToolDefinition {
        let mut spec = ToolSpec::new(w(name));
        spec.set_runnable(true);
        ToolDefinition::new(spec, priority)
    }

    #[test]
    fn remaining_words_follow_the_prefix() {
        assert_eq!(calc_remaining_words(&w("a b c"), &w("a")), Some(w("b c")));
        assert_eq!(calc_remaining_words(&w("a"), &w("a b")), Some(Vec::new()));
        assert_eq!(calc_remaining_words(&w("a b"), &w("a b")), Some(Vec::new()));
        assert_eq!(calc_remaining_words(&w("a x"), &w("a b")), None);
        assert_eq!(calc_remaining_words(&[], &[]), Some(Vec::new()));

        assert_eq!(next_remaining_words(None, "a"), None);
        let empty: &[String] = &[];
        let ab = w("a b");
        assert_eq!(next_remaining_words(Some(empty), "a"), Some(Vec::new()));
        assert_eq!(next_remaining_words(Some(ab.as_slice()), "a"), Some(w("b")));
        assert_eq!(next_remaining_words(Some(ab.as_slice()), "b"), None);
    }

    #[test]
    fn priority_five_three_seven() {
        let mut loader = Loader::new();
        assert!(loader.register_tool(runnable("build", 5).with_desc("p5")).unwrap());
        assert!(!loader.register_tool(runnable("build", 3).with_desc("p3")).unwrap());
        assert_eq!(loader.lookup_specific(&w("build")).unwrap().unwrap().desc(), "p5");
        assert!(loader.register_tool(runnable("build", 7).with_desc("p7")).unwrap());
        assert_eq!(loader.lookup_specific(&w("build")).unwrap().unwrap().desc(), "p7");
    }

    #[test]
    fn circular_alias_is_an_error() {
        let mut loader = Loader::new();
        loader.register_alias(w("a"), w("b"), 0).unwrap();
        loader.register_alias(w("b"), w("a"), 0).unwrap();
        match loader.get_active_tool(&w("a")) {
            Err(LoadError::CircularAlias { chain }) => {
                assert_eq!(chain, vec![w("a"), w("b"), w("a")]);
            }
            other => panic!("expected CircularAlias, got: {other:?}"),
        }
        assert!(loader.lookup(&w("a x")).is_err());
    }

    #[test]
    fn runnable_ancestor_captures_trailing_words() {
        let mut loader = Loader::new();
        loader.register_tool(runnable("build", 0)).unwrap();
        let args = vec!["build".to_string(), "release".to_string(), "--fast".to_string()];
        let found = loader.lookup(&args).unwrap().unwrap();
        assert_eq!(found.tool.full_name(), w("build"));
        assert_eq!(found.consumed, 1);
        assert_eq!(found.remaining, vec!["release".to_string(), "--fast".to_string()]);
    }

    #[test]
    fn empty_tree_finds_nothing() {
        let mut loader = Loader::new();
        assert!(loader.lookup(&w("nosuch thing")).unwrap().is_none());
        assert!(loader.lookup(&[]).unwrap().is_none());
        assert!(!loader.has_subtools(&[]).unwrap());
    }

    #[test]
    fn placeholders_are_skipped_by_lookup() {
        let mut loader = Loader::new();
        loader.register_tool(runnable("a b c", 0)).unwrap();
        assert!(loader.lookup(&w("a b")).unwrap().is_none());
        assert!(loader.lookup_specific(&w("a")).unwrap().is_none());
        let found = loader.lookup(&w("a b c d")).unwrap().unwrap();
        assert_eq!(found.remaining, w("d"));
    }

    #[test]
    fn alias_resolves_and_counts_alias_words() {
        let mut loader = Loader::new();
        loader.register_tool(runnable("deploy production", 0)).unwrap();
        loader.register_alias(w("dp"), w("deploy production"), 0).unwrap();
        let found = loader.lookup(&w("dp now")).unwrap().unwrap();
        assert_eq!(found.tool.full_name(), w("deploy production"));
        assert_eq!(found.consumed, 1);
        assert_eq!(found.remaining, w("now"));
    }

    #[test]
    fn inline_sources_load_lazily_and_list_in_order() {
        let config = ToolConfig::from_json(
            r#"{
                "subtools": {
                    "zed": { "runnable": true, "desc": "last" },
                    "alpha": { "subtools": { "inner": { "runnable": true } } },
                    "_secret": { "runnable": true }
                },
                "aliases": { "z": "zed" }
            }"#,
        )
        .unwrap();
        let mut loader = Loader::new();
        let priority = loader.add_source(ConfigSource::inline("inline", config)).unwrap();
        assert_eq!(priority, -1);
        assert_eq!(loader.pending(), 1);
        assert!(loader.tree().is_empty());

        let names = |subs: Vec<Subtool>| subs.into_iter().map(|s| s.name.join(" ")).collect::<Vec<_>>();

        let top = loader.list_subtools(&[], ListOptions::default()).unwrap();
        assert_eq!(loader.pending(), 0);
        assert_eq!(names(top), vec!["alpha", "z", "zed"]);

        let all = loader
            .list_subtools(
                &[],
                ListOptions {
                    recursive: true,
                    include_hidden: true,
                    include_namespaces: false,
                },
            )
            .unwrap();
        assert_eq!(names(all), vec!["_secret", "alpha inner", "z", "zed"]);
        assert!(loader.has_subtools(&w("alpha")).unwrap());
        assert!(!loader.has_subtools(&w("zed")).unwrap());
    }

    #[test]
    fn hidden_entries_are_those_whose_last_word_starts_with_underscore() {
        let mut loader = Loader::new();
        for name in ["_private", "_internal run", "ok"] {
            loader.register_tool(runnable(name, 0)).unwrap();
        }
        let mut names = |options| -> Vec<String> {
            loader
                .list_subtools(&[], options)
                .unwrap()
                .into_iter()
                .map(|s| s.name.join(" "))
                .collect()
        };
        let recursive = ListOptions {
            recursive: true,
            ..ListOptions::default()
        };
        assert_eq!(names(recursive), vec!["_internal run", "ok"]);
        assert_eq!(
            names(ListOptions {
                include_hidden: true,
                ..recursive
            }),
            vec!["_internal", "_internal run", "_private", "ok"]
        );
    }

    #[test]
    fn priorities_must_stay_above_namespaces() {
        let empty = || ConfigSource::inline("empty", ToolConfig::from_json("{}").unwrap());
        let mut loader = Loader::new();
        for bad in [i32::MIN, NAMESPACE_PRIORITY] {
            assert!(matches!(
                loader.add_source_at(empty(), bad),
                Err(LoadError::PriorityOutOfRange { priority: Some(p) }) if p == bad
            ));
            assert!(loader.register_alias(w("a"), w("b"), bad).is_err());
            assert!(loader.register_tool(runnable("t", bad)).is_err());
        }
        assert!(loader.tree().is_empty());

        loader.add_source_at(empty(), NAMESPACE_PRIORITY + 1).unwrap();
        assert!(matches!(
            loader.add_source(empty()),
            Err(LoadError::PriorityOutOfRange { .. })
        ));
        loader.add_source_at(empty(), i32::MAX).unwrap();
        assert!(matches!(
            loader.add_high_priority_source(empty()),
            Err(LoadError::PriorityOutOfRange { priority: None })
        ));
        assert_eq!(loader.pending(), 2);
    }

    #[test]
    fn high_priority_sources_outrank_normal_ones() {
        let normal = ToolConfig::from_json(r#"{ "subtools": { "t": { "desc": "normal", "runnable": true } } }"#).unwrap();
        let high = ToolConfig::from_json(r#"{ "subtools": { "t": { "desc": "high", "runnable": true } } }"#).unwrap();
        let mut loader = Loader::new();
        assert_eq!(loader.add_high_priority_source(ConfigSource::inline("high", high)).unwrap(), 1);
        assert_eq!(loader.add_source(ConfigSource::inline("normal", normal)).unwrap(), -1);
        let found = loader.lookup(&w("t")).unwrap().unwrap();
        assert_eq!(found.tool.desc(), "high");
        assert_eq!(found.tool.source_name(), "high");
    }
}
