//! Priority-ordered map from word paths to tools and aliases.

use std::collections::BTreeMap;
use std::sync::Arc;

use toolframe_argparse::ArgSpec;
use tracing::trace;

use crate::definition::{Alias, Entry, ToolDefinition};
use crate::error::LoadError;

/// Priority of implicit ancestor placeholders; any real definition outranks it.
pub const PLACEHOLDER_PRIORITY: i32 = i32::MIN;

/// Priority of namespaces standing in for index-less directories. Outranks
/// placeholders only; every registered source or tool sits above it.
pub const NAMESPACE_PRIORITY: i32 = PLACEHOLDER_PRIORITY + 1;

#[derive(Debug, Clone)]
pub struct Slot {
    pub priority: i32,
    pub entry: Entry,
}

/// Word paths sort word by word, so iteration order is listing order.
#[derive(Debug, Default)]
pub struct ConfigTree {
    slots: BTreeMap<Vec<String>, Slot>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &[String]) -> Option<&Slot> {
        self.slots.get(name)
    }

    pub fn entry(&self, name: &[String]) -> Option<&Entry> {
        self.get(name).map(|s| &s.entry)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<String>, &Slot)> {
        self.slots.iter()
    }

    /// Every slot strictly below `prefix`, in word order.
    pub fn descendants<'a>(
        &'a self,
        prefix: &'a [String],
    ) -> impl Iterator<Item = (&'a Vec<String>, &'a Slot)> + 'a {
        self.slots
            .range(prefix.to_vec()..)
            .take_while(move |(name, _)| name.starts_with(prefix))
            .filter(move |(name, _)| name.len() > prefix.len())
    }

    /// Install a tool. Returns whether the definition is now active.
    pub fn define_tool(&mut self, tool: ToolDefinition) -> Result<bool, LoadError> {
        let name = tool.full_name().to_vec();
        let priority = tool.priority();
        self.install(name, priority, Entry::Tool(Arc::new(tool)))
    }

    pub fn define_alias(&mut self, alias: Alias, priority: i32) -> Result<bool, LoadError> {
        let name = alias.full_name().to_vec();
        self.install(name, priority, Entry::Alias(alias))
    }

    /// Define an empty namespace at `name` unless a real entry is already
    /// there. Any later real definition replaces it.
    pub fn ensure_namespace(&mut self, name: &[String]) -> Result<bool, LoadError> {
        match self.slots.get(name) {
            Some(slot) if slot.priority >= NAMESPACE_PRIORITY => Ok(false),
            _ => self.define_tool(ToolDefinition::namespace(name.to_vec(), NAMESPACE_PRIORITY)),
        }
    }

    fn install(&mut self, name: Vec<String>, priority: i32, entry: Entry) -> Result<bool, LoadError> {
        if let Some(slot) = self.slots.get_mut(&name) {
            if slot.priority > priority {
                trace!(name = ?name, priority, active = slot.priority, "ignoring lower-priority definition");
                return Ok(false);
            }
            if slot.priority == priority {
                if slot.entry.is_alias() != entry.is_alias() {
                    return Err(LoadError::KindConflict {
                        name,
                        priority,
                        existing_kind: slot.entry.kind(),
                        new_kind: entry.kind(),
                    });
                }
                trace!(name = ?name, priority, kind = entry.kind(), "redefining");
                slot.entry = entry;
                return Ok(true);
            }
        }

        trace!(name = ?name, priority, kind = entry.kind(), "defining");
        self.add_placeholders(&name);
        self.slots.insert(name, Slot { priority, entry });
        Ok(true)
    }

    fn add_placeholders(&mut self, name: &[String]) {
        for len in 0..name.len() {
            self.slots
                .entry(name[..len].to_vec())
                .or_insert(Slot {
                    priority: PLACEHOLDER_PRIORITY,
                    entry: Entry::Placeholder,
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolframe_argparse::ToolSpec;

    fn w(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn tool(name: &str, priority: i32, desc: &str) -> ToolDefinition {
        ToolDefinition::new(ToolSpec::new(w(name)), priority).with_desc(desc)
    }

    fn desc_at(tree: &ConfigTree, name: &str) -> Option<String> {
        match tree.entry(&w(name)) {
            Some(Entry::Tool(t)) => Some(t.desc().to_string()),
            _ => None,
        }
    }

    #[test]
    fn higher_priority_wins_in_either_order() {
        let mut tree = ConfigTree::new();
        assert!(tree.define_tool(tool("build", 5, "five")).unwrap());
        assert!(!tree.define_tool(tool("build", 3, "three")).unwrap());
        assert_eq!(desc_at(&tree, "build").as_deref(), Some("five"));
        assert!(tree.define_tool(tool("build", 7, "seven")).unwrap());
        assert_eq!(desc_at(&tree, "build").as_deref(), Some("seven"));
    }

    #[test]
    fn same_priority_redefines_but_cannot_switch_kind() {
        let mut tree = ConfigTree::new();
        tree.define_tool(tool("x", 0, "old")).unwrap();
        tree.define_tool(tool("x", 0, "new")).unwrap();
        assert_eq!(desc_at(&tree, "x").as_deref(), Some("new"));

        let err = tree
            .define_alias(Alias::new(w("x"), w("y")), 0)
            .unwrap_err();
        assert!(matches!(err, LoadError::KindConflict { .. }));

        assert!(tree.define_alias(Alias::new(w("x"), w("y")), 1).unwrap());
        assert!(tree.define_alias(Alias::new(w("x"), w("z")), 1).unwrap());
    }

    #[test]
    fn ancestors_get_placeholders_that_real_definitions_replace() {
        let mut tree = ConfigTree::new();
        tree.define_tool(tool("a b c", -4, "")).unwrap();
        assert!(tree.entry(&w("a b")).unwrap().is_placeholder());
        assert!(tree.entry(&[]).unwrap().is_placeholder());

        assert!(tree.define_tool(tool("a", -9, "real")).unwrap());
        assert_eq!(desc_at(&tree, "a").as_deref(), Some("real"));
    }

    #[test]
    fn ensure_namespace_does_not_override() {
        let mut tree = ConfigTree::new();
        tree.define_alias(Alias::new(w("n"), w("m")), 2).unwrap();
        assert!(!tree.ensure_namespace(&w("n")).unwrap());
        assert!(tree.entry(&w("n")).unwrap().is_alias());
        assert!(tree.ensure_namespace(&w("other")).unwrap());
        assert!(!tree.ensure_namespace(&w("other")).unwrap());
    }

    #[test]
    fn namespaces_yield_to_any_real_definition() {
        let mut tree = ConfigTree::new();
        tree.ensure_namespace(&w("misc")).unwrap();
        assert_eq!(tree.get(&w("misc")).unwrap().priority, NAMESPACE_PRIORITY);

        assert!(tree.define_tool(tool("misc", -1000, "real")).unwrap());
        assert_eq!(desc_at(&tree, "misc").as_deref(), Some("real"));
        assert!(!tree.ensure_namespace(&w("misc")).unwrap());
        assert_eq!(desc_at(&tree, "misc").as_deref(), Some("real"));

        tree.ensure_namespace(&w("ns")).unwrap();
        assert!(tree.define_alias(Alias::new(w("ns"), w("misc")), -1000).unwrap());
        assert!(tree.entry(&w("ns")).unwrap().is_alias());
    }

    #[test]
    fn descendants_are_sorted_word_by_word() {
        let mut tree = ConfigTree::new();
        for name in ["b", "a z", "a b", "ab", "a"] {
            tree.define_tool(tool(name, 0, "")).unwrap();
        }
        let under_a: Vec<_> = tree.descendants(&w("a")).map(|(n, _)| n.join(" ")).collect();
        assert_eq!(under_a, vec!["a b", "a z"]);
        let all: Vec<_> = tree.descendants(&[]).map(|(n, _)| n.join(" ")).collect();
        assert_eq!(all, vec!["a", "a b", "a z", "ab", "b"]);
    }
}
