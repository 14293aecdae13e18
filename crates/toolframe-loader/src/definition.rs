//! What the tool tree stores at each word path.

use std::sync::Arc;

use toolframe_argparse::{ArgSpec, Data, FlagDefinition, FlagGroup, PositionalArg, ToolSpec};

use crate::search_path::SearchPath;

/// A fully built tool: its [`ToolSpec`] plus what the runner needs.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    spec: ToolSpec,
    priority: i32,
    desc: String,
    long_desc: Vec<String>,
    exec: Option<Vec<String>>,
    search_path: SearchPath,
    source_name: String,
}

impl ToolDefinition {
    pub fn new(spec: ToolSpec, priority: i32) -> Self {
        Self {
            spec,
            priority,
            desc: String::new(),
            long_desc: Vec::new(),
            exec: None,
            search_path: SearchPath::default(),
            source_name: String::new(),
        }
    }

    /// An unrunnable tool with no flags or arguments.
    pub fn namespace(full_name: Vec<String>, priority: i32) -> Self {
        Self::new(ToolSpec::new(full_name), priority)
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn with_long_desc(mut self, lines: Vec<String>) -> Self {
        self.long_desc = lines;
        self
    }

    pub fn with_exec(mut self, exec: Option<Vec<String>>) -> Self {
        self.exec = exec;
        self
    }

    pub fn with_search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn long_desc(&self) -> &[String] {
        &self.long_desc
    }

    pub fn exec(&self) -> Option<&[String]> {
        self.exec.as_deref()
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Where the tool was defined: a file path or an inline source name.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Display form of the word path, `""` for the root tool.
    pub fn display_name(&self) -> String {
        self.spec.full_name().join(" ")
    }
}

impl ArgSpec for ToolDefinition {
    fn full_name(&self) -> &[String] {
        self.spec.full_name()
    }

    fn flags(&self) -> &[FlagDefinition] {
        self.spec.flags()
    }

    fn positional_args(&self) -> &[PositionalArg] {
        self.spec.positional_args()
    }

    fn flag_groups(&self) -> &[FlagGroup] {
        self.spec.flag_groups()
    }

    fn default_data(&self) -> &Data {
        self.spec.default_data()
    }

    fn runnable(&self) -> bool {
        self.spec.runnable()
    }

    fn flags_before_args(&self) -> bool {
        self.spec.flags_before_args()
    }

    fn handles_interrupts(&self) -> bool {
        self.spec.handles_interrupts()
    }
}

/// A word path that stands for another one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    full_name: Vec<String>,
    target: Vec<String>,
}

impl Alias {
    pub fn new(full_name: Vec<String>, target: Vec<String>) -> Self {
        Self { full_name, target }
    }

    pub fn full_name(&self) -> &[String] {
        &self.full_name
    }

    pub fn target(&self) -> &[String] {
        &self.target
    }
}

#[derive(Debug, Clone)]
pub enum Entry {
    Tool(Arc<ToolDefinition>),
    Alias(Alias),
    /// Implicit ancestor of a defined entry. Never counts as defined.
    Placeholder,
}

impl Entry {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tool(_) => "tool",
            Self::Alias(_) => "alias",
            Self::Placeholder => "namespace placeholder",
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, Self::Alias(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}
