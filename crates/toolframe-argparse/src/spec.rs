//! Declarative description of one tool's flags, positional arguments and groups.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::acceptor::Acceptor;
use crate::error::SpecError;
use crate::group::{FlagGroup, GroupKind, GroupMember};
use crate::syntax::{FlagStyle, FlagSyntax, FlagType, ValueType};
use crate::{Data, Value};

type HandlerFn = dyn Fn(Value, &Value) -> Value + Send + Sync;

/// Merges a newly accepted value with the value already stored under the same key.
#[derive(Clone, Default)]
pub enum ValueHandler {
    /// Replace the previous value.
    #[default]
    Set,
    /// Append to the previous list, creating the list on first use.
    Push,
    /// `f(new_value, previous_value)`; `previous_value` is `null` when unset.
    Custom(Arc<HandlerFn>),
}

impl ValueHandler {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Value, &Value) -> Value + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    pub fn apply(&self, new_value: Value, previous: Option<&Value>) -> Value {
        match self {
            Self::Set => new_value,
            Self::Push => match previous {
                Some(Value::Array(items)) => {
                    let mut items = items.clone();
                    items.push(new_value);
                    Value::Array(items)
                }
                _ => Value::Array(vec![new_value]),
            },
            Self::Custom(f) => f(new_value, previous.unwrap_or(&Value::Null)),
        }
    }
}

impl fmt::Debug for ValueHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set => f.write_str("Set"),
            Self::Push => f.write_str("Push"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlagDefinition {
    key: String,
    syntaxes: Vec<FlagSyntax>,
    flag_type: FlagType,
    value_type: ValueType,
    acceptor: Option<Arc<dyn Acceptor>>,
    handler: ValueHandler,
    default: Value,
    desc: String,
    display_name: String,
}

impl FlagDefinition {
    /// Build a flag from its spellings, e.g. `FlagDefinition::new("out", ["-o FILE", "--output=FILE"])`.
    pub fn new<I, S>(key: impl Into<String>, syntaxes: I) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let syntaxes = syntaxes
            .into_iter()
            .map(|s| FlagSyntax::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_syntaxes(key, syntaxes)
    }

    pub fn from_syntaxes(key: impl Into<String>, syntaxes: Vec<FlagSyntax>) -> Result<Self, SpecError> {
        let key = key.into();
        let Some(first) = syntaxes.first() else {
            return Err(SpecError::NoSyntax { key });
        };

        let value_syntax = syntaxes.iter().find(|s| s.flag_type() == FlagType::Value);
        let negatable = syntaxes.iter().any(|s| s.negative().is_some());
        if value_syntax.is_some() && negatable {
            return Err(SpecError::MixedFlagTypes { key });
        }

        let (flag_type, value_type) = match value_syntax.and_then(|s| s.value_type()) {
            Some(value_type) => (FlagType::Value, value_type),
            None => (FlagType::Boolean, ValueType::Required),
        };

        let display_name = syntaxes
            .iter()
            .find(|s| s.style() == FlagStyle::Long)
            .unwrap_or(first)
            .positive()
            .to_string();

        Ok(Self {
            key,
            syntaxes,
            flag_type,
            value_type,
            acceptor: None,
            handler: ValueHandler::Set,
            default: Value::Null,
            desc: String::new(),
            display_name,
        })
    }

    /// Attach an acceptor. A flag declared with only plain boolean spellings
    /// becomes a flag that requires a value.
    pub fn accept(mut self, acceptor: Arc<dyn Acceptor>) -> Result<Self, SpecError> {
        if self.flag_type == FlagType::Boolean {
            if self.syntaxes.iter().any(|s| s.negative().is_some()) {
                return Err(SpecError::BooleanAcceptor { key: self.key });
            }
            self.flag_type = FlagType::Value;
            self.value_type = ValueType::Required;
        }
        self.acceptor = Some(acceptor);
        Ok(self)
    }

    pub fn handler(mut self, handler: ValueHandler) -> Self {
        self.handler = handler;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = value;
        self
    }

    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn syntaxes(&self) -> &[FlagSyntax] {
        &self.syntaxes
    }

    pub fn flag_type(&self) -> FlagType {
        self.flag_type
    }

    /// Meaningful only for value flags.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn acceptor(&self) -> Option<&dyn Acceptor> {
        self.acceptor.as_deref()
    }

    pub fn value_handler(&self) -> &ValueHandler {
        &self.handler
    }

    pub fn default(&self) -> &Value {
        &self.default
    }

    pub fn description(&self) -> &str {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.display_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Required,
    Optional,
    /// Absorbs every remaining positional token into one list.
    Remaining,
}

#[derive(Debug, Clone)]
pub struct PositionalArg {
    key: String,
    arg_type: ArgType,
    acceptor: Option<Arc<dyn Acceptor>>,
    handler: ValueHandler,
    default: Value,
    display_name: String,
    desc: String,
}

impl PositionalArg {
    pub fn new(key: impl Into<String>, arg_type: ArgType) -> Self {
        let key = key.into();
        let (handler, default) = match arg_type {
            ArgType::Remaining => (ValueHandler::Push, Value::Array(Vec::new())),
            _ => (ValueHandler::Set, Value::Null),
        };
        Self {
            display_name: key.to_ascii_uppercase(),
            key,
            arg_type,
            acceptor: None,
            handler,
            default,
            desc: String::new(),
        }
    }

    pub fn accept(mut self, acceptor: Arc<dyn Acceptor>) -> Self {
        self.acceptor = Some(acceptor);
        self
    }

    pub fn handler(mut self, handler: ValueHandler) -> Self {
        self.handler = handler;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = value;
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn arg_type(&self) -> ArgType {
        self.arg_type
    }

    pub fn acceptor(&self) -> Option<&dyn Acceptor> {
        self.acceptor.as_deref()
    }

    pub fn value_handler(&self) -> &ValueHandler {
        &self.handler
    }

    pub fn default(&self) -> &Value {
        &self.default
    }

    pub fn name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.desc
    }
}

/// Outcome of looking up a flag spelling.
#[derive(Debug, Clone)]
pub enum FlagResolution<'a> {
    NotFound,
    Unique {
        flag: &'a FlagDefinition,
        syntax: &'a FlagSyntax,
        negative: bool,
    },
    Ambiguous {
        candidates: Vec<String>,
    },
}

/// Resolve `spelling` against `flags`.
///
/// Exact spellings win. Otherwise a long spelling (`--xyz`) is tried as a
/// prefix of each long syntax, positive form first, so a syntax contributes at
/// most one match. More than one distinct flag is ambiguous.
pub fn resolve_among<'a>(flags: &'a [FlagDefinition], spelling: &str) -> FlagResolution<'a> {
    let allow_prefix = spelling.len() > 2 && spelling.starts_with("--");
    let mut exact = Vec::new();
    let mut partial = Vec::new();

    for flag in flags {
        for syntax in flag.syntaxes() {
            let positive = syntax.positive();
            let negative = syntax.negative();
            if positive == spelling {
                exact.push((flag, syntax, false, positive));
            } else if let Some(neg) = negative.filter(|n| *n == spelling) {
                exact.push((flag, syntax, true, neg));
            } else if !allow_prefix || syntax.style() != FlagStyle::Long {
                continue;
            } else if positive.starts_with(spelling) {
                partial.push((flag, syntax, false, positive));
            } else if let Some(neg) = negative.filter(|n| n.starts_with(spelling)) {
                partial.push((flag, syntax, true, neg));
            }
        }
    }

    let mut found = if exact.is_empty() { partial } else { exact };
    let mut keys: Vec<&str> = Vec::new();
    found.retain(|(flag, ..)| {
        if keys.contains(&flag.key()) {
            false
        } else {
            keys.push(flag.key());
            true
        }
    });

    match found.as_slice() {
        [] => FlagResolution::NotFound,
        [(flag, syntax, negative, _)] => FlagResolution::Unique {
            flag: *flag,
            syntax: *syntax,
            negative: *negative,
        },
        many => FlagResolution::Ambiguous {
            candidates: many.iter().map(|(_, _, _, c)| c.to_string()).collect(),
        },
    }
}

/// What the parser needs to know about a tool.
pub trait ArgSpec {
    /// The tool's word path; empty for the root tool.
    fn full_name(&self) -> &[String];

    fn flags(&self) -> &[FlagDefinition];

    fn positional_args(&self) -> &[PositionalArg];

    fn flag_groups(&self) -> &[FlagGroup];

    fn default_data(&self) -> &Data;

    fn runnable(&self) -> bool;

    fn flags_before_args(&self) -> bool {
        false
    }

    fn handles_interrupts(&self) -> bool {
        false
    }

    fn resolve_flag(&self, spelling: &str) -> FlagResolution<'_> {
        resolve_among(self.flags(), spelling)
    }
}

/// Concrete, validated [`ArgSpec`].
#[derive(Debug, Clone, Default)]
pub struct ToolSpec {
    full_name: Vec<String>,
    flags: Vec<FlagDefinition>,
    positional_args: Vec<PositionalArg>,
    flag_groups: Vec<FlagGroup>,
    default_data: Data,
    flags_before_args: bool,
    runnable: bool,
    handles_interrupts: bool,
}

impl ToolSpec {
    pub fn new(full_name: Vec<String>) -> Self {
        Self {
            full_name,
            ..Default::default()
        }
    }

    fn key_in_use(&self, key: &str) -> bool {
        self.flags.iter().any(|f| f.key() == key)
            || self.positional_args.iter().any(|a| a.key() == key)
    }

    pub fn add_flag(&mut self, flag: FlagDefinition) -> Result<&mut Self, SpecError> {
        if self.key_in_use(flag.key()) {
            return Err(SpecError::DuplicateKey(flag.key().to_string()));
        }

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for existing in &self.flags {
            for syntax in existing.syntaxes() {
                for (spelling, _) in syntax.spellings() {
                    owners.insert(spelling, existing.key());
                }
            }
        }
        for syntax in flag.syntaxes() {
            for (spelling, _) in syntax.spellings() {
                if let Some(first) = owners.get(spelling) {
                    return Err(SpecError::SpellingConflict {
                        spelling: spelling.to_string(),
                        first: first.to_string(),
                        second: flag.key().to_string(),
                    });
                }
            }
        }

        self.default_data
            .insert(flag.key().to_string(), flag.default().clone());
        self.flags.push(flag);
        Ok(self)
    }

    pub fn add_positional(&mut self, arg: PositionalArg) -> Result<&mut Self, SpecError> {
        if self.key_in_use(arg.key()) {
            return Err(SpecError::DuplicateKey(arg.key().to_string()));
        }
        if let Some(last) = self.positional_args.last() {
            let key = arg.key().to_string();
            match (last.arg_type(), arg.arg_type()) {
                (ArgType::Remaining, _) => return Err(SpecError::AfterRemaining { key }),
                (ArgType::Optional, ArgType::Required) => {
                    return Err(SpecError::RequiredAfterOptional { key });
                }
                _ => {}
            }
        }

        self.default_data
            .insert(arg.key().to_string(), arg.default().clone());
        self.positional_args.push(arg);
        Ok(self)
    }

    /// Add a group constraint over already-declared flags, referenced by key.
    pub fn add_group<S: AsRef<str>>(
        &mut self,
        kind: GroupKind,
        desc: impl Into<String>,
        keys: &[S],
    ) -> Result<&mut Self, SpecError> {
        let desc = desc.into();
        let members = keys
            .iter()
            .map(|key| {
                let key = key.as_ref();
                self.flags
                    .iter()
                    .find(|f| f.key() == key)
                    .map(|f| GroupMember {
                        key: key.to_string(),
                        display_name: f.name().to_string(),
                    })
                    .ok_or_else(|| SpecError::UnknownGroupMember {
                        group: desc.clone(),
                        key: key.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.flag_groups.push(FlagGroup::new(kind, desc, members));
        Ok(self)
    }

    /// Seed data that is not tied to a declared flag or argument.
    pub fn set_default(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.default_data.insert(key.into(), value);
        self
    }

    pub fn set_runnable(&mut self, runnable: bool) -> &mut Self {
        self.runnable = runnable;
        self
    }

    pub fn set_flags_before_args(&mut self, enforce: bool) -> &mut Self {
        self.flags_before_args = enforce;
        self
    }

    pub fn set_handles_interrupts(&mut self, handles: bool) -> &mut Self {
        self.handles_interrupts = handles;
        self
    }

    pub fn set_full_name(&mut self, full_name: Vec<String>) -> &mut Self {
        self.full_name = full_name;
        self
    }
}

impl ArgSpec for ToolSpec {
    fn full_name(&self) -> &[String] {
        &self.full_name
    }

    fn flags(&self) -> &[FlagDefinition] {
        &self.flags
    }

    fn positional_args(&self) -> &[PositionalArg] {
        &self.positional_args
    }

    fn flag_groups(&self) -> &[FlagGroup] {
        &self.flag_groups
    }

    fn default_data(&self) -> &Data {
        &self.default_data
    }

    fn runnable(&self) -> bool {
        self.runnable
    }

    fn flags_before_args(&self) -> bool {
        self.flags_before_args
    }

    fn handles_interrupts(&self) -> bool {
        self.handles_interrupts
    }
}
