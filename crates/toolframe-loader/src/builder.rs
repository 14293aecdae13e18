//! Turns decoded [`ToolConfig`]s into [`ToolSpec`]s.

use std::sync::Arc;

use toolframe_argparse::{
    ArgType, BuiltinAcceptor, FlagDefinition, GroupKind, PositionalArg, SpecError, ToolSpec,
    ValueHandler,
};
use toolframe_metadata::{
    AcceptConfig, ArgConfig, ArgKind, FlagConfig, GroupKindConfig, HandlerConfig, ToolConfig,
};

use crate::definition::ToolDefinition;
use crate::search_path::SearchPath;

pub fn acceptor(config: &AcceptConfig) -> BuiltinAcceptor {
    match config {
        AcceptConfig::String => BuiltinAcceptor::String,
        AcceptConfig::Integer => BuiltinAcceptor::Integer,
        AcceptConfig::Float => BuiltinAcceptor::Float,
        AcceptConfig::Boolean => BuiltinAcceptor::Boolean,
        AcceptConfig::OneOf(values) => BuiltinAcceptor::OneOf(values.clone()),
        AcceptConfig::Range { min, max } => BuiltinAcceptor::IntegerRange {
            min: *min,
            max: *max,
        },
    }
}

fn handler(config: HandlerConfig) -> ValueHandler {
    match config {
        HandlerConfig::Set => ValueHandler::Set,
        HandlerConfig::Push => ValueHandler::Push,
    }
}

fn group_kind(config: GroupKindConfig) -> GroupKind {
    match config {
        GroupKindConfig::Optional => GroupKind::Optional,
        GroupKindConfig::Required => GroupKind::Required,
        GroupKindConfig::ExactlyOne => GroupKind::ExactlyOne,
        GroupKindConfig::AtLeastOne => GroupKind::AtLeastOne,
        GroupKindConfig::AtMostOne => GroupKind::AtMostOne,
    }
}

fn build_flag(config: &FlagConfig) -> Result<FlagDefinition, SpecError> {
    let mut flag = FlagDefinition::new(&config.key, &config.syntax)?.desc(&config.desc);
    if let Some(accept) = &config.accept {
        flag = flag.accept(Arc::new(acceptor(accept)))?;
    }
    if let Some(h) = config.handler {
        flag = flag.handler(handler(h));
    }
    if let Some(default) = &config.default {
        flag = flag.default_value(default.clone());
    }
    if let Some(name) = &config.display_name {
        flag = flag.display_name(name);
    }
    Ok(flag)
}

fn build_arg(config: &ArgConfig) -> PositionalArg {
    let arg_type = match config.kind {
        ArgKind::Required => ArgType::Required,
        ArgKind::Optional => ArgType::Optional,
        ArgKind::Remaining => ArgType::Remaining,
    };
    let mut arg = PositionalArg::new(&config.key, arg_type).desc(&config.desc);
    if let Some(accept) = &config.accept {
        arg = arg.accept(Arc::new(acceptor(accept)));
    }
    if let Some(h) = config.handler {
        arg = arg.handler(handler(h));
    }
    if let Some(default) = &config.default {
        arg = arg.default_value(default.clone());
    }
    if let Some(name) = &config.display_name {
        arg = arg.display_name(name);
    }
    arg
}

/// Build the [`ToolSpec`] for one tool. Subtools and aliases are not
/// visited here.
pub fn build_spec(config: &ToolConfig, full_name: Vec<String>) -> Result<ToolSpec, SpecError> {
    let mut spec = ToolSpec::new(full_name);
    for flag in &config.flags {
        spec.add_flag(build_flag(flag)?)?;
    }
    for arg in &config.args {
        spec.add_positional(build_arg(arg))?;
    }
    for group in &config.groups {
        spec.add_group(group_kind(group.kind), &group.desc, &group.flags)?;
    }
    spec.set_runnable(config.is_runnable())
        .set_flags_before_args(config.flags_before_args)
        .set_handles_interrupts(config.handles_interrupts);
    Ok(spec)
}

pub fn build_definition(
    config: &ToolConfig,
    full_name: Vec<String>,
    priority: i32,
    search_path: &SearchPath,
    source_name: &str,
) -> Result<ToolDefinition, SpecError> {
    let spec = build_spec(config, full_name)?;
    Ok(ToolDefinition::new(spec, priority)
        .with_desc(&config.desc)
        .with_long_desc(config.long_desc.clone())
        .with_exec(config.exec.clone())
        .with_search_path(search_path.clone())
        .with_source_name(source_name))
}

/// Resolve an alias target relative to the tool that declares it.
pub fn alias_target(parent: &[String], target: &str) -> Vec<String> {
    parent
        .iter()
        .cloned()
        .chain(target.split_whitespace().map(str::to_string))
        .collect()
}
