//! Single-pass, incremental argument parser.

use std::collections::HashSet;
use std::fmt;

use crate::acceptor::Acceptor;
use crate::error::{ParserError, UsageError, ValueKind};
use crate::spec::{ArgSpec, ArgType, FlagDefinition, FlagResolution, ValueHandler};
use crate::syntax::{FlagSyntax, FlagType, ValueDelim, ValueType, is_long_name};
use crate::{Data, Value};

/// A flag that has been seen and is waiting for its value in the next token.
#[derive(Debug, Clone)]
struct PendingFlag<'t> {
    flag: &'t FlagDefinition,
    spelling: String,
}

/// Parses argv tokens against one tool's [`ArgSpec`].
///
/// Tokens are fed with [`add`](Self::add) or [`parse`](Self::parse); the parse
/// is completed with [`finish`](Self::finish), after which the parser is frozen.
///
/// ```
/// use toolframe_argparse::{ArgParser, FlagDefinition, ToolSpec};
///
/// let mut spec = ToolSpec::new(vec!["greet".to_string()]);
/// spec.add_flag(FlagDefinition::new("loud", ["-l", "--loud"]).unwrap()).unwrap();
/// spec.set_runnable(true);
///
/// let mut parser = ArgParser::new(&spec);
/// parser.parse(["--lo"]).unwrap().finish().unwrap();
/// assert_eq!(parser.data()["loud"], serde_json::json!(true));
/// assert!(parser.errors().is_empty());
/// ```
pub struct ArgParser<'t> {
    tool: &'t dyn ArgSpec,
    data: Data,
    parsed_args: Vec<String>,
    errors: Vec<UsageError>,
    pending_flag: Option<PendingFlag<'t>>,
    flags_allowed: bool,
    arg_index: usize,
    extra_args: Vec<String>,
    seen_flag_keys: HashSet<String>,
    finished: bool,
}

impl<'t> ArgParser<'t> {
    pub fn new(tool: &'t dyn ArgSpec) -> Self {
        Self {
            tool,
            data: tool.default_data().clone(),
            parsed_args: Vec::new(),
            errors: Vec::new(),
            pending_flag: None,
            flags_allowed: true,
            arg_index: 0,
            extra_args: Vec::new(),
            seen_flag_keys: HashSet::new(),
            finished: false,
        }
    }

    /// Feed every token in `args`.
    pub fn parse<I, S>(&mut self, args: I) -> Result<&mut Self, ParserError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self.add(arg)?;
        }
        Ok(self)
    }

    /// Feed exactly one token.
    pub fn add(&mut self, arg: impl Into<String>) -> Result<&mut Self, ParserError> {
        if self.finished {
            return Err(ParserError::Finished);
        }
        let arg = arg.into();
        self.parsed_args.push(arg.clone());

        if self.take_flag_value(&arg) {
            return Ok(self);
        }
        if self.flags_allowed && self.handle_flag(&arg) {
            return Ok(self);
        }
        self.handle_positional(arg);
        Ok(self)
    }

    /// Complete the parse: settle a pending flag, check required arguments,
    /// report extra arguments and run flag-group validation.
    pub fn finish(&mut self) -> Result<&mut Self, ParserError> {
        if self.finished {
            return Err(ParserError::Finished);
        }
        self.finish_pending_flag();
        self.finish_positionals();
        self.finish_flag_groups();
        self.finished = true;
        Ok(self)
    }

    pub fn tool(&self) -> &'t dyn ArgSpec {
        self.tool
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn into_data(self) -> Data {
        self.data
    }

    pub fn errors(&self) -> &[UsageError] {
        &self.errors
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    /// Positional tokens beyond the declared positional arguments.
    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    /// Every token added so far, in order.
    pub fn parsed_args(&self) -> &[String] {
        &self.parsed_args
    }

    /// Keys of flags recognized so far.
    pub fn seen_flag_keys(&self) -> &HashSet<String> {
        &self.seen_flag_keys
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn take_flag_value(&mut self, arg: &str) -> bool {
        let Some(pending) = self.pending_flag.take() else {
            return false;
        };
        if pending.flag.value_type() == ValueType::Optional && arg.starts_with('-') {
            self.store_flag_value(pending.flag, None);
            return false;
        }
        self.store_flag_value(pending.flag, Some(arg));
        true
    }

    fn handle_flag(&mut self, arg: &str) -> bool {
        if arg == "--" {
            self.flags_allowed = false;
            return true;
        }

        if let Some(body) = arg.strip_prefix("--") {
            return match body.split_once('=') {
                Some((name, value)) if is_long_name(name) => {
                    self.handle_valued_flag(&arg[..name.len() + 2], value);
                    true
                }
                None if is_long_name(body) => {
                    self.handle_plain_flag(arg, "");
                    true
                }
                _ => false,
            };
        }

        match arg.strip_prefix('-') {
            Some(cluster) if !cluster.is_empty() => {
                self.handle_short_flags(cluster);
                true
            }
            _ => false,
        }
    }

    /// `--name=value`
    fn handle_valued_flag(&mut self, name: &str, value: &str) {
        let Some((flag, _, negative)) = self.find_flag(name) else {
            return;
        };
        self.seen_flag_keys.insert(flag.key().to_string());
        match flag.flag_type() {
            FlagType::Value => self.store_flag_value(flag, Some(value)),
            FlagType::Boolean => {
                self.store_boolean(flag, !negative);
                self.errors.push(UsageError::FlagValueNotAllowed {
                    flag: name.to_string(),
                });
            }
        }
    }

    /// `--name`, or one `-x` out of a short cluster where `following` is the
    /// rest of the cluster. Returns what is left of the cluster to process.
    fn handle_plain_flag(&mut self, name: &str, following: &str) -> Option<String> {
        let (flag, syntax, negative) = self.find_flag(name)?;
        self.seen_flag_keys.insert(flag.key().to_string());

        if flag.flag_type() == FlagType::Boolean {
            self.store_boolean(flag, !negative);
            return Some(following.to_string());
        }

        if !following.is_empty() {
            self.store_flag_value(flag, Some(following));
        } else if flag.value_type() == ValueType::Required
            || syntax.value_delim() == Some(ValueDelim::Space)
        {
            self.pending_flag = Some(PendingFlag {
                flag,
                spelling: name.to_string(),
            });
        } else {
            self.store_flag_value(flag, None);
        }
        None
    }

    /// `-xyz`: boolean flags keep consuming the cluster, a value flag takes the rest.
    fn handle_short_flags(&mut self, cluster: &str) {
        let mut rest = cluster.to_string();
        while let Some(c) = rest.chars().next() {
            let name = format!("-{c}");
            let following = rest[c.len_utf8()..].to_string();
            match self.handle_plain_flag(&name, &following) {
                Some(next) => rest = next,
                None => break,
            }
        }
    }

    fn find_flag(&mut self, name: &str) -> Option<(&'t FlagDefinition, &'t FlagSyntax, bool)> {
        let tool = self.tool;
        match tool.resolve_flag(name) {
            FlagResolution::Unique {
                flag,
                syntax,
                negative,
            } => Some((flag, syntax, negative)),
            FlagResolution::NotFound => {
                self.errors.push(UsageError::FlagUnrecognized {
                    flag: name.to_string(),
                });
                None
            }
            FlagResolution::Ambiguous { candidates } => {
                self.errors.push(UsageError::FlagAmbiguous {
                    flag: name.to_string(),
                    candidates,
                });
                None
            }
        }
    }

    fn handle_positional(&mut self, arg: String) {
        let tool = self.tool;
        if tool.flags_before_args() {
            self.flags_allowed = false;
        }

        let Some(def) = tool.positional_args().get(self.arg_index) else {
            self.extra_args.push(arg);
            return;
        };
        if def.arg_type() != ArgType::Remaining {
            self.arg_index += 1;
        }
        self.add_data(
            def.key(),
            def.acceptor(),
            def.value_handler(),
            Some(&arg),
            ValueKind::Arg,
            def.name(),
        );
    }

    fn store_boolean(&mut self, flag: &FlagDefinition, value: bool) {
        let merged = flag
            .value_handler()
            .apply(Value::Bool(value), self.data.get(flag.key()));
        self.data.insert(flag.key().to_string(), merged);
    }

    fn store_flag_value(&mut self, flag: &FlagDefinition, raw: Option<&str>) {
        self.add_data(
            flag.key(),
            flag.acceptor(),
            flag.value_handler(),
            raw,
            ValueKind::Flag,
            flag.name(),
        );
    }

    fn add_data(
        &mut self,
        key: &str,
        acceptor: Option<&dyn Acceptor>,
        handler: &ValueHandler,
        raw: Option<&str>,
        kind: ValueKind,
        name: &str,
    ) {
        let value = match acceptor {
            Some(acceptor) => match acceptor.accept(raw) {
                Some(matched) => acceptor.convert(matched),
                None => {
                    self.errors.push(UsageError::UnacceptableValue {
                        kind,
                        name: name.to_string(),
                        value: raw.map(str::to_string),
                        expected: acceptor.describe(),
                    });
                    return;
                }
            },
            None => raw.map_or(Value::Null, |s| Value::String(s.to_string())),
        };
        let merged = handler.apply(value, self.data.get(key));
        self.data.insert(key.to_string(), merged);
    }

    fn finish_pending_flag(&mut self) {
        let Some(pending) = self.pending_flag.take() else {
            return;
        };
        if pending.flag.value_type() == ValueType::Required {
            self.errors.push(UsageError::FlagValueMissing {
                flag: pending.spelling,
            });
        } else {
            self.store_flag_value(pending.flag, None);
        }
    }

    fn finish_positionals(&mut self) {
        let tool = self.tool;
        if let Some(def) = tool.positional_args().get(self.arg_index)
            && def.arg_type() == ArgType::Required
        {
            self.errors.push(UsageError::ArgMissing {
                name: def.name().to_string(),
            });
        }

        if self.extra_args.is_empty() {
            return;
        }
        if tool.runnable() || !self.seen_flag_keys.is_empty() {
            self.errors.push(UsageError::ExtraArguments {
                values: self.extra_args.clone(),
            });
        } else {
            let mut words = tool.full_name().to_vec();
            words.push(self.extra_args[0].clone());
            self.errors.push(UsageError::ToolNotFound { words });
        }
    }

    fn finish_flag_groups(&mut self) {
        let tool = self.tool;
        for group in tool.flag_groups() {
            let errors = group.validate(&self.seen_flag_keys);
            self.errors.extend(errors);
        }
    }
}

impl fmt::Debug for ArgParser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgParser")
            .field("tool", &self.tool.full_name())
            .field("data", &self.data)
            .field("errors", &self.errors)
            .field("extra_args", &self.extra_args)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acceptor::BuiltinAcceptor;
    use crate::group::GroupKind;
    use crate::spec::{PositionalArg, ToolSpec};
    use serde_json::json;
    use std::sync::Arc;

    fn tool() -> ToolSpec {
        let mut spec = ToolSpec::new(vec!["build".into()]);
        spec.add_flag(FlagDefinition::new("verbose", ["-v", "--verbose"]).unwrap())
            .unwrap()
            .add_flag(FlagDefinition::new("color", ["--[no-]color"]).unwrap())
            .unwrap()
            .add_flag(FlagDefinition::new("output", ["-o FILE", "--output=FILE"]).unwrap())
            .unwrap()
            .add_flag(FlagDefinition::new("level", ["-l[N]", "--level[=N]"]).unwrap())
            .unwrap()
            .add_flag(
                FlagDefinition::new("jobs", ["-j", "--jobs"])
                    .unwrap()
                    .accept(Arc::new(BuiltinAcceptor::Integer))
                    .unwrap(),
            )
            .unwrap()
            .add_positional(PositionalArg::new("target", ArgType::Required))
            .unwrap()
            .add_positional(PositionalArg::new("mode", ArgType::Optional))
            .unwrap()
            .add_positional(PositionalArg::new("rest", ArgType::Remaining))
            .unwrap();
        spec.set_runnable(true);
        spec
    }

    fn run(spec: &ToolSpec, args: &[&str]) -> (Data, Vec<UsageError>, Vec<String>) {
        let mut parser = ArgParser::new(spec);
        parser.parse(args.iter().copied()).unwrap().finish().unwrap();
        (
            parser.data().clone(),
            parser.errors().to_vec(),
            parser.extra_args().to_vec(),
        )
    }

    #[test]
    fn seeds_defaults_and_assigns_positionals_in_order() {
        let spec = tool();
        let (data, errors, _) = run(&spec, &["app", "release", "x", "y"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(data["target"], json!("app"));
        assert_eq!(data["mode"], json!("release"));
        assert_eq!(data["rest"], json!(["x", "y"]));
        assert_eq!(data["verbose"], Value::Null);
    }

    #[test]
    fn short_cluster_with_attached_value() {
        let spec = tool();
        let (data, errors, _) = run(&spec, &["-voout.txt", "app"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(data["verbose"], json!(true));
        assert_eq!(data["output"], json!("out.txt"));
    }

    #[test]
    fn value_flag_consumes_next_token_even_if_it_looks_like_a_flag() {
        let spec = tool();
        let (data, errors, _) = run(&spec, &["-o", "--weird", "app"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(data["output"], json!("--weird"));
        assert_eq!(data["target"], json!("app"));
    }

    #[test]
    fn optional_value_flag_yields_to_following_flag() {
        let spec = tool();
        let (data, errors, _) = run(&spec, &["--level", "-v", "app"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(data["level"], Value::Null);
        assert_eq!(data["verbose"], json!(true));

        let (data, _, _) = run(&spec, &["--level=3", "app"]);
        assert_eq!(data["level"], json!("3"));

        let (data, _, _) = run(&spec, &["-l2", "app"]);
        assert_eq!(data["level"], json!("2"));
    }

    #[test]
    fn boolean_flag_with_value_records_error_but_keeps_value() {
        let spec = tool();
        let (data, errors, _) = run(&spec, &["--no-color=yes", "app"]);
        assert_eq!(data["color"], json!(false));
        assert_eq!(
            errors,
            vec![UsageError::FlagValueNotAllowed {
                flag: "--no-color".into()
            }]
        );
    }

    #[test]
    fn double_dash_turns_flags_into_positionals() {
        let spec = tool();
        let (data, errors, _) = run(&spec, &["--", "-v", "--color"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(data["target"], json!("-v"));
        assert_eq!(data["mode"], json!("--color"));
        assert_eq!(data["verbose"], Value::Null);
    }

    #[test]
    fn unknown_and_ambiguous_flags_are_collected() {
        let mut spec = tool();
        spec.add_flag(FlagDefinition::new("verify", ["--verify"]).unwrap())
            .unwrap();
        let (data, errors, _) = run(&spec, &["--bogus", "--ver", "-vx", "app"]);
        assert_eq!(data["verbose"], json!(true));
        assert_eq!(data["verify"], Value::Null);
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert_eq!(
            errors[0],
            UsageError::FlagUnrecognized {
                flag: "--bogus".into()
            }
        );
        assert!(matches!(errors[1], UsageError::FlagAmbiguous { .. }));
        assert_eq!(errors[2], UsageError::FlagUnrecognized { flag: "-x".into() });
    }

    #[test]
    fn acceptor_rejection_skips_assignment() {
        let spec = tool();
        let (data, errors, _) = run(&spec, &["--jobs", "many", "-j4", "app"]);
        assert_eq!(data["jobs"], json!(4));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("\"many\""));
    }

    #[test]
    fn finish_reports_missing_value_and_missing_argument() {
        let spec = tool();
        let (data, errors, _) = run(&spec, &["--output"]);
        assert_eq!(data["output"], Value::Null);
        assert_eq!(
            errors,
            vec![
                UsageError::FlagValueMissing {
                    flag: "--output".into()
                },
                UsageError::ArgMissing {
                    name: "TARGET".into()
                },
            ]
        );
    }

    #[test]
    fn extra_arguments_vs_tool_not_found() {
        let mut spec = ToolSpec::new(vec!["ns".into()]);
        spec.add_flag(FlagDefinition::new("all", ["-a"]).unwrap())
            .unwrap();

        let (_, errors, extra) = run(&spec, &["nope", "more"]);
        assert_eq!(extra, vec!["nope".to_string(), "more".to_string()]);
        assert_eq!(
            errors,
            vec![UsageError::ToolNotFound {
                words: vec!["ns".into(), "nope".into()]
            }]
        );

        let (_, errors, _) = run(&spec, &["-a", "nope"]);
        assert!(matches!(errors[0], UsageError::ExtraArguments { .. }));

        spec.set_runnable(true);
        let (_, errors, _) = run(&spec, &["nope"]);
        assert!(matches!(errors[0], UsageError::ExtraArguments { .. }));
    }

    #[test]
    fn flags_before_args_stops_flag_recognition() {
        let mut spec = tool();
        spec.set_flags_before_args(true);
        let (data, errors, _) = run(&spec, &["-v", "app", "--color"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(data["verbose"], json!(true));
        assert_eq!(data["mode"], json!("--color"));
        assert_eq!(data["color"], Value::Null);
    }

    #[test]
    fn groups_are_checked_against_recognized_keys() {
        let mut spec = tool();
        spec.add_group(GroupKind::ExactlyOne, "format", &["verbose", "color"])
            .unwrap();
        let (_, errors, _) = run(&spec, &["app"]);
        assert_eq!(
            errors,
            vec![UsageError::ExactlyOneMissing {
                group: "format".into()
            }]
        );
        let (_, errors, _) = run(&spec, &["--no-color", "app"]);
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn handler_accumulates_repeated_flags() {
        let mut spec = ToolSpec::new(Vec::new());
        spec.add_flag(
            FlagDefinition::new("verbosity", ["-v"])
                .unwrap()
                .default_value(json!(0))
                .handler(ValueHandler::custom(|_, prev| {
                    json!(prev.as_i64().unwrap_or(0) + 1)
                })),
        )
        .unwrap();
        let (data, _, _) = run(&spec, &["-vvv", "-v"]);
        assert_eq!(data["verbosity"], json!(4));
    }

    #[test]
    fn add_after_finish_is_a_contract_violation() {
        let spec = tool();
        let mut parser = ArgParser::new(&spec);
        parser.add("app").unwrap().finish().unwrap();
        assert_eq!(parser.add("more").unwrap_err(), ParserError::Finished);
        assert_eq!(parser.finish().unwrap_err(), ParserError::Finished);
        assert_eq!(parser.parsed_args(), ["app".to_string()]);
    }

    #[test]
    fn defaults_are_not_shared_between_parsers() {
        let spec = tool();
        let (first, _, _) = run(&spec, &["app", "m", "a"]);
        let (second, _, _) = run(&spec, &["app"]);
        assert_eq!(first["rest"], json!(["a"]));
        assert_eq!(second["rest"], json!([]));
        assert_eq!(spec.default_data()["rest"], json!([]));
    }
}
