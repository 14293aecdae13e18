//! Runs a resolved tool with its parsed data.

use anyhow::{Context, Result, bail};
use std::env;
use std::io::Write;
use std::process::{Command, ExitCode, ExitStatus};
use std::sync::Arc;
use toolframe_argparse::{ArgParser, ArgSpec, Data};
use toolframe_loader::{ListOptions, Loader, NAMESPACE_PRIORITY, Subtool, ToolDefinition};
use tracing::debug;

/// Parsed data of the running tool, as a JSON object.
pub const DATA_ENV: &str = "TOOLFRAME_DATA";

/// Space-separated word path of the running tool.
pub const TOOL_ENV: &str = "TOOLFRAME_TOOL";

/// Exit status used when the command line does not parse.
pub const USAGE_EXIT: u8 = 2;

/// The tool that will handle `args` and the arguments it will parse.
///
/// When no tool is defined at all, an empty root namespace takes over so the
/// words read as "tool not found".
pub fn resolve(loader: &mut Loader, args: &[String]) -> Result<(Arc<ToolDefinition>, Vec<String>)> {
    Ok(match loader.lookup(args)? {
        Some(found) => (found.tool, found.remaining),
        None => (
            Arc::new(ToolDefinition::namespace(Vec::new(), NAMESPACE_PRIORITY)),
            args.to_vec(),
        ),
    })
}

pub fn run(loader: &mut Loader, args: &[String]) -> Result<ExitCode> {
    let (tool, remaining) = resolve(loader, args)?;
    debug!(tool = %tool.display_name(), args = ?remaining, "parsing");

    let mut parser = ArgParser::new(tool.as_ref());
    parser.parse(remaining.iter().cloned())?.finish()?;

    if !parser.errors().is_empty() {
        for message in parser.error_messages() {
            eprintln!("{message}");
        }
        return Ok(ExitCode::from(USAGE_EXIT));
    }

    if !tool.runnable() {
        let subtools = loader.list_subtools(tool.full_name(), ListOptions::default())?;
        print_listing(&tool, &subtools)?;
        return Ok(ExitCode::SUCCESS);
    }

    match tool.exec() {
        Some(exec) => spawn(&tool, exec, parser.data(), &remaining),
        None => {
            println!("{}", serde_json::to_string_pretty(parser.data())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn spawn(tool: &ToolDefinition, exec: &[String], data: &Data, args: &[String]) -> Result<ExitCode> {
    let Some((program, leading)) = exec.split_first() else {
        bail!("tool \"{}\" has an empty exec list", tool.display_name());
    };

    let mut command = Command::new(program);
    command
        .args(leading)
        .args(args)
        .env(DATA_ENV, serde_json::to_string(data)?)
        .env(TOOL_ENV, tool.display_name());
    if !tool.search_path().is_empty() {
        let path = tool
            .search_path()
            .prepend_to(env::var_os("PATH"))
            .context("search path contains an invalid directory")?;
        command.env("PATH", path);
    }

    debug!(program, source = tool.source_name(), "spawning");
    let status = command
        .status()
        .with_context(|| format!("failed to run {program}"))?;
    Ok(exit_code(status))
}

fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(0) => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    }
}

/// Lines of a subtool listing: the words below `prefix_len`, padded, then the description.
pub fn format_listing(prefix_len: usize, subtools: &[Subtool]) -> String {
    let mut out = String::new();
    for sub in subtools {
        let name = sub.name[prefix_len..].join(" ");
        let desc = sub.desc();
        if desc.is_empty() {
            out.push_str(&format!("  {name}\n"));
        } else {
            out.push_str(&format!("  {name:<16} {desc}\n"));
        }
    }
    out
}

fn print_listing(tool: &ToolDefinition, subtools: &[Subtool]) -> Result<()> {
    if subtools.is_empty() {
        eprintln!("No tools defined.");
        return Ok(());
    }
    let mut out = String::new();
    if !tool.desc().is_empty() {
        out.push_str(tool.desc());
        out.push_str("\n\n");
    }
    out.push_str("Available tools:\n");
    out.push_str(&format_listing(tool.full_name().len(), subtools));

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(out.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolframe_loader::ConfigSource;
    use toolframe_metadata::ToolConfig;

    fn loader() -> Loader {
        let config = ToolConfig::from_json(
            r#"{
                "subtools": {
                    "ns": {
                        "desc": "a namespace",
                        "subtools": { "leaf": { "runnable": true, "desc": "does things" } }
                    }
                }
            }"#,
        )
        .unwrap();
        let mut loader = Loader::new();
        loader.add_source(ConfigSource::inline("test", config)).unwrap();
        loader
    }

    fn w(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn resolve_falls_back_to_root_namespace() {
        let mut empty = Loader::new();
        let (tool, remaining) = resolve(&mut empty, &w("nosuch thing")).unwrap();
        assert!(tool.full_name().is_empty());
        assert!(!tool.runnable());
        assert_eq!(remaining, w("nosuch thing"));

        let mut parser = ArgParser::new(tool.as_ref());
        parser.parse(remaining).unwrap().finish().unwrap();
        assert_eq!(parser.error_messages(), vec!["tool not found: \"nosuch\"".to_string()]);
    }

    #[test]
    fn listing_shows_relative_names() {
        let mut loader = loader();
        let subs = loader.list_subtools(&w("ns"), ListOptions::default()).unwrap();
        assert_eq!(format_listing(1, &subs), format!("  {:<16} does things\n", "leaf"));
    }
}
