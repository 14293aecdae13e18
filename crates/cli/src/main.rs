mod manifest;
mod runner;
mod sources;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};
use toolframe_argparse::ArgSpec;
use toolframe_loader::{ListOptions, Loader};
use tracing_subscriber::{EnvFilter, fmt};

use crate::manifest::{DEFAULT_MANIFEST_NAME, load_manifest, write_default_manifest};
use crate::sources::{Discovery, PATH_ENV, build_loader, home_dir};

/// Overrides the log filter, e.g. `TOOLFRAME_LOG=toolframe_loader=debug`.
const LOG_ENV: &str = "TOOLFRAME_LOG";

#[derive(Parser)]
#[command(name = "toolframe")]
#[command(version, about = "Run tools defined in layered, lazily loaded config directories", long_about = None)]
struct Cli {
    /// Path to toolframe.json manifest
    #[arg(long, global = true, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Add a config source (file or directory) above discovered ones
    #[arg(short = 'C', long = "config", global = true, value_name = "PATH")]
    configs: Vec<PathBuf>,

    /// Add a config source that outranks every other source
    #[arg(long = "high-priority-config", global = true, value_name = "PATH")]
    high_priority_configs: Vec<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the leading words to a tool and run it with the rest
    Run(RunArgs),

    /// List tools below a word path
    List(ListArgs),

    /// Show which tool would handle a command line
    Which(WhichArgs),

    /// Create a toolframe.json manifest and a sample tool
    Init(InitArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// Tool words followed by the tool's own arguments
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Parser)]
struct ListArgs {
    /// Word path to list under (default: top level)
    #[arg(value_name = "WORDS")]
    words: Vec<String>,

    /// Include every descendant
    #[arg(short, long)]
    recursive: bool,

    /// Include hidden tools (words starting with `_`)
    #[arg(short, long)]
    all: bool,
}

#[derive(Parser)]
struct WhichArgs {
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Replace an existing manifest
    #[arg(long)]
    force: bool,
}

fn main() -> Result<ExitCode> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!("failed to load .env: {err}"),
    }

    match &cli.command {
        Commands::Run(args) => {
            let mut loader = open_loader(&cli)?;
            runner::run(&mut loader, &args.args)
        }
        Commands::List(args) => {
            let mut loader = open_loader(&cli)?;
            list(&mut loader, args)
        }
        Commands::Which(args) => {
            let mut loader = open_loader(&cli)?;
            which(&mut loader, &args.args)
        }
        Commands::Init(args) => init(args),
    }
}

fn open_loader(cli: &Cli) -> Result<Loader> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let loaded = load_manifest(&cwd, cli.manifest.as_deref())?;
    let layout = loaded
        .as_ref()
        .map(|m| m.manifest.layout())
        .unwrap_or_default();

    let discovery = Discovery {
        cwd,
        home: home_dir(),
        path_env: std::env::var_os(PATH_ENV),
        manifest: loaded.as_ref(),
        configs: &cli.configs,
        high_priority_configs: &cli.high_priority_configs,
        layout: layout.clone(),
    };
    let plan = discovery.plan();
    tracing::debug!(sources = plan.len(), "planned config sources");
    build_loader(&plan, layout)
}

fn list(loader: &mut Loader, args: &ListArgs) -> Result<ExitCode> {
    let options = ListOptions {
        recursive: args.recursive,
        include_hidden: args.all,
        ..ListOptions::default()
    };
    let subtools = loader.list_subtools(&args.words, options)?;
    if subtools.is_empty() {
        eprintln!("No tools found.");
        return Ok(ExitCode::FAILURE);
    }
    print!("{}", runner::format_listing(args.words.len(), &subtools));
    Ok(ExitCode::SUCCESS)
}

fn which(loader: &mut Loader, args: &[String]) -> Result<ExitCode> {
    let Some(found) = loader.lookup(args)? else {
        eprintln!("No tool found.");
        return Ok(ExitCode::FAILURE);
    };
    let tool = &found.tool;
    let name = if tool.full_name().is_empty() {
        "(root)".to_string()
    } else {
        tool.display_name()
    };
    println!("tool:      {name}");
    println!("runnable:  {}", tool.runnable());
    println!("priority:  {}", tool.priority());
    if !tool.source_name().is_empty() {
        println!("source:    {}", tool.source_name());
    }
    if let Some(exec) = tool.exec() {
        println!("exec:      {}", exec.join(" "));
    }
    println!("remaining: {}", found.remaining.join(" "));
    Ok(ExitCode::SUCCESS)
}

const SAMPLE_TOOL: &str = r#"{
  "desc": "Print a greeting",
  "flags": [
    { "key": "shout", "syntax": ["-s", "--shout"], "desc": "Use capital letters" },
    { "key": "times", "syntax": ["-n", "--times=N"], "accept": "integer", "default": 1 }
  ],
  "args": [{ "key": "name", "kind": "optional", "default": "world" }],
  "runnable": true
}
"#;

fn init(args: &InitArgs) -> Result<ExitCode> {
    let dir = args.dir.clone().unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    if dir.join(DEFAULT_MANIFEST_NAME).exists() && !args.force {
        bail!("{DEFAULT_MANIFEST_NAME} already exists in {}", dir.display());
    }
    let manifest_path = write_default_manifest(&dir, args.force)?;
    eprintln!("Created: {}", manifest_path.display());

    let sample = write_sample_tool(&dir.join("tools"))?;
    if let Some(sample) = sample {
        eprintln!("Created: {}", sample.display());
    }

    eprintln!("\nNext steps:");
    eprintln!("  1. Add tools as JSON or TOML files under tools/");
    eprintln!("  2. Run: toolframe list");
    eprintln!("  3. Run: toolframe run hello --shout");

    Ok(ExitCode::SUCCESS)
}

fn write_sample_tool(tools_dir: &Path) -> Result<Option<PathBuf>> {
    fs::create_dir_all(tools_dir)
        .with_context(|| format!("failed to create directory: {}", tools_dir.display()))?;
    let sample = tools_dir.join("hello.json");
    if sample.exists() {
        return Ok(None);
    }
    fs::write(&sample, SAMPLE_TOOL)
        .with_context(|| format!("failed to write {}", sample.display()))?;
    Ok(Some(sample))
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
