//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use dashpanel::core::config::Config;
use dashpanel::core::errors::DashError;
use dashpanel::layout::{BlockSize, PackOptions, PackResult, pack};
use dashpanel::logger::jsonl::{JournalConfig, JsonlWriter};
use dashpanel::persist::{DurableStore, JsonFileStore, LoadOutcome, MemoryStore, UnavailableStore};
use dashpanel::state::{DashboardState, DashboardStore};
use dashpanel::transport::{RecordingTransport, load_frames};

/// dashpanel: state sync and masonry layout for server-driven dashboards.
#[derive(Debug, Parser)]
#[command(
    name = "dashpanel",
    author,
    version,
    about = "Dashboard state-sync reducer and masonry layout toolkit",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Feed recorded `{event, payload}` frames through a store.
    Replay(ReplayArgs),
    /// Pack block sizes with the masonry engine.
    Layout(LayoutArgs),
    /// Show the effective configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// JSON-lines file of recorded frames.
    #[arg(value_name = "FRAMES")]
    frames: PathBuf,
    /// Persist visibility flags to this JSON file (defaults to `storage.file`).
    #[arg(long, value_name = "FILE", conflicts_with = "ephemeral")]
    storage: Option<PathBuf>,
    /// Append the activity journal to this JSONL file (defaults to `paths.journal`).
    #[arg(long, value_name = "FILE", conflicts_with = "ephemeral")]
    journal: Option<PathBuf>,
    /// Keep visibility flags in memory and write no journal.
    #[arg(long)]
    ephemeral: bool,
    /// Simulated milliseconds between frames (drives toast expiry).
    #[arg(long, default_value_t = 0, value_name = "MS")]
    step_ms: u64,
}

#[derive(Debug, Clone, Args)]
struct LayoutArgs {
    /// Container width in pixels.
    #[arg(long, value_name = "PX")]
    width: u32,
    /// Gutter in both directions (defaults to the configured gutters).
    #[arg(long, value_name = "PX")]
    gutter: Option<u32>,
    /// Block sizes as WIDTHxHEIGHT, in display order.
    #[arg(value_name = "WxH", required = true)]
    blocks: Vec<String>,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Only print the config file path.
    #[arg(long)]
    path: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Failure reported by the library.
    #[error(transparent)]
    Dash(#[from] DashError),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Dash(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Replay(args) => run_replay(cli, args),
        Command::Layout(args) => run_layout(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── replay ────────────────────

fn run_replay(cli: &Cli, args: &ReplayArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let frames = load_frames(&args.frames)?;

    let storage: Box<dyn DurableStore> = if !config.storage.enabled {
        Box::new(UnavailableStore)
    } else if args.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        let path = args.storage.as_ref().unwrap_or(&config.storage.file);
        let (store, outcome) = JsonFileStore::open(path.clone(), config.storage.flush_debounce());
        if let LoadOutcome::Corrupt { details } | LoadOutcome::IoError { details } = &outcome {
            eprintln!(
                "dashpanel: {} {}: {details}",
                "ignoring unreadable storage".yellow(),
                path.display()
            );
        }
        Box::new(store)
    };

    let mut store = DashboardStore::from_config(&config, RecordingTransport::default(), storage);
    if !args.ephemeral {
        let path = args.journal.as_ref().unwrap_or(&config.paths.journal);
        store = store.with_journal(JsonlWriter::open(JournalConfig::at(path)));
    }

    let step = Duration::from_millis(args.step_ms);
    let mut now = Instant::now();
    for frame in &frames {
        store.handle_frame(frame, now);
        now += step;
        store.tick(now);
    }
    store.teardown(now);

    let state = store.state();
    let sent = &store.transport().sent;
    match output_mode(cli) {
        OutputMode::Human => {
            print_state_summary(&state, frames.len(), store.route());
            if !sent.is_empty() {
                println!("{} {}", "emitted:".bold(), sent.len());
                for frame in sent {
                    println!("  {} {}", frame.event.cyan(), frame.payload);
                }
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "replay",
                "frames": frames.len(),
                "route": store.route(),
                "state": serde_json::to_value(&*state)?,
                "emitted": serde_json::to_value(sent)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn print_state_summary(state: &DashboardState, frames: usize, route: &str) {
    let connection = state.connection.label();
    let connection = if state.is_loading() {
        connection.yellow()
    } else {
        connection.green()
    };
    println!("{} {frames}", "frames:".bold());
    println!("{} {connection}", "connection:".bold());
    if !state.socket_id.is_empty() {
        println!("{} {}", "session:".bold(), state.socket_id);
    }
    println!("{} {}", "replay done:".bold(), state.replay_done);
    println!("{} {}", "tabs:".bold(), state.menu.len());
    for (index, tab) in state.menu.iter().enumerate() {
        let marker = if state.selected_tab_index == Some(index) {
            "*"
        } else {
            " "
        };
        let mut flags = Vec::new();
        if tab.hidden {
            flags.push("hidden");
        }
        if tab.disabled {
            flags.push("disabled");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", ")).dimmed().to_string()
        };
        println!(
            " {marker} {index}: {} ({} groups){flags}",
            tab.display_name(),
            tab.items.len()
        );
    }
    if !route.is_empty() {
        println!("{} {route}", "route:".bold());
    }
    println!("{} {}", "toasts:".bold(), state.toasts.len());
    for toast in &state.toasts {
        println!(
            "  {} [{:?}] {}",
            toast.id,
            toast.level,
            toast.message.as_deref().unwrap_or("")
        );
    }
}

// ──────────────────── layout ────────────────────

fn parse_block(raw: &str) -> Result<BlockSize, CliError> {
    let invalid = || CliError::User(format!("invalid block size {raw:?} (expected WIDTHxHEIGHT)"));
    let (w, h) = raw.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width = w.trim().parse().map_err(|_| invalid())?;
    let height = h.trim().parse().map_err(|_| invalid())?;
    Ok(BlockSize::new(width, height))
}

fn run_layout(cli: &Cli, args: &LayoutArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let blocks = args
        .blocks
        .iter()
        .map(|raw| parse_block(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let mut options = PackOptions::from_config(&config.layout, args.width);
    if let Some(gutter) = args.gutter {
        options.gutter_x = gutter;
        options.gutter_y = gutter;
    }
    let result = pack(&blocks, &options);

    match output_mode(cli) {
        OutputMode::Human => print_layout(&result, &options),
        OutputMode::Json => {
            let payload = json!({
                "command": "layout",
                "container_width": options.container_width,
                "result": serde_json::to_value(&result)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn print_layout(result: &PackResult, options: &PackOptions) {
    println!(
        "{} {}px wide, {}px tall (offset {}px)",
        "container:".bold(),
        options.container_width,
        result.container_height,
        result.offset_x
    );
    for p in &result.placements {
        println!("  #{:<3} {:>5},{:<5} {}x{}", p.index, p.x, p.y, p.width, p.height);
    }
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    if args.path {
        let path = cli.config.clone().unwrap_or_else(Config::default_path);
        let exists = path.exists();
        match output_mode(cli) {
            OutputMode::Human => {
                println!("{}", path.display());
                if !exists {
                    println!("  (file does not exist; defaults will be used)");
                }
            }
            OutputMode::Json => {
                let payload = json!({
                    "command": "config path",
                    "path": path.to_string_lossy(),
                    "exists": exists,
                });
                write_json_line(&payload)?;
            }
        }
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let hash = config.stable_hash()?;
    match output_mode(cli) {
        OutputMode::Human => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| CliError::User(format!("render config: {e}")))?;
            print!("{rendered}");
            println!("\n# hash: {hash}");
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "config show",
                "hash": hash,
                "config": serde_json::to_value(&config)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("DASHPANEL_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
