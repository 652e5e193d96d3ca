//! `tradeflow` command-line host.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;

use tradeflow_app::{AppConfig, AppState, ConsolePrompter};
use tradeflow_core::Locale;
use tradeflow_search::{DispatchOutcome, FilterValue, SearchInput, ToolRegistry};

/// Multi-modal product search and FX feed health from the terminal.
#[derive(Parser)]
#[command(name = "tradeflow", version, about)]
struct Cli {
    /// Search service base URL (overrides TRADEFLOW_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Locale tag such as `en-US` or `de_DE` (overrides TRADEFLOW_LOCALE).
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Grant camera/microphone access without prompting.
    #[arg(short, long, global = true)]
    yes: bool,

    /// Emit JSON logs instead of compact text.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the search tools and the permissions they need.
    Tools,

    /// Run one search.
    Search {
        /// Tool id, e.g. `quick_search` or `barcode_scan`.
        tool: String,

        /// Query text (scan tools: the decoded code, if any).
        #[arg(default_value = "")]
        query: String,

        /// Image file for image_read / qr_scan / barcode_scan.
        #[arg(long, conflicts_with = "audio")]
        image: Option<PathBuf>,

        /// Audio file for voice_input.
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Filter as `name=value`; repeatable.
        #[arg(long = "filter", value_name = "NAME=VALUE")]
        filters: Vec<String>,
    },

    /// Print the FX feed health report.
    Health {
        /// Seconds to wait for the first telemetry poll.
        #[arg(long, default_value_t = 2)]
        wait: u64,
    },

    /// Ask the service what a query is about.
    Intent { query: String },

    /// Show the stored search preferences.
    Prefs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        tradeflow_observability::init();
    } else {
        tradeflow_observability::init_pretty();
    }

    let config = load_config(&cli)?;

    if let Command::Tools = cli.command {
        return list_tools();
    }

    let prompter = if cli.yes {
        ConsolePrompter::assume_yes()
    } else {
        ConsolePrompter::new()
    };
    let state = AppState::start(config, Arc::new(prompter)).context("failed to start")?;

    let result = run(&state, cli.command).await;
    state.shutdown().await;
    result
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::from_env().context("invalid environment configuration")?;

    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url)?;
    }
    if let Some(tag) = &cli.locale {
        let locale = Locale::from_tag(tag).with_context(|| format!("--locale {tag:?}"))?;
        config.locale_override = Some(locale);
    }
    if let Some(secs) = cli.timeout {
        if secs == 0 {
            bail!("--timeout must be at least 1 second");
        }
        config.request_timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

async fn run(state: &AppState, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Tools => list_tools(),
        Command::Search {
            tool,
            query,
            image,
            audio,
            filters,
        } => {
            let mut input = SearchInput::text(query);
            for raw in &filters {
                let (name, value) = parse_filter(raw)?;
                input = input.with_filter(name, value);
            }
            if let Some(path) = image {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read image {}", path.display()))?;
                input = input.with_image(bytes);
            }
            if let Some(path) = audio {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read audio {}", path.display()))?;
                input = input.with_audio(bytes);
            }
            search(state, &tool, input).await
        }
        Command::Health { wait } => {
            let mut updates = state.health_updates();
            // The first poll fires immediately; give it a moment to land.
            let _ = tokio::time::timeout(Duration::from_secs(wait), updates.changed()).await;
            print_json(&state.health())
        }
        Command::Intent { query } => {
            let locale = state.locale();
            let analysis = state
                .api
                .analyze_intent(&query, &locale)
                .await
                .context("intent analysis failed")?;
            print_json(&analysis)
        }
        Command::Prefs => {
            let prefs = state
                .api
                .user_preferences()
                .await
                .context("failed to load preferences")?;
            print_json(&prefs)
        }
    }
}

async fn search(state: &AppState, tool: &str, input: SearchInput) -> anyhow::Result<()> {
    let screen = state.open_screen();
    let outcome = screen.execute(tool, input).await;
    print_json(&screen.view())?;
    screen.close();

    match outcome {
        DispatchOutcome::Completed(_) => Ok(()),
        DispatchOutcome::PermissionRequired(tool) => {
            bail!("{tool} needs device access; rerun and allow it, or pass --yes")
        }
        DispatchOutcome::Failed(e) | DispatchOutcome::Rejected(e) => Err(e.into()),
        DispatchOutcome::Superseded | DispatchOutcome::Cancelled => bail!("search was cancelled"),
    }
}

#[derive(Serialize)]
struct ToolRow {
    id: &'static str,
    label: &'static str,
    icon: &'static str,
    camera: bool,
    microphone: bool,
}

fn list_tools() -> anyhow::Result<()> {
    let rows: Vec<ToolRow> = ToolRegistry::builtin()
        .list()
        .iter()
        .map(|t| ToolRow {
            id: t.id.as_str(),
            label: t.label,
            icon: t.icon,
            camera: t.requires_camera,
            microphone: t.requires_microphone,
        })
        .collect();
    print_json(&rows)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `name=value`; the value is read as a bool, then an integer, then a float, then text.
fn parse_filter(raw: &str) -> anyhow::Result<(String, FilterValue)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("filter {raw:?} must look like name=value");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("filter {raw:?} has an empty name");
    }

    let value = value.trim();
    let value = if let Ok(b) = value.parse::<bool>() {
        FilterValue::from(b)
    } else if let Ok(i) = value.parse::<i64>() {
        FilterValue::from(i)
    } else if let Ok(f) = value.parse::<f64>() {
        FilterValue::from(f)
    } else {
        FilterValue::from(value)
    };
    Ok((name.to_string(), value))
}
