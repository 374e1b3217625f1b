//! G4 Plugin Host
//!
//! Loads plugin bundles, manages their enabled state and feeds them events
//! from stdin.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Interval;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use g4::{HostConfig, JsonFileStore, PluginRegistry, CONFIG_FILE};

const DEFAULT_LOG_FILTER: &str = "g4=info,g4_js_runtime=info";

/// G4 Plugin Host
#[derive(Parser, Debug)]
#[command(name = "g4")]
#[command(about = "Sandboxed JavaScript plugin host", long_about = None)]
struct Args {
    /// Path to the host configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Plugin bundle directory (overrides the config file)
    #[arg(short, long)]
    plugins: Option<PathBuf>,

    /// Enabled-state file (overrides the config file)
    #[arg(long)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List plugins and their state
    List {
        /// Print snapshots as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a plugin and keep it enabled
    Enable { id: String },
    /// Stop a plugin and keep it disabled
    Disable { id: String },
    /// Stop a plugin and remove its bundle
    Delete { id: String },
    /// Print a plugin's debug messages
    Console { id: String },
    /// Run enabled plugins, dispatching events read from stdin
    Run {
        /// Dispatch a `tick` event at this period
        #[arg(long)]
        tick_ms: Option<u64>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = HostConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(plugins) = args.plugins {
        config.plugins_dir = plugins;
    }
    if let Some(state) = args.state {
        config.state_file = state;
    }

    // Initialize tracing
    let default_filter = config.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = JsonFileStore::new(&config.state_file);
    let mut registry = PluginRegistry::new(&config.plugins_dir, Box::new(store))
        .with_manifest_file(config.manifest_file.clone());
    registry
        .load_all()
        .with_context(|| format!("Failed to load plugins from {}", config.plugins_dir.display()))?;

    match args.command {
        Command::List { json } => print_list(&registry, json)?,
        Command::Enable { id } => {
            registry.set_running(&id)?;
            println!("{id}: running");
        }
        Command::Disable { id } => {
            registry.set_stopped(&id)?;
            println!("{id}: stopped");
        }
        Command::Delete { id } => {
            registry.delete(&id)?;
            println!("{id}: deleted");
        }
        Command::Console { id } => print_console(&registry, &id)?,
        Command::Run { tick_ms } => {
            let period = tick_ms.or(config.tick_interval_ms).map(Duration::from_millis);

            // Sandboxes are !Send, so the event loop stays on this thread.
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to build tokio runtime")?
                .block_on(run_loop(&mut registry, period))?;
        }
    }

    registry.shutdown();
    Ok(())
}

fn print_list(registry: &PluginRegistry, json: bool) -> Result<()> {
    let snapshot = registry.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("No plugins in {}", registry.bundle_root().display());
    }
    for plugin in snapshot {
        println!(
            "{:<20} {:<8} {} v{} by {} ({} handlers)",
            plugin.id, plugin.run_state, plugin.name, plugin.version, plugin.author, plugin.handler_count
        );
    }
    Ok(())
}

fn print_console(registry: &PluginRegistry, id: &str) -> Result<()> {
    let plugin = registry
        .get(id)
        .ok_or_else(|| g4::PluginError::PluginNotFound(id.to_string()))?;

    for message in plugin.debug_messages() {
        println!(
            "{} [{}] {}",
            message.timestamp.format("%H:%M:%S%.3f"),
            message.severity,
            message.text
        );
    }
    Ok(())
}

/// One line of `run` input.
#[derive(Debug, PartialEq)]
enum Input {
    Blank,
    Reload,
    Event {
        event_type: String,
        payload: serde_json::Value,
    },
}

fn parse_line(line: &str) -> Result<Input, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Blank);
    }
    if line == "reload" {
        return Ok(Input::Reload);
    }

    let (event_type, rest) = match line.split_once(char::is_whitespace) {
        Some((event_type, rest)) => (event_type, rest.trim()),
        None => (line, ""),
    };
    let payload = if rest.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(rest)?
    };

    Ok(Input::Event {
        event_type: event_type.to_string(),
        payload,
    })
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn run_loop(registry: &mut PluginRegistry, tick_period: Option<Duration>) -> Result<()> {
    info!("Running {} plugins, reading events from stdin", registry.len());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tick_period.map(tokio::time::interval);
    let mut ticks: u64 = 0;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("End of input, shutting down...");
                    break;
                };

                match parse_line(&line) {
                    Ok(Input::Blank) => {}
                    Ok(Input::Reload) => {
                        registry.reload()?;
                    }
                    Ok(Input::Event { event_type, payload }) => {
                        let report = registry.dispatch(&event_type, &payload);
                        info!(
                            event_type = %event_type,
                            invoked = report.invoked,
                            failed = report.failed,
                            "Dispatched to {} plugins",
                            report.plugins
                        );
                    }
                    Err(e) => warn!("Ignoring line with invalid JSON payload: {}", e),
                }
            }
            _ = next_tick(&mut ticker) => {
                ticks += 1;
                registry.dispatch("tick", &serde_json::json!({ "count": ticks }));
            }
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    Ok(())
}
