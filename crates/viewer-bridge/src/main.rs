//! Hacking viewer bridge developer CLI.
//!
//! Runs the URL validator and the messaging bridge headlessly, without a
//! host application or a browser frame.
//!
//! # Usage
//!
//! ```text
//! viewer-bridge [OPTIONS] <COMMAND>
//!
//! Commands:
//!   validate <URL>   Validate a URL against the configured allowlist
//!   settings         Print the effective settings as TOML
//!   replay           Feed newline-delimited inbound events from stdin
//!
//! Options:
//!   --config <PATH>          Settings file [default: viewer-settings.toml]
//!   --handshake-ms <MILLIS>  Handshake delay for `replay --attach` [default: 1000]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable              | Default                | Description            |
//! |-----------------------|------------------------|------------------------|
//! | `VIEWER_CONFIG`       | `viewer-settings.toml` | Settings file path     |
//! | `VIEWER_HANDSHAKE_MS` | `1000`                 | Handshake delay        |
//! | `RUST_LOG`            | settings `log_level`   | Log filter             |
//!
//! # Replay input
//!
//! One JSON object per line, shaped like a host inbound event:
//!
//! ```text
//! {"origin": "https://starfinderencounters.com", "data": {"type": "nodeSelected", "version": 1, "payload": {"nodeId": "n1", "nodeName": "Core"}}}
//! ```
//!
//! For each line the CLI prints what the bridge did. For an accepted message
//! of a known type it then prints the typed event (or the schema error).
//! Last come every broadcast, handler failure and outbound message the line
//! produced.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use viewer_bridge::application::{install_default_handlers, Disposition, MessagingBridge};
use viewer_bridge::domain::BridgeConfig;
use viewer_bridge::infrastructure::{
    trust_policy, ChannelBroadcaster, ChannelSurface, InboundEvent, TomlConfigStore,
    TracingNotifier,
};
use viewer_core::{decode_inbound, validate, AppEvent};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Hacking network viewer bridge.
#[derive(Debug, Parser)]
#[command(
    name = "viewer-bridge",
    about = "Validate viewer URLs and replay bridge traffic headlessly",
    version
)]
struct Cli {
    /// TOML settings file.  A missing file means default settings.
    #[arg(long, default_value = "viewer-settings.toml", env = "VIEWER_CONFIG")]
    config: PathBuf,

    /// Delay before the handshake ping after attaching, in milliseconds.
    #[arg(long, default_value_t = 1000, env = "VIEWER_HANDSHAKE_MS")]
    handshake_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a URL and print the result as JSON.  Exits 1 if it is rejected.
    Validate {
        /// The URL as a user would type it.
        url: String,
    },
    /// Print the effective settings as TOML.
    Settings,
    /// Read inbound events from stdin and feed them to a bridge.
    Replay {
        /// Attach an in-process surface first, so the handshake ping and
        /// any replies from handlers are printed.
        #[arg(long)]
        attach: bool,
    },
}

impl Cli {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            handshake_delay: Duration::from_millis(self.handshake_ms),
            ..BridgeConfig::default()
        }
    }
}

/// One replay input line.
#[derive(Debug, Deserialize)]
struct ReplayLine {
    origin: String,
    data: Value,
}

fn parse_replay_line(line: &str) -> anyhow::Result<InboundEvent> {
    let parsed: ReplayLine =
        serde_json::from_str(line).context("replay line is not {\"origin\", \"data\"} JSON")?;
    Ok(InboundEvent::new(parsed.origin, parsed.data))
}

/// Describes the typed decoding of an accepted inbound message.
///
/// Returns `None` for data without the envelope shape and for
/// application-defined types.
fn describe_event(data: &Value) -> Option<Value> {
    let message = decode_inbound(data).ok()?;
    match AppEvent::decode(&message) {
        Ok(Some(event)) => Some(json!({ "event": event })),
        Ok(None) => None,
        Err(e) => Some(json!({ "payloadError": e.to_string() })),
    }
}

/// Builds the tracing filter: `RUST_LOG`, then the configured level, then `info`.
fn log_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_validate(store: &TomlConfigStore, url: &str) -> anyhow::Result<ExitCode> {
    let result = validate(url, &trust_policy(store));
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(if result.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_settings(store: &TomlConfigStore) -> anyhow::Result<ExitCode> {
    let rendered = toml::to_string_pretty(&store.snapshot()).context("rendering settings")?;
    print!("{rendered}");
    Ok(ExitCode::SUCCESS)
}

async fn run_replay(
    store: Arc<TomlConfigStore>,
    config: BridgeConfig,
    attach: bool,
) -> anyhow::Result<ExitCode> {
    let broadcaster = Arc::new(ChannelBroadcaster::default());
    let mut broadcasts = broadcaster.subscribe();
    let bridge = MessagingBridge::new(config, store, broadcaster);
    let mut failures = bridge.subscribe_failures();
    let _defaults = install_default_handlers(&bridge, Arc::new(TracingNotifier));

    if !bridge.init() {
        info!("bridge is disabled; every event will be ignored");
    }

    let mut outbound = if attach {
        let (surface, rx) = ChannelSurface::new();
        bridge.attach_surface(Some(Arc::new(surface)));
        Some(rx)
    } else {
        None
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let event = match parse_replay_line(&line) {
            Ok(event) => event,
            Err(e) => {
                println!("{}", json!({"error": format!("{e:#}")}));
                continue;
            }
        };

        let disposition = bridge.receive(&event);
        println!("{}", serde_json::to_string(&disposition)?);
        if matches!(
            disposition,
            Disposition::Pong { .. } | Disposition::Dispatched { .. }
        ) {
            if let Some(described) = describe_event(&event.data) {
                println!("{described}");
            }
        }

        while let Ok(published) = broadcasts.try_recv() {
            println!("{}", json!({"broadcast": published}));
        }
        while let Ok(failure) = failures.try_recv() {
            println!("{}", json!({"handlerFailure": failure}));
        }
        if let Some(rx) = outbound.as_mut() {
            while let Ok(message) = rx.try_recv() {
                println!("{}", json!({"sent": message}));
            }
        }
    }

    println!("{}", json!({"connected": bridge.is_connected()}));
    bridge.teardown();
    Ok(ExitCode::SUCCESS)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Settings are read before logging starts because they carry the
    // fallback log level.
    let store = TomlConfigStore::open(&cli.config);
    let level = store
        .as_ref()
        .map(|s| s.snapshot().log_level)
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&level))
        .with_writer(std::io::stderr)
        .init();

    let store = store
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    info!("settings loaded from {}", store.path().display());

    let config = cli.bridge_config();
    match cli.command {
        Command::Validate { url } => run_validate(&store, &url),
        Command::Settings => run_settings(&store),
        Command::Replay { attach } => run_replay(Arc::new(store), config, attach).await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
