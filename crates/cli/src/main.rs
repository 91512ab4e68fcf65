//! `signage` - command-line front end for the signage API client
//!
//! Loads configuration, opens the local store and runs one command against
//! the backend. `watch` keeps the connectivity probe and offline sync worker
//! running until interrupted.

mod context;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use signage_core::RequestReplayer;
use signage_domain::{HttpMethod, Priority, RequestOptions, TokenPair};
use signage_infra::{
    config, ConnectivityProbe, HealthProbe, OfflineSyncWorker, OfflineSyncWorkerConfig,
};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::context::ClientContext;

#[derive(Parser, Debug)]
#[command(name = "signage", version, about = "Signage platform API client")]
struct Cli {
    /// Configuration file (JSON or TOML); falls back to SIGNAGE_* variables
    #[arg(short, long, env = "SIGNAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether the backend answers its health endpoint
    Health,
    /// Show offline queue counts
    Stats,
    /// Replay every queued request once
    Drain,
    /// Fetch a path and print the unwrapped payload
    Get { path: String },
    /// Send a request with an optional JSON body
    Send {
        /// GET, POST, PUT, PATCH or DELETE
        #[arg(value_parser = HttpMethod::parse_verb)]
        method: HttpMethod,
        path: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
        /// Replay tier if the request ends up queued
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Fail instead of queueing when offline
        #[arg(long, default_value_t = false)]
        no_queue: bool,
        /// Treat the network as down so the request is queued
        #[arg(long, default_value_t = false)]
        offline: bool,
    },
    /// Store a token pair for subsequent requests
    Login {
        #[arg(long, env = "SIGNAGE_ACCESS_TOKEN")]
        access_token: String,
        #[arg(long, env = "SIGNAGE_REFRESH_TOKEN")]
        refresh_token: String,
    },
    /// Forget stored tokens and tenant
    Logout,
    /// Select the tenant sent with every request
    Tenant {
        /// Tenant id; omit to clear
        id: Option<String>,
    },
    /// Probe connectivity and replay the queue whenever the backend returns
    Watch {
        /// Seconds between health probes
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG and SIGNAGE_* from it are visible.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded"),
    }

    let config = match cli.config {
        Some(path) => config::load_from_file(Some(path))?,
        None => config::load()?,
    };
    let ctx = ClientContext::new(config)?;

    run(&ctx, cli.command).await
}

const DEFAULT_LOG_FILTER: &str = "signage=info,signage_infra=info,signage_core=info";

/// `RUST_LOG` (process or `.env`) wins over the built-in default.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry().with(log_filter());

    if json {
        registry.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)).init();
    }
}

async fn run(ctx: &ClientContext, command: Command) -> Result<()> {
    match command {
        Command::Health => {
            let healthy = ctx.client.health_check().await;
            let store_ok = ctx.db.health_check().is_ok();
            print_json(&json!({ "healthy": healthy, "store": store_ok }))?;
            if !healthy {
                bail!("backend at {} is not healthy", ctx.config.api.base_url);
            }
        }
        Command::Stats => {
            let stats = ctx.queue.stats().await?;
            print_json(&serde_json::to_value(stats)?)?;
        }
        Command::Drain => {
            let report = ctx.client.drain_offline_queue().await?;
            print_json(&serde_json::to_value(report)?)?;
        }
        Command::Get { path } => {
            let data: Value = ctx.client.get(&path).await?;
            print_json(&data)?;
        }
        Command::Send { method, path, body, priority, no_queue, offline } => {
            let body = body
                .map(|raw| serde_json::from_str::<Value>(&raw))
                .transpose()
                .context("--body must be valid JSON")?;
            if offline {
                ctx.network.set_online(false);
            }
            let options = RequestOptions { priority, skip_offline_queue: no_queue };
            let data: Value = ctx.client.send_with(method, &path, body, None, options).await?;
            print_json(&data)?;
        }
        Command::Login { access_token, refresh_token } => {
            ctx.client.set_tokens(&TokenPair::new(access_token, refresh_token)).await?;
            info!("Tokens stored");
        }
        Command::Logout => {
            ctx.client.clear_session().await?;
            info!("Session cleared");
        }
        Command::Tenant { id } => {
            ctx.client.set_tenant(id.as_deref()).await?;
            print_json(&json!({ "tenant": ctx.client.tenant().await? }))?;
        }
        Command::Watch { interval_secs } => watch(ctx, Duration::from_secs(interval_secs)).await?,
    }
    Ok(())
}

async fn watch(ctx: &ClientContext, interval: Duration) -> Result<()> {
    let mut probe = ConnectivityProbe::new(
        Arc::clone(&ctx.client) as Arc<dyn HealthProbe>,
        ctx.network.clone(),
        interval,
    );
    let mut worker = OfflineSyncWorker::new(
        Arc::clone(&ctx.queue),
        Arc::clone(&ctx.client) as Arc<dyn RequestReplayer>,
        ctx.network.clone(),
        OfflineSyncWorkerConfig::default(),
    );
    probe.start()?;
    worker.start()?;

    let mut events = ctx.events.subscribe();
    info!(interval_secs = interval.as_secs(), "Watching; press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => info!(?event, "Client event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    worker.stop().await?;
    probe.stop().await?;
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
