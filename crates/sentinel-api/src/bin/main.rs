//! Platform sentinel entry point
//!
//! Serves the health-check endpoint or runs a single invocation from the
//! terminal.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sentinel_api::handler::{create_router, AppState};
use sentinel_api::output::{self, OutputFormat};
use sentinel_core::{RunOptions, SentinelConfig, SentinelEngine};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Platform sentinel - health checks and self-healing for the compliance platform")]
#[command(version)]
struct Cli {
    /// Path to the sentinel configuration (YAML, TOML or JSON)
    #[arg(short, long, global = true, env = "SENTINEL_CONFIG", default_value = "sentinel.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8090", env = "PORT")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },

    /// Run one health check invocation and print the report
    Run {
        /// Probe only, skip every remediation action
        #[arg(long)]
        no_heal: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Load and validate the configuration file
    ValidateConfig,
}

fn load_config(path: &PathBuf) -> anyhow::Result<SentinelConfig> {
    SentinelConfig::from_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => {
            let config = load_config(&cli.config)?;
            let engine = SentinelEngine::new(config)?;
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

            tracing::info!(
                addr = %addr,
                probes = engine.probe_count(),
                version = env!("CARGO_PKG_VERSION"),
                "Starting platform sentinel"
            );

            let router = create_router(Arc::new(AppState::new(engine)));
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router).await?;
        }

        Commands::Run { no_heal, format } => {
            let config = load_config(&cli.config)?;
            let engine = SentinelEngine::new(config)?;
            let report = engine
                .run(RunOptions {
                    self_healing: !no_heal,
                })
                .await;

            output::render(&report, format)?;
            engine.shutdown().await;

            if report.is_degraded() {
                std::process::exit(1);
            }
        }

        Commands::ValidateConfig => {
            let config = load_config(&cli.config)?;
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "pages": config.pages.len(),
                    "functions": config.functions.len(),
                    "refreshOperations": config.remediation.stale_data.operations.len(),
                    "redeployHook": config.remediation.page_failure.hook_url.is_some(),
                    "fingerprint": config.fingerprint(),
                })
            );
        }
    }

    Ok(())
}
