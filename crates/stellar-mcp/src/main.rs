//! Stellar MCP Server
//!
//! Speaks MCP over stdio. Configuration comes from the environment, after
//! loading an optional `.env` file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stellar_mcp::McpServer;
use stellar_mcp_core::Config;

/// Stellar MCP Server - Stellar accounts and Soroban calls for AI agents
#[derive(Parser, Debug)]
#[command(name = "stellar-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Transport mechanism to use
    #[arg(short, long, value_enum, default_value = "stdio")]
    transport: Transport,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Environment file to load instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    /// Standard input/output (for Claude Desktop, VS Code, etc.)
    Stdio,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Before logging so RUST_LOG can come from the env file
    let env_loaded = match &args.env_file {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
            true
        }
        None => dotenv::dotenv().is_ok(),
    };

    // stdout is reserved for MCP messages
    let level = Level::from(args.log_level);
    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(level).into())
                .from_env_lossy(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();

    info!("Stellar MCP Server v{} starting", env!("CARGO_PKG_VERSION"));
    if !env_loaded {
        info!("No .env file found, using process environment");
    }

    let config = Config::from_env();
    info!(
        network = %config.network_passphrase,
        rpc = config.rpc_url.as_deref().unwrap_or("<unset>"),
        wallet_wasm_hash = config.wallet_wasm_hash.as_deref().unwrap_or("<unset>"),
        "Configuration loaded"
    );
    if config.rpc_url.is_none() {
        warn!("RPC_URL not set, sign-and-submit-transaction will fail");
    }
    if config.launchtube.is_none() {
        warn!("LAUNCHTUBE_URL or LAUNCHTUBE_JWT not set, transactions cannot be submitted");
    }

    let server = McpServer::new(Arc::new(config));
    match args.transport {
        Transport::Stdio => server.run_stdio().await.context("stdio transport failed")?,
    }

    Ok(())
}
