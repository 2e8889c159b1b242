//! Diagnostic front end for the DPL array adapter.
//!
//! Connects to an array, prints vendor/version metadata and per-pool
//! capacity accounting. Useful for verifying credentials, TLS setup and
//! pool identifiers before wiring the adapter into a control plane.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dpl_array_adapter::{
    ArrayInfo, DplAdapter, DplApi, DplConfig, Result, StandaloneHost,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// DPL Array Adapter - array connectivity and capacity diagnostics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Array management address
    #[arg(long, env = "DPL_ADDRESS")]
    address: String,

    /// Array management port
    #[arg(long, env = "DPL_PORT", default_value = "8357")]
    port: u16,

    /// Management account name
    #[arg(long, env = "DPL_USERNAME", default_value = "admin")]
    username: String,

    /// Management account password
    #[arg(long, env = "DPL_PASSWORD", default_value = "password")]
    password: String,

    /// Verify the array's TLS certificate
    #[arg(long, env = "DPL_CERT_VERIFY")]
    cert_verify: bool,

    /// CA bundle used when certificate verification is enabled
    #[arg(long, env = "DPL_CERT_PATH")]
    cert_path: Option<PathBuf>,

    /// Pool identifiers to report on; all pools when omitted
    #[arg(long, env = "DPL_POOLS", value_delimiter = ',')]
    pools: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting DPL array diagnostics");
    info!("  Version: {}", dpl_array_adapter::VERSION);
    info!("  Array: {}:{}", args.address, args.port);
    info!("  Certificate verification: {}", args.cert_verify);

    let config = DplConfig {
        address: args.address.clone(),
        port: args.port,
        username: args.username.clone(),
        password: args.password.clone(),
        cert_verify: args.cert_verify,
        cert_path: args.cert_path.clone(),
    };

    let api = Arc::new(DplApi::new(config)?);
    let adapter = DplAdapter::new(api, Arc::new(StandaloneHost));

    let info = adapter.server_info().await?;
    info!("Array vendor: {} version: {}", info.vendor, info.version);

    let stats = adapter.pool_stats(&args.pools).await?;
    if stats.is_empty() {
        error!("no pools reported; check pool identifiers and credentials");
    }
    for pool in &stats {
        info!(
            "Pool {}: total {} B, available {} B",
            pool.pool_id, pool.total_capacity_bytes, pool.available_capacity_bytes
        );
    }

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
