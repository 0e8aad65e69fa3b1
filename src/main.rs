use anyhow::Result;
use clap::{Parser, ValueEnum};
use compliance_mcp::compliance::{ClientSettings, ComplianceClient, OperationPoller, ServiceHandle};
use compliance_mcp::config::Config;
use compliance_mcp::mcp::{McpServer, ToolHandlers};
use compliance_mcp::VERSION;
use std::path::PathBuf;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// MCP server for the Cloud Security Compliance API
#[derive(Parser, Debug)]
#[command(name = "compliance-mcp", version = VERSION, about, long_about = None)]
struct Args {
    /// Compliance API endpoint
    #[arg(long, env = "COMPLIANCE_MCP_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token to use instead of Application Default Credentials
    #[arg(long, env = "COMPLIANCE_MCP_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Seconds between long-running operation polls
    #[arg(long)]
    poll_interval_secs: Option<u64>,

    /// Operation polls before reporting a timeout
    #[arg(long)]
    max_poll_attempts: Option<u32>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// stdout carries the protocol, so logs go to stderr or a file
fn setup_logging(level: LogLevel, log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false);

    let Some(path) = log_file else {
        builder.with_writer(std::io::stderr).init();
        return Ok(None);
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    builder
        .with_writer(non_blocking)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Log file: {:?}", path);
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load();

    let level = args
        .log_level
        .or_else(|| {
            config
                .log_level
                .as_deref()
                .and_then(|l| LogLevel::from_str(l, true).ok())
        })
        .unwrap_or(LogLevel::Info);
    let _log_guard = setup_logging(level, args.log_file.as_ref())?;

    tracing::info!("compliance-mcp {} starting", VERSION);

    let settings = ClientSettings {
        endpoint: args
            .endpoint
            .clone()
            .unwrap_or_else(|| config.effective_endpoint()),
        access_token: args.access_token.clone().or_else(|| config.access_token.clone()),
    };
    let poller = OperationPoller::new(
        args.poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.effective_poll_interval()),
        args.max_poll_attempts
            .unwrap_or_else(|| config.effective_max_poll_attempts()),
    );

    tracing::info!(
        "Endpoint: {}, polling every {:?} up to {} times",
        settings.endpoint,
        poller.interval(),
        poller.max_attempts()
    );

    // A failed client is recorded, not fatal; its tools report ClientUnavailable
    let config_service =
        ServiceHandle::from_init("Config", ComplianceClient::connect(&settings).await);
    let deployment_service =
        ServiceHandle::from_init("Deployment", ComplianceClient::connect(&settings).await);

    let server = McpServer::new(ToolHandlers::new(config_service, deployment_service, poller));
    server.run().await
}
