//! Plumbing shared by the server binaries: errors, logging and transports.
//!
//! ## Transport Features
//!
//! - `stdio` - JSON-RPC over standard input/output
//! - `http` - streamable HTTP server
//!
//! Both are enabled by default.

use crate::config::error::ConfigError;
use crate::google::error::GoogleError;
use crate::obsidian::error::ObsidianError;
use clap::Args;
#[cfg(feature = "http")]
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
    service::TowerToHyperService,
};
use rmcp::ServerHandler;
use rmcp::service::{QuitReason, ServerInitializeError};
#[cfg(feature = "stdio")]
use rmcp::ServiceExt;
#[cfg(feature = "stdio")]
use rmcp::transport::stdio;
#[cfg(feature = "http")]
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Registry, fmt};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Obsidian client could not be built or a call failed
    #[error(transparent)]
    Obsidian(#[from] ObsidianError),

    /// Google authorization or api failure
    #[error(transparent)]
    Google(#[from] GoogleError),

    /// Service switched off in the configuration
    #[error("{service} is disabled in the configuration")]
    ServiceDisabled { service: &'static str },

    /// Argument Error
    #[error("{reason}")]
    ArgumentError { reason: String },

    /// UnexpectedError
    #[error("{reason}")]
    UnexpectedError { reason: String },
}

impl From<TryInitError> for AppError {
    fn from(err: TryInitError) -> Self {
        AppError::unexpected_error(err.to_string())
    }
}

impl From<ServerInitializeError> for AppError {
    fn from(err: ServerInitializeError) -> Self {
        AppError::unexpected_error(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::unexpected_error(err.to_string())
    }
}

impl AppError {
    pub fn argument_error(reason: impl Into<String>) -> Self {
        AppError::ArgumentError {
            reason: reason.into(),
        }
    }

    pub fn unexpected_error(reason: impl Into<String>) -> Self {
        AppError::UnexpectedError {
            reason: reason.into(),
        }
    }

    pub fn service_disabled(service: &'static str) -> Self {
        AppError::ServiceDisabled { service }
    }
}

/// `--config`, falling back to the environment and then the XDG search.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "BTTK_MCP_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// MCP Transport mode (stdio, http)
    #[arg(short, long, default_value = "stdio", env = "MCP_TRANSPORT_MODE")]
    pub transport: String,

    /// MCP HTTP server port (for http transport)
    #[arg(long, default_value = "3000", env = "MCP_HTTP_TRANSPORT_PORT")]
    pub port: u16,
}

/// Log to stderr, stdout belongs to the JSON-RPC stream. `RUST_LOG`
/// overrides the default `info` level.
pub fn init_logging() -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()?;

    Ok(())
}

/// Serve `handler` on the transport selected by `args`.
pub async fn serve<S>(handler: S, args: &TransportArgs) -> Result<(), AppError>
where
    S: ServerHandler + Clone,
{
    match args.transport.as_str() {
        #[cfg(feature = "stdio")]
        "stdio" => {
            start_stdio_server(handler).await?;
        }
        #[cfg(feature = "http")]
        "http" => {
            start_http_server(handler, args.port).await?;
        }
        transport => {
            return Err(transport_arg_error(transport));
        }
    }

    Ok(())
}

#[cfg(feature = "stdio")]
async fn start_stdio_server<S>(handler: S) -> Result<QuitReason, AppError>
where
    S: ServerHandler,
{
    tracing::info!("Starting MCP server in STDIO mode. Use Ctrl+C to exit.");
    let service = handler
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("serving error: {:?}", e))?;

    service
        .waiting()
        .await
        .map_err(|e| AppError::unexpected_error(e.to_string()))
}

#[cfg(feature = "http")]
async fn start_http_server<S>(handler: S, port: u16) -> Result<QuitReason, AppError>
where
    S: ServerHandler + Clone,
{
    let addr = format!("0.0.0.0:{}", port);
    tracing::info!(%addr, "Starting MCP server in HTTP mode. Use Ctrl+C to exit.");

    let service = TowerToHyperService::new(StreamableHttpService::new(
        move || Ok(handler.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    ));

    let listener = tokio::net::TcpListener::bind(addr).await?;

    loop {
        let io = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            accept = listener.accept() => {
                TokioIo::new(accept?.0)
            }
        };

        let service = service.clone();
        tokio::spawn(async move {
            if let Err(err) = Builder::new(TokioExecutor::default())
                .serve_connection(io, service)
                .await
            {
                tracing::debug!(%err, "connection closed with error");
            }
        });
    }

    Ok(QuitReason::Cancelled)
}

fn transport_arg_error(transport: &str) -> AppError {
    #[cfg(not(feature = "stdio"))]
    if transport == "stdio" {
        return AppError::argument_error("STDIO transport not enabled. Rebuild with --features stdio");
    }

    #[cfg(not(feature = "http"))]
    if transport == "http" {
        return AppError::argument_error("HTTP transport not enabled. Rebuild with --features http");
    }

    let mut enabled_transports = Vec::new();

    if cfg!(feature = "stdio") {
        enabled_transports.push("stdio");
    }

    if cfg!(feature = "http") {
        enabled_transports.push("http");
    }

    AppError::argument_error(format!(
        "Unknown transport '{}'. Valid options: {}",
        transport,
        enabled_transports.join(","),
    ))
}
