use bttk_mcp::cli::{self, AppError, ConfigArgs, TransportArgs};
use bttk_mcp::config::Config;
use bttk_mcp::gmail::{GmailApi, GmailClient};
use bttk_mcp::google;
use bttk_mcp::mcp::GmailMcp;
use clap::{Parser, Subcommand};
use std::sync::Arc;

/// MCP server for read-only Gmail access
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct ApplicationArgs {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    transport: TransportArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate with Gmail and verify api access
    Auth,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = ApplicationArgs::parse();

    cli::init_logging()?;

    let config = Config::load(args.config.config.as_deref())?;
    if !config.gmail.is_enabled() {
        return Err(AppError::service_disabled("gmail"));
    }

    if matches!(args.command, Some(Command::Auth)) {
        println!("Checking Gmail authentication...");
    }

    let api = google::connect(&config.gmail.credentials_file, &config.gmail.token_file).await?;
    let gmail = GmailClient::new(api);

    match args.command {
        Some(Command::Auth) => {
            println!("Authentication successful. Verifying API access...");
            gmail.search_messages("", 1).await.map_err(|err| {
                AppError::unexpected_error(format!(
                    "API verification failed: {}\n(If you have recently changed scopes, try deleting {})",
                    err,
                    config.gmail.token_file.display()
                ))
            })?;
            println!("Gmail authentication and verification completed successfully!");
            Ok(())
        }
        None => cli::serve(GmailMcp::new(Arc::new(gmail), &config.mcp), &args.transport).await,
    }
}
