use bttk_mcp::calendar::{CalendarApi, CalendarClient};
use bttk_mcp::cli::{self, AppError, ConfigArgs, TransportArgs};
use bttk_mcp::config::Config;
use bttk_mcp::google;
use bttk_mcp::mcp::CalendarMcp;
use clap::{Parser, Subcommand};
use std::sync::Arc;

/// MCP server for Google Calendar
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
    /// List available calendars
    List,

    /// Authenticate with Google Calendar and verify api access
    Auth,
}

/// Missing or broken config falls back to defaults below the working directory.
fn load_config(args: &ConfigArgs) -> Result<Config, AppError> {
    match Config::load(args.config.as_deref()) {
        Ok(config) => Ok(config),
        Err(err) => {
            tracing::warn!(%err, "error loading config, using defaults");
            Ok(Config::default_relative_to(&std::env::current_dir()?)?)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = ApplicationArgs::parse();

    cli::init_logging()?;

    let config = load_config(&args.config)?;
    if !config.calendar.google.is_enabled() {
        return Err(AppError::service_disabled("calendar"));
    }

    if matches!(args.command, Some(Command::Auth)) {
        println!("Checking Calendar authentication...");
    }

    let service = &config.calendar.google;
    let api = google::connect(&service.credentials_file, &service.token_file).await?;
    let calendar = CalendarClient::new(api);

    match args.command {
        Some(Command::List) => {
            let calendars = calendar.list_calendars().await?;

            println!("All Available Calendars:");
            for entry in calendars {
                println!(
                    "- {} (ID: {}) [Primary: {}] [Access: {}]",
                    entry.summary, entry.id, entry.primary, entry.access_role
                );
            }
            Ok(())
        }
        Some(Command::Auth) => {
            println!("Authentication successful. Verifying API access...");
            calendar.list_calendars().await.map_err(|err| {
                AppError::unexpected_error(format!(
                    "API verification failed: {}\n(If you have recently changed scopes, try deleting {})",
                    err,
                    service.token_file.display()
                ))
            })?;
            println!("Calendar authentication and verification completed successfully!");
            Ok(())
        }
        None => {
            let server = CalendarMcp::new(
                Arc::new(calendar),
                config.calendar.calendars.clone(),
                &config.mcp,
            );
            cli::serve(server, &args.transport).await
        }
    }
}
