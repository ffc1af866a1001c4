use bttk_mcp::cli::{self, AppError, ConfigArgs, TransportArgs};
use bttk_mcp::config::Config;
use bttk_mcp::mcp::ObsidianMcp;
use bttk_mcp::obsidian::ObsidianClient;
use clap::Parser;

/// MCP server for the Obsidian Local REST API plugin
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct ApplicationArgs {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = ApplicationArgs::parse();

    cli::init_logging()?;

    let config = Config::load(args.config.config.as_deref())?;
    let client = ObsidianClient::from_config(&config.obsidian)?;
    tracing::info!(url = %client.base_url(), "using Obsidian REST API");

    cli::serve(ObsidianMcp::new(client, &config.mcp), &args.transport).await
}
