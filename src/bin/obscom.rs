use bttk_mcp::cli::{self, AppError};
use bttk_mcp::config::Config;
use bttk_mcp::obsidian::ObsidianClient;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line companion for the Obsidian Local REST API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct ApplicationArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Work with Obsidian commands
    Command {
        #[command(subcommand)]
        action: CommandAction,
    },
}

#[derive(Subcommand, Debug)]
enum CommandAction {
    /// Print the name and id of every available command
    List {
        /// Path to the JSON configuration file
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = ApplicationArgs::parse();

    cli::init_logging()?;

    match args.command {
        Command::Command {
            action: CommandAction::List { config },
        } => {
            let config = Config::load(Some(&config))?;
            let client = ObsidianClient::from_config(&config.obsidian)?;
            let commands = client.commands().list().await?;

            println!("{:<30} {}", "NAME", "ID");
            println!("{:<30} {}", "----", "--");
            for command in commands {
                println!("{:<30} {}", command.name, command.id);
            }
        }
    }

    Ok(())
}
