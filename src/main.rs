mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use soot_core::SootConfig;

#[derive(Parser)]
#[command(name = "soot")]
#[command(about = "Run and maintain a Soot household server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Do not apply pending migrations on startup
        #[arg(long)]
        no_migrate: bool,
    },
    /// Apply database migrations
    Migrate {
        /// Stop after this version (e.g. "0001")
        #[arg(long)]
        to: Option<String>,

        /// Only list migrations and whether they are applied
        #[arg(long, conflicts_with = "to")]
        status: bool,
    },
    /// Find houses where a user is a member more than once
    DedupeMembers {
        /// Delete the duplicate rows instead of only listing them
        #[arg(long)]
        apply: bool,
    },
    /// Issue an API session for a user, creating the user if needed
    Session {
        email: String,

        /// Display name for a new user
        #[arg(long)]
        name: Option<String>,
    },
    /// Show configuration paths and effective settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config => commands::config::run(),
        Commands::Serve { no_migrate } => soot_server::serve(load_config()?, !no_migrate).await,
        Commands::Migrate { to, status } => {
            commands::migrate::run(&load_config()?, to.as_deref(), status).await
        }
        Commands::DedupeMembers { apply } => commands::dedupe_members::run(&load_config()?, apply).await,
        Commands::Session { email, name } => {
            commands::session::run(&load_config()?, &email, name.as_deref()).await
        }
    }
}

/// Load the configuration and install logging according to it.
fn load_config() -> Result<SootConfig> {
    let config = SootConfig::load()?;
    soot_server::logging::init(config.log_json);
    Ok(config)
}
