use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use daily_report::config::{CONFIG_FILE_NAME, ReportToml};

mod cmd;

#[derive(Parser)]
#[command(name = "daily-report")]
#[command(version, about = "Slack daily machine-report form service")]
pub struct Cli {
    /// Path to report.toml
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the webhook server
    Serve {
        /// Port to listen on (overrides [server].port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind (overrides [server].host)
        #[arg(long)]
        host: Option<String>,
    },
    /// Print the modal JSON that would be opened for a factory
    Preview {
        /// Factory whose machine list populates the form
        #[arg(short, long)]
        factory: Option<String>,

        /// Read reference lists from a JSON file instead of the data service
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default report.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { port, host } => {
            let config = ReportToml::load_or_default(&cli.config)?;
            daily_report::telemetry::init(config.logging.format, &config.log_filter());
            cmd::cmd_serve(config, host.clone(), *port).await?;
        }
        Commands::Preview { factory, catalog } => {
            let config = ReportToml::load_or_default(&cli.config)?;
            cmd::cmd_preview(&config, factory.as_deref(), catalog.as_deref()).await?;
        }
        Commands::Config { command } => cmd::cmd_config(&cli.config, command.clone())?,
    }

    Ok(())
}
