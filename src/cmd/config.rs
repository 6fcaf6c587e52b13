//! Configuration view and validation commands: `daily-report config`.

use std::path::Path;

use anyhow::{Result, bail};

use daily_report::config::ReportToml;

use super::super::ConfigCommands;

pub fn cmd_config(config_path: &Path, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Daily Report Configuration");
            println!("==========================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No config file at {} (using defaults)", config_path.display());
            }
            println!();

            let toml = ReportToml::load_or_default(config_path)?;

            println!("[server]");
            println!("  host = \"{}\"", toml.server.host);
            println!("  port = {}", toml.server.port);
            println!();

            println!("[slack]");
            println!("  api_base = \"{}\"", toml.slack.api_base);
            println!("  timeout_ms = {}", toml.slack.timeout_ms);
            let token_state = match std::env::var("SLACK_BOT_TOKEN") {
                Ok(t) if !t.trim().is_empty() => "set",
                _ => "missing",
            };
            println!("  SLACK_BOT_TOKEN: {}", token_state);
            println!();

            println!("[data_service]");
            match toml.data_service_url() {
                Some(url) => println!("  url = \"{}\"", url),
                None => println!("  url = (unset)"),
            }
            println!("  timeout_ms = {}", toml.data_service.timeout_ms);
            println!();

            println!("[form]");
            println!("  factories = {:?}", toml.form.factories);
            println!("  default_factory = \"{}\"", toml.form.default_factory);
            println!();

            println!("[catalog]");
            println!("  load_budget_ms = {}", toml.catalog.load_budget_ms);
            println!();

            println!("[logging]");
            println!("  format = \"{}\"", toml.logging.format);
            println!("  filter = \"{}\"", toml.log_filter());
        }
        Some(ConfigCommands::Validate) => {
            if !config_path.exists() {
                println!("No config file at {}", config_path.display());
                println!("Run 'daily-report config init' to create one.");
                return Ok(());
            }

            let toml = ReportToml::load(config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                bail!("Config file already exists: {}", config_path.display());
            }

            ReportToml::default().save(config_path)?;
            println!("Created {}", config_path.display());
        }
    }

    Ok(())
}
