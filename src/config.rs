//! Configuration for the daily-report service.
//!
//! Settings are layered: `report.toml` → environment → CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//!
//! [slack]
//! api_base = "https://slack.com/api"
//! timeout_ms = 2500
//!
//! [data_service]
//! url = "https://script.google.com/macros/s/.../exec"
//! timeout_ms = 2500
//!
//! [form]
//! factories = ["1a_machine", "1b_machine", "d2_machine"]
//! default_factory = "1a_machine"
//!
//! [catalog]
//! load_budget_ms = 2000
//!
//! [logging]
//! format = "json"
//! filter = "info,daily_report=debug"
//! ```
//!
//! Secrets never live in the file: `SLACK_BOT_TOKEN` is read from the
//! environment (or a `.env` file), and `DATA_SERVICE_URL` overrides
//! `[data_service].url`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use report_common::FactoryId;

pub const CONFIG_FILE_NAME: &str = "report.toml";

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Chat platform API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackSection {
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,
    /// Per-request timeout for `views.*` calls
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_timeout_ms() -> u64 {
    2500
}

impl Default for SlackSection {
    fn default() -> Self {
        Self {
            api_base: default_slack_api_base(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Spreadsheet data service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataServiceSection {
    /// Web app endpoint; `DATA_SERVICE_URL` takes precedence
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DataServiceSection {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Form shape settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSection {
    /// Factories whose machine sheets are loaded into the catalog
    #[serde(default = "default_factories")]
    pub factories: Vec<String>,
    /// Factory used when an event carries none
    #[serde(default = "default_factory")]
    pub default_factory: String,
}

fn default_factories() -> Vec<String> {
    vec![
        "1a_machine".to_string(),
        "1b_machine".to_string(),
        "d2_machine".to_string(),
    ]
}

fn default_factory() -> String {
    "1a_machine".to_string()
}

impl Default for FormSection {
    fn default() -> Self {
        Self {
            factories: default_factories(),
            default_factory: default_factory(),
        }
    }
}

/// Catalog cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSection {
    /// Longest a webhook waits on a catalog load before rendering degraded
    #[serde(default = "default_load_budget_ms")]
    pub load_budget_ms: u64,
}

fn default_load_budget_ms() -> u64 {
    2000
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            load_budget_ms: default_load_budget_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub format: LogFormat,
    /// `tracing` env-filter directive; `REPORT_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
        }
    }
}

/// Contents of `report.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub slack: SlackSection,
    #[serde(default)]
    pub data_service: DataServiceSection,
    #[serde(default)]
    pub form: FormSection,
    #[serde(default)]
    pub catalog: CatalogSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl ReportToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse report.toml")
    }

    /// Load `path` if it exists, otherwise the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize report.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Data service URL, with `DATA_SERVICE_URL` overriding the file.
    pub fn data_service_url(&self) -> Option<String> {
        std::env::var("DATA_SERVICE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.data_service.url.clone())
    }

    /// Log filter, with `REPORT_LOG` overriding the file.
    pub fn log_filter(&self) -> String {
        std::env::var("REPORT_LOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.logging.filter.clone())
    }

    pub fn default_factory(&self) -> FactoryId {
        FactoryId::new(self.form.default_factory.clone())
    }

    pub fn factories(&self) -> Vec<FactoryId> {
        self.form.factories.iter().cloned().map(FactoryId::from).collect()
    }

    pub fn slack_timeout(&self) -> Duration {
        Duration::from_millis(self.slack.timeout_ms)
    }

    pub fn data_service_timeout(&self) -> Duration {
        Duration::from_millis(self.data_service.timeout_ms)
    }

    pub fn catalog_load_budget(&self) -> Duration {
        Duration::from_millis(self.catalog.load_budget_ms)
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.form.factories.is_empty() {
            warnings.push("[form].factories is empty: no machine lists will be loaded".to_string());
        }
        if !self.form.factories.contains(&self.form.default_factory) {
            warnings.push(format!(
                "default_factory '{}' is not listed in [form].factories",
                self.form.default_factory
            ));
        }
        if self.data_service.url.is_none() {
            warnings.push(
                "[data_service].url is not set: DATA_SERVICE_URL must be provided at runtime"
                    .to_string(),
            );
        }
        if self.slack.timeout_ms == 0 || self.data_service.timeout_ms == 0 {
            warnings.push("timeout_ms of 0 disables outbound calls entirely".to_string());
        }
        // Slack abandons interactive requests after three seconds.
        if self.catalog.load_budget_ms >= 3000 {
            warnings.push(format!(
                "load_budget_ms = {} exceeds the platform's 3s response window",
                self.catalog.load_budget_ms
            ));
        }

        warnings
    }
}
