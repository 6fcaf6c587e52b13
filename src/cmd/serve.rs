//! Webhook server command: `daily-report serve`.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use daily_report::api::AppState;
use daily_report::catalog::CatalogCache;
use daily_report::config::ReportToml;
use daily_report::data::HttpDataService;
use daily_report::dispatch::Dispatcher;
use daily_report::server::{ServerConfig, start_server};
use daily_report::slack::SlackClient;

pub async fn cmd_serve(config: ReportToml, host: Option<String>, port: Option<u16>) -> Result<()> {
    for warning in config.validate() {
        warn!(%warning, "configuration warning");
    }

    let Some(url) = config.data_service_url() else {
        bail!("No data service configured: set DATA_SERVICE_URL or [data_service].url");
    };
    let token = std::env::var("SLACK_BOT_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .context("SLACK_BOT_TOKEN is not set")?;

    let data = Arc::new(HttpDataService::new(url, config.data_service_timeout())?);
    let platform = Arc::new(SlackClient::new(
        config.slack.api_base.clone(),
        token,
        config.slack_timeout(),
    )?);

    let catalog = Arc::new(CatalogCache::new(
        data.clone(),
        config.factories(),
        config.catalog_load_budget(),
    ));

    // Warm the cache so the first webhook does not pay for the load.
    let warm = catalog.clone();
    tokio::spawn(async move {
        let snapshot = warm.get_or_load().await;
        info!(
            reporters = snapshot.reporters.len(),
            factories = snapshot.machines_by_factory.len(),
            "catalog warmed"
        );
    });

    let dispatcher = Dispatcher::new(catalog, platform, data, config.default_factory());
    let state = Arc::new(AppState { dispatcher });

    let server = ServerConfig {
        host: host.unwrap_or_else(|| config.server.host.clone()),
        port: port.unwrap_or(config.server.port),
    };
    start_server(server, state).await
}
