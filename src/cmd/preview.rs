//! `daily-report preview`: print the modal that would be opened.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use daily_report::catalog::load_snapshot;
use daily_report::config::ReportToml;
use daily_report::data::{DataService, HttpDataService, StaticDataService};
use daily_report::form::build_initial_view;
use daily_report::slack::render::render_modal;
use report_common::{CatalogSnapshot, FactoryId};

pub async fn cmd_preview(
    config: &ReportToml,
    factory: Option<&str>,
    catalog_path: Option<&Path>,
) -> Result<()> {
    let factory = factory
        .map(FactoryId::from)
        .unwrap_or_else(|| config.default_factory());

    let data: Arc<dyn DataService> = match catalog_path {
        Some(path) => Arc::new(StaticDataService::new(read_fixture(path)?)),
        None => {
            let url = config
                .data_service_url()
                .context("No catalog fixture given and no data service configured")?;
            Arc::new(HttpDataService::new(url, config.data_service_timeout())?)
        }
    };
    let catalog = load_snapshot(data.as_ref(), std::slice::from_ref(&factory))
        .await
        .context("Failed to load catalog")?;

    let view = render_modal(&build_initial_view(&factory, &catalog))?;
    let json = serde_json::to_string_pretty(&view).context("Failed to serialize modal")?;
    println!("{}", json);
    Ok(())
}

fn read_fixture(path: &Path) -> Result<CatalogSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog fixture: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog fixture: {}", path.display()))
}
