//! Event dispatch: the one place that sequences catalog reads, form logic,
//! and calls out to the platform and data service for a decoded event.
//!
//! Each call handles one event start to finish. The only state shared
//! between calls is the catalog cache; no lock is held across an await.

use std::sync::Arc;

use tracing::{debug, info, warn};

use report_common::{EditIntent, FactoryId, FormView, StateBlob, VersionToken};

use crate::catalog::CatalogCache;
use crate::data::{DataService, ReportSubmission};
use crate::errors::{DispatchError, EventError, RenderError};
use crate::events::InboundEvent;
use crate::form::{apply, build_initial_view, extract};
use crate::slack::RenderApi;
use crate::slack::decode::decode_form;
use crate::slack::home::render_home;
use crate::slack::render::render_modal;

/// Reporter recorded when the submission did not name one.
pub const UNKNOWN_REPORTER: &str = "unknown";

/// What the webhook should answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Empty 200.
    Ack,
    /// Echo the url_verification challenge.
    Challenge(String),
    /// Tell the platform to close the modal stack.
    ClearForm,
}

pub struct Dispatcher {
    catalog: Arc<CatalogCache>,
    platform: Arc<dyn RenderApi>,
    data: Arc<dyn DataService>,
    default_factory: FactoryId,
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<CatalogCache>,
        platform: Arc<dyn RenderApi>,
        data: Arc<dyn DataService>,
        default_factory: FactoryId,
    ) -> Self {
        Self {
            catalog,
            platform,
            data,
            default_factory,
        }
    }

    pub fn default_factory(&self) -> &FactoryId {
        &self.default_factory
    }

    pub async fn dispatch(&self, event: InboundEvent) -> Result<Reply, DispatchError> {
        info!(kind = event.kind(), "inbound event");
        match event {
            InboundEvent::UrlVerification { challenge } => Ok(Reply::Challenge(challenge)),
            InboundEvent::AppHomeOpened { user_id } => {
                publish_home(
                    self.data.as_ref(),
                    self.platform.as_ref(),
                    &user_id,
                    &self.default_factory,
                )
                .await?;
                Ok(Reply::Ack)
            }
            InboundEvent::OpenForm {
                trigger_id,
                factory,
            } => {
                let factory = factory.unwrap_or_else(|| self.default_factory.clone());
                self.open_form(&trigger_id, &factory).await?;
                Ok(Reply::Ack)
            }
            InboundEvent::Edit { intent, view } => {
                self.edit(view, &intent).await?;
                Ok(Reply::Ack)
            }
            InboundEvent::Submit {
                user_id,
                factory,
                blob,
            } => {
                self.submit(&user_id, &factory, &blob).await?;
                Ok(Reply::ClearForm)
            }
            InboundEvent::Ignored { reason } => {
                debug!(%reason, "event ignored");
                Ok(Reply::Ack)
            }
        }
    }

    async fn open_form(&self, trigger_id: &str, factory: &FactoryId) -> Result<(), DispatchError> {
        let catalog = self.catalog.get_or_load().await;
        let form = build_initial_view(factory, &catalog);
        let modal = render_modal(&form)?;
        let opened = self.platform.open_view(trigger_id, &modal).await?;
        info!(
            factory = %factory,
            view_id = opened.id.as_deref().unwrap_or_default(),
            "report form opened"
        );
        Ok(())
    }

    /// Apply `intent` and push the result. A stale version token gets exactly
    /// one retry against the latest revision of the view.
    async fn edit(&self, view: FormView, intent: &EditIntent) -> Result<(), DispatchError> {
        let (Some(view_id), Some(version)) = (view.view_id.clone(), view.version.clone()) else {
            return Err(EventError::MalformedEventPayload("edit without view id or hash".into()).into());
        };
        let catalog = self.catalog.get_or_load().await;

        let next = apply(view, intent, &catalog);
        match self.push(&view_id, &version, &next).await {
            Err(RenderError::ConcurrencyConflict { .. }) => {
                warn!(
                    view_id = %view_id,
                    section = intent.section(),
                    "version token stale, re-fetching view and retrying once"
                );
                let latest = decode_form(
                    &self.platform.fetch_view(&view_id).await?,
                    &self.default_factory,
                );
                let version = latest
                    .version
                    .clone()
                    .ok_or_else(|| RenderError::ViewUnavailable {
                        view_id: view_id.clone(),
                    })?;
                let next = apply(latest, intent, &catalog);
                self.push(&view_id, &version, &next).await?;
                Ok(())
            }
            other => Ok(other?),
        }
    }

    async fn push(
        &self,
        view_id: &str,
        version: &VersionToken,
        form: &FormView,
    ) -> Result<(), RenderError> {
        let modal = render_modal(form)?;
        self.platform.update_view(view_id, version, &modal).await?;
        Ok(())
    }

    async fn submit(
        &self,
        user_id: &str,
        factory: &FactoryId,
        blob: &StateBlob,
    ) -> Result<(), DispatchError> {
        let records = extract(blob);
        if records.is_empty() {
            info!(factory = %factory, "submission has no filled sections, nothing to persist");
            return Ok(());
        }

        let reporter = blob
            .reporter
            .clone()
            .unwrap_or_else(|| UNKNOWN_REPORTER.to_string());
        let submission = ReportSubmission::new(factory.clone(), reporter, &records);
        self.data
            .submit(&submission)
            .await
            .map_err(DispatchError::Persistence)?;
        info!(factory = %factory, records = records.len(), "reports persisted");

        // The platform drops the submission ack after three seconds, so the
        // refresh and home publish run after the reply.
        let catalog = Arc::clone(&self.catalog);
        let platform = Arc::clone(&self.platform);
        let data = Arc::clone(&self.data);
        let user_id = user_id.to_string();
        let factory = factory.clone();
        tokio::spawn(async move {
            let (_, home) = tokio::join!(
                catalog.refresh(),
                publish_home(data.as_ref(), platform.as_ref(), &user_id, &factory)
            );
            if let Err(e) = home {
                warn!(error = %e, user_id = %user_id, "home view not refreshed after submission");
            }
        });
        Ok(())
    }
}

/// Publish the home tab with `factory`'s report history.
async fn publish_home(
    data: &dyn DataService,
    platform: &dyn RenderApi,
    user_id: &str,
    factory: &FactoryId,
) -> Result<(), RenderError> {
    let sheet = factory.history_sheet();
    let history = match data.reports(&sheet).await {
        Ok(history) => history,
        Err(e) => {
            warn!(error = %e, sheet = %sheet, "report history unavailable, showing none");
            Vec::new()
        }
    };
    let home = render_home(factory, &history);
    platform.publish_home(user_id, &home).await?;
    debug!(user_id, entries = history.len(), "home view published");
    Ok(())
}
