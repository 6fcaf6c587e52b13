//! Typed error hierarchy for the daily-report service.
//!
//! One enum per external seam, plus `DispatchError` which the webhook
//! dispatcher returns and the HTTP layer maps to a status code:
//! - `CatalogError`: reference data could not be loaded
//! - `DataServiceError`: spreadsheet data service calls
//! - `RenderError`: chat platform `views.*` calls
//! - `EventError`: inbound webhook payloads that fail to decode

use report_common::FormError;
use thiserror::Error;

/// Errors from loading the option catalog.
///
/// `Clone` because one in-flight load is shared by every waiting caller.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Data service unavailable: {0}")]
    UpstreamUnavailable(String),
}

/// Errors from the spreadsheet data service.
#[derive(Debug, Error)]
pub enum DataServiceError {
    #[error("Data service request timed out: {action}")]
    Timeout { action: String },

    #[error("Data service unreachable during {action}: {message}")]
    Unreachable { action: String, message: String },

    #[error("Data service returned a non-JSON or malformed body for {action}: {message}")]
    InvalidResponse { action: String, message: String },

    #[error("Data service rejected {action} with status {status}")]
    Rejected { action: String, status: u16 },
}

impl DataServiceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<DataServiceError> for CatalogError {
    fn from(err: DataServiceError) -> Self {
        CatalogError::UpstreamUnavailable(err.to_string())
    }
}

/// Errors from the chat platform's view API.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("View {view_id} was updated concurrently; version token is stale")]
    ConcurrencyConflict { view_id: String },

    #[error("View {view_id} is not available for re-fetch")]
    ViewUnavailable { view_id: String },

    #[error("Platform request timed out: {method}")]
    Timeout { method: String },

    #[error("Platform API {method} failed: {error}")]
    Api { method: String, error: String },

    #[error("Platform transport error during {method}: {message}")]
    Transport { method: String, message: String },

    #[error("Refusing to render malformed form: {0}")]
    Invariant(#[from] FormError),
}

/// Errors decoding an inbound webhook payload.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Malformed event payload: {0}")]
    MalformedEventPayload(String),
}

/// Errors from handling one webhook event.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Report persistence failed: {0}")]
    Persistence(#[source] DataServiceError),

    #[error(transparent)]
    Event(#[from] EventError),
}

impl DispatchError {
    /// True when the form is already newer than this edit and a second
    /// attempt also lost the race.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Render(RenderError::ConcurrencyConflict { .. })
                | Self::Render(RenderError::ViewUnavailable { .. })
        )
    }
}
