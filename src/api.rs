use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{error, warn};

use crate::dispatch::{Dispatcher, Reply};
use crate::errors::{DispatchError, EventError};
use crate::events::decode_event;

/// Largest webhook body accepted; Slack payloads are far below this.
const MAX_BODY_BYTES: usize = 1024 * 1024;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub dispatcher: Dispatcher,
}

pub type SharedState = Arc<AppState>;

/// Interactivity payloads arrive form-encoded as `payload=<json>`.
#[derive(Deserialize)]
struct InteractionForm {
    payload: String,
}

// ── Error type ────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

/// Map a failed event to the webhook response.
///
/// Only errors the platform should see as failures become 500s. Malformed
/// payloads and lost edit races are acknowledged so the platform does not
/// redeliver them.
fn dispatch_failure(err: DispatchError) -> Result<Response, ApiError> {
    if err.is_conflict() {
        warn!(error = %err, "selection didn't update: view changed twice underneath the edit");
        return Ok(StatusCode::OK.into_response());
    }
    match err {
        DispatchError::Event(e) => {
            warn!(error = %e, "ignoring malformed event");
            Ok(StatusCode::OK.into_response())
        }
        other => {
            error!(error = %other, "event handling failed");
            Err(ApiError::Internal(other.to_string()))
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/slack/events", post(slack_events))
}

async fn health() -> &'static str {
    "ok"
}

async fn slack_events(
    State(state): State<SharedState>,
    request: Request,
) -> Result<Response, ApiError> {
    let body = match read_payload(request).await {
        Ok(body) => body,
        Err(e) => return dispatch_failure(e.into()),
    };
    let event = match decode_event(body, state.dispatcher.default_factory()) {
        Ok(event) => event,
        Err(e) => return dispatch_failure(e.into()),
    };

    match state.dispatcher.dispatch(event).await {
        Ok(Reply::Ack) => Ok(StatusCode::OK.into_response()),
        Ok(Reply::Challenge(challenge)) => Ok(challenge.into_response()),
        Ok(Reply::ClearForm) => {
            Ok(Json(serde_json::json!({"response_action": "clear"})).into_response())
        }
        Err(e) => dispatch_failure(e),
    }
}

/// Unwrap the JSON event from either body encoding the platform uses.
async fn read_payload(request: Request) -> Result<serde_json::Value, EventError> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(form) = Form::<InteractionForm>::from_request(request, &())
            .await
            .map_err(|e| EventError::MalformedEventPayload(e.body_text()))?;
        serde_json::from_str(&form.payload)
            .map_err(|e| EventError::MalformedEventPayload(format!("payload is not JSON: {}", e)))
    } else {
        let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| EventError::MalformedEventPayload(e.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| EventError::MalformedEventPayload(format!("body is not JSON: {}", e)))
    }
}
