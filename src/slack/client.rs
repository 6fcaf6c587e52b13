use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use report_common::VersionToken;

use super::{RenderApi, SlackView};
use crate::errors::RenderError;

/// How many recently rendered views are kept for conflict re-fetches.
const RECENT_VIEWS: usize = 256;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    view: Option<SlackView>,
}

/// `views.*` over the Slack Web API.
///
/// Slack has no call to read a view back, so the client remembers the
/// latest revision of every view it opened or updated and serves
/// [`fetch_view`](RenderApi::fetch_view) from that.
pub struct SlackClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
    recent: Mutex<VecDeque<SlackView>>,
}

impl SlackClient {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("daily-report")
            .build()
            .context("Failed to build Slack HTTP client")?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            recent: Mutex::new(VecDeque::new()),
        })
    }

    async fn call(
        &self,
        method: &str,
        view_id: Option<&str>,
        body: serde_json::Value,
    ) -> Result<ApiResponse, RenderError> {
        let resp = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(|e| classify(method, e))?;

        let status = resp.status();
        let parsed: ApiResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                classify(method, e)
            } else {
                RenderError::Api {
                    method: method.to_string(),
                    error: format!("unreadable response (HTTP {}): {}", status, e),
                }
            }
        })?;

        if !parsed.ok {
            let error = parsed
                .error
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(api_error(method, view_id, error));
        }
        debug!(method, "platform call succeeded");
        Ok(parsed)
    }

    fn rendered(&self, method: &str, resp: ApiResponse) -> Result<SlackView, RenderError> {
        let view = resp.view.ok_or_else(|| RenderError::Api {
            method: method.to_string(),
            error: "response carried no view".to_string(),
        })?;
        self.remember(&view);
        Ok(view)
    }

    fn remember(&self, view: &SlackView) {
        let Some(id) = view.id.as_deref() else {
            return;
        };
        let Ok(mut recent) = self.recent.lock() else {
            return;
        };
        recent.retain(|v| v.id.as_deref() != Some(id));
        recent.push_back(view.clone());
        while recent.len() > RECENT_VIEWS {
            recent.pop_front();
        }
    }
}

fn classify(method: &str, err: reqwest::Error) -> RenderError {
    if err.is_timeout() {
        RenderError::Timeout {
            method: method.to_string(),
        }
    } else {
        RenderError::Transport {
            method: method.to_string(),
            message: err.to_string(),
        }
    }
}

fn api_error(method: &str, view_id: Option<&str>, error: String) -> RenderError {
    let view_id = view_id.unwrap_or_default().to_string();
    match error.as_str() {
        "hash_conflict" => RenderError::ConcurrencyConflict { view_id },
        "not_found" | "view_not_found" => RenderError::ViewUnavailable { view_id },
        _ => RenderError::Api {
            method: method.to_string(),
            error,
        },
    }
}

#[async_trait]
impl RenderApi for SlackClient {
    async fn open_view(&self, trigger_id: &str, view: &SlackView) -> Result<SlackView, RenderError> {
        let resp = self
            .call(
                "views.open",
                None,
                json!({ "trigger_id": trigger_id, "view": view }),
            )
            .await?;
        self.rendered("views.open", resp)
    }

    async fn update_view(
        &self,
        view_id: &str,
        version: &VersionToken,
        view: &SlackView,
    ) -> Result<SlackView, RenderError> {
        let resp = self
            .call(
                "views.update",
                Some(view_id),
                json!({ "view_id": view_id, "hash": version.as_str(), "view": view }),
            )
            .await?;
        self.rendered("views.update", resp)
    }

    async fn fetch_view(&self, view_id: &str) -> Result<SlackView, RenderError> {
        self.recent
            .lock()
            .ok()
            .and_then(|recent| {
                recent
                    .iter()
                    .rev()
                    .find(|v| v.id.as_deref() == Some(view_id))
                    .cloned()
            })
            .ok_or_else(|| RenderError::ViewUnavailable {
                view_id: view_id.to_string(),
            })
    }

    async fn publish_home(&self, user_id: &str, view: &SlackView) -> Result<(), RenderError> {
        self.call(
            "views.publish",
            None,
            json!({ "user_id": user_id, "view": view }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::blocks::Block;

    fn client() -> SlackClient {
        SlackClient::new("http://127.0.0.1:9/api/", "xoxb-test", Duration::from_millis(500)).unwrap()
    }

    fn view_with(id: &str, hash: &str) -> SlackView {
        let mut view = SlackView::home(vec![Block::Divider { block_id: None }]);
        view.id = Some(id.into());
        view.hash = Some(hash.into());
        view
    }

    #[test]
    fn hash_conflict_maps_to_concurrency_conflict() {
        let err = api_error("views.update", Some("V1"), "hash_conflict".into());
        assert!(matches!(err, RenderError::ConcurrencyConflict { ref view_id } if view_id == "V1"));
    }

    #[test]
    fn not_found_maps_to_view_unavailable() {
        let err = api_error("views.update", Some("V1"), "not_found".into());
        assert!(matches!(err, RenderError::ViewUnavailable { .. }));
    }

    #[test]
    fn other_errors_keep_method_and_code() {
        let err = api_error("views.open", None, "expired_trigger_id".into());
        match err {
            RenderError::Api { method, error } => {
                assert_eq!(method, "views.open");
                assert_eq!(error, "expired_trigger_id");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        assert_eq!(client().api_base, "http://127.0.0.1:9/api");
    }

    #[tokio::test]
    async fn fetch_view_serves_latest_remembered_revision() {
        let client = client();
        client.remember(&view_with("V1", "h1"));
        client.remember(&view_with("V2", "x"));
        client.remember(&view_with("V1", "h2"));

        let latest = client.fetch_view("V1").await.unwrap();
        assert_eq!(latest.hash.as_deref(), Some("h2"));
        assert_eq!(client.recent.lock().unwrap().len(), 2);

        let err = client.fetch_view("V9").await.unwrap_err();
        assert!(matches!(err, RenderError::ViewUnavailable { .. }));
    }

    #[tokio::test]
    async fn remembered_views_are_bounded() {
        let client = client();
        for i in 0..(RECENT_VIEWS + 10) {
            client.remember(&view_with(&format!("V{i}"), "h"));
        }
        assert_eq!(client.recent.lock().unwrap().len(), RECENT_VIEWS);
        assert!(client.fetch_view("V0").await.is_err());
    }

    #[tokio::test]
    async fn unreachable_platform_is_a_transport_error() {
        let err = client()
            .publish_home("U1", &SlackView::home(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Transport { .. } | RenderError::Timeout { .. }
        ));
    }
}
