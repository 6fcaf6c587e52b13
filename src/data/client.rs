use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use report_common::{FactoryId, HistoryEntry};

use super::{CommonLists, DataService, ReportSubmission, parse_history};
use crate::errors::DataServiceError;

const ACTION_COMMON_LISTS: &str = "getCommonLists";
const ACTION_MACHINE_PRODUCTS: &str = "getMachineProducts";
const ACTION_REPORTS: &str = "getReports";
const ACTION_SUBMIT: &str = "submitReports";

/// HTTP client for the spreadsheet web app.
pub struct HttpDataService {
    client: reqwest::Client,
    url: String,
}

impl HttpDataService {
    /// Every request made through this client is bounded by `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("daily-report")
            .build()
            .context("Failed to build data service HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn get_json(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, DataServiceError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("action", action)])
            .query(params)
            .send()
            .await
            .map_err(|e| classify(action, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataServiceError::Rejected {
                action: action.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| classify(action, e))?;
        serde_json::from_str(&body).map_err(|e| DataServiceError::InvalidResponse {
            action: action.to_string(),
            message: e.to_string(),
        })
    }
}

fn classify(action: &str, err: reqwest::Error) -> DataServiceError {
    if err.is_timeout() {
        DataServiceError::Timeout {
            action: action.to_string(),
        }
    } else {
        DataServiceError::Unreachable {
            action: action.to_string(),
            message: err.to_string(),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    action: &str,
    value: serde_json::Value,
) -> Result<T, DataServiceError> {
    serde_json::from_value(value).map_err(|e| DataServiceError::InvalidResponse {
        action: action.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl DataService for HttpDataService {
    async fn common_lists(&self) -> Result<CommonLists, DataServiceError> {
        let value = self.get_json(ACTION_COMMON_LISTS, &[]).await?;
        decode(ACTION_COMMON_LISTS, value)
    }

    async fn machine_products(
        &self,
        factory: &FactoryId,
    ) -> Result<BTreeMap<String, Vec<String>>, DataServiceError> {
        let value = self
            .get_json(ACTION_MACHINE_PRODUCTS, &[("sheet", factory.as_str())])
            .await?;
        // An unknown sheet comes back as null rather than an empty object.
        let products: Option<BTreeMap<String, Vec<String>>> =
            decode(ACTION_MACHINE_PRODUCTS, value)?;
        Ok(products.unwrap_or_default())
    }

    async fn reports(&self, sheet: &str) -> Result<Vec<HistoryEntry>, DataServiceError> {
        let value = self.get_json(ACTION_REPORTS, &[("sheet", sheet)]).await?;
        Ok(parse_history(value))
    }

    async fn submit(&self, submission: &ReportSubmission) -> Result<(), DataServiceError> {
        let resp = self
            .client
            .post(&self.url)
            .json(submission)
            .send()
            .await
            .map_err(|e| classify(ACTION_SUBMIT, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataServiceError::Rejected {
                action: ACTION_SUBMIT.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
