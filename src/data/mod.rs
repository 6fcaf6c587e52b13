//! Spreadsheet-backed data service: reference lists, report history, and
//! report persistence.
//!
//! The service speaks a tiny action-based protocol over one URL:
//!
//! | Call                                         | Returns                        |
//! |----------------------------------------------|--------------------------------|
//! | `GET ?action=getCommonLists`                 | `{names: [..], defects: [..]}` |
//! | `GET ?action=getMachineProducts&sheet=<f>`   | `{machine: [product, ..]}`     |
//! | `GET ?action=getReports&sheet=<history>`     | `[HistoryEntry, ..]`           |
//! | `POST {factory, reporter, reports}`          | success / failure only         |

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use report_common::{FactoryId, HistoryEntry, ReportRecord};

use crate::errors::DataServiceError;

pub mod client;
pub mod memory;

pub use client::HttpDataService;
pub use memory::StaticDataService;

/// Reporter names and defect categories shared by every factory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommonLists {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub defects: Vec<String>,
}

/// One report row in the shape the spreadsheet expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub machine_no: String,
    pub product_name: String,
    /// Defect labels joined with `", "`
    pub defect: String,
    pub details: String,
}

impl From<&ReportRecord> for ReportRow {
    fn from(record: &ReportRecord) -> Self {
        Self {
            machine_no: record.machine_id.clone(),
            product_name: record.product_name.clone(),
            defect: record.defects.join(", "),
            details: record.details.clone(),
        }
    }
}

/// Body of the persistence POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSubmission {
    pub factory: FactoryId,
    pub reporter: String,
    pub reports: Vec<ReportRow>,
}

impl ReportSubmission {
    pub fn new(factory: FactoryId, reporter: impl Into<String>, records: &[ReportRecord]) -> Self {
        Self {
            factory,
            reporter: reporter.into(),
            reports: records.iter().map(ReportRow::from).collect(),
        }
    }
}

/// Abstraction over the data service for testability.
/// Real implementation: `HttpDataService`. Test double: `StaticDataService`.
#[async_trait]
pub trait DataService: Send + Sync {
    async fn common_lists(&self) -> Result<CommonLists, DataServiceError>;

    async fn machine_products(
        &self,
        factory: &FactoryId,
    ) -> Result<BTreeMap<String, Vec<String>>, DataServiceError>;

    async fn reports(&self, sheet: &str) -> Result<Vec<HistoryEntry>, DataServiceError>;

    async fn submit(&self, submission: &ReportSubmission) -> Result<(), DataServiceError>;
}

/// Decode a history response; anything other than an array is treated as
/// "no history", and rows that do not parse are skipped.
pub fn parse_history(value: serde_json::Value) -> Vec<HistoryEntry> {
    match value {
        serde_json::Value::Array(rows) => rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect(),
        _ => Vec::new(),
    }
}
