use serde::{Deserialize, Deserializer, Serialize};

/// One unit's worth of submitted report data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub machine_id: String,
    pub product_name: String,
    pub defects: Vec<String>,
    pub details: String,
}

impl ReportRecord {
    /// A record is worth persisting iff any field carries data.
    pub fn is_material(&self) -> bool {
        !self.machine_id.is_empty()
            || !self.product_name.is_empty()
            || !self.defects.is_empty()
            || !self.details.is_empty()
    }
}

/// A previously submitted report row as returned by the data service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub reporter: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub machine_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub defect: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub details: String,
}

/// Spreadsheet cells arrive as strings, numbers, or null; keep them all as text.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
