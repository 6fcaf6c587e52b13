use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FormError;

/// Value carried by the placeholder option rendered in place of an empty list.
pub const SENTINEL_VALUE: &str = "none";

/// Label shown for the placeholder option.
pub const SENTINEL_LABEL: &str = "—";

/// Identifier of a factory's machine sheet, e.g. `1a_machine`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactoryId(String);

impl FactoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sheet holding submitted reports for this factory.
    ///
    /// `1a_machine` maps to `1a_reports`; an id without `_` is used whole.
    pub fn history_sheet(&self) -> String {
        let prefix = self.0.split('_').next().unwrap_or_default();
        format!("{}_reports", prefix)
    }
}

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FactoryId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FactoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An option list that can never be empty.
///
/// Empty sources collapse to a single sentinel entry; duplicates are dropped
/// keeping first occurrence, so the list behaves as an ordered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OptionList(Vec<String>);

impl OptionList {
    pub fn sentinel() -> Self {
        Self(vec![SENTINEL_VALUE.to_string()])
    }

    /// Build from a source list, substituting the sentinel when it is empty.
    pub fn or_sentinel<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = dedup(items);
        if values.is_empty() {
            Self::sentinel()
        } else {
            Self(values)
        }
    }

    /// Build from a list that must already be non-empty.
    pub fn try_new(field: &str, items: Vec<String>) -> Result<Self, FormError> {
        let values = dedup(items);
        if values.is_empty() {
            return Err(FormError::RenderInvariantViolation {
                field: field.to_string(),
            });
        }
        Ok(Self(values))
    }

    pub fn is_sentinel(&self) -> bool {
        self.0.len() == 1 && self.0[0] == SENTINEL_VALUE
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }
}

fn dedup<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.into();
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Reference data backing every selectable option on the form.
///
/// A snapshot is immutable once built; the cache swaps whole snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub reporters: Vec<String>,
    #[serde(default)]
    pub defect_categories: Vec<String>,
    #[serde(default)]
    pub machines_by_factory: BTreeMap<FactoryId, BTreeMap<String, Vec<String>>>,
}

impl CatalogSnapshot {
    /// The degraded snapshot used when the data service cannot be reached.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
            && self.defect_categories.is_empty()
            && self.machines_by_factory.is_empty()
    }

    pub fn reporter_options(&self) -> OptionList {
        OptionList::or_sentinel(self.reporters.iter().cloned())
    }

    pub fn defect_options(&self) -> OptionList {
        OptionList::or_sentinel(self.defect_categories.iter().cloned())
    }

    pub fn machine_options(&self, factory: &FactoryId) -> OptionList {
        let machines = self
            .machines_by_factory
            .get(factory)
            .map(|m| m.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        OptionList::or_sentinel(machines)
    }

    /// Products selectable once `machine` is chosen in `factory`.
    pub fn product_options(&self, factory: &FactoryId, machine: &str) -> OptionList {
        let products = self
            .machines_by_factory
            .get(factory)
            .and_then(|m| m.get(machine))
            .cloned()
            .unwrap_or_default();
        OptionList::or_sentinel(products)
    }
}
