use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogSnapshot, FactoryId, OptionList, SENTINEL_VALUE};
use crate::keys::{FieldKey, FieldKind};
use crate::{FormError, SECTION_COUNT};

/// Opaque optimistic-concurrency token issued by the platform per view revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A unit section rendered with all four inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedSection {
    pub index: usize,
    pub machine_options: OptionList,
    pub product_options: OptionList,
    pub defect_options: OptionList,
    pub selected_machine: Option<String>,
    pub selected_product: Option<String>,
    pub selected_defects: Vec<String>,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionState {
    /// Only the expand affordance is shown.
    Collapsed { index: usize },
    Expanded(ExpandedSection),
}

impl SectionState {
    pub fn index(&self) -> usize {
        match self {
            Self::Collapsed { index } => *index,
            Self::Expanded(section) => section.index,
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, Self::Expanded(_))
    }

    pub fn as_expanded(&self) -> Option<&ExpandedSection> {
        match self {
            Self::Expanded(section) => Some(section),
            Self::Collapsed { .. } => None,
        }
    }
}

/// The server-side model of the report modal.
///
/// `view_id` and `version` are `None` until the platform has opened the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub view_id: Option<String>,
    pub version: Option<VersionToken>,
    pub factory: FactoryId,
    pub reporter_options: OptionList,
    pub selected_reporter: Option<String>,
    pub sections: Vec<SectionState>,
}

impl FormView {
    pub fn section(&self, index: usize) -> Option<&SectionState> {
        self.sections.iter().find(|s| s.index() == index)
    }

    pub fn expanded(&self, index: usize) -> Option<&ExpandedSection> {
        self.section(index).and_then(SectionState::as_expanded)
    }

    pub fn expanded_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_expanded()).count()
    }

    /// Structural checks: unique in-range indices, section 0 expanded, and
    /// sentinel products wherever no machine is selected yet.
    pub fn check_invariants(&self) -> Result<(), FormError> {
        let mut seen = BTreeSet::new();
        for section in &self.sections {
            let index = section.index();
            if index >= SECTION_COUNT {
                return Err(FormError::SectionOutOfRange { index });
            }
            if !seen.insert(index) {
                return Err(FormError::DuplicateSection { index });
            }
            if let SectionState::Expanded(expanded) = section
                && expanded.selected_machine.is_none()
                && !expanded.product_options.is_sentinel()
            {
                return Err(FormError::ProductDomainMismatch { index });
            }
        }
        match self.section(0) {
            Some(SectionState::Expanded(_)) => Ok(()),
            _ => Err(FormError::FirstSectionCollapsed),
        }
    }

    /// Check every expanded section's product options against `catalog`.
    pub fn check_products(&self, catalog: &CatalogSnapshot) -> Result<(), FormError> {
        for expanded in self.sections.iter().filter_map(SectionState::as_expanded) {
            let expected = match &expanded.selected_machine {
                Some(machine) => catalog.product_options(&self.factory, machine),
                None => OptionList::sentinel(),
            };
            if expanded.product_options != expected {
                return Err(FormError::ProductDomainMismatch {
                    index: expanded.index,
                });
            }
        }
        Ok(())
    }
}

/// A requested edit to an open form, decoded from one inbound action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditIntent {
    CascadeMachineSelected { section: usize, machine: String },
    ExpandSection { section: usize },
}

impl EditIntent {
    pub fn section(&self) -> usize {
        match self {
            Self::CascadeMachineSelected { section, .. } => *section,
            Self::ExpandSection { section } => *section,
        }
    }
}

/// One submitted input value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Selected(Option<String>),
    MultiSelected(Vec<String>),
    Text(Option<String>),
}

impl FieldValue {
    /// The value as a single string; blank text and the sentinel count as absent.
    pub fn single(&self) -> Option<&str> {
        let value = match self {
            Self::Selected(v) | Self::Text(v) => v.as_deref(),
            Self::MultiSelected(_) => None,
        }?;
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == SENTINEL_VALUE {
            None
        } else {
            Some(value)
        }
    }

    /// The value as a list of selections.
    pub fn many(&self) -> Vec<String> {
        match self {
            Self::MultiSelected(values) => values
                .iter()
                .filter(|v| !v.trim().is_empty() && v.as_str() != SENTINEL_VALUE)
                .cloned()
                .collect(),
            other => other.single().map(|v| vec![v.to_string()]).unwrap_or_default(),
        }
    }
}

/// The flat, index-keyed input state returned when the form is submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateBlob {
    pub reporter: Option<String>,
    fields: BTreeMap<FieldKey, FieldValue>,
}

impl StateBlob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: FieldKey, value: FieldValue) {
        self.fields.insert(key, value);
    }

    pub fn get(&self, key: FieldKey) -> Option<&FieldValue> {
        self.fields.get(&key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The state a platform would report for `view` as currently filled in.
    pub fn from_view(view: &FormView) -> Self {
        let mut blob = Self {
            reporter: view.selected_reporter.clone(),
            fields: BTreeMap::new(),
        };
        for expanded in view.sections.iter().filter_map(SectionState::as_expanded) {
            let i = expanded.index;
            blob.insert(
                FieldKey::new(i, FieldKind::Machine),
                FieldValue::Selected(expanded.selected_machine.clone()),
            );
            blob.insert(
                FieldKey::new(i, FieldKind::Product),
                FieldValue::Selected(expanded.selected_product.clone()),
            );
            blob.insert(
                FieldKey::new(i, FieldKind::Defects),
                FieldValue::MultiSelected(expanded.selected_defects.clone()),
            );
            let details = (!expanded.details.is_empty()).then(|| expanded.details.clone());
            blob.insert(FieldKey::new(i, FieldKind::Details), FieldValue::Text(details));
        }
        blob
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expanded(index: usize) -> ExpandedSection {
        ExpandedSection {
            index,
            machine_options: OptionList::or_sentinel(["M1"]),
            product_options: OptionList::sentinel(),
            defect_options: OptionList::sentinel(),
            selected_machine: None,
            selected_product: None,
            selected_defects: vec![],
            details: String::new(),
        }
    }

    fn view(sections: Vec<SectionState>) -> FormView {
        FormView {
            view_id: None,
            version: None,
            factory: FactoryId::from("1a_machine"),
            reporter_options: OptionList::sentinel(),
            selected_reporter: None,
            sections,
        }
    }

    #[test]
    fn invariants_hold_for_well_formed_view() {
        let v = view(vec![
            SectionState::Expanded(expanded(0)),
            SectionState::Collapsed { index: 1 },
        ]);
        assert_eq!(v.check_invariants(), Ok(()));
        assert_eq!(v.expanded_count(), 1);
    }

    #[test]
    fn duplicate_section_is_rejected() {
        let v = view(vec![
            SectionState::Expanded(expanded(0)),
            SectionState::Collapsed { index: 0 },
        ]);
        assert_eq!(
            v.check_invariants(),
            Err(FormError::DuplicateSection { index: 0 })
        );
    }

    #[test]
    fn collapsed_first_section_is_rejected() {
        let v = view(vec![SectionState::Collapsed { index: 0 }]);
        assert_eq!(v.check_invariants(), Err(FormError::FirstSectionCollapsed));
    }

    #[test]
    fn products_without_machine_must_be_sentinel() {
        let mut section = expanded(0);
        section.product_options = OptionList::or_sentinel(["P1"]);
        let v = view(vec![SectionState::Expanded(section)]);
        assert_eq!(
            v.check_invariants(),
            Err(FormError::ProductDomainMismatch { index: 0 })
        );
    }

    #[test]
    fn field_value_single_ignores_blank_and_sentinel() {
        assert_eq!(FieldValue::Text(Some("  ".into())).single(), None);
        assert_eq!(FieldValue::Selected(Some(SENTINEL_VALUE.into())).single(), None);
        assert_eq!(FieldValue::Selected(None).single(), None);
        assert_eq!(FieldValue::Text(Some("P1".into())).single(), Some("P1"));
        assert_eq!(FieldValue::MultiSelected(vec!["a".into()]).single(), None);
    }

    #[test]
    fn field_value_many_keeps_order() {
        let value = FieldValue::MultiSelected(vec!["b".into(), "".into(), "a".into()]);
        assert_eq!(value.many(), vec!["b", "a"]);
        assert_eq!(FieldValue::Selected(Some("x".into())).many(), vec!["x"]);
    }

    #[test]
    fn state_blob_from_view_covers_expanded_sections_only() {
        let mut first = expanded(0);
        first.selected_machine = Some("M1".into());
        first.details = "note".into();
        let v = view(vec![
            SectionState::Expanded(first),
            SectionState::Collapsed { index: 1 },
        ]);
        let blob = StateBlob::from_view(&v);
        assert_eq!(blob.len(), 4);
        assert_eq!(
            blob.get(FieldKey::new(0, FieldKind::Machine)).and_then(FieldValue::single),
            Some("M1")
        );
        assert_eq!(
            blob.get(FieldKey::new(0, FieldKind::Details)).and_then(FieldValue::single),
            Some("note")
        );
        assert!(blob.get(FieldKey::new(1, FieldKind::Machine)).is_none());
    }
}
