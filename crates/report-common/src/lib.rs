//! Shared domain types for the daily-report form engine.
//!
//! Everything in this crate is plain data plus pure helpers: no I/O, no
//! async, no knowledge of the chat platform's wire format beyond the
//! composite field keys in [`keys`].
//!
//! | Module    | Contents                                                  |
//! |-----------|-----------------------------------------------------------|
//! | `catalog` | `CatalogSnapshot`, `FactoryId`, non-empty `OptionList`    |
//! | `form`    | `FormView`, `SectionState`, `EditIntent`, `StateBlob`     |
//! | `keys`    | `(section, kind)` composite keys and their wire ids       |
//! | `record`  | `ReportRecord`, `HistoryEntry`                            |

use thiserror::Error;

pub mod catalog;
pub mod form;
pub mod keys;
pub mod record;

pub use catalog::{CatalogSnapshot, FactoryId, OptionList, SENTINEL_LABEL, SENTINEL_VALUE};
pub use form::{
    EditIntent, ExpandedSection, FieldValue, FormView, SectionState, StateBlob, VersionToken,
};
pub use keys::{FieldKey, FieldKind};
pub use record::{HistoryEntry, ReportRecord};

/// Number of repeatable unit sections on the form.
pub const SECTION_COUNT: usize = 10;

/// Contract violations in the form model.
///
/// None of these are expected at runtime: they indicate a bug in a builder
/// or mutator, and tests treat them as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Option list for {field} resolved empty with no sentinel applied")]
    RenderInvariantViolation { field: String },

    #[error("Section {index} appears more than once")]
    DuplicateSection { index: usize },

    #[error("Section index {index} is outside 0..{max}", max = SECTION_COUNT)]
    SectionOutOfRange { index: usize },

    #[error("Section 0 must be expanded")]
    FirstSectionCollapsed,

    #[error("Product options of section {index} do not match its selected machine")]
    ProductDomainMismatch { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_error_render_invariant_names_field() {
        let err = FormError::RenderInvariantViolation {
            field: "product_3".into(),
        };
        assert!(err.to_string().contains("product_3"));
    }

    #[test]
    fn form_error_out_of_range_mentions_bound() {
        let err = FormError::SectionOutOfRange { index: 12 };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("10"));
    }
}
