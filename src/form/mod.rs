//! Pure form logic: building, mutating, and reading back the report modal.
//!
//! ```text
//!   CatalogSnapshot ──> builder::build_initial_view ──> FormView
//!                                                         │
//!   EditIntent ───────> mutator::apply(view, intent) ─────┤
//!                                                         v
//!   StateBlob ────────> extract::extract ──> Vec<ReportRecord>
//! ```
//!
//! Nothing here does I/O. Every function takes the catalog by reference
//! and returns a new value, so handlers can run them without holding locks.

pub mod builder;
pub mod extract;
pub mod mutator;

pub use builder::{build_initial_view, build_section};
pub use extract::{extract, extract_indexed};
pub use mutator::apply;
