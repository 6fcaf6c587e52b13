//! Composite `(section, kind)` keys and the wire identifiers they map to.
//!
//! The chat platform only knows flat string ids such as `machine_select_3`.
//! These are decoded here, once, into [`FieldKey`]; nothing past the
//! boundary looks at the strings again.

use crate::SECTION_COUNT;

/// Block holding the reporter select.
pub const REPORTER_BLOCK_ID: &str = "reporter";
/// Action id of the reporter select.
pub const REPORTER_ACTION_ID: &str = "name";
/// Button that expands a collapsed section; its value is the section index.
pub const EXPAND_ACTION_ID: &str = "open_machine_block";
/// Home-tab button and global shortcut that open the form.
pub const OPEN_FORM_ACTION_ID: &str = "open_daily_report";
/// Callback id identifying the report modal on submission.
pub const FORM_CALLBACK_ID: &str = "daily_report_modal";

const TOGGLE_PREFIX: &str = "toggle";
const HEADING_PREFIX: &str = "heading";

/// The four inputs inside an expanded section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKind {
    Machine,
    Product,
    Defects,
    Details,
}

impl FieldKind {
    pub const ALL: [FieldKind; 4] = [
        FieldKind::Machine,
        FieldKind::Product,
        FieldKind::Defects,
        FieldKind::Details,
    ];

    fn block_prefix(self) -> &'static str {
        match self {
            Self::Machine => "machine",
            Self::Product => "product",
            Self::Defects => "defect",
            Self::Details => "details",
        }
    }

    fn action_prefix(self) -> &'static str {
        match self {
            Self::Machine => "machine_select",
            Self::Product => "product_select",
            Self::Defects => "defects",
            Self::Details => "details",
        }
    }
}

/// A field of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
    pub section: usize,
    pub kind: FieldKind,
}

impl FieldKey {
    pub fn new(section: usize, kind: FieldKind) -> Self {
        Self { section, kind }
    }

    pub fn block_id(&self) -> String {
        format!("{}_{}", self.kind.block_prefix(), self.section)
    }

    pub fn action_id(&self) -> String {
        format!("{}_{}", self.kind.action_prefix(), self.section)
    }

    pub fn from_block_id(id: &str) -> Option<Self> {
        FieldKind::ALL.into_iter().find_map(|kind| {
            parse_indexed(id, kind.block_prefix()).map(|section| Self::new(section, kind))
        })
    }

    pub fn from_action_id(id: &str) -> Option<Self> {
        FieldKind::ALL.into_iter().find_map(|kind| {
            parse_indexed(id, kind.action_prefix()).map(|section| Self::new(section, kind))
        })
    }
}

pub fn toggle_block_id(section: usize) -> String {
    format!("{}_{}", TOGGLE_PREFIX, section)
}

pub fn parse_toggle_block_id(id: &str) -> Option<usize> {
    parse_indexed(id, TOGGLE_PREFIX)
}

/// Longest action id the platform accepts.
const MAX_ACTION_ID_LEN: usize = 255;

/// Action id of a section's product input.
///
/// The client keeps an input's value across view updates only while its
/// action id is unchanged, so the id names the input kind and the machine
/// whose products it offers. A new machine then starts from an empty product.
pub fn product_action_id(section: usize, machine: Option<&str>) -> String {
    let id = match machine {
        None => format!("product_input_{}", section),
        Some(machine) => format!("product_select_{}_{}", section, machine),
    };
    truncate_to_boundary(id, MAX_ACTION_ID_LEN)
}

fn truncate_to_boundary(mut s: String, max: usize) -> String {
    if s.len() > max {
        let cut = (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
        s.truncate(cut);
    }
    s
}

pub fn heading_block_id(section: usize) -> String {
    format!("{}_{}", HEADING_PREFIX, section)
}

/// Parse a section index as carried in an expand button's value.
pub fn parse_section_index(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    let canonical = !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_digit())
        && (raw.len() == 1 || !raw.starts_with('0'));
    if !canonical {
        return None;
    }
    raw.parse::<usize>().ok().filter(|i| *i < SECTION_COUNT)
}

fn parse_indexed(id: &str, prefix: &str) -> Option<usize> {
    let digits = id.strip_prefix(prefix)?.strip_prefix('_')?;
    if digits.trim() != digits {
        return None;
    }
    parse_section_index(digits)
}
