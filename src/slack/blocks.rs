//! The subset of Slack Block Kit this service reads and writes.
//!
//! Unknown block and element types deserialize to `Unknown` so that a view
//! edited by another app does not fail the whole payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextKind {
    PlainText,
    Mrkdwn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    #[serde(rename = "type")]
    pub kind: TextKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<bool>,
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: TextKind::PlainText,
            text: text.into(),
            emoji: None,
        }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            kind: TextKind::Mrkdwn,
            text: text.into(),
            emoji: None,
        }
    }
}

/// A select option. Text and value are the same label throughout this app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackOption {
    pub text: Text,
    pub value: String,
}

impl SlackOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: Text::plain(label),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    StaticSelect {
        action_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<Text>,
        #[serde(default)]
        options: Vec<SlackOption>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_option: Option<SlackOption>,
    },
    MultiStaticSelect {
        action_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<Text>,
        #[serde(default)]
        options: Vec<SlackOption>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_options: Option<Vec<SlackOption>>,
    },
    PlainTextInput {
        action_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<Text>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_value: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        multiline: bool,
    },
    Button {
        action_id: String,
        text: Text,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl Element {
    pub fn action_id(&self) -> Option<&str> {
        match self {
            Self::StaticSelect { action_id, .. }
            | Self::MultiStaticSelect { action_id, .. }
            | Self::PlainTextInput { action_id, .. }
            | Self::Button { action_id, .. } => Some(action_id),
            Self::Unknown => None,
        }
    }

    /// Option values of a select element; empty for anything else.
    pub fn option_values(&self) -> Vec<String> {
        match self {
            Self::StaticSelect { options, .. } | Self::MultiStaticSelect { options, .. } => {
                options.iter().map(|o| o.value.clone()).collect()
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        text: Text,
    },
    Section {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
    },
    Divider {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
    },
    Actions {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        elements: Vec<Element>,
    },
    Input {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        label: Text,
        element: Element,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        optional: bool,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        dispatch_action: bool,
    },
    #[serde(other)]
    Unknown,
}

impl Block {
    pub fn block_id(&self) -> Option<&str> {
        match self {
            Self::Header { block_id, .. }
            | Self::Section { block_id, .. }
            | Self::Divider { block_id }
            | Self::Actions { block_id, .. }
            | Self::Input { block_id, .. } => block_id.as_deref(),
            Self::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Modal,
    Home,
}

/// Current input values, keyed by block id then action id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub values: BTreeMap<String, BTreeMap<String, StateValue>>,
}

/// One input's value as reported by the platform. Which field is set depends
/// on the element type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateValue {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<SlackOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_options: Option<Vec<SlackOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A modal or home-tab view.
///
/// `id`, `hash` and `state` are assigned by the platform; they are `None`
/// on views this service builds and are skipped when serializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackView {
    #[serde(rename = "type")]
    pub kind: ViewKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<Text>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ViewState>,
}

impl SlackView {
    pub fn home(blocks: Vec<Block>) -> Self {
        Self {
            kind: ViewKind::Home,
            id: None,
            hash: None,
            callback_id: None,
            private_metadata: None,
            title: None,
            submit: None,
            close: None,
            blocks,
            state: None,
        }
    }

    /// Look up the state value for `block_id` regardless of action id.
    pub fn state_value(&self, block_id: &str) -> Option<&StateValue> {
        self.state
            .as_ref()?
            .values
            .get(block_id)?
            .values()
            .next()
    }
}
