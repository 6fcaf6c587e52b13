//! Inbound webhook decoding.
//!
//! Every payload is validated once, here, into an [`InboundEvent`]. Handlers
//! downstream never look at raw JSON or wire ids.

use serde::Deserialize;

use report_common::keys::{
    EXPAND_ACTION_ID, FORM_CALLBACK_ID, OPEN_FORM_ACTION_ID, parse_section_index,
};
use report_common::{EditIntent, FactoryId, FieldKey, FieldKind, FormView, StateBlob};

use crate::errors::EventError;
use crate::slack::SlackView;
use crate::slack::blocks::SlackOption;
use crate::slack::decode::{decode_form, decode_state, view_factory};

/// A decoded webhook event.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    UrlVerification {
        challenge: String,
    },
    AppHomeOpened {
        user_id: String,
    },
    /// Home button or global shortcut. `factory` is `None` when the trigger
    /// did not name one.
    OpenForm {
        trigger_id: String,
        factory: Option<FactoryId>,
    },
    Edit {
        intent: EditIntent,
        view: FormView,
    },
    Submit {
        user_id: String,
        factory: FactoryId,
        blob: StateBlob,
    },
    /// Well-formed but not ours to handle.
    Ignored {
        reason: String,
    },
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UrlVerification { .. } => "url_verification",
            Self::AppHomeOpened { .. } => "app_home_opened",
            Self::OpenForm { .. } => "open_form",
            Self::Edit { .. } => "edit",
            Self::Submit { .. } => "submit",
            Self::Ignored { .. } => "ignored",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Envelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event: CallbackEvent,
    },
    BlockActions {
        #[serde(default)]
        trigger_id: Option<String>,
        #[serde(default)]
        actions: Vec<Action>,
        #[serde(default)]
        view: Option<SlackView>,
    },
    Shortcut {
        callback_id: String,
        trigger_id: String,
    },
    ViewSubmission {
        user: User,
        view: SlackView,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct CallbackEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Action {
    action_id: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    selected_option: Option<SlackOption>,
}

fn malformed(message: impl Into<String>) -> EventError {
    EventError::MalformedEventPayload(message.into())
}

fn ignored(reason: impl Into<String>) -> InboundEvent {
    InboundEvent::Ignored {
        reason: reason.into(),
    }
}

/// Decode one webhook body (already unwrapped from its form encoding).
pub fn decode_event(
    body: serde_json::Value,
    default_factory: &FactoryId,
) -> Result<InboundEvent, EventError> {
    let envelope: Envelope = serde_json::from_value(body).map_err(|e| malformed(e.to_string()))?;

    match envelope {
        Envelope::UrlVerification { challenge } => Ok(InboundEvent::UrlVerification { challenge }),
        Envelope::EventCallback { event } => match event.kind.as_str() {
            "app_home_opened" => {
                let user_id = event
                    .user
                    .ok_or_else(|| malformed("app_home_opened without user"))?;
                Ok(InboundEvent::AppHomeOpened { user_id })
            }
            other => Ok(ignored(format!("event {}", other))),
        },
        Envelope::BlockActions {
            trigger_id,
            actions,
            view,
        } => decode_block_action(trigger_id, actions, view, default_factory),
        Envelope::Shortcut {
            callback_id,
            trigger_id,
        } => {
            if callback_id == OPEN_FORM_ACTION_ID {
                Ok(InboundEvent::OpenForm {
                    trigger_id,
                    factory: None,
                })
            } else {
                Ok(ignored(format!("shortcut {}", callback_id)))
            }
        }
        Envelope::ViewSubmission { user, view } => {
            if view.callback_id.as_deref() != Some(FORM_CALLBACK_ID) {
                return Ok(ignored("submission of another view"));
            }
            Ok(InboundEvent::Submit {
                user_id: user.id,
                factory: view_factory(&view, default_factory),
                blob: decode_state(&view),
            })
        }
        Envelope::Other => Ok(ignored("unhandled payload type")),
    }
}

fn decode_block_action(
    trigger_id: Option<String>,
    actions: Vec<Action>,
    view: Option<SlackView>,
    default_factory: &FactoryId,
) -> Result<InboundEvent, EventError> {
    let Some(action) = actions.into_iter().next() else {
        return Ok(ignored("block_actions without actions"));
    };

    if action.action_id == OPEN_FORM_ACTION_ID {
        let trigger_id = trigger_id.ok_or_else(|| malformed("open button without trigger_id"))?;
        let factory = action
            .value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(FactoryId::from);
        return Ok(InboundEvent::OpenForm {
            trigger_id,
            factory,
        });
    }

    let intent = if action.action_id == EXPAND_ACTION_ID {
        let raw = action
            .value
            .as_deref()
            .ok_or_else(|| malformed("expand button without value"))?;
        let section = parse_section_index(raw)
            .ok_or_else(|| malformed(format!("expand button value {:?} is not a section", raw)))?;
        EditIntent::ExpandSection { section }
    } else {
        match FieldKey::from_action_id(&action.action_id) {
            Some(FieldKey {
                section,
                kind: FieldKind::Machine,
            }) => {
                let machine = action
                    .selected_option
                    .map(|o| o.value)
                    .ok_or_else(|| malformed("machine selection without selected_option"))?;
                EditIntent::CascadeMachineSelected { section, machine }
            }
            _ => return Ok(ignored(format!("action {}", action.action_id))),
        }
    };

    let view = view.ok_or_else(|| malformed("edit action without view"))?;
    if view.callback_id.as_deref() != Some(FORM_CALLBACK_ID) {
        return Err(malformed("edit action on a view that is not the report form"));
    }
    if view.id.is_none() || view.hash.is_none() {
        return Err(malformed("edit action view lacks id or hash"));
    }

    Ok(InboundEvent::Edit {
        intent,
        view: decode_form(&view, default_factory),
    })
}
