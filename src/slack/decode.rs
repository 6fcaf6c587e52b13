//! Reading platform views back into the form model.
//!
//! Decoding is lenient about content (a missing or empty option list becomes
//! the sentinel) but strict about identity: the caller has already checked
//! the view is our modal.

use std::collections::BTreeMap;

use report_common::keys::REPORTER_BLOCK_ID;
use report_common::{
    ExpandedSection, FactoryId, FieldKey, FieldKind, FieldValue, FormView, OptionList,
    SECTION_COUNT, SENTINEL_VALUE, SectionState, StateBlob, VersionToken,
};

use super::blocks::{Block, Element, SlackView, StateValue};

#[derive(Default)]
struct SectionParts {
    machine: Option<(Vec<String>, Option<String>)>,
    product: Option<(Vec<String>, bool, Option<String>)>,
    defects: Option<(Vec<String>, Vec<String>)>,
    details: Option<String>,
}

/// The factory a modal was opened for, carried in `private_metadata`.
pub fn view_factory(view: &SlackView, default_factory: &FactoryId) -> FactoryId {
    view.private_metadata
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(FactoryId::from)
        .unwrap_or_else(|| default_factory.clone())
}

/// Rebuild the server-side form model from a modal view.
///
/// Current input state takes precedence over initial values baked into the
/// blocks. Sections with no inputs become collapsed.
pub fn decode_form(view: &SlackView, default_factory: &FactoryId) -> FormView {
    let factory = view_factory(view, default_factory);

    let mut reporter_options = OptionList::sentinel();
    let mut selected_reporter = None;
    let mut parts: BTreeMap<usize, SectionParts> = BTreeMap::new();

    for block in &view.blocks {
        let Block::Input {
            block_id: Some(block_id),
            element,
            ..
        } = block
        else {
            continue;
        };
        let state = view.state_value(block_id);

        if block_id == REPORTER_BLOCK_ID {
            reporter_options = lenient_options(block_id, element.option_values());
            selected_reporter = selected_single(element, state);
            continue;
        }

        let Some(key) = FieldKey::from_block_id(block_id) else {
            continue;
        };
        let section = parts.entry(key.section).or_default();
        match key.kind {
            FieldKind::Machine => {
                section.machine = Some((element.option_values(), selected_single(element, state)));
            }
            FieldKind::Product => {
                let is_select = matches!(element, Element::StaticSelect { .. });
                section.product = Some((
                    element.option_values(),
                    is_select,
                    selected_single(element, state),
                ));
            }
            FieldKind::Defects => {
                section.defects = Some((element.option_values(), selected_many(element, state)));
            }
            FieldKind::Details => {
                section.details = selected_single(element, state);
            }
        }
    }

    // Every index without inputs is collapsed, whether or not its toggle
    // block survived.
    let sections = (0..SECTION_COUNT)
        .map(|index| match parts.remove(&index) {
            Some(p) if p.machine.is_some() => SectionState::Expanded(expanded_from(index, p)),
            _ => SectionState::Collapsed { index },
        })
        .collect();

    FormView {
        view_id: view.id.clone(),
        version: view.hash.clone().map(VersionToken::new),
        factory,
        reporter_options,
        selected_reporter,
        sections,
    }
}

fn expanded_from(index: usize, parts: SectionParts) -> ExpandedSection {
    let (machine_values, selected_machine) = parts.machine.unwrap_or_default();
    let selected_machine = selected_machine.filter(|m| m != SENTINEL_VALUE);

    // Products only have a domain once a machine is chosen; a free-text
    // product keeps its value but has no options.
    let (product_values, product_is_select, selected_product) =
        parts.product.unwrap_or((Vec::new(), false, None));
    let product_options = if selected_machine.is_some() && product_is_select {
        lenient_options(&FieldKey::new(index, FieldKind::Product).block_id(), product_values)
    } else {
        OptionList::sentinel()
    };

    let (defect_values, selected_defects) = parts.defects.unwrap_or_default();

    ExpandedSection {
        index,
        machine_options: lenient_options(
            &FieldKey::new(index, FieldKind::Machine).block_id(),
            machine_values,
        ),
        product_options,
        defect_options: lenient_options(
            &FieldKey::new(index, FieldKind::Defects).block_id(),
            defect_values,
        ),
        selected_machine,
        selected_product: selected_product.filter(|p| p != SENTINEL_VALUE),
        selected_defects,
        details: parts.details.unwrap_or_default(),
    }
}

fn lenient_options(field: &str, values: Vec<String>) -> OptionList {
    OptionList::try_new(field, values).unwrap_or_else(|_| OptionList::sentinel())
}

fn selected_single(element: &Element, state: Option<&StateValue>) -> Option<String> {
    if let Some(state) = state {
        return state
            .selected_option
            .as_ref()
            .map(|o| o.value.clone())
            .or_else(|| state.value.clone())
            .filter(|v| !v.trim().is_empty());
    }
    match element {
        Element::StaticSelect { initial_option, .. } => {
            initial_option.as_ref().map(|o| o.value.clone())
        }
        Element::PlainTextInput { initial_value, .. } => {
            initial_value.clone().filter(|v| !v.trim().is_empty())
        }
        _ => None,
    }
}

fn selected_many(element: &Element, state: Option<&StateValue>) -> Vec<String> {
    let options = match state {
        Some(state) => state.selected_options.clone().unwrap_or_default(),
        None => match element {
            Element::MultiStaticSelect { initial_options, .. } => {
                initial_options.clone().unwrap_or_default()
            }
            _ => Vec::new(),
        },
    };
    options.into_iter().map(|o| o.value).collect()
}

/// Flatten a submitted view's input state into a [`StateBlob`].
///
/// Block ids that do not name a form field are ignored.
pub fn decode_state(view: &SlackView) -> StateBlob {
    let mut blob = StateBlob::new();
    let Some(state) = view.state.as_ref() else {
        return blob;
    };

    for (block_id, actions) in &state.values {
        let Some(value) = actions.values().next() else {
            continue;
        };
        if block_id == REPORTER_BLOCK_ID {
            blob.reporter = value
                .selected_option
                .as_ref()
                .map(|o| o.value.clone())
                .filter(|v| v != SENTINEL_VALUE);
            continue;
        }
        if let Some(key) = FieldKey::from_block_id(block_id) {
            blob.insert(key, field_value(value));
        }
    }
    blob
}

fn field_value(value: &StateValue) -> FieldValue {
    match value.kind.as_deref() {
        Some("multi_static_select") => FieldValue::MultiSelected(
            value
                .selected_options
                .iter()
                .flatten()
                .map(|o| o.value.clone())
                .collect(),
        ),
        Some("static_select") => {
            FieldValue::Selected(value.selected_option.as_ref().map(|o| o.value.clone()))
        }
        Some(_) => FieldValue::Text(value.value.clone()),
        // No type tag: go by which field is populated.
        None => {
            if let Some(options) = &value.selected_options {
                FieldValue::MultiSelected(options.iter().map(|o| o.value.clone()).collect())
            } else if let Some(option) = &value.selected_option {
                FieldValue::Selected(Some(option.value.clone()))
            } else {
                FieldValue::Text(value.value.clone())
            }
        }
    }
}
