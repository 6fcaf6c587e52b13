use report_common::keys::{
    EXPAND_ACTION_ID, FORM_CALLBACK_ID, REPORTER_ACTION_ID, REPORTER_BLOCK_ID, heading_block_id,
    product_action_id, toggle_block_id,
};
use report_common::{
    ExpandedSection, FieldKey, FieldKind, FormView, OptionList, SENTINEL_LABEL, SENTINEL_VALUE,
    SectionState,
};

use super::blocks::{Block, Element, SlackOption, SlackView, Text, ViewKind};
use crate::errors::RenderError;

/// Slack rejects static selects with more than this many options.
pub const MAX_SELECT_OPTIONS: usize = 100;

/// Render the form as a modal.
///
/// Fails only if `view` breaks the form's structural invariants, which would
/// indicate a builder or mutator bug.
pub fn render_modal(view: &FormView) -> Result<SlackView, RenderError> {
    view.check_invariants()?;

    let mut blocks = vec![Block::Input {
        block_id: Some(REPORTER_BLOCK_ID.to_string()),
        label: Text::plain("Reporter"),
        element: static_select(
            REPORTER_ACTION_ID.to_string(),
            "Choose your name",
            &view.reporter_options,
            view.selected_reporter.as_deref(),
        ),
        optional: false,
        dispatch_action: false,
    }];

    for section in &view.sections {
        match section {
            SectionState::Collapsed { index } => blocks.push(expand_button(*index)),
            SectionState::Expanded(expanded) => render_section(expanded, &mut blocks),
        }
    }

    Ok(SlackView {
        kind: ViewKind::Modal,
        id: None,
        hash: None,
        callback_id: Some(FORM_CALLBACK_ID.to_string()),
        private_metadata: Some(view.factory.to_string()),
        title: Some(Text::plain("Daily report")),
        submit: Some(Text::plain("Submit")),
        close: Some(Text::plain("Cancel")),
        blocks,
        state: None,
    })
}

fn render_section(section: &ExpandedSection, blocks: &mut Vec<Block>) {
    let i = section.index;
    if i > 0 {
        blocks.push(Block::Divider { block_id: None });
    }
    blocks.push(Block::Section {
        block_id: Some(heading_block_id(i)),
        text: Some(Text::mrkdwn(format!("*Unit {}*", i + 1))),
    });

    let machine = FieldKey::new(i, FieldKind::Machine);
    blocks.push(Block::Input {
        block_id: Some(machine.block_id()),
        label: Text::plain("Machine"),
        element: static_select(
            machine.action_id(),
            "Choose a machine",
            &section.machine_options,
            section.selected_machine.as_deref(),
        ),
        optional: true,
        dispatch_action: true,
    });

    // Until a machine is picked there is nothing to choose from, so the
    // product is free text.
    let product = FieldKey::new(i, FieldKind::Product);
    let product_action = product_action_id(i, section.selected_machine.as_deref());
    let product_element = if section.selected_machine.is_some() {
        static_select(
            product_action,
            "Choose a product",
            &section.product_options,
            section.selected_product.as_deref(),
        )
    } else {
        Element::PlainTextInput {
            action_id: product_action,
            placeholder: Some(Text::plain("Choose a machine first, or type a product")),
            initial_value: section.selected_product.clone(),
            multiline: false,
        }
    };
    blocks.push(Block::Input {
        block_id: Some(product.block_id()),
        label: Text::plain("Product"),
        element: product_element,
        optional: true,
        dispatch_action: false,
    });

    let defects = FieldKey::new(i, FieldKind::Defects);
    let initial: Vec<SlackOption> = capped(&section.defect_options)
        .filter(|o| section.selected_defects.contains(&o.value))
        .collect();
    blocks.push(Block::Input {
        block_id: Some(defects.block_id()),
        label: Text::plain("Defects"),
        element: Element::MultiStaticSelect {
            action_id: defects.action_id(),
            placeholder: Some(Text::plain("Choose defects")),
            options: capped(&section.defect_options).collect(),
            initial_options: (!initial.is_empty()).then_some(initial),
        },
        optional: true,
        dispatch_action: false,
    });

    let details = FieldKey::new(i, FieldKind::Details);
    blocks.push(Block::Input {
        block_id: Some(details.block_id()),
        label: Text::plain("Equipment notes / details"),
        element: Element::PlainTextInput {
            action_id: details.action_id(),
            placeholder: None,
            initial_value: (!section.details.is_empty()).then(|| section.details.clone()),
            multiline: true,
        },
        optional: true,
        dispatch_action: false,
    });
}

fn expand_button(index: usize) -> Block {
    Block::Actions {
        block_id: Some(toggle_block_id(index)),
        elements: vec![Element::Button {
            action_id: EXPAND_ACTION_ID.to_string(),
            text: Text::plain(format!("+ Add unit {}", index + 1)),
            value: Some(index.to_string()),
            style: None,
        }],
    }
}

fn static_select(
    action_id: String,
    placeholder: &str,
    options: &OptionList,
    selected: Option<&str>,
) -> Element {
    let options: Vec<SlackOption> = capped(options).collect();
    let initial_option = selected.and_then(|s| options.iter().find(|o| o.value == s).cloned());
    Element::StaticSelect {
        action_id,
        placeholder: Some(Text::plain(placeholder)),
        options,
        initial_option,
    }
}

fn capped(options: &OptionList) -> impl Iterator<Item = SlackOption> + '_ {
    options.values().iter().take(MAX_SELECT_OPTIONS).map(|value| {
        if value == SENTINEL_VALUE {
            SlackOption::new(SENTINEL_LABEL, SENTINEL_VALUE)
        } else {
            SlackOption::new(value.as_str(), value.as_str())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use report_common::{CatalogSnapshot, EditIntent, FactoryId, FormError};

    use super::*;
    use crate::form::{apply, build_initial_view};

    fn catalog() -> CatalogSnapshot {
        let mut machines = BTreeMap::new();
        machines.insert("M1".to_string(), vec!["P1".to_string(), "P2".to_string()]);
        let mut by_factory = BTreeMap::new();
        by_factory.insert(FactoryId::from("1a_machine"), machines);
        CatalogSnapshot {
            reporters: vec!["Sato".into()],
            defect_categories: vec!["burr".into(), "crack".into()],
            machines_by_factory: by_factory,
        }
    }

    fn initial() -> FormView {
        build_initial_view(&FactoryId::from("1a_machine"), &catalog())
    }

    fn input_element<'a>(view: &'a SlackView, block_id: &str) -> &'a Element {
        view.blocks
            .iter()
            .find_map(|b| match b {
                Block::Input { block_id: Some(id), element, .. } if id == block_id => Some(element),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no input block {block_id}"))
    }

    #[test]
    fn modal_carries_callback_and_factory() {
        let modal = render_modal(&initial()).unwrap();
        assert_eq!(modal.callback_id.as_deref(), Some(FORM_CALLBACK_ID));
        assert_eq!(modal.private_metadata.as_deref(), Some("1a_machine"));
        assert_eq!(modal.kind, ViewKind::Modal);
    }

    #[test]
    fn initial_modal_has_one_section_and_nine_expand_buttons() {
        let modal = render_modal(&initial()).unwrap();
        let buttons: Vec<&str> = modal
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Actions { block_id, .. } => block_id.as_deref(),
                _ => None,
            })
            .collect();
        assert_eq!(buttons.len(), 9);
        assert_eq!(buttons[0], "toggle_1");
        assert_eq!(buttons[8], "toggle_9");

        match input_element(&modal, "machine_0") {
            Element::StaticSelect { action_id, options, .. } => {
                assert_eq!(action_id, "machine_select_0");
                assert_eq!(options.len(), 1);
            }
            other => panic!("unexpected element {other:?}"),
        }
        assert!(matches!(
            input_element(&modal, "product_0"),
            Element::PlainTextInput { .. }
        ));
    }

    #[test]
    fn expand_button_value_is_section_index() {
        let modal = render_modal(&initial()).unwrap();
        let Some(Block::Actions { elements, .. }) = modal
            .blocks
            .iter()
            .find(|b| b.block_id() == Some("toggle_4"))
        else {
            panic!("toggle_4 missing");
        };
        match &elements[0] {
            Element::Button { action_id, value, .. } => {
                assert_eq!(action_id, EXPAND_ACTION_ID);
                assert_eq!(value.as_deref(), Some("4"));
            }
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn machine_input_dispatches_actions() {
        let modal = render_modal(&initial()).unwrap();
        let dispatch = modal.blocks.iter().find_map(|b| match b {
            Block::Input { block_id: Some(id), dispatch_action, .. } if id == "machine_0" => {
                Some(*dispatch_action)
            }
            _ => None,
        });
        assert_eq!(dispatch, Some(true));
    }

    #[test]
    fn selected_machine_renders_product_select_with_initial_option() {
        let view = apply(
            initial(),
            &EditIntent::CascadeMachineSelected {
                section: 0,
                machine: "M1".into(),
            },
            &catalog(),
        );
        let modal = render_modal(&view).unwrap();

        match input_element(&modal, "machine_0") {
            Element::StaticSelect { initial_option, .. } => {
                assert_eq!(initial_option.as_ref().map(|o| o.value.as_str()), Some("M1"));
            }
            other => panic!("unexpected element {other:?}"),
        }
        match input_element(&modal, "product_0") {
            Element::StaticSelect { action_id, options, initial_option, .. } => {
                assert_eq!(action_id, "product_select_0_M1");
                let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
                assert_eq!(values, vec!["P1", "P2"]);
                assert!(initial_option.is_none());
            }
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn product_action_id_changes_with_every_cascade() {
        fn product_action(view: &FormView) -> String {
            let modal = render_modal(view).unwrap();
            match input_element(&modal, "product_0") {
                Element::StaticSelect { action_id, .. }
                | Element::PlainTextInput { action_id, .. } => action_id.clone(),
                other => panic!("unexpected element {other:?}"),
            }
        }
        let cascade = |view: FormView, machine: &str| {
            apply(
                view,
                &EditIntent::CascadeMachineSelected {
                    section: 0,
                    machine: machine.into(),
                },
                &catalog(),
            )
        };

        let free_text = initial();
        let on_m1 = cascade(free_text.clone(), "M1");
        let on_m2 = cascade(on_m1.clone(), "M2");
        let back_to_none = cascade(on_m2.clone(), SENTINEL_VALUE);

        assert_eq!(product_action(&free_text), "product_input_0");
        assert_ne!(product_action(&on_m1), product_action(&free_text));
        assert_ne!(product_action(&on_m2), product_action(&on_m1));
        assert_eq!(product_action(&back_to_none), "product_input_0");
    }

    #[test]
    fn sentinel_option_uses_dash_label() {
        let view = build_initial_view(&FactoryId::from("1a_machine"), &CatalogSnapshot::empty());
        let modal = render_modal(&view).unwrap();
        match input_element(&modal, REPORTER_BLOCK_ID) {
            Element::StaticSelect { options, .. } => {
                assert_eq!(options, &vec![SlackOption::new(SENTINEL_LABEL, SENTINEL_VALUE)]);
            }
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn long_option_lists_are_capped() {
        let mut catalog = catalog();
        catalog.reporters = (0..250).map(|i| format!("person {i}")).collect();
        let view = build_initial_view(&FactoryId::from("1a_machine"), &catalog);
        let modal = render_modal(&view).unwrap();
        match input_element(&modal, REPORTER_BLOCK_ID) {
            Element::StaticSelect { options, .. } => assert_eq!(options.len(), MAX_SELECT_OPTIONS),
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn filled_values_render_back_as_initial_values() {
        let mut view = initial();
        view.selected_reporter = Some("Sato".into());
        if let SectionState::Expanded(s) = &mut view.sections[0] {
            s.selected_defects = vec!["crack".into(), "gone".into()];
            s.details = "noisy".into();
            s.selected_product = Some("typed".into());
        }
        let modal = render_modal(&view).unwrap();

        match input_element(&modal, "reporter") {
            Element::StaticSelect { initial_option, .. } => {
                assert_eq!(initial_option.as_ref().map(|o| o.value.as_str()), Some("Sato"));
            }
            other => panic!("unexpected element {other:?}"),
        }
        match input_element(&modal, "defect_0") {
            Element::MultiStaticSelect { initial_options, .. } => {
                let values: Vec<&str> = initial_options
                    .as_ref()
                    .unwrap()
                    .iter()
                    .map(|o| o.value.as_str())
                    .collect();
                assert_eq!(values, vec!["crack"]);
            }
            other => panic!("unexpected element {other:?}"),
        }
        match input_element(&modal, "details_0") {
            Element::PlainTextInput { initial_value, .. } => {
                assert_eq!(initial_value.as_deref(), Some("noisy"));
            }
            other => panic!("unexpected element {other:?}"),
        }
        match input_element(&modal, "product_0") {
            Element::PlainTextInput { initial_value, .. } => {
                assert_eq!(initial_value.as_deref(), Some("typed"));
            }
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn broken_view_is_refused() {
        let mut view = initial();
        view.sections[0] = SectionState::Collapsed { index: 0 };
        let err = render_modal(&view).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Invariant(FormError::FirstSectionCollapsed)
        ));
    }

    #[test]
    fn fully_expanded_form_stays_within_block_limit() {
        let mut view = initial();
        for i in 1..report_common::SECTION_COUNT {
            view = apply(view, &EditIntent::ExpandSection { section: i }, &catalog());
        }
        let modal = render_modal(&view).unwrap();
        assert!(modal.blocks.len() <= 100);
    }
}
