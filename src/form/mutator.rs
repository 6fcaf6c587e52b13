use report_common::{
    CatalogSnapshot, EditIntent, FormView, OptionList, SECTION_COUNT, SENTINEL_VALUE, SectionState,
};
use tracing::debug;

use super::builder::build_section;

/// Apply one edit to `view`.
///
/// Total: intents that do not fit the view (a collapsed or unknown section
/// for a cascade, an already expanded or out-of-range one for an expand)
/// return the view unchanged. The version token is carried through; the
/// render call is what checks it.
pub fn apply(view: FormView, intent: &EditIntent, catalog: &CatalogSnapshot) -> FormView {
    let view = match intent {
        EditIntent::CascadeMachineSelected { section, machine } => {
            cascade(view, *section, machine, catalog)
        }
        EditIntent::ExpandSection { section } => expand(view, *section, catalog),
    };
    align_products(view, catalog)
}

/// Re-derive every expanded section's product options from its selected
/// machine, dropping a selected product that left the domain.
///
/// A decoded view can carry a machine from input state next to the options
/// rendered for an earlier machine, e.g. after an update that lost a race.
fn align_products(mut view: FormView, catalog: &CatalogSnapshot) -> FormView {
    let factory = view.factory.clone();
    for section in view.sections.iter_mut() {
        let SectionState::Expanded(section) = section else {
            continue;
        };
        let Some(machine) = section.selected_machine.as_deref() else {
            continue;
        };
        let products = catalog.product_options(&factory, machine);
        if products != section.product_options {
            debug!(section = section.index, machine, "product options realigned with machine");
            section.product_options = products;
        }
        if section
            .selected_product
            .as_deref()
            .is_some_and(|p| !section.product_options.contains(p))
        {
            section.selected_product = None;
        }
    }
    view
}

fn cascade(mut view: FormView, index: usize, machine: &str, catalog: &CatalogSnapshot) -> FormView {
    let factory = view.factory.clone();
    let Some(SectionState::Expanded(section)) =
        view.sections.iter_mut().find(|s| s.index() == index)
    else {
        debug!(section = index, "cascade on a section that is not expanded, ignoring");
        return view;
    };

    let machine = machine.trim();
    if machine.is_empty() || machine == SENTINEL_VALUE {
        section.selected_machine = None;
        section.product_options = OptionList::sentinel();
    } else {
        section.selected_machine = Some(machine.to_string());
        section.product_options = catalog.product_options(&factory, machine);
    }
    section.selected_product = None;
    view
}

fn expand(mut view: FormView, index: usize, catalog: &CatalogSnapshot) -> FormView {
    if index >= SECTION_COUNT {
        debug!(section = index, "expand out of range, ignoring");
        return view;
    }
    let fresh = SectionState::Expanded(build_section(index, &view.factory, catalog));
    match view.sections.iter_mut().find(|s| s.index() == index) {
        Some(SectionState::Expanded(_)) => {}
        Some(slot) => *slot = fresh,
        None => {
            view.sections.push(fresh);
            view.sections.sort_by_key(SectionState::index);
        }
    }
    view
}
