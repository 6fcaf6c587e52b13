use report_common::{
    CatalogSnapshot, ExpandedSection, FactoryId, FormView, OptionList, SECTION_COUNT, SectionState,
};

/// The form as first opened: section 0 expanded, the rest collapsed.
pub fn build_initial_view(factory: &FactoryId, catalog: &CatalogSnapshot) -> FormView {
    let sections = (0..SECTION_COUNT)
        .map(|index| {
            if index == 0 {
                SectionState::Expanded(build_section(index, factory, catalog))
            } else {
                SectionState::Collapsed { index }
            }
        })
        .collect();

    FormView {
        view_id: None,
        version: None,
        factory: factory.clone(),
        reporter_options: catalog.reporter_options(),
        selected_reporter: None,
        sections,
    }
}

/// A freshly expanded section. Products stay on the sentinel until a
/// machine is chosen.
pub fn build_section(index: usize, factory: &FactoryId, catalog: &CatalogSnapshot) -> ExpandedSection {
    ExpandedSection {
        index,
        machine_options: catalog.machine_options(factory),
        product_options: OptionList::sentinel(),
        defect_options: catalog.defect_options(),
        selected_machine: None,
        selected_product: None,
        selected_defects: Vec::new(),
        details: String::new(),
    }
}
