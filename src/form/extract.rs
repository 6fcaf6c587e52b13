use report_common::{FieldKey, FieldKind, FieldValue, ReportRecord, SECTION_COUNT, StateBlob};

/// Read every section of a submitted form into report records.
///
/// Sections that were never expanded, or were left blank, produce no record.
/// Output follows section order.
pub fn extract(blob: &StateBlob) -> Vec<ReportRecord> {
    extract_indexed(blob)
        .into_iter()
        .map(|(_, record)| record)
        .collect()
}

/// Like [`extract`], keeping the section index of each record.
pub fn extract_indexed(blob: &StateBlob) -> Vec<(usize, ReportRecord)> {
    (0..SECTION_COUNT)
        .map(|index| (index, read_section(blob, index)))
        .filter(|(_, record)| record.is_material())
        .collect()
}

fn read_section(blob: &StateBlob, index: usize) -> ReportRecord {
    let single = |kind| {
        blob.get(FieldKey::new(index, kind))
            .and_then(FieldValue::single)
            .map(str::to_string)
            .unwrap_or_default()
    };
    let defects = blob
        .get(FieldKey::new(index, FieldKind::Defects))
        .map(FieldValue::many)
        .unwrap_or_default();

    ReportRecord {
        machine_id: single(FieldKind::Machine),
        product_name: single(FieldKind::Product),
        defects,
        details: single(FieldKind::Details),
    }
}
