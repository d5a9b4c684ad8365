use std::collections::BTreeMap;

use crate::common::{BvrRecord, MetadataCollection, SearchMode, SearchResult, SearchSpec};

/// Per selected class, whether `record` satisfies that class's presence and cap.
pub fn class_matches(record: &BvrRecord, spec: &SearchSpec) -> BTreeMap<String, bool> {
    spec.selected_classes
        .iter()
        .map(|cls| {
            let n = record.count_of(cls);
            (cls.clone(), spec.threshold_for(cls).check_count(n))
        })
        .collect()
}

/// Whether `record` satisfies `spec` as a whole.
///
/// An empty selection matches nothing.
pub fn record_matches(record: &BvrRecord, spec: &SearchSpec) -> bool {
    if spec.selected_classes.is_empty() {
        return false;
    }
    let matches = class_matches(record, spec);
    match spec.mode {
        SearchMode::Any => matches.values().any(|&m| m),
        SearchMode::All => matches.values().all(|&m| m),
    }
}

/// Filters `collection` down to the records matching `spec`, keeping order.
pub fn evaluate(collection: &MetadataCollection, spec: &SearchSpec) -> SearchResult {
    if spec.selected_classes.is_empty() {
        log::debug!("Search with no selected classes, returning no matches");
    }

    let records: Vec<BvrRecord> = collection
        .iter()
        .filter(|record| record_matches(record, spec))
        .cloned()
        .collect();

    log::debug!(
        "Search over {} images for {:?} ({}) matched {}",
        collection.len(),
        spec.selected_classes,
        spec.mode.str(),
        records.len()
    );

    SearchResult {
        records,
        spec: spec.clone(),
    }
}
