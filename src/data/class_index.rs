use std::collections::{BTreeMap, BTreeSet};

use crate::common::MetadataCollection;

/// Classes present in a collection and the per-image counts seen for each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassIndex {
    /// Sorted, distinct class labels.
    pub unique_classes: Vec<String>,
    /// Per class, the sorted distinct counts observed in images containing it.
    pub count_options: BTreeMap<String, Vec<u32>>,
}

impl ClassIndex {
    pub fn is_empty(&self) -> bool {
        self.unique_classes.is_empty()
    }

    pub fn options_for(&self, label: &str) -> &[u32] {
        self.count_options.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, label: &str) -> bool {
        self.count_options.contains_key(label)
    }
}

/// Derives the [`ClassIndex`] of a collection from each record's `class_counts`.
pub fn build_index(collection: &MetadataCollection) -> ClassIndex {
    let mut options: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();

    for record in collection {
        for (label, &count) in &record.class_counts {
            options.entry(label.clone()).or_default().insert(count);
        }
    }

    ClassIndex {
        unique_classes: options.keys().cloned().collect(),
        count_options: options
            .into_iter()
            .map(|(label, counts)| (label, counts.into_iter().collect()))
            .collect(),
    }
}
