use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{BvrDetection, RawDetection};
use crate::detection_processing;

/// Detection metadata for one processed image.
///
/// `total_objects`, `unique_classes`, `class_counts` and every detection's
/// `count` are derived from `detections`. Records built by
/// [`detection_processing::build_record`] always agree with their detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BvrRecord {
    pub image_path: String,
    #[serde(alias = "detection")]
    pub detections: Vec<BvrDetection>,
    pub total_objects: usize,
    #[serde(alias = "unique_class")]
    pub unique_classes: BTreeSet<String>,
    pub class_counts: BTreeMap<String, u32>,
}

impl BvrRecord {
    /// Number of detections carrying `label`, zero when the class is absent.
    pub fn count_of(&self, label: &str) -> u32 {
        self.class_counts.get(label).copied().unwrap_or(0)
    }

    pub fn file_name(&self) -> String {
        Path::new(&self.image_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.image_path.clone())
    }

    /// Recomputes every derived field from `detections`.
    pub fn rederive(&self) -> BvrRecord {
        let raw: Vec<RawDetection> = self.detections.iter().map(RawDetection::from).collect();
        detection_processing::build_record(&self.image_path, raw)
    }

    /// True when the derived fields agree with `detections`.
    pub fn is_consistent(&self) -> bool {
        *self == self.rederive()
    }
}

/// Ordered set of image records, the unit of persistence and querying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataCollection(Vec<BvrRecord>);

impl MetadataCollection {
    pub fn new(records: Vec<BvrRecord>) -> Self {
        Self(records)
    }

    pub fn into_records(self) -> Vec<BvrRecord> {
        self.0
    }
}

impl std::ops::Deref for MetadataCollection {
    type Target = [BvrRecord];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<BvrRecord>> for MetadataCollection {
    fn from(records: Vec<BvrRecord>) -> Self {
        Self(records)
    }
}

impl FromIterator<BvrRecord> for MetadataCollection {
    fn from_iter<I: IntoIterator<Item = BvrRecord>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MetadataCollection {
    type Item = &'a BvrRecord;
    type IntoIter = std::slice::Iter<'a, BvrRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
