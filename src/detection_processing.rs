use std::collections::{BTreeMap, BTreeSet};

use crate::common::{BvrDetection, BvrRecord, RawDetection};

/// Drops detections scoring below `threshold`, keeping emission order.
pub(crate) fn filter_by_confidence(raw: Vec<RawDetection>, threshold: f32) -> Vec<RawDetection> {
    raw.into_iter()
        .filter(|det| det.confidence >= threshold)
        .collect()
}

/// Rejects a detection that cannot be stored: a box corner that is not a
/// finite number, or a confidence outside `[0, 1]`.
pub(crate) fn validate_detection(det: &RawDetection) -> Result<(), String> {
    if !det.bbox.is_finite() {
        return Err(format!("non-finite box {:?} for class '{}'", det.bbox.xy1_xy2(), det.label));
    }
    if !(0.0..=1.0).contains(&det.confidence) {
        return Err(format!("confidence {} for class '{}' is outside [0, 1]", det.confidence, det.label));
    }
    Ok(())
}

/// Turns one image's detector output into its metadata record.
///
/// Per-class totals are tallied over the whole detection list first, then
/// written onto every detection, so `count`, `class_counts` and
/// `unique_classes` always describe the same data. An empty list is valid
/// and yields a record with no objects.
pub fn build_record(image_path: &str, raw: Vec<RawDetection>) -> BvrRecord {
    let mut class_counts: BTreeMap<String, u32> = BTreeMap::new();
    for det in &raw {
        *class_counts.entry(det.label.clone()).or_insert(0) += 1;
    }

    let detections: Vec<BvrDetection> = raw
        .into_iter()
        .map(|det| {
            let count = class_counts.get(&det.label).copied().unwrap_or_default();
            BvrDetection::new(det.label, det.confidence, det.bbox, count)
        })
        .collect();

    let unique_classes: BTreeSet<String> = class_counts.keys().cloned().collect();

    BvrRecord {
        image_path: image_path.to_string(),
        total_objects: detections.len(),
        detections,
        unique_classes,
        class_counts,
    }
}
