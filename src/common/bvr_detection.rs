use serde::{Deserialize, Serialize};
use crate::common::BvrBox;

/// One object reported by a detector, before it is placed in an image record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BvrBox,
}

impl RawDetection {
    pub fn new(label: &str, confidence: f32, bbox: BvrBox) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            bbox,
        }
    }
}

/// One detected object inside a persisted image record.
///
/// `count` is the number of detections in the same record that share `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BvrDetection {
    #[serde(rename = "class")]
    pub label: String,
    pub confidence: f32,
    pub bbox: BvrBox,
    pub count: u32,
}

impl BvrDetection {
    pub fn new(label: String, confidence: f32, bbox: BvrBox, count: u32) -> Self {
        Self {
            label,
            confidence,
            bbox,
            count,
        }
    }

    pub fn label_with_confidence(&self) -> String {
        format!("{} {:.2}", self.label, self.confidence)
    }
}

impl From<&BvrDetection> for RawDetection {
    fn from(det: &BvrDetection) -> Self {
        RawDetection::new(&det.label, det.confidence, det.bbox)
    }
}
