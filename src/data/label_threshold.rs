use serde::{Deserialize, Serialize};

use crate::error::BvrError;

/// Values that mean "no cap" when a threshold arrives as text.
const NO_LIMIT: [&str; 3] = ["none", "", "no limit"];

/// Optional per-class cap on how many detections a matching image may hold.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelThreshold {
    pub label: String,
    pub max_count: Option<u32>,
}

impl LabelThreshold {
    pub fn new(label: &str, max_count: Option<u32>) -> Self {
        Self {
            label: label.to_string(),
            max_count,
        }
    }

    pub fn unbounded(label: &str) -> Self {
        Self::new(label, None)
    }

    /// Parses a user supplied cap such as `"3"` or `"None"`.
    pub fn parse(label: &str, raw: &str) -> Result<Self, BvrError> {
        let trimmed = raw.trim();
        if NO_LIMIT.contains(&trimmed.to_lowercase().as_str()) {
            return Ok(Self::unbounded(label));
        }
        let max_count = trimmed.parse::<u32>().map_err(|_| {
            BvrError::InvalidSearchSpec(format!(
                "threshold for class '{}' must be a non-negative integer or None, got '{}'",
                label, raw
            ))
        })?;
        Ok(Self::new(label, Some(max_count)))
    }

    /// Whether an image holding `n` detections of this class matches it.
    ///
    /// Presence is always required. With a cap, `n` above the cap fails even
    /// though the class is present.
    pub fn check_count(&self, n: u32) -> bool {
        match self.max_count {
            None => n >= 1,
            Some(cap) => n >= 1 && n <= cap,
        }
    }
}
