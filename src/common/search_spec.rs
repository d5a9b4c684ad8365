use std::collections::BTreeMap;

use crate::common::BvrRecord;
use crate::data::LabelThreshold;
use crate::error::BvrError;

/// How per-class matches combine into an image match.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Any selected class matches (logical OR).
    #[default] Any,
    /// Every selected class matches (logical AND).
    All,
}

// Storing the "proper" spelling and the lowercase version.
static ANY: [&str; 2] = ["ANY", "any"];
static ALL: [&str; 2] = ["ALL", "all"];

impl SearchMode {
    pub fn str(&self) -> &'static str {
        match self {
            SearchMode::Any => ANY[0],
            SearchMode::All => ALL[0],
        }
    }

    pub fn str_lowercase(&self) -> &'static str {
        match self {
            SearchMode::Any => ANY[1],
            SearchMode::All => ALL[1],
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            SearchMode::Any => "Any of selected classes (OR)",
            SearchMode::All => "All selected classes (AND)",
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = BvrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "any" | "or" => Ok(SearchMode::Any),
            "all" | "and" => Ok(SearchMode::All),
            _ if lowered.starts_with("any") => Ok(SearchMode::Any),
            _ if lowered.starts_with("all") => Ok(SearchMode::All),
            _ => Err(BvrError::InvalidSearchSpec(format!(
                "unknown search mode '{}', use 'any' or 'all'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.str_lowercase())
    }
}

/// A query over a metadata collection.
///
/// `thresholds` may hold entries for classes that are not selected (they are
/// ignored) and may omit selected classes (those are unbounded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSpec {
    pub selected_classes: Vec<String>,
    pub mode: SearchMode,
    pub thresholds: BTreeMap<String, Option<u32>>,
}

impl SearchSpec {
    /// Duplicate class names are dropped, first occurrence wins.
    pub fn new<S: AsRef<str>>(selected_classes: &[S], mode: SearchMode) -> Self {
        let mut selected: Vec<String> = Vec::with_capacity(selected_classes.len());
        for cls in selected_classes {
            let cls = cls.as_ref();
            if !selected.iter().any(|s| s == cls) {
                selected.push(cls.to_string());
            }
        }
        Self {
            selected_classes: selected,
            mode,
            thresholds: BTreeMap::new(),
        }
    }

    pub fn with_threshold(mut self, label: &str, max_count: Option<u32>) -> Self {
        self.thresholds.insert(label.to_string(), max_count);
        self
    }

    /// Sets a threshold from its textual form, e.g. `"2"` or `"None"`.
    pub fn with_raw_threshold(self, label: &str, raw: &str) -> Result<Self, BvrError> {
        let parsed = LabelThreshold::parse(label, raw)?;
        Ok(self.with_threshold(label, parsed.max_count))
    }

    pub fn threshold_for(&self, label: &str) -> LabelThreshold {
        LabelThreshold::new(label, self.thresholds.get(label).copied().flatten())
    }

    pub fn is_selected(&self, label: &str) -> bool {
        self.selected_classes.iter().any(|cls| cls == label)
    }
}

/// Records that satisfied a [`SearchSpec`], in collection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub records: Vec<BvrRecord>,
    pub spec: SearchSpec,
}

impl SearchResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> String {
        format!("Found {} images matching criteria ({})", self.len(), self.spec.mode.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing() {
        assert_eq!("ANY".parse::<SearchMode>().unwrap(), SearchMode::Any);
        assert_eq!("and".parse::<SearchMode>().unwrap(), SearchMode::All);
        assert_eq!("Any of selected classes OR".parse::<SearchMode>().unwrap(), SearchMode::Any);
        assert_eq!("All selected Classes".parse::<SearchMode>().unwrap(), SearchMode::All);
        assert!("some".parse::<SearchMode>().is_err());
        assert_eq!(SearchMode::All.to_string(), "all");
    }

    #[test]
    fn selection_is_deduplicated() {
        let spec = SearchSpec::new(&["cat", "dog", "cat"], SearchMode::Any);
        assert_eq!(spec.selected_classes, vec!["cat", "dog"]);
    }

    #[test]
    fn missing_threshold_is_unbounded() {
        let spec = SearchSpec::new(&["cat"], SearchMode::Any)
            .with_raw_threshold("dog", "3")
            .unwrap();
        assert_eq!(spec.threshold_for("cat").max_count, None);
        assert_eq!(spec.threshold_for("dog").max_count, Some(3));
        assert!(SearchSpec::new(&["cat"], SearchMode::Any).with_raw_threshold("cat", "x").is_err());
    }
}
