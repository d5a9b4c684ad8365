use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{MetadataCollection, SearchMode, SearchResult, SearchSpec};
use crate::data::{self, build_index, ClassIndex};
use crate::detection_runners::{DirectoryReport, RunOptions};
use crate::detectors::Detector;
use crate::error::BvrError;
use crate::query_engine;

/// A loaded collection together with its class index.
///
/// Snapshots are never mutated. Loading or processing replaces the whole
/// snapshot, so readers holding an `Arc` keep a consistent view.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub collection: MetadataCollection,
    pub index: ClassIndex,
    pub source: Option<PathBuf>,
}

impl Snapshot {
    fn new(collection: MetadataCollection, source: Option<PathBuf>) -> Self {
        let index = build_index(&collection);
        Self {
            collection,
            index,
            source,
        }
    }
}

/// Search input as a user interface collects it.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub selected_classes: Vec<String>,
    pub mode: String,
    /// Raw per-class caps such as `"2"` or `"None"`.
    pub thresholds: BTreeMap<String, String>,
}

impl SearchRequest {
    /// Validates the raw input into a [`SearchSpec`]. Caps for classes that
    /// are not selected are ignored.
    pub fn to_spec(&self) -> Result<SearchSpec, BvrError> {
        let mode: SearchMode = if self.mode.trim().is_empty() {
            SearchMode::default()
        } else {
            self.mode.parse()?
        };
        let mut spec = SearchSpec::new(&self.selected_classes, mode);
        for (label, raw) in &self.thresholds {
            if spec.is_selected(label) {
                spec = spec.with_raw_threshold(label, raw)?;
            }
        }
        Ok(spec)
    }
}

/// Application state shared between a user interface and the search core.
///
/// Holds the current snapshot and the most recent search result. One writer
/// replaces them, any number of readers may look at them.
#[derive(Debug, Default)]
pub struct AppState {
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    last_result: RwLock<Option<Arc<SearchResult>>>,
}

impl AppState {
    pub fn new() -> Self {
        Default::default()
    }

    /// Installs `collection` as the current snapshot and clears the last result.
    pub fn replace_collection(&self, collection: MetadataCollection, source: Option<PathBuf>) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::new(collection, source));
        *self.snapshot.write() = Some(snapshot.clone());
        *self.last_result.write() = None;
        snapshot
    }

    /// Runs the detector over `dir`, saves the metadata and makes it current.
    /// Returns the batch report and the path of the saved metadata file.
    pub fn process_directory(
        &self,
        dir: &Path,
        detector: &dyn Detector,
        options: &RunOptions,
    ) -> Result<(DirectoryReport, PathBuf), BvrError> {
        let (report, saved) = crate::process_and_save(dir, detector, options)?;
        self.replace_collection(report.records.clone(), Some(saved.clone()));
        Ok((report, saved))
    }

    /// Loads metadata from `path` and makes it current. On error the current
    /// snapshot is left untouched.
    pub fn load_metadata(&self, path: &Path) -> Result<Arc<Snapshot>, BvrError> {
        let collection = data::load(path)?;
        Ok(self.replace_collection(collection, Some(path.to_path_buf())))
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().clone()
    }

    pub fn class_index(&self) -> Option<ClassIndex> {
        self.snapshot().map(|snapshot| snapshot.index.clone())
    }

    /// Evaluates `request` against the current snapshot.
    ///
    /// An invalid request leaves the previous result in place. Without a
    /// loaded collection the result is empty.
    pub fn search(&self, request: &SearchRequest) -> Result<Arc<SearchResult>, BvrError> {
        let spec = request.to_spec()?;
        let result = match self.snapshot() {
            Some(snapshot) => query_engine::evaluate(&snapshot.collection, &spec),
            None => SearchResult {
                records: Vec::new(),
                spec,
            },
        };
        let result = Arc::new(result);
        *self.last_result.write() = Some(result.clone());
        Ok(result)
    }

    pub fn last_result(&self) -> Option<Arc<SearchResult>> {
        self.last_result.read().clone()
    }

    pub fn clear_result(&self) {
        *self.last_result.write() = None;
    }
}
