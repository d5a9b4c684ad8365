mod utils;
pub mod app_state;
pub mod common;
pub mod config;
pub mod data;
pub mod detection_processing;
pub mod detection_runners;
pub mod detectors;
pub mod error;
pub mod overlay;
pub mod query_engine;

use std::path::{Path, PathBuf};

use crate::common::{MetadataCollection, SearchResult, SearchSpec};
use crate::config::SearchConfig;
use crate::detection_runners::{DirectoryReport, RunOptions};
use crate::detectors::{Detector, YoloLabelDetector};

pub use crate::error::BvrError;

pub type Result<T, E = BvrError> = std::result::Result<T, E>;

pub fn init_detector(config: &SearchConfig) -> anyhow::Result<YoloLabelDetector> {
    log::info!("Initializing detector\n{}", config.model);
    let detector = YoloLabelDetector::from_config(&config.model)?;
    log::info!("Detector '{}' ready with {} classes", detector.name(), detector.names().len());
    Ok(detector)
}

/// Processes every image in `dir` and saves the collection next to it.
/// Returns the report and the path of the written metadata file.
pub fn process_and_save(
    dir: &Path,
    detector: &dyn Detector,
    options: &RunOptions,
) -> Result<(DirectoryReport, PathBuf)> {
    let report = detection_runners::process_directory(dir, detector, options)?;
    let saved = data::save(&report.records, dir)?;
    Ok((report, saved))
}

/// Loads the metadata at `path` and evaluates `spec` against it.
pub fn search_file(path: &Path, spec: &SearchSpec) -> Result<SearchResult> {
    let collection: MetadataCollection = data::load(path)?;
    Ok(query_engine::evaluate(&collection, spec))
}
