use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::common::{BvrRecord, MetadataCollection, DEFAULT_CONF_THRESHOLD};
use crate::detection_processing::{build_record, filter_by_confidence, validate_detection};
use crate::detectors::Detector;
use crate::error::BvrError;
use crate::utils;

pub const DEFAULT_IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Options for a directory run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub image_extensions: Vec<String>,
    pub conf_threshold: f32,
    pub parallel: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            image_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            conf_threshold: DEFAULT_CONF_THRESHOLD,
            parallel: false,
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.image_extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// An image that was skipped because its detection failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFailure {
    pub path: PathBuf,
    pub cause: String,
}

impl From<ImageFailure> for BvrError {
    fn from(failure: ImageFailure) -> Self {
        BvrError::ImageDetection {
            path: failure.path,
            cause: failure.cause,
        }
    }
}

/// Outcome of a directory run: records of every image that succeeded, in
/// path order, plus the images that failed.
#[derive(Debug, Default)]
pub struct DirectoryReport {
    pub records: MetadataCollection,
    pub failures: Vec<ImageFailure>,
}

/// Lists the files directly inside `dir` whose extension is one of
/// `extensions`, compared case-insensitively. Sorted, each file once.
pub fn collect_images(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, BvrError> {
    if !dir.is_dir() {
        return Err(BvrError::InvalidDirectory(dir.to_path_buf()));
    }

    let wanted: BTreeSet<String> = extensions
        .iter()
        .map(|ext| utils::normalize_extension(ext))
        .collect();

    let mut found: BTreeSet<PathBuf> = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(|e| BvrError::io(dir, e))? {
        let path = entry.map_err(|e| BvrError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension() else { continue };
        if wanted.contains(&utils::normalize_extension(&ext.to_string_lossy())) {
            found.insert(path);
        }
    }

    Ok(found.into_iter().collect())
}

fn detect_one(detector: &dyn Detector, path: &Path, conf_threshold: f32) -> Result<BvrRecord, ImageFailure> {
    let raw = detector.detect(path).map_err(|e| ImageFailure {
        path: path.to_path_buf(),
        cause: format!("{:#}", e),
    })?;
    if let Some(cause) = raw.iter().find_map(|det| validate_detection(det).err()) {
        return Err(ImageFailure {
            path: path.to_path_buf(),
            cause,
        });
    }
    let raw = filter_by_confidence(raw, conf_threshold);
    Ok(build_record(&path.to_string_lossy(), raw))
}

/// Runs `detector` over every matching image in `dir`.
///
/// A missing directory fails the whole run. A failing image is logged,
/// reported in [`DirectoryReport::failures`] and left out of the records.
/// An image whose detector output holds a non-finite box or a confidence
/// outside `[0, 1]` counts as failing.
pub fn process_directory(
    dir: &Path,
    detector: &dyn Detector,
    options: &RunOptions,
) -> Result<DirectoryReport, BvrError> {
    let start = Instant::now();
    let images = collect_images(dir, &options.image_extensions)?;
    let mut elapsed = utils::trace("TIME", "Collecting images", start, Duration::ZERO);

    log::info!(
        "Running detector '{}' over {} images in {}",
        detector.name(),
        images.len(),
        dir.display()
    );

    let outcomes: Vec<Result<BvrRecord, ImageFailure>> = if options.parallel {
        images
            .par_iter()
            .map(|path| detect_one(detector, path, options.conf_threshold))
            .collect()
    } else {
        images
            .iter()
            .map(|path| detect_one(detector, path, options.conf_threshold))
            .collect()
    };
    elapsed = utils::trace("TIME", "Detection", start, elapsed);

    let mut records = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(record) => records.push(record),
            Err(failure) => {
                log::warn!("Skipping {}: {}", failure.path.display(), failure.cause);
                failures.push(failure);
            }
        }
    }
    utils::trace("TIME", "Building records", start, elapsed);

    log::info!(
        "Processed {} images ({} failed) in {:.2?}",
        records.len(),
        failures.len(),
        start.elapsed()
    );

    Ok(DirectoryReport {
        records: MetadataCollection::new(records),
        failures,
    })
}
