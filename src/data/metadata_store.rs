//! JSON persistence for metadata collections.
//!
//! Metadata for a source directory `<root>/<group>/<name>` lives at
//! `<root>/processed/<name>/metadata.json`.

use std::path::{Path, PathBuf};

use crate::common::{MetadataCollection, SearchResult};
use crate::data::FsAccess;
use crate::error::BvrError;

pub const METADATA_FILE_NAME: &str = "metadata.json";
const PROCESSED_DIR_NAME: &str = "processed";

/// Maps a source image directory to its processed output directory.
///
/// `data/raw/cats` becomes `data/processed/cats`. Purely lexical, nothing is
/// created or checked on disk.
pub fn processed_dir(source_dir: &Path) -> Result<PathBuf, BvrError> {
    let name = source_dir
        .file_name()
        .ok_or_else(|| BvrError::InvalidDirectory(source_dir.to_path_buf()))?;
    let parent = source_dir.parent().unwrap_or_else(|| Path::new(""));
    let root = parent.parent().unwrap_or(parent);
    Ok(root.join(PROCESSED_DIR_NAME).join(name))
}

/// Writes `collection` to the processed directory of `source_dir` and returns
/// the path of the written file.
pub fn save(collection: &MetadataCollection, source_dir: &Path) -> Result<PathBuf, BvrError> {
    let out_dir = processed_dir(source_dir)?;
    FsAccess::create_directory(&out_dir)?;

    let out_path = out_dir.join(METADATA_FILE_NAME);
    let json = serde_json::to_vec_pretty(collection)?;
    std::fs::write(&out_path, json).map_err(|e| BvrError::io(&out_path, e))?;

    log::info!("Saved metadata for {} images to {}", collection.len(), out_path.display());
    Ok(out_path)
}

/// Finds the metadata file for `path`.
///
/// `path` is used as given when it names a file. Otherwise it is treated as a
/// source directory and resolved through [`processed_dir`].
pub fn resolve(path: &Path) -> Result<PathBuf, BvrError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    let fallback = match processed_dir(path) {
        Ok(dir) => dir.join(METADATA_FILE_NAME),
        Err(_) => path.join(METADATA_FILE_NAME),
    };
    if fallback.is_file() {
        log::debug!("{} is not a metadata file, using {}", path.display(), fallback.display());
        return Ok(fallback);
    }

    Err(BvrError::MetadataNotFound {
        given: path.to_path_buf(),
        fallback,
    })
}

/// Reads a metadata collection written by [`save`].
///
/// Records whose derived fields disagree with their detections are re-derived
/// so the loaded collection always satisfies the count invariants.
pub fn load(path: &Path) -> Result<MetadataCollection, BvrError> {
    let resolved = resolve(path)?;
    let raw = std::fs::read(&resolved).map_err(|e| BvrError::io(&resolved, e))?;
    let collection: MetadataCollection =
        serde_json::from_slice(&raw).map_err(|e| BvrError::malformed(&resolved, e))?;

    let records: MetadataCollection = collection
        .into_records()
        .into_iter()
        .map(|record| {
            if record.is_consistent() {
                record
            } else {
                log::warn!("Derived counts for {} disagree with its detections, recomputing", record.image_path);
                record.rederive()
            }
        })
        .collect();

    log::info!("Loaded metadata for {} images from {}", records.len(), resolved.display());
    Ok(records)
}

/// Serializes the records of a search result exactly as they are stored.
pub fn export_results(result: &SearchResult) -> Result<String, BvrError> {
    Ok(serde_json::to_string_pretty(&result.records)?)
}
