mod filesystem_access;
mod label_threshold;
pub mod class_index;
pub mod metadata_store;

pub use class_index::{build_index, ClassIndex};
pub use filesystem_access::FsAccess;
pub use label_threshold::LabelThreshold;
pub use metadata_store::{export_results, load, processed_dir, save, METADATA_FILE_NAME};
