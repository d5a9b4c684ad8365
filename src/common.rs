mod bvr_box;
mod bvr_detection;
mod bvr_record;
mod model_config;
mod search_spec;

pub use bvr_box::*;
pub use bvr_detection::*;
pub use bvr_record::*;
pub use model_config::*;
pub use search_spec::*;
