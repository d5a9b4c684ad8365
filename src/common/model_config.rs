use std::path::PathBuf;

pub const DEFAULT_CONF_THRESHOLD: f32 = 0.25;

/// Settings handed to the detector collaborator.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub names_path: Option<PathBuf>,
    pub labels_dir: Option<PathBuf>,
    pub conf_threshold: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            names_path: None,
            labels_dir: None,
            conf_threshold: DEFAULT_CONF_THRESHOLD,
        }
    }
}

impl ModelConfig {
    pub fn new(names_path: Option<PathBuf>, labels_dir: Option<PathBuf>, conf_threshold: f32) -> Self {
        Self {
            names_path,
            labels_dir,
            conf_threshold,
        }
    }

    pub fn get_threshold(&self) -> f32 {
        self.conf_threshold
    }
}

impl std::fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string())
        };
        write!(f, "Class Names Path: {}\n\
        Labels Directory: {}\n\
        Detection Threshold: {}",
               show(&self.names_path), show(&self.labels_dir), self.conf_threshold)
    }
}
