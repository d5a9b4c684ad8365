use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::{ModelConfig, DEFAULT_CONF_THRESHOLD};
use crate::data::FsAccess;
use crate::detection_runners::{RunOptions, DEFAULT_IMAGE_EXTENSIONS};
use crate::error::BvrError;
use crate::utils;

pub const CONFIG_ENV: &str = "BVR_SEARCH_CONFIG";

#[derive(Debug, Serialize, Deserialize, Default)]
struct SearchConfigFile {
    model: Option<ModelConfigFile>,
    data: Option<DataConfigFile>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct ModelConfigFile {
    names_path: Option<PathBuf>,
    labels_dir: Option<PathBuf>,
    conf_threshold: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct DataConfigFile {
    image_extensions: Option<Vec<String>>,
    parallel: Option<bool>,
}

/// Effective configuration of the search tool.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub model: ModelConfig,
    pub image_extensions: Vec<String>,
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::from_file(SearchConfigFile::default())
    }
}

impl SearchConfig {
    /// Loads `path`, or when it is `None` the file named by `BVR_SEARCH_CONFIG`,
    /// or the per-user config file. Falls back to defaults when none exists.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, BvrError> {
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().filter(|p| !p.trim().is_empty()).map(PathBuf::from))
            .or_else(FsAccess::default_config_file);

        let file_cfg = match config_path.as_deref() {
            Some(path) => {
                log::debug!("Reading config from {}", path.display());
                read_config_file(path)?
            }
            None => SearchConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses a TOML document without consulting the environment.
    pub fn from_toml(raw: &str) -> Result<Self, BvrError> {
        let file: SearchConfigFile =
            toml::from_str(raw).map_err(|e| BvrError::Config(e.to_string()))?;
        let mut cfg = Self::from_file(file);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SearchConfigFile) -> Self {
        let model = file.model.unwrap_or_default();
        let data = file.data.unwrap_or_default();
        Self {
            model: ModelConfig::new(
                model.names_path,
                model.labels_dir,
                model.conf_threshold.unwrap_or(DEFAULT_CONF_THRESHOLD),
            ),
            image_extensions: data.image_extensions.unwrap_or_else(|| {
                DEFAULT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect()
            }),
            parallel: data.parallel.unwrap_or(false),
        }
    }

    fn apply_env(&mut self) -> Result<(), BvrError> {
        if let Ok(threshold) = std::env::var("BVR_CONF_THRESHOLD") {
            self.model.conf_threshold = threshold.trim().parse().map_err(|_| {
                BvrError::Config("BVR_CONF_THRESHOLD must be a number between 0 and 1".to_string())
            })?;
        }
        if let Ok(extensions) = std::env::var("BVR_IMAGE_EXTENSIONS") {
            let parsed = split_csv(&extensions);
            if !parsed.is_empty() {
                self.image_extensions = parsed;
            }
        }
        if let Ok(parallel) = std::env::var("BVR_PARALLEL") {
            self.parallel = matches!(parallel.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<(), BvrError> {
        if !(0.0..=1.0).contains(&self.model.conf_threshold) {
            return Err(BvrError::Config(format!(
                "conf_threshold must be within [0, 1], got {}",
                self.model.conf_threshold
            )));
        }

        let mut extensions: Vec<String> = self
            .image_extensions
            .iter()
            .filter(|ext| !ext.trim().trim_start_matches('.').is_empty())
            .map(|ext| utils::normalize_extension(ext))
            .collect();
        extensions.sort();
        extensions.dedup();
        if extensions.is_empty() {
            return Err(BvrError::Config("at least one image extension is required".to_string()));
        }
        self.image_extensions = extensions;
        Ok(())
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            image_extensions: self.image_extensions.clone(),
            conf_threshold: self.model.get_threshold(),
            parallel: self.parallel,
        }
    }

    /// Writes this configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), BvrError> {
        let file = SearchConfigFile {
            model: Some(ModelConfigFile {
                names_path: self.model.names_path.clone(),
                labels_dir: self.model.labels_dir.clone(),
                conf_threshold: Some(self.model.conf_threshold),
            }),
            data: Some(DataConfigFile {
                image_extensions: Some(self.image_extensions.clone()),
                parallel: Some(self.parallel),
            }),
        };
        let raw = toml::to_string_pretty(&file).map_err(|e| BvrError::Config(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            FsAccess::create_directory(parent)?;
        }
        std::fs::write(path, raw).map_err(|e| BvrError::io(path, e))
    }
}

fn read_config_file(path: &Path) -> Result<SearchConfigFile, BvrError> {
    let raw = std::fs::read_to_string(path).map_err(|e| BvrError::io(path, e))?;
    toml::from_str(&raw)
        .map_err(|e| BvrError::Config(format!("invalid config file {}: {}", path.display(), e)))
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
