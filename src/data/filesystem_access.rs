//! Well-known directories used by the search tool.
use std::path::{Path, PathBuf};

use crate::error::BvrError;

const APP_DIR: &str = "bvr";
const CONFIG_FILE_NAME: &str = "search.toml";

#[derive(Debug, Clone, Copy)]
pub enum FsAccess {
    Home,
    Config,
}

impl FsAccess {
    /// Retrieves the base path for the specified directory type.
    fn raw_path(&self) -> Result<PathBuf, BvrError> {
        let base_path = match self {
            FsAccess::Home => dirs::home_dir(),
            FsAccess::Config => dirs::config_dir(),
        };

        base_path.ok_or_else(|| {
            BvrError::Config(format!("unable to resolve the {:?} directory on this system", self))
        })
    }

    /// Returns the `bvr` directory under the base path, e.g. `~/.config/bvr` or `~/.bvr`.
    /// Nothing is created.
    pub fn path(&self) -> Result<PathBuf, BvrError> {
        let mut path = self.raw_path()?;
        match self {
            FsAccess::Home => path.push(format!(".{}", APP_DIR)),
            FsAccess::Config => path.push(APP_DIR),
        }
        Ok(path)
    }

    /// The per-user configuration file, if one has been written.
    /// `~/.config/bvr/search.toml` is preferred over `~/.bvr/search.toml`.
    pub fn default_config_file() -> Option<PathBuf> {
        [FsAccess::Config, FsAccess::Home]
            .iter()
            .filter_map(|access| access.path().ok())
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Creates the specified directory if it does not exist.
    pub fn create_directory(path: &Path) -> Result<(), BvrError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| BvrError::io(path, e))?;
        }
        Ok(())
    }
}
