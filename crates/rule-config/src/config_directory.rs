//! Configuration directory layout.
//!
//! The application scope lives under the user's home directory; a project
//! scope lives under the project root:
//!
//! ```text
//! ~/.colorcast/
//! ├── colorcast.json      (Default scheme)
//! ├── logs/
//! │   ├── colorcast.log
//!
//! <project>/.colorcast/
//! ├── colorcast.json      (Project scheme)
//! ```

use crate::errors::{Result, RuleConfigError};
use std::path::{Path, PathBuf};

const COLORCAST_DIR_NAME: &str = ".colorcast";
const CONFIG_FILE_NAME: &str = "colorcast.json";
const LOGS_DIR_NAME: &str = "logs";

#[derive(Debug, Clone)]
pub struct ConfigDirectory {
    pub root_path: PathBuf,
    pub config_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl ConfigDirectory {
    pub fn new_system_default() -> Result<Self> {
        let root_path = Self::get_system_config_directory()?;
        Self::new(root_path)
    }

    /// The project-scope directory under `project_root`.
    pub fn for_project(project_root: &Path) -> Result<Self> {
        Self::new(project_root.join(COLORCAST_DIR_NAME))
    }

    pub fn new(root_path: PathBuf) -> Result<Self> {
        let directory = Self::locate(root_path);
        directory.ensure_directory_structure()?;
        Ok(directory)
    }

    /// The layout under `root_path`, without creating anything.
    pub fn locate(root_path: PathBuf) -> Self {
        let config_path = root_path.join(CONFIG_FILE_NAME);
        let logs_dir = root_path.join(LOGS_DIR_NAME);
        Self {
            root_path,
            config_path,
            logs_dir,
        }
    }

    /// Like [`ConfigDirectory::new_system_default`], without creating anything.
    pub fn locate_system_default() -> Result<Self> {
        Ok(Self::locate(Self::get_system_config_directory()?))
    }

    /// Like [`ConfigDirectory::for_project`], without creating anything.
    pub fn locate_project(project_root: &Path) -> Self {
        Self::locate(project_root.join(COLORCAST_DIR_NAME))
    }

    pub fn get_system_config_directory() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(COLORCAST_DIR_NAME))
            .ok_or(RuleConfigError::ConfigDirectoryNotFound)
    }

    pub fn ensure_directory_structure(&self) -> Result<()> {
        if !self.root_path.exists() {
            std::fs::create_dir_all(&self.root_path).map_err(|_| {
                RuleConfigError::DirectoryCreationFailed {
                    path: self.root_path.clone(),
                }
            })?;
            tracing::info!("Created configuration directory: {}", self.root_path.display());
        }
        Ok(())
    }

    /// Creates the log directory on demand; only hosts that log to file need it.
    pub fn ensure_logs_directory(&self) -> Result<&Path> {
        if !self.logs_dir.exists() {
            std::fs::create_dir_all(&self.logs_dir).map_err(|_| {
                RuleConfigError::DirectoryCreationFailed {
                    path: self.logs_dir.clone(),
                }
            })?;
        }
        Ok(&self.logs_dir)
    }
}
