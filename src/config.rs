//! Settings file handling
//!
//! Settings are a small JSON document. Every field has a default, so a
//! partial file (or none at all) is fine:
//!
//! ```json
//! {
//!   "work_dir": "/tmp/flyingmonkeys",
//!   "bin_dir": "/usr/local/bin",
//!   "package_manager": "apt",
//!   "elevation": "auto",
//!   "catalog": "/etc/flyingmonkeys/catalog.json",
//!   "log_file": "/var/log/flyingmonkeys.log"
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::command_executor::CommandExecutor;
use crate::install_module::InstallContext;
use crate::types::{Elevation, PackageManagerKind};

/// Name of the log file inside the work dir when no log file is configured
pub const DEFAULT_LOG_FILE_NAME: &str = "flyingmonkeys.log";

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("flyingmonkeys")
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("/usr/local/bin")
}

/// Installer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Downloads and source trees go here
    pub work_dir: PathBuf,
    /// Target of binary installs
    pub bin_dir: PathBuf,
    pub package_manager: PackageManagerKind,
    pub elevation: Elevation,
    /// Catalog file; the built-in catalog when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            bin_dir: default_bin_dir(),
            package_manager: PackageManagerKind::default(),
            elevation: Elevation::default(),
            catalog: None,
            log_file: None,
        }
    }
}

impl Settings {
    /// Save settings to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize settings to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write settings to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load settings from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path.as_ref()))?;

        let settings: Self =
            serde_json::from_str(&content).context("Failed to parse settings JSON")?;

        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.work_dir.as_os_str().is_empty() {
            anyhow::bail!("Work directory must be specified");
        }

        // mv targets must not depend on the work dir
        if !self.bin_dir.is_absolute() {
            anyhow::bail!("Binary directory must be an absolute path");
        }

        if let Some(ref log_file) = self.log_file {
            if log_file.as_os_str().is_empty() {
                anyhow::bail!("Log file path cannot be empty");
            }
        }

        Ok(())
    }

    /// Where logs go in interactive mode
    pub fn log_file_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.work_dir.join(DEFAULT_LOG_FILE_NAME))
    }

    /// Create the work directory if it does not exist
    pub fn ensure_work_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.work_dir).with_context(|| {
            format!("Failed to create work directory {:?}", self.work_dir)
        })
    }

    /// Install context for these settings
    pub fn install_context<'a>(&self, executor: &'a dyn CommandExecutor) -> InstallContext<'a> {
        InstallContext {
            executor,
            work_dir: self.work_dir.clone(),
            bin_dir: self.bin_dir.clone(),
            package_manager: self.package_manager,
            elevate: self.elevation.needs_sudo(),
        }
    }
}
