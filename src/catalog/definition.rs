//! Catalog file format.
//!
//! The on-disk shape mirrors the in-memory catalog except that prerequisites
//! and applications name modules instead of holding arena ids.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::install_module::HookCommand;
use crate::strategies::InstallStrategy;

/// A whole catalog file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDefinition {
    pub modules: Vec<ModuleDefinition>,
    pub categories: Vec<CategoryDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub name: String,
    #[serde(default)]
    pub install_by_default: bool,
    /// Module names, run in this order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prereqs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_install: Vec<HookCommand>,
    pub install: InstallStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub name: String,
    pub applications: Vec<ApplicationDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDefinition {
    pub display_name: String,
    /// Name of the module this entry installs
    pub module: String,
}

impl CatalogDefinition {
    /// Write the catalog as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize catalog to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write catalog to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Read a catalog JSON file (no validation)
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read catalog from {:?}", path.as_ref()))?;

        let definition: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog JSON in {:?}", path.as_ref()))?;

        Ok(definition)
    }
}
