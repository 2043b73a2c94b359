//! The catalog: ordered categories of applications over a module arena.
//!
//! Modules are stored once and referenced by [`ModuleId`] from applications
//! and from other modules' prerequisite lists. A catalog is built once,
//! validated, and never mutated afterwards.

mod builtin;
mod definition;

pub use builtin::builtin_catalog;
pub use definition::{ApplicationDefinition, CatalogDefinition, CategoryDefinition, ModuleDefinition};

use crate::error::{InstallError, Result};
use crate::install_module::{InstallModule, ModuleId};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// One checklist entry: a label and the module it installs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub display_name: String,
    pub module: ModuleId,
}

/// A checklist page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Category>,
    modules: Vec<InstallModule>,
}

impl Catalog {
    /// Catalog compiled into the binary
    pub fn builtin() -> Result<Self> {
        builtin_catalog()
    }

    /// Read and validate a catalog JSON file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let definition = CatalogDefinition::load_from_file(&path)?;
        let catalog = Self::from_definition(&definition)?;
        Ok(catalog)
    }

    /// Resolve module names to ids and validate the result
    pub fn from_definition(definition: &CatalogDefinition) -> Result<Self> {
        let mut builder = CatalogBuilder::new();
        let mut ids = HashMap::new();

        for module in &definition.modules {
            if ids.contains_key(module.name.as_str()) {
                return Err(InstallError::catalog(format!(
                    "duplicate module name `{}`",
                    module.name
                )));
            }
            let id = builder.add_module(InstallModule {
                name: module.name.clone(),
                install_by_default: module.install_by_default,
                prereqs: Vec::new(),
                post_install: module.post_install.clone(),
                strategy: module.install.clone(),
            });
            ids.insert(module.name.as_str(), id);
        }

        let resolve = |name: &str, referrer: String| -> Result<ModuleId> {
            ids.get(name).copied().ok_or_else(|| {
                InstallError::catalog(format!("{} refers to unknown module `{}`", referrer, name))
            })
        };

        for module in &definition.modules {
            let prereqs = module
                .prereqs
                .iter()
                .map(|name| resolve(name.as_str(), format!("module `{}`", module.name)))
                .collect::<Result<Vec<_>>>()?;
            let id = resolve(module.name.as_str(), "catalog".to_string())?;
            builder.modules[id.index()].prereqs = prereqs;
        }

        for category in &definition.categories {
            let applications = category
                .applications
                .iter()
                .map(|app| {
                    resolve(app.module.as_str(), format!("application `{}`", app.display_name))
                        .map(|id| (app.display_name.as_str(), id))
                })
                .collect::<Result<Vec<_>>>()?;
            builder.add_category(&category.name, applications);
        }

        builder.build()
    }

    /// Inverse of `from_definition`, used for `export-catalog`
    pub fn to_definition(&self) -> CatalogDefinition {
        let name_of = |id: ModuleId| self.module(id).name.clone();
        CatalogDefinition {
            modules: self
                .modules
                .iter()
                .map(|m| ModuleDefinition {
                    name: m.name.clone(),
                    install_by_default: m.install_by_default,
                    prereqs: m.prereqs.iter().copied().map(name_of).collect(),
                    post_install: m.post_install.clone(),
                    install: m.strategy.clone(),
                })
                .collect(),
            categories: self
                .categories
                .iter()
                .map(|c| CategoryDefinition {
                    name: c.name.clone(),
                    applications: c
                        .applications
                        .iter()
                        .map(|a| ApplicationDefinition {
                            display_name: a.display_name.clone(),
                            module: name_of(a.module),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn modules(&self) -> &[InstallModule] {
        &self.modules
    }

    /// Ids of every module in arena order
    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        (0..self.modules.len()).map(ModuleId)
    }

    /// The module behind `id`.
    ///
    /// Ids only come from this catalog, so they are always in range.
    pub fn module(&self, id: ModuleId) -> &InstallModule {
        &self.modules[id.0]
    }

    /// Every application with its category, in checklist order
    pub fn applications(&self) -> impl Iterator<Item = (&Category, &Application)> {
        self.categories
            .iter()
            .flat_map(|c| c.applications.iter().map(move |a| (c, a)))
    }

    /// Look a module up by module name or application display name,
    /// ignoring case
    pub fn find(&self, name: &str) -> Option<ModuleId> {
        self.module_ids()
            .find(|&id| self.module(id).name.eq_ignore_ascii_case(name))
            .or_else(|| {
                self.applications()
                    .find(|(_, app)| app.display_name.eq_ignore_ascii_case(name))
                    .map(|(_, app)| app.module)
            })
    }

    /// Label for a module: its first display name, or the module name for
    /// hidden prerequisites
    pub fn display_name(&self, id: ModuleId) -> &str {
        self.applications()
            .find(|(_, app)| app.module == id)
            .map_or(self.module(id).name.as_str(), |(_, app)| app.display_name.as_str())
    }

    /// Check names, references, strategies and the prerequisite graph
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for module in &self.modules {
            if module.name.trim().is_empty() {
                return Err(InstallError::catalog("module with an empty name"));
            }
            if !names.insert(module.name.as_str()) {
                return Err(InstallError::catalog(format!(
                    "duplicate module name `{}`",
                    module.name
                )));
            }
            for prereq in &module.prereqs {
                if prereq.0 >= self.modules.len() {
                    return Err(InstallError::catalog(format!(
                        "module `{}` has a prerequisite outside the catalog",
                        module.name
                    )));
                }
            }
            module
                .strategy
                .as_strategy()
                .validate()
                .map_err(|e| match e {
                    InstallError::Catalog(msg) => {
                        InstallError::catalog(format!("module `{}`: {}", module.name, msg))
                    }
                    other => other,
                })?;
        }

        let mut category_names = HashSet::new();
        for category in &self.categories {
            if !category_names.insert(category.name.as_str()) {
                return Err(InstallError::catalog(format!(
                    "duplicate category `{}`",
                    category.name
                )));
            }
            if category.applications.is_empty() {
                return Err(InstallError::catalog(format!(
                    "category `{}` has no applications",
                    category.name
                )));
            }
            for app in &category.applications {
                if app.module.0 >= self.modules.len() {
                    return Err(InstallError::catalog(format!(
                        "application `{}` refers to a module outside the catalog",
                        app.display_name
                    )));
                }
            }
        }

        self.check_cycles()
    }

    /// Depth-first search over prerequisites; the first back edge is a cycle
    fn check_cycles(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit(
            catalog: &Catalog,
            id: ModuleId,
            marks: &mut [Mark],
            stack: &mut Vec<ModuleId>,
        ) -> Result<()> {
            match marks[id.0] {
                Mark::Done => return Ok(()),
                Mark::InProgress => {
                    let start = stack.iter().position(|&s| s == id).unwrap_or(0);
                    let mut path: Vec<String> = stack[start..]
                        .iter()
                        .map(|&s| catalog.module(s).name.clone())
                        .collect();
                    path.push(catalog.module(id).name.clone());
                    return Err(InstallError::PrerequisiteCycle { path });
                }
                Mark::Unvisited => {}
            }

            marks[id.0] = Mark::InProgress;
            stack.push(id);
            for &prereq in &catalog.module(id).prereqs {
                visit(catalog, prereq, marks, stack)?;
            }
            stack.pop();
            marks[id.0] = Mark::Done;
            Ok(())
        }

        let mut marks = vec![Mark::Unvisited; self.modules.len()];
        let mut stack = Vec::new();
        for id in self.module_ids() {
            visit(self, id, &mut marks, &mut stack)?;
        }
        Ok(())
    }
}

/// Incremental construction of a catalog in code.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    categories: Vec<Category>,
    modules: Vec<InstallModule>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module to the arena
    pub fn add_module(&mut self, module: InstallModule) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.modules.push(module);
        id
    }

    /// Add a module that depends on `prereqs`, in order
    pub fn add_module_with_prereqs(&mut self, mut module: InstallModule, prereqs: &[ModuleId]) -> ModuleId {
        module.prereqs = prereqs.to_vec();
        self.add_module(module)
    }

    /// Append a category with `(display name, module)` entries
    pub fn add_category(&mut self, name: &str, applications: Vec<(&str, ModuleId)>) -> &mut Self {
        self.categories.push(Category {
            name: name.to_string(),
            applications: applications
                .into_iter()
                .map(|(display_name, module)| Application {
                    display_name: display_name.to_string(),
                    module,
                })
                .collect(),
        });
        self
    }

    /// Finish and validate
    pub fn build(self) -> Result<Catalog> {
        let catalog = Catalog {
            categories: self.categories,
            modules: self.modules,
        };
        catalog.validate()?;
        debug!(
            "Catalog with {} categories and {} modules",
            catalog.categories.len(),
            catalog.modules.len()
        );
        Ok(catalog)
    }
}
