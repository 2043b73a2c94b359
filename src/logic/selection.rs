//! Which modules the user wants installed.
//!
//! A `Selection` is a plain value. The checklist (or the command line)
//! edits it and hands it to the commit orchestrator; nothing else holds on
//! to it.

use crate::catalog::{Application, Catalog};
use crate::error::{InstallError, Result};
use crate::install_module::{InstallContext, ModuleId};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: BTreeSet<ModuleId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting state of the checklist.
    ///
    /// Each module is checked if it is already installed or installs by
    /// default. This probes every module once; later changes only come from
    /// the user.
    pub fn initial(catalog: &Catalog, ctx: &InstallContext<'_>) -> Self {
        Self::from_installed(catalog, &installed_modules(catalog, ctx))
    }

    /// Starting state from an earlier probe of installed modules
    pub fn from_installed(catalog: &Catalog, installed: &BTreeSet<ModuleId>) -> Self {
        let selection: Self = catalog
            .module_ids()
            .filter(|id| installed.contains(id) || catalog.module(*id).install_by_default)
            .collect();
        debug!(
            "{} of {} modules selected initially",
            selection.len(),
            catalog.modules().len()
        );
        selection
    }

    /// Every module in the catalog
    pub fn all(catalog: &Catalog) -> Self {
        catalog.module_ids().collect()
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.selected.contains(&id)
    }

    pub fn set(&mut self, id: ModuleId, selected: bool) {
        if selected {
            self.selected.insert(id);
        } else {
            self.selected.remove(&id);
        }
    }

    /// Flip one module, returning its new state
    pub fn toggle(&mut self, id: ModuleId) -> bool {
        let now = !self.contains(id);
        self.set(id, now);
        now
    }

    pub fn ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.selected.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Checked checklist entries, in catalog order
    pub fn selected_applications<'c>(&self, catalog: &'c Catalog) -> Vec<&'c Application> {
        catalog
            .applications()
            .filter(|(_, app)| self.contains(app.module))
            .map(|(_, app)| app)
            .collect()
    }

    /// Keep only the named applications (and everything they need).
    ///
    /// Names match module names or display names, ignoring case. Modules
    /// that are neither listed in a category nor needed by a named one keep
    /// their current state.
    pub fn restrict_to(&mut self, catalog: &Catalog, names: &[String]) -> Result<()> {
        let wanted = resolve_names(catalog, names)?;

        for (_, app) in catalog.applications() {
            self.set(app.module, false);
        }

        let mut visited = BTreeSet::new();
        let mut stack = wanted;
        while let Some(id) = stack.pop() {
            if visited.insert(id) {
                self.selected.insert(id);
                stack.extend(catalog.module(id).prereqs.iter().copied());
            }
        }
        Ok(())
    }

    /// Uncheck the named applications
    pub fn deselect_named(&mut self, catalog: &Catalog, names: &[String]) -> Result<()> {
        for id in resolve_names(catalog, names)? {
            self.set(id, false);
        }
        Ok(())
    }
}

impl FromIterator<ModuleId> for Selection {
    fn from_iter<I: IntoIterator<Item = ModuleId>>(iter: I) -> Self {
        Self {
            selected: iter.into_iter().collect(),
        }
    }
}

/// Modules whose software is already present (one probe each)
pub fn installed_modules(catalog: &Catalog, ctx: &InstallContext<'_>) -> BTreeSet<ModuleId> {
    catalog
        .module_ids()
        .filter(|&id| catalog.module(id).is_installed(ctx))
        .collect()
}

fn resolve_names(catalog: &Catalog, names: &[String]) -> Result<Vec<ModuleId>> {
    names
        .iter()
        .map(|name| {
            catalog
                .find(name)
                .ok_or_else(|| InstallError::catalog(format!("unknown application `{}`", name)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::command_executor::RecordingExecutor;
    use crate::install_module::InstallModule;
    use crate::strategies::PackageManagerInstall;

    fn pkg(name: &str, install_by_default: bool) -> InstallModule {
        InstallModule {
            install_by_default,
            ..InstallModule::new(name, PackageManagerInstall::new(name))
        }
    }

    fn catalog() -> (Catalog, [ModuleId; 4]) {
        let mut b = CatalogBuilder::new();
        let jre = b.add_module(pkg("jre", false));
        let ide = b.add_module_with_prereqs(pkg("ide", true), &[jre]);
        let git = b.add_module(pkg("git", false));
        let gftp = b.add_module(pkg("gftp", false));
        b.add_category("Tools", vec![("IDE", ide), ("Git", git)]);
        b.add_category("FTP", vec![("gFTP", gftp)]);
        (b.build().unwrap(), [jre, ide, git, gftp])
    }

    #[test]
    fn test_initial_is_installed_or_default() {
        let (catalog, [jre, ide, git, gftp]) = catalog();
        let exec = RecordingExecutor::new().with_available_command("git");
        let ctx = InstallContext::new(&exec, "/tmp/work");

        let selection = Selection::initial(&catalog, &ctx);
        assert!(!selection.contains(jre));
        assert!(selection.contains(ide));
        assert!(selection.contains(git));
        assert!(!selection.contains(gftp));
        assert!(exec.mutating_calls().is_empty());
    }

    #[test]
    fn test_toggle() {
        let (_, [_, ide, ..]) = catalog();
        let mut selection = Selection::new();
        assert!(selection.toggle(ide));
        assert!(!selection.toggle(ide));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_restrict_to_pulls_in_prerequisites() {
        let (catalog, [jre, ide, git, gftp]) = catalog();
        let mut selection = Selection::all(&catalog);

        selection.restrict_to(&catalog, &["ide".to_string()]).unwrap();
        assert!(selection.contains(ide));
        assert!(selection.contains(jre));
        assert!(!selection.contains(git));
        assert!(!selection.contains(gftp));
    }

    #[test]
    fn test_deselect_named_by_display_name() {
        let (catalog, [_, _, git, gftp]) = catalog();
        let mut selection = Selection::all(&catalog);

        selection.deselect_named(&catalog, &["GFTP".to_string()]).unwrap();
        assert!(!selection.contains(gftp));
        assert!(selection.contains(git));
        assert_eq!(
            selection
                .selected_applications(&catalog)
                .iter()
                .map(|a| a.display_name.as_str())
                .collect::<Vec<_>>(),
            vec!["IDE", "Git"]
        );
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let (catalog, _) = catalog();
        let err = Selection::new()
            .deselect_named(&catalog, &["emacs".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("unknown application `emacs`"));
    }
}
