//! Property-based tests for flyingmonkeys
//!
//! Uses proptest for invariants that should hold for any catalog shape:
//! - Probing installed state never changes the system
//! - A second run of any module installs nothing
//! - Prerequisites always run before their dependents, exactly once
//! - Binary names are derived from the URL file name

use flyingmonkeys::catalog::{Catalog, CatalogBuilder};
use flyingmonkeys::command_executor::RecordingExecutor;
use flyingmonkeys::install_module::{InstallContext, InstallModule, ModuleId};
use flyingmonkeys::logic::{run_module, Committer, Outcome, Selection};
use flyingmonkeys::strategies::{file_name_from_url, BinaryInstall, PackageManagerInstall};
use proptest::prelude::*;
use std::path::PathBuf;

/// `pkg0..pkgN`, where module `i` requires each earlier `j` with `edges[i][j]`
fn chain_catalog(edges: &[Vec<bool>]) -> (Catalog, Vec<ModuleId>) {
    let mut b = CatalogBuilder::new();
    let mut ids: Vec<ModuleId> = Vec::new();
    for (i, row) in edges.iter().enumerate() {
        let prereqs: Vec<ModuleId> = ids
            .iter()
            .zip(row)
            .filter(|(_, edge)| **edge)
            .map(|(&id, _)| id)
            .collect();
        let name = format!("pkg{}", i);
        let module = InstallModule::new(name.clone(), PackageManagerInstall::new(name));
        ids.push(b.add_module_with_prereqs(module, &prereqs));
    }
    let apps: Vec<(String, ModuleId)> = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (format!("Package {}", i), id))
        .collect();
    b.add_category(
        "All",
        apps.iter().map(|(name, id)| (name.as_str(), *id)).collect(),
    );
    (b.build().unwrap(), ids)
}

/// Every `pkgN` install makes `which pkgN` succeed
fn installing_executor(count: usize) -> RecordingExecutor {
    (0..count).fold(RecordingExecutor::new(), |exec, i| {
        let name = format!("pkg{}", i);
        exec.provides_command("apt-get", Some(&name), &name)
    })
}

fn edges_strategy() -> impl Strategy<Value = Vec<Vec<bool>>> {
    prop::collection::vec(prop::collection::vec(any::<bool>(), 8), 1..8)
}

// =============================================================================
// Installed-state probes
// =============================================================================

proptest! {
    /// Probing the built-in catalog runs only read-only commands and is stable
    #[test]
    fn probing_has_no_side_effects(available in prop::collection::vec(any::<bool>(), 32)) {
        let catalog = Catalog::builtin().unwrap();
        let exec = catalog
            .modules()
            .iter()
            .zip(&available)
            .filter(|(_, on)| **on)
            .fold(RecordingExecutor::new(), |exec, (module, _)| {
                exec.with_available_command(module.name.clone())
            });
        let ctx = InstallContext::new(&exec, "/tmp/fm");

        let first: Vec<bool> = catalog.modules().iter().map(|m| m.is_installed(&ctx)).collect();
        let second: Vec<bool> = catalog.modules().iter().map(|m| m.is_installed(&ctx)).collect();

        prop_assert_eq!(first, second);
        prop_assert!(exec.mutating_calls().is_empty());
    }
}

// =============================================================================
// Commit invariants
// =============================================================================

proptest! {
    /// After a successful run, running again only probes
    #[test]
    fn second_run_is_a_no_op(edges in edges_strategy()) {
        let (catalog, ids) = chain_catalog(&edges);
        let exec = installing_executor(ids.len());
        let ctx = InstallContext::new(&exec, "/tmp/fm");
        let selection = Selection::all(&catalog);
        let last = ids[ids.len() - 1];

        prop_assert_eq!(run_module(&catalog, &selection, &ctx, last), Outcome::Installed);
        exec.clear_calls();
        prop_assert_eq!(run_module(&catalog, &selection, &ctx, last), Outcome::AlreadyInstalled);
        prop_assert!(exec.mutating_calls().is_empty());
    }

    /// Each module is installed once, after all of its prerequisites
    #[test]
    fn prerequisites_install_first_and_once(edges in edges_strategy()) {
        let (catalog, ids) = chain_catalog(&edges);
        let exec = installing_executor(ids.len());
        let ctx = InstallContext::new(&exec, "/tmp/fm");
        let selection = Selection::all(&catalog);

        let report = Committer::new(&catalog, &selection, &ctx).commit(|| true).unwrap();
        prop_assert!(!report.has_failures());

        let lines = exec.command_lines();
        prop_assert_eq!(lines.len(), ids.len());
        let position = |id: ModuleId| {
            let wanted = format!("sudo apt-get install -y {}", catalog.module(id).name);
            lines.iter().position(|line| *line == wanted)
        };
        for &id in &ids {
            let own = position(id);
            prop_assert!(own.is_some());
            for &prereq in &catalog.module(id).prereqs {
                prop_assert!(position(prereq) < own);
            }
        }
    }

    /// Nothing selected means nothing runs, whatever the graph
    #[test]
    fn empty_selection_runs_nothing(edges in edges_strategy()) {
        let (catalog, _) = chain_catalog(&edges);
        let exec = installing_executor(edges.len());
        let ctx = InstallContext::new(&exec, "/tmp/fm");

        let report = Committer::new(&catalog, &Selection::new(), &ctx).commit(|| true).unwrap();
        prop_assert!(report.items.iter().all(|item| item.outcome == Outcome::Deselected));
        prop_assert!(exec.calls().is_empty());
    }
}

// =============================================================================
// Binary names
// =============================================================================

proptest! {
    /// The binary name is the file name up to its first dot
    #[test]
    fn binary_name_strips_extensions(
        stem in "[a-z][a-z0-9_-]{0,15}",
        exts in prop::collection::vec("[a-z0-9]{1,4}", 0..3),
        query in prop::option::of("[a-z]{1,8}=[a-z0-9]{1,8}"),
    ) {
        let file = std::iter::once(stem.clone()).chain(exts).collect::<Vec<_>>().join(".");
        let mut url = format!("https://example.com/downloads/{}", file);
        if let Some(query) = query {
            url = format!("{}?{}", url, query);
        }

        prop_assert_eq!(file_name_from_url(&url).unwrap(), file.as_str());

        let binary = BinaryInstall::new(url.clone());
        prop_assert_eq!(binary.binary_name().unwrap(), stem.as_str());

        let exec = RecordingExecutor::new();
        let ctx = InstallContext::new(&exec, "/tmp/fm");
        prop_assert_eq!(
            binary.installed_path(&ctx).unwrap(),
            PathBuf::from("/usr/local/bin").join(&stem)
        );
        let kept = BinaryInstall::new(url).keep_extension();
        prop_assert_eq!(kept.binary_name().unwrap(), file.as_str());
    }
}
