//! Commit orchestration
//!
//! Turns a confirmed selection into installs. Every module goes through the
//! same run template:
//!
//! 1. not selected: nothing happens
//! 2. already installed: nothing more happens
//! 3. prerequisites run first, in declared order
//! 4. the strategy installs, stopping at its first failing step
//! 5. post-install hooks run
//!
//! # Failure Policy
//!
//! A failed item never aborts the commit. It is recorded with the step it
//! stopped at and the remaining applications still run. A failed
//! prerequisite fails its dependents without being retried for each one.

use crate::catalog::Catalog;
use crate::error::InstallError;
use crate::install_module::{InstallContext, InstallStep, ModuleId};
use crate::logic::selection::Selection;

use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error, info, warn};

// ============================================================================
// Outcomes
// ============================================================================

/// What happened to one module during a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Installed during this commit
    Installed,
    /// Already present, nothing was run
    AlreadyInstalled,
    /// Not selected, nothing was run
    Deselected,
    /// Stopped at `step`
    Failed { step: InstallStep, error: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// True when the module is present after the run
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Installed | Self::AlreadyInstalled)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::AlreadyInstalled => write!(f, "already installed"),
            Self::Deselected => write!(f, "not selected"),
            Self::Failed { step, error } => write!(f, "failed at {}: {}", step, error),
        }
    }
}

/// One checklist entry in the commit report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub module: ModuleId,
    pub category: String,
    pub display_name: String,
    pub outcome: Outcome,
}

/// Result of a whole commit, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub items: Vec<ItemReport>,
    /// Commands were only recorded, not run
    pub dry_run: bool,
}

impl CommitReport {
    pub fn has_failures(&self) -> bool {
        self.items.iter().any(|item| item.outcome.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|item| item.outcome.is_failure())
    }

    /// Items whose outcome matches `predicate`
    fn names_where(&self, predicate: impl Fn(&Outcome) -> bool) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| predicate(&item.outcome))
            .map(|item| item.display_name.as_str())
            .collect()
    }

    pub fn installed(&self) -> Vec<&str> {
        self.names_where(|o| *o == Outcome::Installed)
    }

    pub fn already_installed(&self) -> Vec<&str> {
        self.names_where(|o| *o == Outcome::AlreadyInstalled)
    }

    pub fn deselected(&self) -> Vec<&str> {
        self.names_where(|o| *o == Outcome::Deselected)
    }
}

impl fmt::Display for CommitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let installed_label = if self.dry_run { "Would install" } else { "Installed" };
        let groups = [
            (installed_label, self.installed()),
            ("Already installed", self.already_installed()),
            ("Not selected", self.deselected()),
        ];
        if self.dry_run {
            writeln!(f, "[DRY RUN] No commands were executed")?;
        }
        for (label, names) in groups {
            if !names.is_empty() {
                writeln!(f, "{} ({}): {}", label, names.len(), names.join(", "))?;
            }
        }
        let failures: Vec<&ItemReport> = self.failures().collect();
        if failures.is_empty() {
            write!(f, "No failures")?;
        } else {
            write!(f, "Failed ({}):", failures.len())?;
            for item in failures {
                write!(f, "\n  {}: {}", item.display_name, item.outcome)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Runs modules against one selection, remembering outcomes.
///
/// Outcomes are cached for the lifetime of the committer, so a prerequisite
/// shared by several applications runs once per commit. Use a fresh
/// committer for each commit.
pub struct Committer<'a> {
    catalog: &'a Catalog,
    selection: &'a Selection,
    ctx: &'a InstallContext<'a>,
    dry_run: bool,
    outcomes: HashMap<ModuleId, Outcome>,
    in_progress: Vec<ModuleId>,
}

impl<'a> Committer<'a> {
    pub fn new(catalog: &'a Catalog, selection: &'a Selection, ctx: &'a InstallContext<'a>) -> Self {
        Self {
            catalog,
            selection,
            ctx,
            dry_run: false,
            outcomes: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Mark the report as a dry run
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one module through the template
    pub fn run(&mut self, id: ModuleId) -> Outcome {
        if let Some(outcome) = self.outcomes.get(&id) {
            return outcome.clone();
        }

        if let Some(start) = self.in_progress.iter().position(|&p| p == id) {
            let mut path: Vec<String> = self.in_progress[start..]
                .iter()
                .map(|&p| self.catalog.module(p).name.clone())
                .collect();
            path.push(self.catalog.module(id).name.clone());
            let err = InstallError::PrerequisiteCycle { path };
            error!("{}", err);
            return Outcome::Failed {
                step: InstallStep::Prerequisite(self.catalog.module(id).name.clone()),
                error: err.to_string(),
            };
        }

        let outcome = self.run_uncached(id);
        self.outcomes.insert(id, outcome.clone());
        outcome
    }

    fn run_uncached(&mut self, id: ModuleId) -> Outcome {
        let catalog = self.catalog;
        let ctx = self.ctx;
        let module = catalog.module(id);

        if !self.selection.contains(id) {
            debug!("{} is not selected, skipping", module.name);
            return Outcome::Deselected;
        }
        if module.is_installed(ctx) {
            return Outcome::AlreadyInstalled;
        }

        self.in_progress.push(id);
        let prereqs = self.run_prerequisites(id);
        self.in_progress.pop();
        if let Err(outcome) = prereqs {
            return outcome;
        }

        match module
            .install(ctx)
            .and_then(|()| module.run_post_install(ctx))
        {
            Ok(()) => Outcome::Installed,
            Err(failure) => {
                error!("{}: {}", module.name, failure);
                Outcome::Failed {
                    step: failure.step,
                    error: failure.source.to_string(),
                }
            }
        }
    }

    fn run_prerequisites(&mut self, id: ModuleId) -> Result<(), Outcome> {
        let catalog = self.catalog;
        let module = catalog.module(id);

        for &prereq in &module.prereqs {
            let name = &catalog.module(prereq).name;
            match self.run(prereq) {
                Outcome::Installed | Outcome::AlreadyInstalled => {}
                Outcome::Deselected => {
                    warn!(
                        "{} requires {}, which is not selected; continuing without it",
                        module.name, name
                    );
                }
                Outcome::Failed { step, error } => {
                    warn!("Skipping {}: prerequisite {} failed", module.name, name);
                    return Err(Outcome::Failed {
                        step: InstallStep::Prerequisite(name.clone()),
                        error: format!("{} failed: {}", step, error),
                    });
                }
            }
        }
        Ok(())
    }

    /// Run every application in catalog order, if `confirm` agrees.
    ///
    /// Returns `None` when the commit was declined; nothing runs then.
    pub fn commit(mut self, confirm: impl FnOnce() -> bool) -> Option<CommitReport> {
        if !confirm() {
            info!("Commit declined, nothing installed");
            return None;
        }

        let catalog = self.catalog;
        let total = catalog.applications().count();
        info!(
            "Committing {} selected application(s){}",
            self.selection.selected_applications(catalog).len(),
            if self.dry_run { " [DRY RUN]" } else { "" }
        );

        let mut items = Vec::with_capacity(total);
        for (index, (category, app)) in catalog.applications().enumerate() {
            info!("[{}/{}] {} / {}", index + 1, total, category.name, app.display_name);
            let outcome = self.run(app.module);
            items.push(ItemReport {
                module: app.module,
                category: category.name.clone(),
                display_name: app.display_name.clone(),
                outcome,
            });
        }

        let report = CommitReport {
            items,
            dry_run: self.dry_run,
        };
        if report.has_failures() {
            warn!("Commit finished with {} failure(s)", report.failures().count());
        } else {
            info!("Commit finished");
        }
        Some(report)
    }
}

/// One independent run of `id`: outcomes from earlier runs are not reused,
/// so a second call only probes `is_installed`.
pub fn run_module(
    catalog: &Catalog,
    selection: &Selection,
    ctx: &InstallContext<'_>,
    id: ModuleId,
) -> Outcome {
    Committer::new(catalog, selection, ctx).run(id)
}
