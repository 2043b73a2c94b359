//! Install modules: one installable unit of software.
//!
//! An `InstallModule` couples a strategy (how to detect and perform the
//! install) with the catalog-level data around it: its unique name, whether
//! it is checked by default, its prerequisites and the hook commands that run
//! after it is installed. Modules live in the catalog's arena and refer to
//! each other by `ModuleId`, so one module can be the prerequisite of several
//! others and appear in the checklist at the same time.

use crate::command_executor::{CommandExecutor, CommandSpec};
use crate::error::InstallError;
use crate::strategies::{InstallStrategy, Strategy};
use crate::types::PackageManagerKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Index of a module in the catalog arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub(crate) usize);

impl ModuleId {
    /// Position in the catalog arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Everything an install step needs from the outside world.
pub struct InstallContext<'a> {
    /// All commands and path probes go through this executor
    pub executor: &'a dyn CommandExecutor,
    /// Downloads and unpacked sources live here
    pub work_dir: PathBuf,
    /// Destination of binary drops
    pub bin_dir: PathBuf,
    pub package_manager: PackageManagerKind,
    /// Prefix privileged commands with `sudo`
    pub elevate: bool,
}

impl<'a> InstallContext<'a> {
    /// Context with the stock `/usr/local/bin` target and apt, elevated
    pub fn new(executor: &'a dyn CommandExecutor, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            work_dir: work_dir.into(),
            bin_dir: PathBuf::from("/usr/local/bin"),
            package_manager: PackageManagerKind::default(),
            elevate: true,
        }
    }

    /// Run `spec` and map a failure to `step`
    pub fn run_step(&self, step: InstallStep, spec: CommandSpec) -> Result<(), StepFailure> {
        self.executor
            .run_checked(&spec)
            .map(|_| ())
            .map_err(|source| StepFailure::new(step, source))
    }

    /// Command with the work directory as its working directory
    pub fn in_work_dir<I, S>(&self, program: &str, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(program, args).in_dir(&self.work_dir)
    }

    pub fn path_exists(&self, path: &Path) -> bool {
        self.executor.path_exists(path)
    }
}

/// Named stage of an install, used to report where an item stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStep {
    Download,
    Unpack,
    Configure,
    Compile,
    InstallBinaries,
    MakeExecutable,
    RunInstaller,
    MoveIntoPlace,
    PackageInstall,
    Cleanup,
    PostInstall,
    Prerequisite(String),
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Unpack => write!(f, "unpack"),
            Self::Configure => write!(f, "configure"),
            Self::Compile => write!(f, "compile"),
            Self::InstallBinaries => write!(f, "install binaries"),
            Self::MakeExecutable => write!(f, "make executable"),
            Self::RunInstaller => write!(f, "run installer"),
            Self::MoveIntoPlace => write!(f, "move into place"),
            Self::PackageInstall => write!(f, "package install"),
            Self::Cleanup => write!(f, "cleanup"),
            Self::PostInstall => write!(f, "post-install"),
            Self::Prerequisite(name) => write!(f, "prerequisite {}", name),
        }
    }
}

/// The step an install stopped at, and why
#[derive(Error, Debug)]
#[error("{step} failed: {source}")]
pub struct StepFailure {
    pub step: InstallStep,
    #[source]
    pub source: InstallError,
}

impl StepFailure {
    pub fn new(step: InstallStep, source: InstallError) -> Self {
        Self { step, source }
    }
}

/// A command run after an install completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Run through `sudo` when elevation is enabled
    #[serde(default)]
    pub elevated: bool,
}

impl HookCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            elevated: false,
        }
    }

    /// Same command, run with elevation
    pub fn elevated(program: &str, args: &[&str]) -> Self {
        Self {
            elevated: true,
            ..Self::new(program, args)
        }
    }

    /// Concrete command inside `dir`
    pub fn to_spec(&self, dir: &Path, ctx: &InstallContext<'_>) -> CommandSpec {
        CommandSpec::new(self.program.as_str(), self.args.iter().cloned())
            .in_dir(dir)
            .elevated(self.elevated && ctx.elevate)
    }
}

/// Run hook commands in order, stopping at the first failure
pub fn run_hooks(
    hooks: &[HookCommand],
    dir: &Path,
    ctx: &InstallContext<'_>,
) -> Result<(), StepFailure> {
    for hook in hooks {
        ctx.run_step(InstallStep::PostInstall, hook.to_spec(dir, ctx))?;
    }
    Ok(())
}

/// One installable unit in the catalog.
#[derive(Debug, Clone)]
pub struct InstallModule {
    /// Unique key used in catalog files, CLI filters and reports
    pub name: String,
    /// Checked in the checklist even when not yet installed
    pub install_by_default: bool,
    /// Run before this module, in order
    pub prereqs: Vec<ModuleId>,
    /// Run after `install` succeeds, in the work directory
    pub post_install: Vec<HookCommand>,
    pub strategy: InstallStrategy,
}

impl InstallModule {
    pub fn new(name: impl Into<String>, strategy: impl Into<InstallStrategy>) -> Self {
        Self {
            name: name.into(),
            install_by_default: false,
            prereqs: Vec::new(),
            post_install: Vec::new(),
            strategy: strategy.into(),
        }
    }

    /// Whether the software is already present (one probe, no state change)
    pub fn is_installed(&self, ctx: &InstallContext<'_>) -> bool {
        let installed = self.strategy.as_strategy().is_installed(ctx);
        if installed {
            debug!("{} is already installed", self.name);
        }
        installed
    }

    /// Perform the install steps of the strategy
    pub fn install(&self, ctx: &InstallContext<'_>) -> Result<(), StepFailure> {
        info!("Installing {} ({})", self.name, self.strategy.as_strategy().describe());
        self.strategy.as_strategy().install(ctx)?;
        info!("Finished installing {}", self.name);
        Ok(())
    }

    /// Run the module's post-install hooks
    pub fn run_post_install(&self, ctx: &InstallContext<'_>) -> Result<(), StepFailure> {
        run_hooks(&self.post_install, &ctx.work_dir, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_executor::RecordingExecutor;
    use crate::strategies::PackageManagerInstall;

    #[test]
    fn test_step_display() {
        assert_eq!(InstallStep::InstallBinaries.to_string(), "install binaries");
        assert_eq!(
            InstallStep::Prerequisite("cmake".into()).to_string(),
            "prerequisite cmake"
        );
    }

    #[test]
    fn test_hook_elevation_follows_context() {
        let exec = RecordingExecutor::new();
        let mut ctx = InstallContext::new(&exec, "/tmp/work");
        let hook = HookCommand::elevated("php5enmod", &["mcrypt"]);

        let spec = hook.to_spec(Path::new("/tmp/work"), &ctx);
        assert_eq!(spec.command_line(), "sudo php5enmod mcrypt");

        ctx.elevate = false;
        let spec = hook.to_spec(Path::new("/tmp/work"), &ctx);
        assert_eq!(spec.command_line(), "php5enmod mcrypt");
        assert_eq!(spec.cwd.as_deref(), Some(Path::new("/tmp/work")));
    }

    #[test]
    fn test_run_hooks_stops_at_first_failure() {
        let exec = RecordingExecutor::new().with_exit_code("first", None, 1);
        let ctx = InstallContext::new(&exec, "/tmp/work");
        let hooks = vec![HookCommand::new("first", &[]), HookCommand::new("second", &[])];

        let failure = run_hooks(&hooks, Path::new("/tmp/work"), &ctx).unwrap_err();
        assert_eq!(failure.step, InstallStep::PostInstall);
        assert_eq!(exec.command_lines(), vec!["first"]);
    }

    #[test]
    fn test_is_installed_only_probes() {
        let exec = RecordingExecutor::new().with_available_command("git");
        let ctx = InstallContext::new(&exec, "/tmp/work");

        let git = InstallModule::new("git", PackageManagerInstall::new("git"));
        assert!(git.is_installed(&ctx));
        let gftp = InstallModule::new("gftp", PackageManagerInstall::new("gftp"));
        assert!(!gftp.is_installed(&ctx));
        assert!(exec.mutating_calls().is_empty());
    }
}
