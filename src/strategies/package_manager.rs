//! Installs through the platform package manager.

use super::Strategy;
use crate::command_executor::CommandSpec;
use crate::error::{InstallError, Result};
use crate::install_module::{InstallContext, InstallStep, StepFailure};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManagerInstall {
    /// Package name passed to the package manager
    pub package: String,
    /// Executable looked up with `which`; defaults to the package name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_name: Option<String>,
}

impl PackageManagerInstall {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            command_name: None,
        }
    }

    /// Package whose executable has a different name (`mercurial` provides `hg`)
    pub fn with_command(package: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            command_name: Some(command.into()),
        }
    }

    pub fn command_name(&self) -> &str {
        self.command_name.as_deref().unwrap_or(&self.package)
    }
}

impl Strategy for PackageManagerInstall {
    fn is_installed(&self, ctx: &InstallContext<'_>) -> bool {
        let probe = CommandSpec::probe("which", [self.command_name()]);
        match ctx.executor.execute(&probe) {
            Ok(output) => output.success,
            Err(e) => {
                debug!("which {} could not run: {}", self.command_name(), e);
                false
            }
        }
    }

    fn install(&self, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        let (program, args) = ctx.package_manager.install_args(&self.package);
        let spec = CommandSpec::new(program, args)
            .in_dir(&ctx.work_dir)
            .with_env(ctx.package_manager.noninteractive_env())
            .elevated(ctx.elevate);
        ctx.run_step(InstallStep::PackageInstall, spec)
    }

    fn describe(&self) -> String {
        format!("package {}", self.package)
    }

    fn validate(&self) -> Result<()> {
        if self.package.trim().is_empty() {
            return Err(InstallError::catalog("package name is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_executor::RecordingExecutor;
    use crate::types::PackageManagerKind;

    #[test]
    fn test_probe_uses_command_name() {
        let exec = RecordingExecutor::new().with_available_command("hg");
        let ctx = InstallContext::new(&exec, "/tmp/work");
        let hg = PackageManagerInstall::with_command("mercurial", "hg");

        assert!(hg.is_installed(&ctx));
        let calls = exec.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].command_line(), "which hg");
        assert!(calls[0].read_only);
    }

    #[test]
    fn test_apt_install_is_noninteractive_and_elevated() {
        let exec = RecordingExecutor::new();
        let ctx = InstallContext::new(&exec, "/tmp/work");

        PackageManagerInstall::new("cmake").install(&ctx).unwrap();

        let calls = exec.mutating_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].command_line(), "sudo apt-get install -y cmake");
        assert_eq!(
            calls[0].env,
            vec![("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())]
        );
    }

    #[test]
    fn test_pacman_without_elevation() {
        let exec = RecordingExecutor::new();
        let mut ctx = InstallContext::new(&exec, "/tmp/work");
        ctx.package_manager = PackageManagerKind::Pacman;
        ctx.elevate = false;

        PackageManagerInstall::new("git").install(&ctx).unwrap();
        assert_eq!(exec.command_lines(), vec!["pacman -S --noconfirm --needed git"]);
    }

    #[test]
    fn test_failed_install_reports_step() {
        let exec = RecordingExecutor::new().with_exit_code("apt-get", Some("php5"), 100);
        let ctx = InstallContext::new(&exec, "/tmp/work");

        let failure = PackageManagerInstall::new("php5").install(&ctx).unwrap_err();
        assert_eq!(failure.step, InstallStep::PackageInstall);
        assert!(matches!(
            failure.source,
            InstallError::CommandFailed { exit_code: Some(100), .. }
        ));
    }
}
