//! Download-and-run installers (self-extracting `.sh` bundles and the like).

use super::{discard, download, file_name_from_url, Strategy};
use crate::command_executor::CommandSpec;
use crate::error::Result;
use crate::install_module::{InstallContext, InstallStep, StepFailure};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInstall {
    /// Installer to fetch
    pub url: String,
    /// Present once the installer has run
    pub installation_path: PathBuf,
}

impl DownloadInstall {
    pub fn new(url: impl Into<String>, installation_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            installation_path: installation_path.into(),
        }
    }
}

impl Strategy for DownloadInstall {
    fn is_installed(&self, ctx: &InstallContext<'_>) -> bool {
        ctx.path_exists(&self.installation_path)
    }

    fn install(&self, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        let file = file_name_from_url(&self.url)
            .map_err(|e| StepFailure::new(InstallStep::Download, e))?;

        download(ctx, &self.url, file)?;

        let result = ctx
            .run_step(
                InstallStep::MakeExecutable,
                ctx.in_work_dir("chmod", ["u+x", file]),
            )
            .and_then(|()| {
                let installer = CommandSpec::new(format!("./{}", file), Vec::<String>::new())
                    .in_dir(&ctx.work_dir)
                    .elevated(ctx.elevate);
                ctx.run_step(InstallStep::RunInstaller, installer)
            });

        match result {
            Ok(()) => ctx.run_step(InstallStep::Cleanup, ctx.in_work_dir("rm", [file])),
            Err(failure) => {
                discard(ctx, file);
                Err(failure)
            }
        }
    }

    fn describe(&self) -> String {
        format!("installer {}", self.url)
    }

    fn validate(&self) -> Result<()> {
        file_name_from_url(&self.url).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_executor::RecordingExecutor;
    use std::path::Path;

    const NETBEANS: &str =
        "http://download.netbeans.org/netbeans/8.0/final/bundles/netbeans-8.0-php-linux.sh";

    #[test]
    fn test_installed_when_path_exists() {
        let exec = RecordingExecutor::new().with_existing_path("/usr/local/netbeans-8.0");
        let ctx = InstallContext::new(&exec, "/tmp/work");
        let netbeans = DownloadInstall::new(NETBEANS, "/usr/local/netbeans-8.0");

        assert!(netbeans.is_installed(&ctx));
        assert!(exec.calls().is_empty());
        assert_eq!(exec.probed_paths(), vec![PathBuf::from("/usr/local/netbeans-8.0")]);
    }

    #[test]
    fn test_install_sequence() {
        let exec = RecordingExecutor::new();
        let ctx = InstallContext::new(&exec, "/tmp/work");

        DownloadInstall::new(NETBEANS, "/usr/local/netbeans-8.0")
            .install(&ctx)
            .unwrap();

        assert_eq!(
            exec.command_lines(),
            vec![
                format!("wget -O netbeans-8.0-php-linux.sh {}", NETBEANS),
                "chmod u+x netbeans-8.0-php-linux.sh".to_string(),
                "sudo ./netbeans-8.0-php-linux.sh".to_string(),
                "rm netbeans-8.0-php-linux.sh".to_string(),
            ]
        );
        for call in exec.mutating_calls() {
            assert_eq!(call.cwd.as_deref(), Some(Path::new("/tmp/work")));
        }
    }

    #[test]
    fn test_failed_installer_still_removes_download() {
        let exec = RecordingExecutor::new().with_exit_code("./netbeans-8.0-php-linux.sh", None, 1);
        let ctx = InstallContext::new(&exec, "/tmp/work");

        let failure = DownloadInstall::new(NETBEANS, "/usr/local/netbeans-8.0")
            .install(&ctx)
            .unwrap_err();
        assert_eq!(failure.step, InstallStep::RunInstaller);
        assert_eq!(
            exec.command_lines().last().map(String::as_str),
            Some("rm -f netbeans-8.0-php-linux.sh")
        );
    }

    #[test]
    fn test_failed_download_only_removes_partial_file() {
        let exec = RecordingExecutor::new().with_exit_code("wget", None, 4);
        let ctx = InstallContext::new(&exec, "/tmp/work");

        let failure = DownloadInstall::new(NETBEANS, "/usr/local/netbeans-8.0")
            .install(&ctx)
            .unwrap_err();
        assert_eq!(failure.step, InstallStep::Download);
        assert_eq!(
            exec.command_lines(),
            vec![
                format!("wget -O netbeans-8.0-php-linux.sh {}", NETBEANS),
                "rm -f netbeans-8.0-php-linux.sh".to_string(),
            ]
        );
    }
}
