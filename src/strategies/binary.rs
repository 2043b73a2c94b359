//! Single-file executables dropped into the binary directory.

use super::{discard, download, file_name_from_url, Strategy};
use crate::command_executor::CommandSpec;
use crate::error::{InstallError, Result};
use crate::install_module::{InstallContext, InstallStep, StepFailure};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_strip_extension() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryInstall {
    pub url: String,
    /// Install under the part of the file name before the first `.`
    #[serde(default = "default_strip_extension")]
    pub strip_extension: bool,
}

impl BinaryInstall {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            strip_extension: true,
        }
    }

    pub fn keep_extension(mut self) -> Self {
        self.strip_extension = false;
        self
    }

    /// Downloaded file name
    pub fn file_name(&self) -> Result<&str> {
        file_name_from_url(&self.url)
    }

    /// Name of the installed executable.
    ///
    /// `tool-1.2.sh` becomes `tool-1` when the extension is stripped.
    pub fn binary_name(&self) -> Result<&str> {
        let file = self.file_name()?;
        if !self.strip_extension {
            return Ok(file);
        }
        Ok(file.split('.').next().unwrap_or(file))
    }

    /// Where the executable ends up
    pub fn installed_path(&self, ctx: &InstallContext<'_>) -> Result<PathBuf> {
        Ok(ctx.bin_dir.join(self.binary_name()?))
    }
}

impl Strategy for BinaryInstall {
    fn is_installed(&self, ctx: &InstallContext<'_>) -> bool {
        self.installed_path(ctx)
            .is_ok_and(|path| ctx.path_exists(&path))
    }

    fn install(&self, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        let (file, target) = self
            .file_name()
            .and_then(|file| Ok((file, self.installed_path(ctx)?)))
            .map_err(|e| StepFailure::new(InstallStep::Download, e))?;

        download(ctx, &self.url, file)?;

        let target = target.to_string_lossy().into_owned();
        let mv = CommandSpec::new("mv", [file.to_string(), target])
            .in_dir(&ctx.work_dir)
            .elevated(ctx.elevate);
        ctx.run_step(
            InstallStep::MakeExecutable,
            ctx.in_work_dir("chmod", ["u+x", file]),
        )
        .and_then(|()| ctx.run_step(InstallStep::MoveIntoPlace, mv))
        .inspect_err(|_| discard(ctx, file))
    }

    fn describe(&self) -> String {
        format!("binary {}", self.url)
    }

    fn validate(&self) -> Result<()> {
        let name = self.binary_name()?;
        if name.is_empty() {
            return Err(InstallError::catalog(format!(
                "URL `{}` gives an empty binary name",
                self.url
            )));
        }
        Ok(())
    }
}
