//! Source builds: download an archive, unpack it, build and install.
//!
//! All build systems share one template:
//!
//! ```text
//! wget -O <archive> <url> -> unpack -> configure -> compile -> install_binaries -> rm <archive>
//! ```
//!
//! The three middle steps come from a [`SourceSteps`] implementation. Each
//! runs with an explicit working directory under the work dir; the process
//! working directory is never changed.

use super::{discard, download, file_name_from_url, Strategy};
use crate::command_executor::CommandSpec;
use crate::error::{InstallError, Result};
use crate::install_module::{run_hooks, HookCommand, InstallContext, InstallStep, StepFailure};
use crate::types::ArchiveFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Build-system specific part of a source install
pub trait SourceSteps {
    /// Prepare the unpacked tree in `src`
    fn configure(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure>;

    fn compile(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure>;

    /// Copy the build results into the system (usually elevated)
    fn install_binaries(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure>;
}

/// A `./configure` switch: `--name` or `--name-value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureOption {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl ConfigureOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }

    /// Command-line form of the option
    pub fn render(&self) -> String {
        if self.value.is_empty() {
            format!("--{}", self.name)
        } else {
            format!("--{}-{}", self.name, self.value)
        }
    }
}

/// PHP extension: `phpize`, `./configure`, `make`, `make install`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpBuild {
    /// Rendered in declared order
    #[serde(default)]
    pub configure_options: Vec<ConfigureOption>,
}

impl SourceSteps for PhpBuild {
    fn configure(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        ctx.run_step(
            InstallStep::Configure,
            CommandSpec::new("phpize", Vec::<String>::new()).in_dir(src),
        )?;
        let args: Vec<String> = self.configure_options.iter().map(ConfigureOption::render).collect();
        ctx.run_step(
            InstallStep::Configure,
            CommandSpec::new("./configure", args).in_dir(src),
        )
    }

    fn compile(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        ctx.run_step(
            InstallStep::Compile,
            CommandSpec::new("make", Vec::<String>::new()).in_dir(src),
        )
    }

    fn install_binaries(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        ctx.run_step(
            InstallStep::InstallBinaries,
            CommandSpec::new("make", ["install"])
                .in_dir(src)
                .elevated(ctx.elevate),
        )
    }
}

fn default_install_prefix() -> String {
    "/usr/local".to_string()
}

/// CMake library built out of tree in `<src>/build`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CMakeBuild {
    #[serde(default = "default_install_prefix")]
    pub install_prefix: String,
    /// Run inside the build directory after `cmake --build . --target install`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_install: Vec<HookCommand>,
}

impl Default for CMakeBuild {
    fn default() -> Self {
        Self {
            install_prefix: default_install_prefix(),
            post_install: Vec::new(),
        }
    }
}

impl CMakeBuild {
    fn build_dir(src: &Path) -> PathBuf {
        src.join("build")
    }
}

impl SourceSteps for CMakeBuild {
    fn configure(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        ctx.run_step(
            InstallStep::Configure,
            CommandSpec::new("mkdir", ["-p", "build"]).in_dir(src),
        )
    }

    fn compile(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        let prefix = format!("-DCMAKE_INSTALL_PREFIX={}", self.install_prefix);
        ctx.run_step(
            InstallStep::Compile,
            CommandSpec::new("cmake", [prefix, "..".to_string()]).in_dir(Self::build_dir(src)),
        )
    }

    fn install_binaries(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        let build = Self::build_dir(src);
        ctx.run_step(
            InstallStep::InstallBinaries,
            CommandSpec::new("cmake", ["--build", ".", "--target", "install"])
                .in_dir(&build)
                .elevated(ctx.elevate),
        )?;
        run_hooks(&self.post_install, &build, ctx)
    }
}

/// Plain `./configure && make && make install`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutotoolsBuild {
    #[serde(default)]
    pub configure_args: Vec<String>,
}

impl SourceSteps for AutotoolsBuild {
    fn configure(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        ctx.run_step(
            InstallStep::Configure,
            CommandSpec::new("./configure", self.configure_args.iter().cloned()).in_dir(src),
        )
    }

    fn compile(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        ctx.run_step(
            InstallStep::Compile,
            CommandSpec::new("make", Vec::<String>::new()).in_dir(src),
        )
    }

    fn install_binaries(&self, src: &Path, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        ctx.run_step(
            InstallStep::InstallBinaries,
            CommandSpec::new("make", ["install"])
                .in_dir(src)
                .elevated(ctx.elevate),
        )
    }
}

/// Build system of a source install, tagged `system` in catalog files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "system", rename_all = "snake_case")]
pub enum SourceBuild {
    Php(PhpBuild),
    #[serde(rename = "cmake")]
    CMake(CMakeBuild),
    Autotools(AutotoolsBuild),
}

impl SourceBuild {
    pub fn as_steps(&self) -> &dyn SourceSteps {
        match self {
            Self::Php(b) => b,
            Self::CMake(b) => b,
            Self::Autotools(b) => b,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Php(_) => "php extension",
            Self::CMake(_) => "cmake",
            Self::Autotools(_) => "autotools",
        }
    }
}

/// Archive built from source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInstall {
    pub url: String,
    /// Present once the build is installed
    pub compiled_path: PathBuf,
    /// Directory the archive unpacks into, relative to the work dir
    pub unpacked_dir: PathBuf,
    pub build: SourceBuild,
}

impl SourceInstall {
    pub fn new(
        url: impl Into<String>,
        compiled_path: impl Into<PathBuf>,
        unpacked_dir: impl Into<PathBuf>,
        build: SourceBuild,
    ) -> Self {
        Self {
            url: url.into(),
            compiled_path: compiled_path.into(),
            unpacked_dir: unpacked_dir.into(),
            build,
        }
    }

    /// Downloaded archive name
    pub fn archive_name(&self) -> Result<&str> {
        file_name_from_url(&self.url)
    }

    /// Unpacked source tree
    pub fn source_dir(&self, ctx: &InstallContext<'_>) -> PathBuf {
        ctx.work_dir.join(&self.unpacked_dir)
    }

    /// Unpack the downloaded archive in the work dir.
    ///
    /// Fails with `UnsupportedArchive` before running anything when the
    /// extension is not `.zip`, `.tar.gz` or `.tgz`.
    pub fn unpack(&self, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        let unpack_error = |e| StepFailure::new(InstallStep::Unpack, e);
        let file = self.archive_name().map_err(unpack_error)?;
        let format = ArchiveFormat::from_file_name(file).map_err(unpack_error)?;
        let (program, args) = format.unpack_args(file);
        ctx.run_step(InstallStep::Unpack, ctx.in_work_dir(program, args))
    }

    fn build_from_archive(&self, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        self.unpack(ctx)?;
        let src = self.source_dir(ctx);
        let steps = self.build.as_steps();
        steps.configure(&src, ctx)?;
        steps.compile(&src, ctx)?;
        steps.install_binaries(&src, ctx)
    }
}

impl Strategy for SourceInstall {
    fn is_installed(&self, ctx: &InstallContext<'_>) -> bool {
        ctx.path_exists(&self.compiled_path)
    }

    fn install(&self, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure> {
        let file = self
            .archive_name()
            .map_err(|e| StepFailure::new(InstallStep::Download, e))?;
        // Reject unknown archives before downloading anything
        ArchiveFormat::from_file_name(file).map_err(|e| StepFailure::new(InstallStep::Unpack, e))?;

        download(ctx, &self.url, file)?;

        if let Err(failure) = self.build_from_archive(ctx) {
            discard(ctx, file);
            return Err(failure);
        }

        info!("Built {} from source", file);
        ctx.run_step(InstallStep::Cleanup, ctx.in_work_dir("rm", [file]))
    }

    fn describe(&self) -> String {
        format!("{} source {}", self.build.label(), self.url)
    }

    fn validate(&self) -> Result<()> {
        let file = self.archive_name()?;
        ArchiveFormat::from_file_name(file)?;
        if self.unpacked_dir.as_os_str().is_empty() || self.unpacked_dir.is_absolute() {
            return Err(InstallError::catalog(format!(
                "unpacked_dir of {} must be a relative directory",
                self.url
            )));
        }
        Ok(())
    }
}
