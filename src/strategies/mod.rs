//! Install strategies
//!
//! A strategy knows how to tell whether its software is present and how to
//! put it there. The set is closed; catalog files select one with a `kind` tag:
//!
//! - `package_manager` - the platform package manager
//! - `download` - fetch an installer script and run it
//! - `binary` - fetch a single executable into the binary directory
//! - `source` - fetch an archive and build it (PHP extension, CMake, Autotools)

mod binary;
mod download;
mod package_manager;
mod source;

pub use binary::BinaryInstall;
pub use download::DownloadInstall;
pub use package_manager::PackageManagerInstall;
pub use source::{
    AutotoolsBuild, CMakeBuild, ConfigureOption, PhpBuild, SourceBuild, SourceInstall, SourceSteps,
};

use crate::error::{InstallError, Result};
use crate::install_module::{InstallContext, InstallStep, StepFailure};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Detection and installation of one piece of software.
pub trait Strategy {
    /// One probe, no side effects
    fn is_installed(&self, ctx: &InstallContext<'_>) -> bool;

    /// Run the install steps in order, stopping at the first failure
    fn install(&self, ctx: &InstallContext<'_>) -> std::result::Result<(), StepFailure>;

    /// Short human-readable description for logs and listings
    fn describe(&self) -> String;

    /// Static checks run when a catalog is loaded
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Every way a module can be installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstallStrategy {
    PackageManager(PackageManagerInstall),
    Download(DownloadInstall),
    Binary(BinaryInstall),
    Source(SourceInstall),
}

impl InstallStrategy {
    pub fn as_strategy(&self) -> &dyn Strategy {
        match self {
            Self::PackageManager(s) => s,
            Self::Download(s) => s,
            Self::Binary(s) => s,
            Self::Source(s) => s,
        }
    }

    /// Tag used in catalog files
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PackageManager(_) => "package_manager",
            Self::Download(_) => "download",
            Self::Binary(_) => "binary",
            Self::Source(_) => "source",
        }
    }
}

impl From<PackageManagerInstall> for InstallStrategy {
    fn from(s: PackageManagerInstall) -> Self {
        Self::PackageManager(s)
    }
}

impl From<DownloadInstall> for InstallStrategy {
    fn from(s: DownloadInstall) -> Self {
        Self::Download(s)
    }
}

impl From<BinaryInstall> for InstallStrategy {
    fn from(s: BinaryInstall) -> Self {
        Self::Binary(s)
    }
}

impl From<SourceInstall> for InstallStrategy {
    fn from(s: SourceInstall) -> Self {
        Self::Source(s)
    }
}

/// Last path segment of `url`, without query string or fragment.
///
/// `http://pecl.php.net/get/amqp-1.0.10.tgz` gives `amqp-1.0.10.tgz`.
pub fn file_name_from_url(url: &str) -> Result<&str> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let path = without_fragment.split('?').next().unwrap_or(without_fragment);
    let after_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);

    // A bare host (`https://example.com`) has no file to name
    let Some((_, name)) = after_scheme.rsplit_once('/') else {
        return Err(InstallError::catalog(format!(
            "URL `{}` does not end in a file name",
            url
        )));
    };
    if name.is_empty() || name == "." || name == ".." {
        return Err(InstallError::catalog(format!(
            "URL `{}` does not end in a file name",
            url
        )));
    }
    Ok(name)
}

/// `wget -O <file> <url>` in the work dir.
///
/// The target name is fixed so a retry overwrites instead of saving
/// `<file>.1`. A partial download is removed when wget fails.
pub(crate) fn download(
    ctx: &InstallContext<'_>,
    url: &str,
    file: &str,
) -> std::result::Result<(), StepFailure> {
    ctx.run_step(
        InstallStep::Download,
        ctx.in_work_dir("wget", ["-O", file, url]),
    )
    .inspect_err(|_| discard(ctx, file))
}

/// `rm -f <file>` in the work dir, logging instead of failing
pub(crate) fn discard(ctx: &InstallContext<'_>, file: &str) {
    let rm = ctx.in_work_dir("rm", ["-f", file]);
    if let Err(e) = ctx.executor.run_checked(&rm) {
        warn!("Could not remove {}: {}", file, e);
    }
}
