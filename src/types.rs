//! Type-safe configuration types for flyingmonkeys
//!
//! String-backed enums for settings and catalog values. `strum` provides the
//! `Display`/`FromStr` pair so the same spelling is used on the command line,
//! in JSON and in log output.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{InstallError, Result};

/// Platform package manager used by package-manager install modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PackageManagerKind {
    #[default]
    Apt,
    Dnf,
    Pacman,
    Zypper,
}

impl PackageManagerKind {
    /// Program and arguments for a non-interactive install of `package`
    pub fn install_args(self, package: &str) -> (&'static str, Vec<String>) {
        let args: &[&str] = match self {
            Self::Apt => &["install", "-y"],
            Self::Dnf => &["install", "-y"],
            Self::Pacman => &["-S", "--noconfirm", "--needed"],
            Self::Zypper => &["--non-interactive", "install"],
        };
        let mut args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        args.push(package.to_string());
        (self.program(), args)
    }

    /// Executable name of the package manager
    pub fn program(self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Pacman => "pacman",
            Self::Zypper => "zypper",
        }
    }

    /// Environment needed to keep the package manager from prompting
    pub fn noninteractive_env(self) -> Vec<(String, String)> {
        match self {
            Self::Apt => vec![("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())],
            Self::Dnf | Self::Pacman | Self::Zypper => vec![],
        }
    }
}

/// How privileged commands are run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Elevation {
    /// Use `sudo` unless already running as root
    #[default]
    Auto,
    /// Always prefix with `sudo`
    Sudo,
    /// Never elevate (already root, or installing into user-writable prefixes)
    None,
}

impl Elevation {
    /// Whether privileged commands need a `sudo` prefix
    pub fn needs_sudo(self) -> bool {
        match self {
            Self::Auto => !nix::unistd::geteuid().is_root(),
            Self::Sudo => true,
            Self::None => false,
        }
    }
}

/// Archive formats the source installer knows how to unpack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ArchiveFormat {
    #[strum(serialize = "zip")]
    Zip,
    #[strum(serialize = "tar.gz")]
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from a downloaded file name.
    ///
    /// Only `.zip`, `.tar.gz` and `.tgz` are accepted; anything else is an
    /// `UnsupportedArchive` error rather than a silent no-op.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Ok(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else {
            Err(InstallError::unsupported_archive(file_name))
        }
    }

    /// Program and arguments that unpack `file_name` into the current directory
    pub fn unpack_args(self, file_name: &str) -> (&'static str, Vec<String>) {
        match self {
            Self::Zip => ("unzip", vec!["-o".to_string(), file_name.to_string()]),
            Self::TarGz => ("tar", vec!["xvfz".to_string(), file_name.to_string()]),
        }
    }
}
