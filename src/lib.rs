//! Flying Monkeys library
//!
//! Checklist installer for developer workstation software: a catalog of
//! install modules grouped into categories, a terminal checklist to pick
//! them, and a commit runner that installs the selection.

pub mod app;
pub mod catalog;
pub mod cli;
pub mod command_executor;
pub mod components;
pub mod config;
pub mod error;
pub mod install_module;
pub mod logic;
pub mod process_guard;
pub mod strategies;
pub mod theme;
pub mod types;
pub mod ui;

// Re-export main types for convenience
pub use catalog::{Application, Catalog, CatalogBuilder, Category};
pub use command_executor::{
    CommandExecutor, CommandOutput, CommandSpec, DryRunExecutor, RecordingExecutor, SystemExecutor,
};
pub use config::Settings;
pub use error::{InstallError, Result};
pub use install_module::{HookCommand, InstallContext, InstallModule, InstallStep, ModuleId, StepFailure};
pub use logic::{run_module, CommitReport, Committer, ItemReport, Outcome, Selection};
pub use process_guard::{ChildRegistry, ProcessGuard};
pub use strategies::{
    BinaryInstall, DownloadInstall, InstallStrategy, PackageManagerInstall, SourceBuild,
    SourceInstall, Strategy,
};
pub use types::{ArchiveFormat, Elevation, PackageManagerKind};
