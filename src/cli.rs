//! Command line interface.
//!
//! Also compiled into `build.rs` to generate the man page and shell
//! completions, so this file only depends on `clap` and `std`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Flying Monkeys - checklist installer for developer workstations
#[derive(Parser, Debug)]
#[command(name = "flyingmonkeys")]
#[command(about = "Pick software from a checklist and install it in one go")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// Installed-checks (`which`, path probes) still run so the plan is
    /// realistic; downloads, builds and package installs are only logged.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Settings file (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Catalog file (JSON) to use instead of the built-in catalog
    #[arg(long, global = true, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Directory for downloads and source builds
    #[arg(long, global = true, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log debug output, including the output of every command
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the interactive checklist (default)
    Tui,
    /// List the catalog with installed and selected markers
    List,
    /// Install without the checklist
    Install {
        /// Install only these applications (module or display name)
        #[arg(long, value_name = "NAME")]
        only: Vec<String>,

        /// Leave these applications out
        #[arg(long, value_name = "NAME")]
        skip: Vec<String>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Validate a catalog file
    Validate {
        /// Catalog to check; the configured catalog when omitted
        catalog: Option<PathBuf>,
    },
    /// Write the built-in catalog as JSON, as a starting point for your own
    ExportCatalog {
        /// Destination file
        path: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
