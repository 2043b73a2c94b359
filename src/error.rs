//! Error handling module for flyingmonkeys
//!
//! Every install step returns `Result<T>` so the commit orchestrator can stop
//! an item at its first failing step and report which step it was.

use thiserror::Error;

/// Main error type for install modules, the catalog and the commit runner
#[derive(Error, Debug)]
pub enum InstallError {
    /// Waiting on a running command failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A command could not be started at all
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A command ran but exited unsuccessfully
    #[error("Command `{command}` failed (exit code {}): {}", exit_code_label(.exit_code), trimmed(.stderr))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Archive extension is neither `.zip` nor `.tar.gz`/`.tgz`
    #[error("Unsupported archive format: {file}")]
    UnsupportedArchive { file: String },

    /// Prerequisites refer back to themselves
    #[error("Prerequisite cycle: {}", .path.join(" -> "))]
    PrerequisiteCycle { path: Vec<String> },

    /// Catalog definition errors (unknown references, duplicates, bad URLs)
    #[error("Catalog error: {0}")]
    Catalog(String),
}

/// Result type alias for flyingmonkeys operations
pub type Result<T> = std::result::Result<T, InstallError>;

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

fn trimmed(text: &str) -> &str {
    text.trim()
}

impl InstallError {
    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create an unsupported archive error
    pub fn unsupported_archive(file: impl Into<String>) -> Self {
        Self::UnsupportedArchive { file: file.into() }
    }
}
