//! Logic modules: turn checklist choices into installs.
//!
//! # Modules
//!
//! - `selection` - which modules are checked
//! - `commit` - the run template and the commit report

pub mod commit;
pub mod selection;

pub use commit::{run_module, CommitReport, Committer, ItemReport, Outcome};
pub use selection::Selection;
