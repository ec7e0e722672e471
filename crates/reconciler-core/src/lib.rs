//! Reconciler Core - Types, diffs, settings, and error handling

pub mod diff;
pub mod error;
pub mod settings;
pub mod types;

pub use diff::{diff, is_empty_value, Diff, DiffItem, DiffOperation, DiffScope};
pub use error::{Error, Result};
pub use settings::*;
pub use types::*;
