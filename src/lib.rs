//! Offline consistency checking for Sombra fixed-layout record stores.
//!
//! A [`FullCheck`] walks every record of the nine stores of a database,
//! validates the references each used record holds, optionally verifies that
//! every property and dynamic chain has exactly one owner, and reports each
//! inconsistency in a line-oriented format while counting it in a
//! [`ConsistencySummaryStatistics`]. The checker only reads; it never repairs.
//!
//! ```no_run
//! use sombra_consistency::{CheckOptions, FullCheck, StoreSnapshot, WriterLogger};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stores = StoreSnapshot::read("graph.json")?.into_store_access();
//! let logger = WriterLogger::new(std::io::stderr());
//! let summary = FullCheck::new(CheckOptions::default()).execute(&stores, &logger)?;
//! println!("consistent: {}", summary.is_consistent());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod access;
pub mod checking;
pub mod error;
pub mod full;
pub mod options;
pub mod progress;
pub mod report;
pub mod store;

pub use access::{ChangeSet, DiffRecordAccess};
pub use checking::Filter;
pub use error::{ConsistencyError, Result, StoreError};
pub use full::{FullCheck, TaskExecutionOrder};
pub use options::CheckOptions;
pub use progress::{ProgressListener, ProgressMonitorFactory, SilentProgress};
pub use report::{
    ConsistencySummaryStatistics, InMemoryLogger, StringLogger, TracingLogger, WriterLogger,
};
pub use store::{StoreAccess, StoreSnapshot};
