//! Store read failures and the fatal errors that stop a run.

use std::io;

use thiserror::Error;

use crate::store::RecordKind;

/// Result type alias for consistency check operations.
pub type Result<T> = std::result::Result<T, ConsistencyError>;

/// Failure to produce a record from an underlying store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not read the record.
    #[error("failed to read {kind} record {id}: {source}")]
    Io {
        /// Store the read was issued against.
        kind: RecordKind,
        /// Record id being read.
        id: u64,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The record bytes could not be decoded.
    #[error("corrupt {kind} record {id}: {reason}")]
    Corrupt {
        /// Store the read was issued against.
        kind: RecordKind,
        /// Record id being read.
        id: u64,
        /// Decoder diagnostic.
        reason: String,
    },
}

impl StoreError {
    /// Store the failing read was issued against.
    pub fn kind(&self) -> RecordKind {
        match self {
            StoreError::Io { kind, .. } | StoreError::Corrupt { kind, .. } => *kind,
        }
    }

    /// Id of the record that could not be produced.
    pub fn id(&self) -> u64 {
        match self {
            StoreError::Io { id, .. } | StoreError::Corrupt { id, .. } => *id,
        }
    }
}

/// Fatal conditions that stop a consistency check.
///
/// Inconsistencies are never errors; they are recorded in the summary. Any of
/// these variants means the check did not complete and no summary is trustworthy.
#[derive(Debug, Error)]
pub enum ConsistencyError {
    /// A store read failed while the check was running.
    #[error("consistency check incomplete: {0}")]
    Incomplete(#[source] StoreError),
    /// A small store could not be materialized before the check started.
    #[error("consistency check incomplete: unable to cache {kind} store: {source}")]
    CacheConstruction {
        /// Store being cached.
        kind: RecordKind,
        /// Read failure that prevented caching.
        #[source]
        source: StoreError,
    },
    /// A worker thread panicked while processing a store.
    #[error("consistency check incomplete: worker for {store} panicked")]
    WorkerPanicked {
        /// Store the worker was processing.
        store: RecordKind,
    },
    /// The task stopped because a sibling task failed first.
    #[error("consistency check incomplete: aborted after a sibling task failed")]
    Aborted,
    /// Worker thread could not be spawned.
    #[error("consistency check incomplete: unable to start worker: {0}")]
    Spawn(#[source] io::Error),
}

impl From<StoreError> for ConsistencyError {
    fn from(err: StoreError) -> Self {
        ConsistencyError::Incomplete(err)
    }
}
