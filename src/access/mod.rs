//! Read-through access to records while a check is running.
//!
//! Checkers never touch a [`RecordStore`](crate::store::RecordStore) directly.
//! They read through a [`DiffRecordAccess`], which can layer a cache or a set of
//! pending changes over the stores without the checkers noticing.

mod cache;
mod diff;

use crate::error::StoreError;
use crate::store::{Record, RecordKind, StoreAccess};

pub use cache::CacheSmallStoresRecordAccess;
pub use diff::{ChangeSet, ChangeSetRecordAccess};

/// Lookup of records by kind and id, exposing the prior image of records
/// changed within the current run.
///
/// Implementations are shared by every task of a run and must allow concurrent
/// reads.
pub trait DiffRecordAccess: Send + Sync {
    /// One past the highest id readable for `kind`.
    fn high_id(&self, kind: RecordKind) -> u64;

    /// The record as it currently reads, or `None` when `id` is at or beyond
    /// the high id.
    fn current_record(&self, kind: RecordKind, id: u64) -> Result<Option<Record>, StoreError>;

    /// The record as it was before a change applied earlier in this run, or
    /// `None` when the record has not been changed.
    fn prior_record(&self, kind: RecordKind, id: u64) -> Result<Option<Record>, StoreError>;
}

/// Reads straight from the stores. Nothing is ever changed, so there is no
/// prior image.
#[derive(Clone, Copy, Debug)]
pub struct DirectRecordAccess<'a> {
    stores: &'a StoreAccess,
}

impl<'a> DirectRecordAccess<'a> {
    /// Wraps a store set.
    pub fn new(stores: &'a StoreAccess) -> Self {
        Self { stores }
    }
}

impl DiffRecordAccess for DirectRecordAccess<'_> {
    fn high_id(&self, kind: RecordKind) -> u64 {
        self.stores.store(kind).high_id()
    }

    fn current_record(&self, kind: RecordKind, id: u64) -> Result<Option<Record>, StoreError> {
        let store = self.stores.store(kind);
        if id >= store.high_id() {
            return Ok(None);
        }
        store.get(id).map(Some)
    }

    fn prior_record(&self, _kind: RecordKind, _id: u64) -> Result<Option<Record>, StoreError> {
        Ok(None)
    }
}
