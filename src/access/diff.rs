use std::collections::BTreeMap;

use crate::access::DiffRecordAccess;
use crate::error::StoreError;
use crate::store::{Record, RecordKind};

/// Changed record images, keyed by kind and id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    records: BTreeMap<(RecordKind, u64), Record>,
}

impl ChangeSet {
    /// Creates an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the after image of a record, replacing any earlier change to it.
    pub fn insert(&mut self, record: Record) -> &mut Self {
        self.records.insert((record.kind(), record.id()), record);
        self
    }

    /// The after image of a changed record.
    pub fn get(&self, kind: RecordKind, id: u64) -> Option<&Record> {
        self.records.get(&(kind, id))
    }

    /// Number of changed records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has changed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One past the highest changed id of `kind`, or zero.
    pub fn high_id(&self, kind: RecordKind) -> u64 {
        self.records
            .range((kind, 0)..=(kind, u64::MAX))
            .next_back()
            .map(|((_, id), _)| id.saturating_add(1))
            .unwrap_or(0)
    }
}

/// Reads the after image of changed records as current and the underlying
/// record as prior, so checkers can compare both.
pub struct ChangeSetRecordAccess<'a, A> {
    inner: A,
    changes: &'a ChangeSet,
}

impl<'a, A: DiffRecordAccess> ChangeSetRecordAccess<'a, A> {
    /// Layers `changes` over `inner`.
    pub fn new(inner: A, changes: &'a ChangeSet) -> Self {
        Self { inner, changes }
    }
}

impl<A: DiffRecordAccess> DiffRecordAccess for ChangeSetRecordAccess<'_, A> {
    fn high_id(&self, kind: RecordKind) -> u64 {
        self.inner.high_id(kind).max(self.changes.high_id(kind))
    }

    fn current_record(&self, kind: RecordKind, id: u64) -> Result<Option<Record>, StoreError> {
        match self.changes.get(kind, id) {
            Some(record) => Ok(Some(record.clone())),
            None => self.inner.current_record(kind, id),
        }
    }

    fn prior_record(&self, kind: RecordKind, id: u64) -> Result<Option<Record>, StoreError> {
        if self.changes.get(kind, id).is_none() {
            return self.inner.prior_record(kind, id);
        }
        self.inner.current_record(kind, id)
    }
}
