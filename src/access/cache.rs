use tracing::debug;

use crate::access::DiffRecordAccess;
use crate::error::{ConsistencyError, StoreError};
use crate::store::{Record, RecordKind};

/// Serves the property index and relationship type stores from memory.
///
/// Both stores are tiny next to the stores that reference them, so they are
/// read once, eagerly, and every later lookup avoids a store read. All other
/// kinds pass through to the wrapped access untouched.
pub struct CacheSmallStoresRecordAccess<A> {
    inner: A,
    property_indexes: Vec<Record>,
    relationship_types: Vec<Record>,
}

impl<A: DiffRecordAccess> CacheSmallStoresRecordAccess<A> {
    /// Materializes the small stores of `inner`.
    ///
    /// # Errors
    ///
    /// Fails if any record of either store cannot be read; every larger store
    /// resolves ids against these, so a partial cache is useless.
    pub fn new(inner: A) -> Result<Self, ConsistencyError> {
        let property_indexes = read_all(&inner, RecordKind::PropertyIndex)?;
        let relationship_types = read_all(&inner, RecordKind::RelationshipType)?;
        debug!(
            property_indexes = property_indexes.len(),
            relationship_types = relationship_types.len(),
            "consistency.cache.small_stores_loaded"
        );
        Ok(Self {
            inner,
            property_indexes,
            relationship_types,
        })
    }

    /// The wrapped access.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    fn cached(&self, kind: RecordKind) -> Option<&[Record]> {
        match kind {
            RecordKind::PropertyIndex => Some(&self.property_indexes),
            RecordKind::RelationshipType => Some(&self.relationship_types),
            _ => None,
        }
    }
}

fn read_all<A: DiffRecordAccess>(inner: &A, kind: RecordKind) -> Result<Vec<Record>, ConsistencyError> {
    let high_id = inner.high_id(kind);
    let mut records = Vec::with_capacity(high_id as usize);
    for id in 0..high_id {
        let record = inner
            .current_record(kind, id)
            .map_err(|source| ConsistencyError::CacheConstruction { kind, source })?
            .unwrap_or_else(|| Record::unused(kind, id));
        records.push(record);
    }
    Ok(records)
}

impl<A: DiffRecordAccess> DiffRecordAccess for CacheSmallStoresRecordAccess<A> {
    fn high_id(&self, kind: RecordKind) -> u64 {
        match self.cached(kind) {
            Some(records) => records.len() as u64,
            None => self.inner.high_id(kind),
        }
    }

    fn current_record(&self, kind: RecordKind, id: u64) -> Result<Option<Record>, StoreError> {
        match self.cached(kind) {
            Some(records) => Ok(records.get(id as usize).cloned()),
            None => self.inner.current_record(kind, id),
        }
    }

    fn prior_record(&self, kind: RecordKind, id: u64) -> Result<Option<Record>, StoreError> {
        self.inner.prior_record(kind, id)
    }
}
