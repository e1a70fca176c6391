use tracing::warn;

use crate::error::StoreError;
use crate::store::{Record, RecordKind, RecordStore};

/// Most unused ids a single placement may open up past the end of a store.
pub const MAX_ID_GAP: u64 = 1 << 16;

/// Record store held entirely in memory.
///
/// Records are addressed by position. Holes left between explicitly placed
/// records read back as unused records.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    kind: RecordKind,
    records: Vec<Record>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
        }
    }

    /// Creates a store from records in any order. A later record with the same
    /// id replaces an earlier one.
    pub fn from_records(kind: RecordKind, records: impl IntoIterator<Item = Record>) -> Self {
        let mut store = Self::new(kind);
        for record in records {
            store.put(record);
        }
        store
    }

    /// Places a record at its id, growing the store as needed. A record more
    /// than [`MAX_ID_GAP`] ids past the end is dropped.
    pub fn put(&mut self, record: Record) {
        if record.kind() != self.kind {
            warn!(
                store = %self.kind,
                record_kind = %record.kind(),
                id = record.id(),
                "consistency.memory_store.kind_mismatch"
            );
            return;
        }
        let len = self.records.len() as u64;
        let id = match usize::try_from(record.id()) {
            Ok(id) if record.id() < len.saturating_add(MAX_ID_GAP) => id,
            _ => {
                warn!(
                    store = %self.kind,
                    id = record.id(),
                    high_id = len,
                    "consistency.memory_store.id_out_of_range"
                );
                return;
            }
        };
        while self.records.len() <= id {
            let hole = self.records.len() as u64;
            self.records.push(Record::unused(self.kind, hole));
        }
        self.records[id] = record;
    }
}

impl RecordStore for MemoryStore {
    fn kind(&self) -> RecordKind {
        self.kind
    }

    fn high_id(&self) -> u64 {
        self.records.len() as u64
    }

    fn get(&self, id: u64) -> Result<Record, StoreError> {
        self.records
            .get(id as usize)
            .cloned()
            .ok_or_else(|| StoreError::Corrupt {
                kind: self.kind,
                id,
                reason: format!("id beyond high id {}", self.records.len()),
            })
    }
}
