//! Record stores consumed by the checker.
//!
//! The checker never writes. A [`RecordStore`] exposes point reads by id and a
//! high-id watermark; [`StoreAccess`] bundles the nine stores of one database.

mod memory;
mod record;
mod snapshot;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use memory::{MemoryStore, MAX_ID_GAP};
pub use record::{
    DynamicRecord, Link, NeoStoreRecord, NodeRecord, PropertyBlock, PropertyIndexRecord,
    PropertyRecord, PropertyValue, Record, RelationshipRecord, RelationshipTypeRecord,
};
pub use snapshot::{SnapshotError, StoreSnapshot};

/// The nine record stores, in the order the checker schedules them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Node store.
    Node,
    /// Relationship store.
    Relationship,
    /// Property store.
    Property,
    /// Relationship type store.
    RelationshipType,
    /// Property index (key) store.
    PropertyIndex,
    /// Dynamic string store.
    String,
    /// Dynamic array store.
    Array,
    /// Dynamic relationship type name store.
    TypeName,
    /// Dynamic property key name store.
    PropertyKey,
}

impl RecordKind {
    /// Number of record kinds.
    pub const COUNT: usize = 9;

    /// All kinds in scheduling order.
    pub const ALL: [RecordKind; RecordKind::COUNT] = [
        RecordKind::Node,
        RecordKind::Relationship,
        RecordKind::Property,
        RecordKind::RelationshipType,
        RecordKind::PropertyIndex,
        RecordKind::String,
        RecordKind::Array,
        RecordKind::TypeName,
        RecordKind::PropertyKey,
    ];

    /// Dense index of this kind, matching [`RecordKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether records of this kind are blocks of a dynamic value chain.
    pub fn is_dynamic(self) -> bool {
        matches!(
            self,
            RecordKind::String | RecordKind::Array | RecordKind::TypeName | RecordKind::PropertyKey
        )
    }

    /// Kinds small enough to be held entirely in memory for the whole check.
    pub fn is_small(self) -> bool {
        matches!(self, RecordKind::PropertyIndex | RecordKind::RelationshipType)
    }

    /// Human readable store name.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Node => "node",
            RecordKind::Relationship => "relationship",
            RecordKind::Property => "property",
            RecordKind::RelationshipType => "relationship type",
            RecordKind::PropertyIndex => "property index",
            RecordKind::String => "string",
            RecordKind::Array => "array",
            RecordKind::TypeName => "type name",
            RecordKind::PropertyKey => "property key",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sequential store of fixed-size records of one kind.
///
/// Implementations must tolerate concurrent reads: the multi-threaded
/// execution order reads every store from its own worker.
pub trait RecordStore: Send + Sync {
    /// Kind of the records held.
    fn kind(&self) -> RecordKind;

    /// One past the highest id ever allocated. Ids at or above it are invalid.
    fn high_id(&self) -> u64;

    /// Reads the record with the given id, used or not.
    fn get(&self, id: u64) -> Result<Record, StoreError>;
}

/// The complete set of stores making up one database.
#[derive(Clone)]
pub struct StoreAccess {
    stores: [Arc<dyn RecordStore>; RecordKind::COUNT],
    neo_store: Option<NeoStoreRecord>,
}

impl StoreAccess {
    /// Starts assembling a store set from individual records or stores.
    pub fn builder() -> StoreAccessBuilder {
        StoreAccessBuilder::default()
    }

    /// The store holding records of `kind`.
    pub fn store(&self, kind: RecordKind) -> &dyn RecordStore {
        self.stores[kind.index()].as_ref()
    }

    /// The graph-level record, when the database has one.
    pub fn neo_store(&self) -> Option<&NeoStoreRecord> {
        self.neo_store.as_ref()
    }
}

impl fmt::Debug for StoreAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("StoreAccess");
        for kind in RecordKind::ALL {
            dbg.field(kind.as_str(), &self.store(kind).high_id());
        }
        dbg.field("neo_store", &self.neo_store).finish()
    }
}

/// Builder for [`StoreAccess`]. Kinds without records or an explicit store get
/// an empty [`MemoryStore`].
#[derive(Default)]
pub struct StoreAccessBuilder {
    records: [Vec<Record>; RecordKind::COUNT],
    stores: [Option<Arc<dyn RecordStore>>; RecordKind::COUNT],
    neo_store: Option<NeoStoreRecord>,
}

impl StoreAccessBuilder {
    /// Adds a record to the store of its kind.
    pub fn record(mut self, record: Record) -> Self {
        self.records[record.kind().index()].push(record);
        self
    }

    /// Adds a node record.
    pub fn node(self, record: NodeRecord) -> Self {
        self.record(Record::Node(record))
    }

    /// Adds a relationship record.
    pub fn relationship(self, record: RelationshipRecord) -> Self {
        self.record(Record::Relationship(record))
    }

    /// Adds a property record.
    pub fn property(self, record: PropertyRecord) -> Self {
        self.record(Record::Property(record))
    }

    /// Adds a property index record.
    pub fn property_index(self, record: PropertyIndexRecord) -> Self {
        self.record(Record::PropertyIndex(record))
    }

    /// Adds a relationship type record.
    pub fn relationship_type(self, record: RelationshipTypeRecord) -> Self {
        self.record(Record::RelationshipType(record))
    }

    /// Adds a block to the string store.
    pub fn string(self, record: DynamicRecord) -> Self {
        self.record(Record::String(record))
    }

    /// Adds a block to the array store.
    pub fn array(self, record: DynamicRecord) -> Self {
        self.record(Record::Array(record))
    }

    /// Adds a block to the relationship type name store.
    pub fn type_name(self, record: DynamicRecord) -> Self {
        self.record(Record::TypeName(record))
    }

    /// Adds a block to the property key name store.
    pub fn property_key(self, record: DynamicRecord) -> Self {
        self.record(Record::PropertyKey(record))
    }

    /// Sets the graph-level record.
    pub fn neo_store(mut self, record: NeoStoreRecord) -> Self {
        self.neo_store = Some(record);
        self
    }

    /// Uses an externally provided store for its kind, replacing any records
    /// added for that kind.
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        let idx = store.kind().index();
        self.stores[idx] = Some(store);
        self
    }

    /// Finishes the store set.
    pub fn build(self) -> StoreAccess {
        let StoreAccessBuilder {
            records,
            mut stores,
            neo_store,
        } = self;
        let mut records = records.into_iter();
        let stores = std::array::from_fn(|idx| {
            let kind = RecordKind::ALL[idx];
            let pending = records.next().unwrap_or_default();
            match stores[idx].take() {
                Some(store) => store,
                None => Arc::new(MemoryStore::from_records(kind, pending)) as Arc<dyn RecordStore>,
            }
        });
        StoreAccess { stores, neo_store }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_places_records_by_id_and_fills_holes() -> Result<(), StoreError> {
        let access = StoreAccess::builder()
            .node(NodeRecord::new(2))
            .string(DynamicRecord::new(0))
            .build();
        let nodes = access.store(RecordKind::Node);
        assert_eq!(nodes.high_id(), 3);
        assert!(!nodes.get(0)?.in_use());
        assert!(nodes.get(2)?.in_use());
        assert_eq!(access.store(RecordKind::String).high_id(), 1);
        assert_eq!(access.store(RecordKind::Array).high_id(), 0);
        Ok(())
    }

    #[test]
    fn kinds_are_indexed_in_scheduling_order() {
        for (idx, kind) in RecordKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), idx);
        }
        assert!(RecordKind::PropertyIndex.is_small());
        assert!(RecordKind::TypeName.is_dynamic());
        assert!(!RecordKind::Property.is_dynamic());
    }
}
