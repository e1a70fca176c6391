#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sombra_consistency::store::{
    DynamicRecord, NeoStoreRecord, NodeRecord, PropertyBlock, PropertyIndexRecord, PropertyRecord,
    PropertyValue, Record, RecordKind, RecordStore, RelationshipRecord, RelationshipTypeRecord,
};
use sombra_consistency::{
    CheckOptions, ConsistencySummaryStatistics, InMemoryLogger, StoreAccess, StoreError,
    StoreSnapshot, TaskExecutionOrder,
};

/// A small graph in which every reference resolves and every chain has
/// exactly one owner.
///
/// Nodes 0, 1, 2; relationships 0 (0 -> 1) and 1 (0 -> 2). Node 0 owns property
/// chain 0 -> 2, relationship 0 owns property 1 and the graph owns property 3.
/// String chain 0 -> 1 and array 0 hang off property blocks; two property
/// indexes and two relationship types carry their names.
pub fn consistent_snapshot() -> StoreSnapshot {
    let mut snapshot = StoreSnapshot::default();

    let mut n0 = NodeRecord::new(0);
    n0.next_rel = Some(0);
    n0.next_prop = Some(0);
    let mut n1 = NodeRecord::new(1);
    n1.next_rel = Some(0);
    let mut n2 = NodeRecord::new(2);
    n2.next_rel = Some(1);
    snapshot.nodes = vec![n0, n1, n2];

    let mut r0 = RelationshipRecord::new(0, 0, 1, 0);
    r0.first_next_rel = Some(1);
    r0.next_prop = Some(1);
    let mut r1 = RelationshipRecord::new(1, 0, 2, 1);
    r1.first_prev_rel = Some(0);
    snapshot.relationships = vec![r0, r1];

    let mut p0 = PropertyRecord::new(0);
    p0.next_prop = Some(2);
    p0.blocks.push(block(0, PropertyValue::String(0)));
    let mut p1 = PropertyRecord::new(1);
    p1.blocks.push(block(1, PropertyValue::Array(0)));
    let mut p2 = PropertyRecord::new(2);
    p2.prev_prop = Some(0);
    p2.blocks.push(block(1, PropertyValue::Inline(7)));
    let mut p3 = PropertyRecord::new(3);
    p3.blocks.push(block(0, PropertyValue::Inline(1)));
    snapshot.properties = vec![p0, p1, p2, p3];

    snapshot.property_indexes = (0..2)
        .map(|id| PropertyIndexRecord {
            id,
            in_use: true,
            name_id: id,
            property_count: 1,
        })
        .collect();
    snapshot.relationship_types = (0..2)
        .map(|id| RelationshipTypeRecord {
            id,
            in_use: true,
            name_id: id,
        })
        .collect();

    let mut s0 = DynamicRecord::new(0);
    s0.next_block = Some(1);
    snapshot.strings = vec![s0, DynamicRecord::new(1)];
    snapshot.arrays = vec![DynamicRecord::new(0)];
    snapshot.property_keys = vec![DynamicRecord::new(0), DynamicRecord::new(1)];
    snapshot.type_names = vec![DynamicRecord::new(0), DynamicRecord::new(1)];
    snapshot.neo_store = Some(NeoStoreRecord {
        in_use: true,
        next_prop: Some(3),
    });
    snapshot
}

pub fn block(key_index: u32, value: PropertyValue) -> PropertyBlock {
    PropertyBlock { key_index, value }
}

pub fn options(order: TaskExecutionOrder, owners: bool) -> CheckOptions {
    CheckOptions::default()
        .with_execution_order(order)
        .with_property_owners(owners)
}

pub struct Outcome {
    pub summary: ConsistencySummaryStatistics,
    pub messages: Vec<String>,
}

impl Outcome {
    /// Individual violations, sorted, independent of how they were grouped
    /// into log units.
    pub fn violations(&self) -> Vec<String> {
        split_violations(&self.messages)
    }
}

pub fn check(stores: &StoreAccess, options: CheckOptions) -> Outcome {
    let logger = InMemoryLogger::new();
    let summary = sombra_consistency::FullCheck::new(options)
        .execute(stores, &logger)
        .expect("check completes");
    Outcome {
        summary,
        messages: logger.messages(),
    }
}

pub fn split_violations(messages: &[String]) -> Vec<String> {
    let mut violations = Vec::new();
    for message in messages {
        if message.starts_with("Inconsistencies found:") {
            continue;
        }
        let mut current = String::new();
        for line in message.lines() {
            if (line.starts_with("ERROR: ") || line.starts_with("WARNING: ")) && !current.is_empty() {
                violations.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
        if !current.is_empty() {
            violations.push(current);
        }
    }
    violations.sort();
    violations
}

/// Serves another store set's records of one kind, failing or panicking on a
/// single id.
pub struct FaultyStore {
    pub stores: StoreAccess,
    pub kind: RecordKind,
    pub fail_id: u64,
    pub panic: bool,
}

impl RecordStore for FaultyStore {
    fn kind(&self) -> RecordKind {
        self.kind
    }

    fn high_id(&self) -> u64 {
        self.stores.store(self.kind).high_id()
    }

    fn get(&self, id: u64) -> Result<Record, StoreError> {
        if id == self.fail_id {
            if self.panic {
                panic!("injected panic reading {} record {id}", self.kind);
            }
            return Err(StoreError::Io {
                kind: self.kind,
                id,
                source: io::Error::new(io::ErrorKind::Other, "injected read failure"),
            });
        }
        self.stores.store(self.kind).get(id)
    }
}

pub fn with_faulty_store(
    snapshot: StoreSnapshot,
    kind: RecordKind,
    fail_id: u64,
    panic: bool,
) -> StoreAccess {
    let stores = snapshot.clone().into_store_access();
    snapshot
        .into_builder()
        .store(Arc::new(FaultyStore {
            stores,
            kind,
            fail_id,
            panic,
        }))
        .build()
}

/// Serves another store set's records of one kind and counts every read.
pub struct CountingStore {
    pub stores: StoreAccess,
    pub kind: RecordKind,
    pub reads: AtomicU64,
}

impl CountingStore {
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl RecordStore for CountingStore {
    fn kind(&self) -> RecordKind {
        self.kind
    }

    fn high_id(&self) -> u64 {
        self.stores.store(self.kind).high_id()
    }

    fn get(&self, id: u64) -> Result<Record, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.stores.store(self.kind).get(id)
    }
}

/// `snapshot` with the store of `kind` replaced by a read counter.
pub fn with_counting_store(
    snapshot: StoreSnapshot,
    kind: RecordKind,
) -> (StoreAccess, Arc<CountingStore>) {
    let counter = Arc::new(CountingStore {
        stores: snapshot.clone().into_store_access(),
        kind,
        reads: AtomicU64::new(0),
    });
    let stores = snapshot.into_builder().store(counter.clone()).build();
    (stores, counter)
}
