#![allow(missing_docs)]

mod support;

use sombra_consistency::report::RecordType;
use sombra_consistency::full::store_filters;
use sombra_consistency::store::{
    NodeRecord, PropertyRecord, PropertyValue, RecordKind, RelationshipRecord, RelationshipTypeRecord,
};
use sombra_consistency::{
    CheckOptions, ConsistencyError, FullCheck, InMemoryLogger, StoreError, StoreSnapshot,
    TaskExecutionOrder,
};

use support::{
    check, consistent_snapshot, options, with_counting_store, with_faulty_store,
};

/// Several independent inconsistencies across stores.
fn broken_snapshot() -> StoreSnapshot {
    let mut snapshot = consistent_snapshot();
    // Node 1 points at a property past the end of the store.
    snapshot.nodes[1].next_prop = Some(40);
    // Node 2's relationship chain head is a relationship between other nodes.
    snapshot.nodes[2].next_rel = Some(0);
    // Relationship 1 references an unknown type.
    snapshot.relationships[1].rel_type = 9;
    // Property 2 no longer references back to its predecessor and points at a
    // missing string.
    snapshot.properties[2].prev_prop = None;
    snapshot.properties[2].blocks[0].value = PropertyValue::String(12);
    // String 1 points at itself.
    snapshot.strings[1].next_block = Some(1);
    // An unused node carrying garbage is never checked.
    let mut ghost = NodeRecord::new(3);
    ghost.in_use = false;
    ghost.next_prop = Some(99);
    snapshot.nodes.push(ghost);
    snapshot
}

#[test]
fn consistent_store_is_consistent_under_every_order() {
    let stores = consistent_snapshot().into_store_access();
    for order in TaskExecutionOrder::ALL {
        let outcome = check(&stores, options(order, true));
        assert!(
            outcome.summary.is_consistent(),
            "{order}: {:?}",
            outcome.messages
        );
        assert!(outcome.messages.is_empty(), "{order}");
    }
}

#[test]
fn dangling_node_property_is_one_violation() {
    let mut snapshot = consistent_snapshot();
    snapshot.nodes[1].next_prop = Some(40);
    let stores = snapshot.into_store_access();

    let outcome = check(&stores, CheckOptions::default());
    assert_eq!(outcome.summary.errors(RecordType::Node), 1);
    assert_eq!(outcome.summary.total_inconsistency_count(), 1);
    assert_eq!(
        outcome.violations(),
        vec![
            "ERROR: The property record referenced is not in use.\n\
             \tNodeRecord[1,used=true,rel=0,prop=40]\n\
             \tInconsistent with: 40"
                .to_string()
        ]
    );
}

#[test]
fn every_order_finds_the_same_violations() {
    let stores = broken_snapshot().into_store_access();
    let reference = check(&stores, options(TaskExecutionOrder::SingleThreaded, true));
    assert!(!reference.summary.is_consistent());
    assert!(reference.violations().len() >= 6, "{:?}", reference.violations());

    for order in [TaskExecutionOrder::MultiThreaded, TaskExecutionOrder::MultiPass] {
        let outcome = check(&stores, options(order, true));
        assert_eq!(outcome.violations(), reference.violations(), "{order}");
        assert_eq!(
            outcome.summary.report(),
            reference.summary.report(),
            "{order}"
        );
    }
}

#[test]
fn repeated_runs_produce_identical_summaries() {
    let stores = broken_snapshot().into_store_access();
    let first = check(&stores, options(TaskExecutionOrder::MultiThreaded, true));
    let second = check(&stores, options(TaskExecutionOrder::MultiThreaded, true));
    assert_eq!(first.summary.report(), second.summary.report());
    assert_eq!(first.violations(), second.violations());
}

#[test]
fn inconsistent_run_ends_with_the_summary() {
    let stores = broken_snapshot().into_store_access();
    let outcome = check(&stores, CheckOptions::default());
    let last = outcome.messages.last().expect("something was logged");
    assert!(
        last.starts_with("Inconsistencies found: ConsistencySummaryStatistics{"),
        "{last}"
    );
    assert!(last.contains("\tNumber of NODE inconsistencies: 2"), "{last}");
}

#[test]
fn read_failure_fails_the_run_under_every_order() {
    for order in TaskExecutionOrder::ALL {
        let stores = with_faulty_store(consistent_snapshot(), RecordKind::Property, 2, false);
        let logger = InMemoryLogger::new();
        let err = FullCheck::new(options(order, false))
            .execute(&stores, &logger)
            .expect_err("read fault is fatal");
        match err {
            ConsistencyError::Incomplete(StoreError::Io { kind, id, .. }) => {
                assert_eq!(kind, RecordKind::Property, "{order}");
                assert_eq!(id, 2, "{order}");
            }
            other => panic!("{order}: unexpected error {other}"),
        }
        assert!(
            logger
                .messages()
                .iter()
                .all(|m| !m.starts_with("Inconsistencies found:")),
            "{order}: no summary after a failed run"
        );
    }
}

#[test]
fn unreadable_small_store_fails_before_checking() {
    let stores = with_faulty_store(consistent_snapshot(), RecordKind::RelationshipType, 1, false);
    let logger = InMemoryLogger::new();
    let err = FullCheck::default()
        .execute(&stores, &logger)
        .expect_err("cache construction fails");
    assert!(
        matches!(
            err,
            ConsistencyError::CacheConstruction {
                kind: RecordKind::RelationshipType,
                ..
            }
        ),
        "{err}"
    );
    assert!(logger.messages().is_empty());
}

#[test]
fn panicking_worker_fails_the_run() {
    let stores = with_faulty_store(consistent_snapshot(), RecordKind::String, 1, true);
    let logger = InMemoryLogger::new();
    let err = FullCheck::new(options(TaskExecutionOrder::MultiThreaded, false))
        .execute(&stores, &logger)
        .expect_err("panic is fatal");
    assert!(
        matches!(err, ConsistencyError::WorkerPanicked { .. }),
        "{err}"
    );
}

#[test]
fn graph_property_chain_is_checked() {
    let mut snapshot = consistent_snapshot();
    snapshot.neo_store = Some(sombra_consistency::store::NeoStoreRecord {
        in_use: true,
        next_prop: Some(2),
    });
    let stores = snapshot.into_store_access();
    let outcome = check(&stores, options(TaskExecutionOrder::SingleThreaded, false));
    assert_eq!(outcome.summary.errors(RecordType::NeoStore), 1);
    assert_eq!(
        outcome.violations(),
        vec![
            "ERROR: The property record referenced is not the first in its property chain.\n\
             \tNeoStoreRecord[used=true,nextProp=2]\n\
             \tInconsistent with: 2"
                .to_string()
        ]
    );
}

/// Stores whose records hold no chain pointers, so the only cross-store reads
/// are relationship endpoints.
fn unlinked_snapshot() -> StoreSnapshot {
    let mut snapshot = StoreSnapshot::default();
    snapshot.nodes = (0..4).map(NodeRecord::new).collect();
    snapshot.relationships = (0..3)
        .map(|id| RelationshipRecord::new(id, id, id + 1, 0))
        .collect();
    snapshot.properties = (0..5).map(PropertyRecord::new).collect();
    snapshot.relationship_types = vec![RelationshipTypeRecord {
        id: 0,
        in_use: true,
        name_id: 0,
    }];
    snapshot
}

#[test]
fn multi_pass_reads_each_store_once_per_filter() {
    let snapshot = unlinked_snapshot();
    let nodes = snapshot.nodes.len() as u64;
    let relationships = snapshot.relationships.len() as u64;
    let properties = snapshot.properties.len() as u64;
    // Each relationship reads both of its endpoints, in exactly one pass.
    let endpoint_reads = 2 * relationships;

    for order in TaskExecutionOrder::ALL {
        let passes = |kind| match order {
            TaskExecutionOrder::MultiPass => store_filters(kind).len() as u64,
            _ => 1,
        };
        let expected = [
            (
                RecordKind::Node,
                nodes * passes(RecordKind::Node) + endpoint_reads,
            ),
            (
                RecordKind::Relationship,
                relationships * passes(RecordKind::Relationship),
            ),
            (RecordKind::Property, properties * passes(RecordKind::Property)),
        ];
        for (kind, reads) in expected {
            let (stores, counter) = with_counting_store(snapshot.clone(), kind);
            check(&stores, options(order, false));
            assert_eq!(counter.reads(), reads, "{order}: {kind}");
        }
    }
}
