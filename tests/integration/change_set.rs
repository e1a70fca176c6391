#![allow(missing_docs)]

mod support;

use sombra_consistency::report::RecordType;
use sombra_consistency::store::{NodeRecord, Record};
use sombra_consistency::{ChangeSet, FullCheck, InMemoryLogger, TaskExecutionOrder};

use support::{consistent_snapshot, options, split_violations};

fn node(id: u64, next_rel: Option<u64>, next_prop: Option<u64>) -> NodeRecord {
    NodeRecord {
        id,
        in_use: true,
        next_rel,
        next_prop,
    }
}

#[test]
fn changed_record_renders_both_images() {
    let stores = consistent_snapshot().into_store_access();
    let mut changes = ChangeSet::new();
    changes.insert(Record::Node(node(1, Some(0), Some(40))));

    let logger = InMemoryLogger::new();
    let summary = FullCheck::new(options(TaskExecutionOrder::SingleThreaded, false))
        .execute_with_changes(&stores, &changes, &logger)
        .expect("check completes");

    assert_eq!(summary.errors(RecordType::Node), 1);
    assert_eq!(
        split_violations(&logger.messages()),
        vec![
            "ERROR: The property record referenced is not in use.\n\
             \t- NodeRecord[1,used=true,rel=0,prop=-1]\n\
             \t+ NodeRecord[1,used=true,rel=0,prop=40]\n\
             \tInconsistent with: 40"
                .to_string()
        ]
    );
}

#[test]
fn appended_record_has_no_prior_image() {
    let stores = consistent_snapshot().into_store_access();
    let mut changes = ChangeSet::new();
    changes.insert(Record::Node(node(3, None, Some(40))));

    let logger = InMemoryLogger::new();
    let summary = FullCheck::new(options(TaskExecutionOrder::MultiThreaded, false))
        .execute_with_changes(&stores, &changes, &logger)
        .expect("check completes");

    assert_eq!(summary.total_inconsistency_count(), 1);
    assert_eq!(
        split_violations(&logger.messages()),
        vec![
            "ERROR: The property record referenced is not in use.\n\
             \tNodeRecord[3,used=true,rel=-1,prop=40]\n\
             \tInconsistent with: 40"
                .to_string()
        ]
    );
}

#[test]
fn change_can_repair_an_inconsistency() {
    let mut snapshot = consistent_snapshot();
    snapshot.nodes[1].next_prop = Some(40);
    let stores = snapshot.into_store_access();

    let broken = FullCheck::default()
        .execute(&stores, &InMemoryLogger::new())
        .expect("check completes");
    assert!(!broken.is_consistent());

    let mut changes = ChangeSet::new();
    changes.insert(Record::Node(node(1, Some(0), None)));
    let logger = InMemoryLogger::new();
    let repaired = FullCheck::default()
        .execute_with_changes(&stores, &changes, &logger)
        .expect("check completes");
    assert!(repaired.is_consistent(), "{:?}", logger.messages());
}

#[test]
fn empty_change_set_matches_a_plain_check() {
    let mut snapshot = consistent_snapshot();
    snapshot.relationships[1].rel_type = 9;
    snapshot.strings[1].next_block = Some(1);
    let stores = snapshot.into_store_access();
    let check = FullCheck::new(options(TaskExecutionOrder::MultiPass, true));

    let plain_logger = InMemoryLogger::new();
    let plain = check.execute(&stores, &plain_logger).expect("check completes");
    let layered_logger = InMemoryLogger::new();
    let layered = check
        .execute_with_changes(&stores, &ChangeSet::new(), &layered_logger)
        .expect("check completes");

    assert_eq!(plain.report(), layered.report());
    assert_eq!(
        split_violations(&plain_logger.messages()),
        split_violations(&layered_logger.messages())
    );
}
