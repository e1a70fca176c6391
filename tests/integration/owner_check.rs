#![allow(missing_docs)]

mod support;

use sombra_consistency::report::RecordType;
use sombra_consistency::store::{DynamicRecord, PropertyValue};
use sombra_consistency::{StoreSnapshot, TaskExecutionOrder};

use support::{block, check, consistent_snapshot, options};

/// Nodes 1 and 2 both claim property chain 0; node 0 no longer does.
fn shared_property_chain() -> StoreSnapshot {
    let mut snapshot = consistent_snapshot();
    snapshot.nodes[0].next_prop = None;
    snapshot.nodes[1].next_prop = Some(0);
    snapshot.nodes[2].next_prop = Some(0);
    snapshot
}

#[test]
fn shared_property_chain_is_one_error_under_every_order() {
    let stores = shared_property_chain().into_store_access();
    for order in TaskExecutionOrder::ALL {
        let outcome = check(&stores, options(order, true));
        assert_eq!(
            outcome.summary.errors(RecordType::PropertyChainOwner),
            1,
            "{order}"
        );
        assert_eq!(outcome.summary.total_inconsistency_count(), 1, "{order}");
        assert_eq!(
            outcome.violations(),
            vec![
                "ERROR: The property chain is owned by more than one record.\n\
                 \tPropertyRecord[0,used=true,prev=-1,next=2,PropertyBlock[key=0,value=string@0]]\n\
                 \tInconsistent with: 0 1 2"
                    .to_string()
            ],
            "{order}"
        );
    }
}

#[test]
fn unowned_property_chain_is_a_warning() {
    let mut snapshot = consistent_snapshot();
    snapshot.neo_store = None;
    let stores = snapshot.into_store_access();

    let outcome = check(&stores, options(TaskExecutionOrder::MultiPass, true));
    assert_eq!(outcome.summary.warnings(RecordType::PropertyChainOwner), 1);
    assert_eq!(outcome.summary.total_errors(), 0);
    assert_eq!(
        outcome.violations(),
        vec![
            "WARNING: The property chain is not owned by any node, relationship or the graph.\n\
             \tPropertyRecord[3,used=true,prev=-1,next=-1,PropertyBlock[key=0,value=1]]\n\
             \tInconsistent with: 3"
                .to_string()
        ]
    );
}

#[test]
fn ownership_is_not_checked_unless_enabled() {
    let mut snapshot = shared_property_chain();
    snapshot.neo_store = None;
    snapshot.strings.push(DynamicRecord::new(2));
    let stores = snapshot.into_store_access();
    for order in TaskExecutionOrder::ALL {
        let outcome = check(&stores, options(order, false));
        assert!(outcome.summary.is_consistent(), "{order}: {:?}", outcome.messages);
    }
}

#[test]
fn unreferenced_string_is_an_orphan() {
    let mut snapshot = consistent_snapshot();
    snapshot.strings.push(DynamicRecord::new(2));
    let stores = snapshot.into_store_access();

    let outcome = check(&stores, options(TaskExecutionOrder::SingleThreaded, true));
    assert_eq!(outcome.summary.warnings(RecordType::DynamicChainOwner), 1);
    assert_eq!(outcome.summary.total_inconsistency_count(), 1);
    assert_eq!(
        outcome.violations(),
        vec![
            "WARNING: The dynamic record chain is not referenced by any record.\n\
             \tDynamicRecord[2,used=true,nextBlock=-1,length=0]\n\
             \tInconsistent with: 2"
                .to_string()
        ]
    );
}

#[test]
fn continuation_blocks_are_not_orphans() {
    let mut snapshot = consistent_snapshot();
    let mut tail = DynamicRecord::new(2);
    tail.length = 12;
    snapshot.strings[1].next_block = Some(2);
    snapshot.strings.push(tail);
    let stores = snapshot.into_store_access();

    let outcome = check(&stores, options(TaskExecutionOrder::MultiThreaded, true));
    assert!(outcome.summary.is_consistent(), "{:?}", outcome.messages);
}

#[test]
fn string_shared_by_two_properties_is_an_error() {
    let mut snapshot = consistent_snapshot();
    snapshot.properties[1]
        .blocks
        .push(block(0, PropertyValue::String(0)));
    let stores = snapshot.into_store_access();

    for order in TaskExecutionOrder::ALL {
        let outcome = check(&stores, options(order, true));
        assert_eq!(
            outcome.summary.errors(RecordType::DynamicChainOwner),
            1,
            "{order}"
        );
        assert_eq!(
            outcome.violations(),
            vec![
                "ERROR: The dynamic record chain is referenced by more than one record.\n\
                 \tDynamicRecord[0,used=true,nextBlock=1,length=0]\n\
                 \tInconsistent with: 0 0 1"
                    .to_string()
            ],
            "{order}"
        );
    }
}

#[test]
fn type_names_are_owned_by_their_types() {
    let mut snapshot = consistent_snapshot();
    // Both types now use name 0; name 1 is left without an owner.
    snapshot.relationship_types[1].name_id = 0;
    let stores = snapshot.into_store_access();

    let outcome = check(&stores, options(TaskExecutionOrder::MultiPass, true));
    assert_eq!(outcome.summary.errors(RecordType::DynamicChainOwner), 1);
    assert_eq!(outcome.summary.warnings(RecordType::DynamicChainOwner), 1);
    let violations = outcome.violations();
    assert_eq!(violations.len(), 2, "{violations:?}");
    assert!(violations[0].ends_with("\tInconsistent with: 0 0 1"), "{violations:?}");
    assert!(violations[1].ends_with("\tInconsistent with: 1"), "{violations:?}");
}

#[test]
fn property_pointing_into_another_chain_shares_the_block() {
    let mut snapshot = consistent_snapshot();
    // String chain 0 -> 1 belongs to property 0; property 1 now claims block 1.
    snapshot.properties[1]
        .blocks
        .push(block(0, PropertyValue::String(1)));
    let stores = snapshot.into_store_access();

    for order in TaskExecutionOrder::ALL {
        let outcome = check(&stores, options(order, true));
        assert_eq!(
            outcome.summary.errors(RecordType::DynamicChainOwner),
            1,
            "{order}"
        );
        assert_eq!(outcome.summary.total_inconsistency_count(), 1, "{order}");
        let violations = outcome.violations();
        assert!(violations[0].contains("\tDynamicRecord[1,"), "{order}: {violations:?}");
        assert!(
            violations[0].ends_with("\tInconsistent with: 1 1 0"),
            "{order}: {violations:?}"
        );
    }
}

#[test]
fn merging_string_chains_share_their_tail() {
    let mut snapshot = consistent_snapshot();
    let mut second_head = DynamicRecord::new(2);
    second_head.next_block = Some(1);
    snapshot.strings.push(second_head);
    snapshot.properties[1]
        .blocks
        .push(block(0, PropertyValue::String(2)));
    let stores = snapshot.into_store_access();

    for order in TaskExecutionOrder::ALL {
        let outcome = check(&stores, options(order, true));
        assert_eq!(
            outcome.summary.errors(RecordType::DynamicChainOwner),
            1,
            "{order}"
        );
        assert_eq!(outcome.summary.total_inconsistency_count(), 1, "{order}");
        let violations = outcome.violations();
        assert!(
            violations[0].ends_with("\tInconsistent with: 1 0 2"),
            "{order}: {violations:?}"
        );
    }
}
