use crate::access::DiffRecordAccess;
use crate::checking::Rule;
use crate::error::StoreError;
use crate::report::{ChainLink, Inconsistency, RecordReport};
use crate::store::{
    DynamicRecord, NodeRecord, PropertyIndexRecord, PropertyRecord, PropertyValue, Record,
    RecordKind, RelationshipRecord, RelationshipTypeRecord,
};

/// Reads a record and keeps it only when it is in use. Ids beyond the high id
/// read as absent.
fn used(
    access: &dyn DiffRecordAccess,
    kind: RecordKind,
    id: u64,
) -> Result<Option<Record>, StoreError> {
    Ok(access
        .current_record(kind, id)?
        .filter(|record| record.in_use()))
}

fn used_node(access: &dyn DiffRecordAccess, id: u64) -> Result<Option<NodeRecord>, StoreError> {
    Ok(match used(access, RecordKind::Node, id)? {
        Some(Record::Node(node)) => Some(node),
        _ => None,
    })
}

fn used_relationship(
    access: &dyn DiffRecordAccess,
    id: u64,
) -> Result<Option<RelationshipRecord>, StoreError> {
    Ok(match used(access, RecordKind::Relationship, id)? {
        Some(Record::Relationship(rel)) => Some(rel),
        _ => None,
    })
}

fn used_property(
    access: &dyn DiffRecordAccess,
    id: u64,
) -> Result<Option<PropertyRecord>, StoreError> {
    Ok(match used(access, RecordKind::Property, id)? {
        Some(Record::Property(prop)) => Some(prop),
        _ => None,
    })
}

pub(super) fn apply(
    rule: Rule,
    record: &Record,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    match (rule, record) {
        (Rule::NodeRelationship, Record::Node(node)) => node_relationship(node, access, report),
        (Rule::NodeProperty, Record::Node(node)) => {
            property_chain_head(node.next_prop, access, report)
        }
        (Rule::RelationshipSourceNode, Record::Relationship(rel)) => {
            endpoint(rel, true, access, report)
        }
        (Rule::RelationshipTargetNode, Record::Relationship(rel)) => {
            endpoint(rel, false, access, report)
        }
        (Rule::RelationshipType, Record::Relationship(rel)) => {
            relationship_type(rel, access, report)
        }
        (Rule::RelationshipProperty, Record::Relationship(rel)) => {
            property_chain_head(rel.next_prop, access, report)
        }
        (rule, Record::Relationship(rel)) => match rule.chain_link() {
            Some(link) => chain_neighbour(rel, link, access, report),
            None => Ok(()),
        },
        (Rule::PropertyPrev, Record::Property(prop)) => property_prev(prop, access, report),
        (Rule::PropertyNext, Record::Property(prop)) => property_next(prop, access, report),
        (Rule::PropertyKey, Record::Property(prop)) => property_keys(prop, access, report),
        (Rule::PropertyString, Record::Property(prop)) => property_values(
            prop,
            RecordKind::String,
            Inconsistency::StringValueNotInUse,
            access,
            report,
        ),
        (Rule::PropertyArray, Record::Property(prop)) => property_values(
            prop,
            RecordKind::Array,
            Inconsistency::ArrayValueNotInUse,
            access,
            report,
        ),
        (Rule::PropertyIndexName, Record::PropertyIndex(index)) => {
            property_index_name(index, access, report)
        }
        (Rule::RelationshipTypeName, Record::RelationshipType(ty)) => {
            relationship_type_name(ty, access, report)
        }
        (Rule::DynamicNext, record) => match record.as_dynamic() {
            Some(block) => next_block(record.kind(), block, access, report),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

fn node_relationship(
    node: &NodeRecord,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    let Some(rel_id) = node.next_rel else {
        return Ok(());
    };
    match used_relationship(access, rel_id)? {
        None => report.report(Inconsistency::RelationshipNotInUse, &[rel_id]),
        Some(rel) => match rel.chain_for(node.id) {
            None => report.report(Inconsistency::RelationshipForOtherNode, &[rel_id]),
            Some((Some(_), _)) => {
                report.report(Inconsistency::RelationshipNotFirstInChain, &[rel_id])
            }
            Some((None, _)) => {}
        },
    }
    Ok(())
}

/// A record's first property must be in use and have no predecessor.
pub(super) fn property_chain_head(
    next_prop: Option<u64>,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    let Some(prop_id) = next_prop else {
        return Ok(());
    };
    match used_property(access, prop_id)? {
        None => report.report(Inconsistency::PropertyNotInUse, &[prop_id]),
        Some(prop) if prop.prev_prop.is_some() => {
            report.report(Inconsistency::PropertyNotFirstInChain, &[prop_id])
        }
        Some(_) => {}
    }
    Ok(())
}

fn endpoint(
    rel: &RelationshipRecord,
    source: bool,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    let (node_id, prev, not_in_use, no_back_reference) = if source {
        (
            rel.first_node,
            rel.first_prev_rel,
            Inconsistency::SourceNodeNotInUse,
            Inconsistency::SourceNodeDoesNotReferenceBack,
        )
    } else {
        (
            rel.second_node,
            rel.second_prev_rel,
            Inconsistency::TargetNodeNotInUse,
            Inconsistency::TargetNodeDoesNotReferenceBack,
        )
    };
    match used_node(access, node_id)? {
        None => report.report(not_in_use, &[node_id]),
        // First in this chain: the node must point at us.
        Some(node) if prev.is_none() && node.next_rel != Some(rel.id) => {
            report.report(no_back_reference, &[node_id])
        }
        Some(_) => {}
    }
    Ok(())
}

fn relationship_type(
    rel: &RelationshipRecord,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    let type_id = u64::from(rel.rel_type);
    if used(access, RecordKind::RelationshipType, type_id)?.is_none() {
        report.report(Inconsistency::RelationshipTypeNotInUse, &[type_id]);
    }
    Ok(())
}

fn chain_neighbour(
    rel: &RelationshipRecord,
    link: ChainLink,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    let (pointer, node) = match link {
        ChainLink::SourcePrev => (rel.first_prev_rel, rel.first_node),
        ChainLink::SourceNext => (rel.first_next_rel, rel.first_node),
        ChainLink::TargetPrev => (rel.second_prev_rel, rel.second_node),
        ChainLink::TargetNext => (rel.second_next_rel, rel.second_node),
    };
    let Some(other_id) = pointer else {
        return Ok(());
    };
    match used_relationship(access, other_id)? {
        None => report.report(Inconsistency::ChainNotInUse(link), &[other_id]),
        Some(other) => match other.chain_for(node) {
            None => report.report(Inconsistency::ChainForOtherNodes(link), &[other_id]),
            Some((other_prev, other_next)) => {
                let back = match link {
                    ChainLink::SourcePrev | ChainLink::TargetPrev => other_next,
                    ChainLink::SourceNext | ChainLink::TargetNext => other_prev,
                };
                if back != Some(rel.id) {
                    report.report(Inconsistency::ChainDoesNotReferenceBack(link), &[other_id]);
                }
            }
        },
    }
    Ok(())
}

fn property_prev(
    prop: &PropertyRecord,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    let Some(prev_id) = prop.prev_prop else {
        return Ok(());
    };
    match used_property(access, prev_id)? {
        None => report.report(Inconsistency::PrevPropertyNotInUse, &[prev_id]),
        Some(prev) if prev.next_prop != Some(prop.id) => {
            report.report(Inconsistency::PrevPropertyDoesNotReferenceBack, &[prev_id])
        }
        Some(_) => {}
    }
    Ok(())
}

fn property_next(
    prop: &PropertyRecord,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    let Some(next_id) = prop.next_prop else {
        return Ok(());
    };
    match used_property(access, next_id)? {
        None => report.report(Inconsistency::NextPropertyNotInUse, &[next_id]),
        Some(next) if next.prev_prop != Some(prop.id) => {
            report.report(Inconsistency::NextPropertyDoesNotReferenceBack, &[next_id])
        }
        Some(_) => {}
    }
    Ok(())
}

fn property_keys(
    prop: &PropertyRecord,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    for block in &prop.blocks {
        let key_id = u64::from(block.key_index);
        if used(access, RecordKind::PropertyIndex, key_id)?.is_none() {
            report.report(Inconsistency::PropertyKeyNotInUse, &[key_id]);
        }
    }
    Ok(())
}

fn property_values(
    prop: &PropertyRecord,
    kind: RecordKind,
    not_in_use: Inconsistency,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    for block in &prop.blocks {
        let value_id = match (kind, block.value) {
            (RecordKind::String, PropertyValue::String(id)) => id,
            (RecordKind::Array, PropertyValue::Array(id)) => id,
            _ => continue,
        };
        if used(access, kind, value_id)?.is_none() {
            report.report(not_in_use, &[value_id]);
        }
    }
    Ok(())
}

fn property_index_name(
    index: &PropertyIndexRecord,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    if used(access, RecordKind::PropertyKey, index.name_id)?.is_none() {
        report.report(Inconsistency::KeyNameNotInUse, &[index.name_id]);
    }
    Ok(())
}

fn relationship_type_name(
    ty: &RelationshipTypeRecord,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    if used(access, RecordKind::TypeName, ty.name_id)?.is_none() {
        report.report(Inconsistency::TypeNameNotInUse, &[ty.name_id]);
    }
    Ok(())
}

fn next_block(
    kind: RecordKind,
    block: &DynamicRecord,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    let Some(next_id) = block.next_block else {
        return Ok(());
    };
    if next_id == block.id {
        report.report(Inconsistency::NextBlockSelfReference, &[next_id]);
    } else if used(access, kind, next_id)?.is_none() {
        report.report(Inconsistency::NextBlockNotInUse, &[next_id]);
    }
    Ok(())
}
