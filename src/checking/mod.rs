//! Per-record consistency rules and the filters that select them.
//!
//! Every rule validates one kind of reference held by one kind of record: a
//! node's first relationship, a property block's string value, and so on. A
//! [`Filter`] enables the rules whose referenced store it targets, so a run can
//! be split into passes that each dereference only a few stores while together
//! covering every rule exactly once.

mod filter;
mod owner;
mod rules;

use crate::access::DiffRecordAccess;
use crate::error::StoreError;
use crate::report::{ChainLink, RecordReport};
use crate::store::{NeoStoreRecord, Record, RecordKind};

pub use filter::{Filter, KindSet, RuleSet};
pub use owner::{ChainOwner, OwnerCheck};

/// One reference check, identified by the record kind it runs on and the
/// store it dereferences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Node's first relationship.
    NodeRelationship,
    /// Node's first property.
    NodeProperty,
    /// Relationship's source node.
    RelationshipSourceNode,
    /// Relationship's target node.
    RelationshipTargetNode,
    /// Relationship's type.
    RelationshipType,
    /// Previous relationship in the source chain.
    RelationshipSourcePrev,
    /// Next relationship in the source chain.
    RelationshipSourceNext,
    /// Previous relationship in the target chain.
    RelationshipTargetPrev,
    /// Next relationship in the target chain.
    RelationshipTargetNext,
    /// Relationship's first property.
    RelationshipProperty,
    /// Previous record of a property chain.
    PropertyPrev,
    /// Next record of a property chain.
    PropertyNext,
    /// Key index of each property block.
    PropertyKey,
    /// String value of each property block.
    PropertyString,
    /// Array value of each property block.
    PropertyArray,
    /// Name of a property index.
    PropertyIndexName,
    /// Name of a relationship type.
    RelationshipTypeName,
    /// Next block of a dynamic record.
    DynamicNext,
}

impl Rule {
    /// Number of rules.
    pub const COUNT: usize = 18;

    /// Every rule, in declaration order.
    pub const ALL: [Rule; Rule::COUNT] = [
        Rule::NodeRelationship,
        Rule::NodeProperty,
        Rule::RelationshipSourceNode,
        Rule::RelationshipTargetNode,
        Rule::RelationshipType,
        Rule::RelationshipSourcePrev,
        Rule::RelationshipSourceNext,
        Rule::RelationshipTargetPrev,
        Rule::RelationshipTargetNext,
        Rule::RelationshipProperty,
        Rule::PropertyPrev,
        Rule::PropertyNext,
        Rule::PropertyKey,
        Rule::PropertyString,
        Rule::PropertyArray,
        Rule::PropertyIndexName,
        Rule::RelationshipTypeName,
        Rule::DynamicNext,
    ];

    /// Dense index of this rule, matching [`Rule::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether the rule checks records of `kind`.
    pub fn applies_to(self, kind: RecordKind) -> bool {
        match self {
            Rule::NodeRelationship | Rule::NodeProperty => kind == RecordKind::Node,
            Rule::RelationshipSourceNode
            | Rule::RelationshipTargetNode
            | Rule::RelationshipType
            | Rule::RelationshipSourcePrev
            | Rule::RelationshipSourceNext
            | Rule::RelationshipTargetPrev
            | Rule::RelationshipTargetNext
            | Rule::RelationshipProperty => kind == RecordKind::Relationship,
            Rule::PropertyPrev
            | Rule::PropertyNext
            | Rule::PropertyKey
            | Rule::PropertyString
            | Rule::PropertyArray => kind == RecordKind::Property,
            Rule::PropertyIndexName => kind == RecordKind::PropertyIndex,
            Rule::RelationshipTypeName => kind == RecordKind::RelationshipType,
            Rule::DynamicNext => kind.is_dynamic(),
        }
    }

    /// Store dereferenced when checking a record of `kind`.
    pub fn target(self, kind: RecordKind) -> RecordKind {
        match self {
            Rule::NodeRelationship
            | Rule::RelationshipSourcePrev
            | Rule::RelationshipSourceNext
            | Rule::RelationshipTargetPrev
            | Rule::RelationshipTargetNext => RecordKind::Relationship,
            Rule::RelationshipSourceNode | Rule::RelationshipTargetNode => RecordKind::Node,
            Rule::NodeProperty
            | Rule::RelationshipProperty
            | Rule::PropertyPrev
            | Rule::PropertyNext => RecordKind::Property,
            Rule::RelationshipType => RecordKind::RelationshipType,
            Rule::PropertyKey => RecordKind::PropertyIndex,
            Rule::PropertyString => RecordKind::String,
            Rule::PropertyArray => RecordKind::Array,
            Rule::PropertyIndexName => RecordKind::PropertyKey,
            Rule::RelationshipTypeName => RecordKind::TypeName,
            Rule::DynamicNext => kind,
        }
    }

    fn chain_link(self) -> Option<ChainLink> {
        match self {
            Rule::RelationshipSourcePrev => Some(ChainLink::SourcePrev),
            Rule::RelationshipSourceNext => Some(ChainLink::SourceNext),
            Rule::RelationshipTargetPrev => Some(ChainLink::TargetPrev),
            Rule::RelationshipTargetNext => Some(ChainLink::TargetNext),
            _ => None,
        }
    }
}

/// Observes every record a processor checks, after its rules ran.
///
/// Decorators see the union of targets of the processor's filters so they can
/// do their bookkeeping in exactly one pass.
pub trait CheckDecorator: Send + Sync {
    /// Called once per used record a processor visits.
    fn observe(&self, record: &Record, targets: KindSet);

    /// Called once for the graph-level record.
    fn observe_neo_store(&self, record: &NeoStoreRecord);
}

/// Runs the enabled rules against one used record.
pub fn check_record(
    record: &Record,
    rules: RuleSet,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    for rule in rules.iter() {
        if rule.applies_to(record.kind()) {
            rules::apply(rule, record, access, report)?;
        }
    }
    Ok(())
}

/// Checks the graph-level record's property chain head.
pub fn check_neo_store(
    record: &NeoStoreRecord,
    access: &dyn DiffRecordAccess,
    report: &mut RecordReport<'_>,
) -> Result<(), StoreError> {
    if !record.in_use {
        return Ok(());
    }
    rules::property_chain_head(record.next_prop, access, report)
}
