//! Violations and the sinks they are reported to.
//!
//! Every inconsistency found becomes a [`Violation`], is counted once in the
//! [`ConsistencySummaryStatistics`] and rendered by a [`ConsistencyLogger`].

mod logger;
mod summary;

use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::store::RecordKind;

pub use logger::{
    ConsistencyLogger, InMemoryLogger, MessageConsistencyLogger, StringLogger, TracingLogger,
    WriterLogger,
};
pub use summary::{ConsistencySummaryStatistics, SummaryReport, TypeCounts};

/// Tag attributing a violation to a kind of record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    /// The graph-level record.
    NeoStore,
    /// Node records.
    Node,
    /// Relationship records.
    Relationship,
    /// Property records.
    Property,
    /// Relationship type records.
    RelationshipType,
    /// Property index records.
    PropertyIndex,
    /// String store blocks.
    String,
    /// Array store blocks.
    Array,
    /// Relationship type name blocks.
    TypeName,
    /// Property key name blocks.
    PropertyKey,
    /// Ownership of property chains, found by the orphan scan.
    PropertyChainOwner,
    /// Ownership of dynamic record chains, found by the orphan scan.
    DynamicChainOwner,
}

impl RecordType {
    /// Number of record types.
    pub const COUNT: usize = 12;

    /// All record types in reporting order.
    pub const ALL: [RecordType; RecordType::COUNT] = [
        RecordType::NeoStore,
        RecordType::Node,
        RecordType::Relationship,
        RecordType::Property,
        RecordType::RelationshipType,
        RecordType::PropertyIndex,
        RecordType::String,
        RecordType::Array,
        RecordType::TypeName,
        RecordType::PropertyKey,
        RecordType::PropertyChainOwner,
        RecordType::DynamicChainOwner,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Name used in summaries.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::NeoStore => "NEO_STORE",
            RecordType::Node => "NODE",
            RecordType::Relationship => "RELATIONSHIP",
            RecordType::Property => "PROPERTY",
            RecordType::RelationshipType => "RELATIONSHIP_TYPE",
            RecordType::PropertyIndex => "PROPERTY_INDEX",
            RecordType::String => "STRING",
            RecordType::Array => "ARRAY",
            RecordType::TypeName => "TYPE_NAME",
            RecordType::PropertyKey => "PROPERTY_KEY",
            RecordType::PropertyChainOwner => "PROPERTY_CHAIN_OWNER",
            RecordType::DynamicChainOwner => "DYNAMIC_CHAIN_OWNER",
        }
    }
}

impl From<RecordKind> for RecordType {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Node => RecordType::Node,
            RecordKind::Relationship => RecordType::Relationship,
            RecordKind::Property => RecordType::Property,
            RecordKind::RelationshipType => RecordType::RelationshipType,
            RecordKind::PropertyIndex => RecordType::PropertyIndex,
            RecordKind::String => RecordType::String,
            RecordKind::Array => RecordType::Array,
            RecordKind::TypeName => RecordType::TypeName,
            RecordKind::PropertyKey => RecordType::PropertyKey,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Wasted space or suspicious state; data is still reachable and correct.
    Warning,
    /// Broken references; data is unreachable or will be corrupted on write.
    Error,
}

impl Severity {
    /// Prefix of the first line of a rendered violation.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

/// A pointer in one of the two relationship chains a relationship sits in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainLink {
    /// Previous relationship of the source node.
    SourcePrev,
    /// Next relationship of the source node.
    SourceNext,
    /// Previous relationship of the target node.
    TargetPrev,
    /// Next relationship of the target node.
    TargetNext,
}

impl ChainLink {
    /// All four links.
    pub const ALL: [ChainLink; 4] = [
        ChainLink::SourcePrev,
        ChainLink::SourceNext,
        ChainLink::TargetPrev,
        ChainLink::TargetNext,
    ];

    fn describe(self) -> &'static str {
        match self {
            ChainLink::SourcePrev => "previous relationship in the source chain",
            ChainLink::SourceNext => "next relationship in the source chain",
            ChainLink::TargetPrev => "previous relationship in the target chain",
            ChainLink::TargetNext => "next relationship in the target chain",
        }
    }
}

/// What is wrong with a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inconsistency {
    /// Chain head relationship unused or out of range.
    RelationshipNotInUse,
    /// Chain head relationship does not have this node as an endpoint.
    RelationshipForOtherNode,
    /// Chain head relationship has a predecessor for this node.
    RelationshipNotFirstInChain,
    /// Property chain head unused or out of range.
    PropertyNotInUse,
    /// Property chain head has a predecessor.
    PropertyNotFirstInChain,
    /// Source node unused or out of range.
    SourceNodeNotInUse,
    /// Target node unused or out of range.
    TargetNodeNotInUse,
    /// Relationship heads the source chain but the source node points elsewhere.
    SourceNodeDoesNotReferenceBack,
    /// Relationship heads the target chain but the target node points elsewhere.
    TargetNodeDoesNotReferenceBack,
    /// Relationship type unused or out of range.
    RelationshipTypeNotInUse,
    /// Chain neighbour unused or out of range.
    ChainNotInUse(ChainLink),
    /// Chain neighbour does not share the chain's node.
    ChainForOtherNodes(ChainLink),
    /// Chain neighbour's opposite pointer does not reference back.
    ChainDoesNotReferenceBack(ChainLink),
    /// Previous property record unused or out of range.
    PrevPropertyNotInUse,
    /// Previous property record's next pointer does not reference back.
    PrevPropertyDoesNotReferenceBack,
    /// Next property record unused or out of range.
    NextPropertyNotInUse,
    /// Next property record's previous pointer does not reference back.
    NextPropertyDoesNotReferenceBack,
    /// A block's key index unused or out of range.
    PropertyKeyNotInUse,
    /// A block's string value unused or out of range.
    StringValueNotInUse,
    /// A block's array value unused or out of range.
    ArrayValueNotInUse,
    /// Property index name unused or out of range.
    KeyNameNotInUse,
    /// Relationship type name unused or out of range.
    TypeNameNotInUse,
    /// Next dynamic block unused or out of range.
    NextBlockNotInUse,
    /// Dynamic block points at itself.
    NextBlockSelfReference,
    /// Property chain nobody owns.
    OrphanPropertyChain,
    /// Property chain owned by more than one record.
    MultiplePropertyChainOwners,
    /// Dynamic chain nobody references.
    OrphanDynamicChain,
    /// Dynamic chain referenced by more than one record.
    MultipleDynamicChainOwners,
}

impl Inconsistency {
    /// How bad the inconsistency is.
    pub fn severity(self) -> Severity {
        match self {
            Inconsistency::OrphanPropertyChain | Inconsistency::OrphanDynamicChain => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::RelationshipNotInUse => {
                f.write_str("The referenced relationship record is not in use.")
            }
            Inconsistency::RelationshipForOtherNode => f.write_str(
                "The referenced relationship record is a relationship between two other nodes.",
            ),
            Inconsistency::RelationshipNotFirstInChain => f.write_str(
                "The referenced relationship record is not the first in the relationship chain of this node.",
            ),
            Inconsistency::PropertyNotInUse => {
                f.write_str("The property record referenced is not in use.")
            }
            Inconsistency::PropertyNotFirstInChain => {
                f.write_str("The property record referenced is not the first in its property chain.")
            }
            Inconsistency::SourceNodeNotInUse => f.write_str("The source node is not in use."),
            Inconsistency::TargetNodeNotInUse => f.write_str("The target node is not in use."),
            Inconsistency::SourceNodeDoesNotReferenceBack => f.write_str(
                "This record is first in the source chain, but the source node does not reference it.",
            ),
            Inconsistency::TargetNodeDoesNotReferenceBack => f.write_str(
                "This record is first in the target chain, but the target node does not reference it.",
            ),
            Inconsistency::RelationshipTypeNotInUse => {
                f.write_str("The relationship type record is not in use.")
            }
            Inconsistency::ChainNotInUse(link) => {
                write!(f, "The {} is not in use.", link.describe())
            }
            Inconsistency::ChainForOtherNodes(link) => write!(
                f,
                "The {} is a relationship between two other nodes.",
                link.describe()
            ),
            Inconsistency::ChainDoesNotReferenceBack(link) => write!(
                f,
                "The {} does not reference back to this record.",
                link.describe()
            ),
            Inconsistency::PrevPropertyNotInUse => {
                f.write_str("The previous property record is not in use.")
            }
            Inconsistency::PrevPropertyDoesNotReferenceBack => f.write_str(
                "The previous property record does not have this record as its next record.",
            ),
            Inconsistency::NextPropertyNotInUse => {
                f.write_str("The next property record is not in use.")
            }
            Inconsistency::NextPropertyDoesNotReferenceBack => f.write_str(
                "The next property record does not have this record as its previous record.",
            ),
            Inconsistency::PropertyKeyNotInUse => {
                f.write_str("The property key index of a property block is not in use.")
            }
            Inconsistency::StringValueNotInUse => {
                f.write_str("The string record of a property block is not in use.")
            }
            Inconsistency::ArrayValueNotInUse => {
                f.write_str("The array record of a property block is not in use.")
            }
            Inconsistency::KeyNameNotInUse => {
                f.write_str("The property key name record is not in use.")
            }
            Inconsistency::TypeNameNotInUse => {
                f.write_str("The relationship type name record is not in use.")
            }
            Inconsistency::NextBlockNotInUse => {
                f.write_str("The next block of this dynamic record is not in use.")
            }
            Inconsistency::NextBlockSelfReference => {
                f.write_str("The next block of this dynamic record references the record itself.")
            }
            Inconsistency::OrphanPropertyChain => f.write_str(
                "The property chain is not owned by any node, relationship or the graph.",
            ),
            Inconsistency::MultiplePropertyChainOwners => {
                f.write_str("The property chain is owned by more than one record.")
            }
            Inconsistency::OrphanDynamicChain => {
                f.write_str("The dynamic record chain is not referenced by any record.")
            }
            Inconsistency::MultipleDynamicChainOwners => {
                f.write_str("The dynamic record chain is referenced by more than one record.")
            }
        }
    }
}

/// One inconsistency found on one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Attribution tag.
    pub record_type: RecordType,
    /// Id of the inconsistent record.
    pub record_id: u64,
    /// What is wrong.
    pub inconsistency: Inconsistency,
    /// Rendering of the record as checked.
    pub record: String,
    /// Rendering of the record before a change applied in this run.
    pub prior: Option<String>,
    /// Ids of the records the violation cross-references.
    pub references: Vec<u64>,
}

impl Violation {
    /// Severity of the underlying inconsistency.
    pub fn severity(&self) -> Severity {
        self.inconsistency.severity()
    }
}

/// Collects the violations found while checking one record.
pub struct RecordReport<'r> {
    record_type: RecordType,
    record_id: u64,
    record: &'r dyn fmt::Display,
    prior: Option<&'r dyn fmt::Display>,
    violations: Vec<Violation>,
}

impl<'r> RecordReport<'r> {
    /// Starts a report for a record, with its prior image when it was changed.
    pub fn new(
        record_type: RecordType,
        record_id: u64,
        record: &'r dyn fmt::Display,
        prior: Option<&'r dyn fmt::Display>,
    ) -> Self {
        Self {
            record_type,
            record_id,
            record,
            prior,
            violations: Vec::new(),
        }
    }

    /// Records an inconsistency cross-referencing `references`.
    pub fn report(&mut self, inconsistency: Inconsistency, references: &[u64]) {
        self.violations.push(Violation {
            record_type: self.record_type,
            record_id: self.record_id,
            inconsistency,
            record: self.record.to_string(),
            prior: self.prior.map(|prior| prior.to_string()),
            references: references.to_vec(),
        });
    }

    /// Violations collected so far.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub(crate) fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

type ViolationKey = (RecordType, u64, Inconsistency, Vec<u64>);

/// Routes violations to the summary and the logger, at most once each.
///
/// Shared by every task of a run. A violation is identified by record type,
/// record id, inconsistency and references; repeats are dropped so passes that
/// revisit a record cannot double count.
pub struct ConsistencyReporter<'a> {
    logger: &'a dyn ConsistencyLogger,
    summary: &'a ConsistencySummaryStatistics,
    seen: Mutex<FxHashSet<ViolationKey>>,
}

impl<'a> ConsistencyReporter<'a> {
    /// Creates a reporter for one run.
    pub fn new(logger: &'a dyn ConsistencyLogger, summary: &'a ConsistencySummaryStatistics) -> Self {
        Self {
            logger,
            summary,
            seen: Mutex::new(FxHashSet::default()),
        }
    }

    /// Counts and logs the violations of one record as a single unit.
    pub fn report(&self, violations: Vec<Violation>) {
        if violations.is_empty() {
            return;
        }
        let fresh: Vec<Violation> = {
            let mut seen = self.seen.lock();
            violations
                .into_iter()
                .filter(|v| {
                    seen.insert((v.record_type, v.record_id, v.inconsistency, v.references.clone()))
                })
                .collect()
        };
        if fresh.is_empty() {
            return;
        }
        for violation in &fresh {
            self.summary.update(violation.record_type, violation.severity());
        }
        self.logger.log(&fresh);
    }

    /// Flushes the violations collected for one record.
    pub fn flush(&self, report: RecordReport<'_>) {
        self.report(report.into_violations());
    }
}
