use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::access::DiffRecordAccess;
use crate::checking::{CheckDecorator, KindSet};
use crate::error::StoreError;
use crate::progress::ProgressMonitorFactory;
use crate::report::{ConsistencyReporter, Inconsistency, RecordReport, RecordType};
use crate::store::{NeoStoreRecord, PropertyValue, Record, RecordKind};

/// A record holding a reference to the head of a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainOwner {
    /// The graph-level record.
    Graph,
    /// A node record.
    Node(u64),
    /// A relationship record.
    Relationship(u64),
    /// A property record, through one of its blocks.
    Property(u64),
    /// A property index record, through its name.
    PropertyIndex(u64),
    /// A relationship type record, through its name.
    RelationshipType(u64),
    /// The dynamic block whose next pointer leads here.
    DynamicBlock(u64),
}

impl ChainOwner {
    /// Id of the owning record. The graph has none.
    pub fn id(self) -> Option<u64> {
        match self {
            ChainOwner::Graph => None,
            ChainOwner::Node(id)
            | ChainOwner::Relationship(id)
            | ChainOwner::Property(id)
            | ChainOwner::PropertyIndex(id)
            | ChainOwner::RelationshipType(id)
            | ChainOwner::DynamicBlock(id) => Some(id),
        }
    }
}

impl fmt::Display for ChainOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainOwner::Graph => f.write_str("graph"),
            ChainOwner::Node(id) => write!(f, "node {id}"),
            ChainOwner::Relationship(id) => write!(f, "relationship {id}"),
            ChainOwner::Property(id) => write!(f, "property {id}"),
            ChainOwner::PropertyIndex(id) => write!(f, "property index {id}"),
            ChainOwner::RelationshipType(id) => write!(f, "relationship type {id}"),
            ChainOwner::DynamicBlock(id) => write!(f, "dynamic block {id}"),
        }
    }
}

const HEAD: u8 = 0b001;
const USED: u8 = 0b010;

type Owners = SmallVec<[ChainOwner; 2]>;

#[derive(Clone, Copy, Default)]
struct Slot {
    flags: u8,
    owner: Option<ChainOwner>,
}

/// Dense per-id claim bookkeeping for one store. Ids at or beyond the store's
/// high id are ignored; the reference rules report those.
#[derive(Default)]
struct ClaimTable {
    slots: Vec<Slot>,
    extra: FxHashMap<u64, Owners>,
}

impl ClaimTable {
    fn with_len(len: u64) -> Self {
        Self {
            slots: vec![Slot::default(); usize::try_from(len).unwrap_or(usize::MAX)],
            extra: FxHashMap::default(),
        }
    }

    fn slot_mut(&mut self, id: u64) -> Option<&mut Slot> {
        let idx = usize::try_from(id).ok()?;
        self.slots.get_mut(idx)
    }

    fn mark(&mut self, id: u64, flag: u8) {
        if let Some(slot) = self.slot_mut(id) {
            slot.flags |= flag;
        }
    }

    fn claim(&mut self, head: u64, owner: ChainOwner) {
        let Some(slot) = self.slot_mut(head) else {
            return;
        };
        match slot.owner {
            None => slot.owner = Some(owner),
            Some(first) if first == owner => {}
            Some(_) => {
                let extra = self.extra.entry(head).or_default();
                if !extra.contains(&owner) {
                    extra.push(owner);
                }
            }
        }
    }

    /// Slots carrying `flag` that are not owned by exactly one record, with
    /// their sorted owners.
    fn unowned_or_shared(&self, flag: u8) -> Vec<(u64, Owners)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.flags & flag != 0)
            .filter_map(|(idx, slot)| {
                let id = idx as u64;
                let mut owners: Owners = slot.owner.into_iter().collect();
                if let Some(extra) = self.extra.get(&id) {
                    owners.extend(extra.iter().copied());
                }
                owners.sort_unstable();
                (owners.len() != 1).then_some((id, owners))
            })
            .collect()
    }

    fn len(&self) -> u64 {
        self.slots.len() as u64
    }
}

const DYNAMIC_KINDS: [RecordKind; 4] = [
    RecordKind::String,
    RecordKind::Array,
    RecordKind::TypeName,
    RecordKind::PropertyKey,
];

fn dynamic_index(kind: RecordKind) -> Option<usize> {
    DYNAMIC_KINDS.iter().position(|candidate| *candidate == kind)
}

/// Finds chains owned by nobody or by more than one record.
///
/// During the store passes the check records which record claims which chain
/// head, and which records are heads. The orphan scan then reports every head
/// whose owner count is not exactly one. Claims are idempotent, so a record
/// observed by several passes counts once.
///
/// Every used dynamic block is judged, not only chain heads: a block's
/// `next_block` is an ownership claim on its successor, so a property
/// pointing into the middle of another chain, or two chains merging into one
/// tail, both surface as shared blocks.
pub struct OwnerCheck {
    enabled: bool,
    properties: Mutex<ClaimTable>,
    dynamics: [Mutex<ClaimTable>; 4],
}

impl OwnerCheck {
    /// Sizes the claim tables for the stores behind `access`. A disabled check
    /// allocates nothing and never reports.
    pub fn new(enabled: bool, access: &dyn DiffRecordAccess) -> Self {
        let table = |kind: RecordKind| {
            if enabled {
                ClaimTable::with_len(access.high_id(kind))
            } else {
                ClaimTable::default()
            }
        };
        Self {
            enabled,
            properties: Mutex::new(table(RecordKind::Property)),
            dynamics: DYNAMIC_KINDS.map(|kind| Mutex::new(table(kind))),
        }
    }

    /// A check that does nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            properties: Mutex::new(ClaimTable::default()),
            dynamics: std::array::from_fn(|_| Mutex::new(ClaimTable::default())),
        }
    }

    /// Whether ownership is being tracked.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn claim_property(&self, head: Option<u64>, owner: ChainOwner) {
        if let Some(head) = head {
            self.properties.lock().claim(head, owner);
        }
    }

    fn claim_dynamic(&self, kind: RecordKind, head: u64, owner: ChainOwner) {
        if let Some(idx) = dynamic_index(kind) {
            self.dynamics[idx].lock().claim(head, owner);
        }
    }

    /// Reports every chain head that is owned by no record or by several.
    ///
    /// Must run after every store pass has finished.
    pub fn scan_for_orphan_chains(
        &self,
        access: &dyn DiffRecordAccess,
        reporter: &ConsistencyReporter<'_>,
        progress: &dyn ProgressMonitorFactory,
    ) -> Result<(), StoreError> {
        if !self.enabled {
            return Ok(());
        }
        let total = self.properties.lock().len()
            + self.dynamics.iter().map(|t| t.lock().len()).sum::<u64>();
        let listener = progress.part("Check for orphan chains", total);

        let (property_findings, scanned) = {
            let table = self.properties.lock();
            (table.unowned_or_shared(HEAD), table.len())
        };
        debug!(
            findings = property_findings.len(),
            "consistency.owner_check.property_chains"
        );
        for (head, owners) in property_findings {
            report_chain(
                access,
                reporter,
                RecordKind::Property,
                RecordType::PropertyChainOwner,
                head,
                &owners,
            )?;
        }
        listener.add(scanned);

        for (idx, kind) in DYNAMIC_KINDS.into_iter().enumerate() {
            let (findings, scanned) = {
                let table = self.dynamics[idx].lock();
                (table.unowned_or_shared(USED), table.len())
            };
            debug!(
                store = %kind,
                findings = findings.len(),
                "consistency.owner_check.dynamic_chains"
            );
            for (head, owners) in findings {
                report_chain(
                    access,
                    reporter,
                    kind,
                    RecordType::DynamicChainOwner,
                    head,
                    &owners,
                )?;
            }
            listener.add(scanned);
        }
        listener.done();
        Ok(())
    }
}

fn report_chain(
    access: &dyn DiffRecordAccess,
    reporter: &ConsistencyReporter<'_>,
    kind: RecordKind,
    record_type: RecordType,
    head: u64,
    owners: &[ChainOwner],
) -> Result<(), StoreError> {
    let record = access
        .current_record(kind, head)?
        .unwrap_or_else(|| Record::unused(kind, head));
    let prior = access.prior_record(kind, head)?;
    let mut report = RecordReport::new(
        record_type,
        head,
        &record,
        prior.as_ref().map(|p| p as &dyn fmt::Display),
    );
    let (orphan, shared) = match record_type {
        RecordType::PropertyChainOwner => (
            Inconsistency::OrphanPropertyChain,
            Inconsistency::MultiplePropertyChainOwners,
        ),
        _ => (
            Inconsistency::OrphanDynamicChain,
            Inconsistency::MultipleDynamicChainOwners,
        ),
    };
    if owners.is_empty() {
        report.report(orphan, &[head]);
    } else {
        let references: Vec<u64> = std::iter::once(head)
            .chain(owners.iter().filter_map(|owner| owner.id()))
            .collect();
        report.report(shared, &references);
    }
    reporter.flush(report);
    Ok(())
}

impl CheckDecorator for OwnerCheck {
    fn observe(&self, record: &Record, targets: KindSet) {
        if !self.enabled {
            return;
        }
        match record {
            Record::Node(node) if targets.contains(RecordKind::Property) => {
                self.claim_property(node.next_prop, ChainOwner::Node(node.id));
            }
            Record::Relationship(rel) if targets.contains(RecordKind::Property) => {
                self.claim_property(rel.next_prop, ChainOwner::Relationship(rel.id));
            }
            Record::Property(prop) => {
                if targets.contains(RecordKind::Property) && prop.prev_prop.is_none() {
                    self.properties.lock().mark(prop.id, HEAD);
                }
                for block in &prop.blocks {
                    let (kind, head) = match block.value {
                        PropertyValue::String(head) => (RecordKind::String, head),
                        PropertyValue::Array(head) => (RecordKind::Array, head),
                        PropertyValue::Inline(_) => continue,
                    };
                    if targets.contains(kind) {
                        self.claim_dynamic(kind, head, ChainOwner::Property(prop.id));
                    }
                }
            }
            Record::PropertyIndex(index) if targets.contains(RecordKind::PropertyKey) => {
                self.claim_dynamic(
                    RecordKind::PropertyKey,
                    index.name_id,
                    ChainOwner::PropertyIndex(index.id),
                );
            }
            Record::RelationshipType(ty) if targets.contains(RecordKind::TypeName) => {
                self.claim_dynamic(
                    RecordKind::TypeName,
                    ty.name_id,
                    ChainOwner::RelationshipType(ty.id),
                );
            }
            other => {
                let (Some(block), Some(idx)) = (other.as_dynamic(), dynamic_index(other.kind()))
                else {
                    return;
                };
                if !targets.contains(other.kind()) {
                    return;
                }
                let mut table = self.dynamics[idx].lock();
                table.mark(block.id, USED);
                // A self reference is reported by its own rule; it must not
                // make the block its own owner.
                if let Some(next) = block.next_block.filter(|next| *next != block.id) {
                    table.claim(next, ChainOwner::DynamicBlock(block.id));
                }
            }
        }
    }

    fn observe_neo_store(&self, record: &NeoStoreRecord) {
        if self.enabled && record.in_use {
            self.claim_property(record.next_prop, ChainOwner::Graph);
        }
    }
}
