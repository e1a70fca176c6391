//! Fixed-layout record types for every store the checker walks.
//!
//! Links between records are `Option<u64>`; absent links render as `-1`, which
//! is how the on-disk format spells "no next record" and what log parsers expect.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::RecordKind;

/// Renders an optional link the way the record store encodes it.
#[derive(Clone, Copy, Debug)]
pub struct Link(pub Option<u64>);

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{id}"),
            None => f.write_str("-1"),
        }
    }
}

/// Node record: heads of the node's relationship and property chains.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Record id.
    pub id: u64,
    /// Liveness flag.
    pub in_use: bool,
    /// First relationship in the node's relationship chain.
    #[serde(default)]
    pub next_rel: Option<u64>,
    /// First record of the node's property chain.
    #[serde(default)]
    pub next_prop: Option<u64>,
}

impl NodeRecord {
    /// Creates a used node with empty chains.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            in_use: true,
            next_rel: None,
            next_prop: None,
        }
    }
}

impl fmt::Display for NodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NodeRecord[{},used={},rel={},prop={}]",
            self.id,
            self.in_use,
            Link(self.next_rel),
            Link(self.next_prop)
        )
    }
}

/// Relationship record: endpoints, type and the two doubly linked chains it
/// participates in (one per endpoint).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Record id.
    pub id: u64,
    /// Liveness flag.
    pub in_use: bool,
    /// Source node.
    pub first_node: u64,
    /// Target node.
    pub second_node: u64,
    /// Relationship type id.
    pub rel_type: u32,
    /// Previous relationship in the source node's chain.
    #[serde(default)]
    pub first_prev_rel: Option<u64>,
    /// Next relationship in the source node's chain.
    #[serde(default)]
    pub first_next_rel: Option<u64>,
    /// Previous relationship in the target node's chain.
    #[serde(default)]
    pub second_prev_rel: Option<u64>,
    /// Next relationship in the target node's chain.
    #[serde(default)]
    pub second_next_rel: Option<u64>,
    /// First record of the relationship's property chain.
    #[serde(default)]
    pub next_prop: Option<u64>,
}

impl RelationshipRecord {
    /// Creates a used relationship between two nodes with unlinked chains.
    pub fn new(id: u64, first_node: u64, second_node: u64, rel_type: u32) -> Self {
        Self {
            id,
            in_use: true,
            first_node,
            second_node,
            rel_type,
            ..Self::default()
        }
    }

    /// Previous and next pointers of the chain belonging to `node`, if the
    /// relationship has `node` as an endpoint. Source wins for self loops.
    pub fn chain_for(&self, node: u64) -> Option<(Option<u64>, Option<u64>)> {
        if self.first_node == node {
            Some((self.first_prev_rel, self.first_next_rel))
        } else if self.second_node == node {
            Some((self.second_prev_rel, self.second_next_rel))
        } else {
            None
        }
    }
}

impl fmt::Display for RelationshipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RelationshipRecord[{},used={},source={},target={},type={},sPrev={},sNext={},tPrev={},tNext={},prop={}]",
            self.id,
            self.in_use,
            self.first_node,
            self.second_node,
            self.rel_type,
            Link(self.first_prev_rel),
            Link(self.first_next_rel),
            Link(self.second_prev_rel),
            Link(self.second_next_rel),
            Link(self.next_prop)
        )
    }
}

/// Value stored in a property block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    /// Value fits inline in the block.
    Inline(i64),
    /// Head of a chain in the string store.
    String(u64),
    /// Head of a chain in the array store.
    Array(u64),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Inline(value) => write!(f, "{value}"),
            PropertyValue::String(id) => write!(f, "string@{id}"),
            PropertyValue::Array(id) => write!(f, "array@{id}"),
        }
    }
}

/// One key/value slot inside a property record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyBlock {
    /// Property index (key) id.
    pub key_index: u32,
    /// Stored value.
    pub value: PropertyValue,
}

/// Property record: a node in a doubly linked property chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Record id.
    pub id: u64,
    /// Liveness flag.
    pub in_use: bool,
    /// Previous record in the chain; absent on the chain head.
    #[serde(default)]
    pub prev_prop: Option<u64>,
    /// Next record in the chain.
    #[serde(default)]
    pub next_prop: Option<u64>,
    /// Key/value blocks.
    #[serde(default)]
    pub blocks: Vec<PropertyBlock>,
}

impl PropertyRecord {
    /// Creates a used, unlinked property record without blocks.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            in_use: true,
            ..Self::default()
        }
    }
}

impl fmt::Display for PropertyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PropertyRecord[{},used={},prev={},next={}",
            self.id,
            self.in_use,
            Link(self.prev_prop),
            Link(self.next_prop)
        )?;
        for block in &self.blocks {
            write!(f, ",PropertyBlock[key={},value={}]", block.key_index, block.value)?;
        }
        f.write_str("]")
    }
}

/// Property index record: a property key, named in the property-key store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyIndexRecord {
    /// Record id.
    pub id: u64,
    /// Liveness flag.
    pub in_use: bool,
    /// Head of the name chain in the property-key store.
    pub name_id: u64,
    /// Number of properties using this key.
    #[serde(default)]
    pub property_count: u32,
}

impl fmt::Display for PropertyIndexRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PropertyIndexRecord[{},used={},propCount={},key={}]",
            self.id, self.in_use, self.property_count, self.name_id
        )
    }
}

/// Relationship type record, named in the type-name store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipTypeRecord {
    /// Record id.
    pub id: u64,
    /// Liveness flag.
    pub in_use: bool,
    /// Head of the name chain in the type-name store.
    pub name_id: u64,
}

impl fmt::Display for RelationshipTypeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RelationshipTypeRecord[{},used={},nameId={}]",
            self.id, self.in_use, self.name_id
        )
    }
}

/// Block of a dynamic (variable length) value chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRecord {
    /// Record id.
    pub id: u64,
    /// Liveness flag.
    pub in_use: bool,
    /// Next block of the value.
    #[serde(default)]
    pub next_block: Option<u64>,
    /// Payload bytes held by this block.
    #[serde(default)]
    pub length: u32,
}

impl DynamicRecord {
    /// Creates a used, terminal block.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            in_use: true,
            next_block: None,
            length: 0,
        }
    }
}

impl fmt::Display for DynamicRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DynamicRecord[{},used={},nextBlock={},length={}]",
            self.id,
            self.in_use,
            Link(self.next_block),
            self.length
        )
    }
}

/// The single graph-level record holding the graph property chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeoStoreRecord {
    /// Liveness flag; the neo store record is always in use.
    pub in_use: bool,
    /// Head of the graph property chain.
    #[serde(default)]
    pub next_prop: Option<u64>,
}

impl Default for NeoStoreRecord {
    fn default() -> Self {
        Self {
            in_use: true,
            next_prop: None,
        }
    }
}

impl fmt::Display for NeoStoreRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NeoStoreRecord[used={},nextProp={}]",
            self.in_use,
            Link(self.next_prop)
        )
    }
}

/// A record read from any of the nine stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    /// Node store record.
    Node(NodeRecord),
    /// Relationship store record.
    Relationship(RelationshipRecord),
    /// Property store record.
    Property(PropertyRecord),
    /// Property index store record.
    PropertyIndex(PropertyIndexRecord),
    /// Relationship type store record.
    RelationshipType(RelationshipTypeRecord),
    /// String store block.
    String(DynamicRecord),
    /// Array store block.
    Array(DynamicRecord),
    /// Relationship type name block.
    TypeName(DynamicRecord),
    /// Property key name block.
    PropertyKey(DynamicRecord),
}

impl Record {
    /// An unused record of the given kind, as found in holes of a store.
    pub fn unused(kind: RecordKind, id: u64) -> Self {
        let dynamic = DynamicRecord {
            id,
            ..DynamicRecord::default()
        };
        match kind {
            RecordKind::Node => Record::Node(NodeRecord {
                id,
                ..NodeRecord::default()
            }),
            RecordKind::Relationship => Record::Relationship(RelationshipRecord {
                id,
                ..RelationshipRecord::default()
            }),
            RecordKind::Property => Record::Property(PropertyRecord {
                id,
                ..PropertyRecord::default()
            }),
            RecordKind::PropertyIndex => Record::PropertyIndex(PropertyIndexRecord {
                id,
                ..PropertyIndexRecord::default()
            }),
            RecordKind::RelationshipType => Record::RelationshipType(RelationshipTypeRecord {
                id,
                ..RelationshipTypeRecord::default()
            }),
            RecordKind::String => Record::String(dynamic),
            RecordKind::Array => Record::Array(dynamic),
            RecordKind::TypeName => Record::TypeName(dynamic),
            RecordKind::PropertyKey => Record::PropertyKey(dynamic),
        }
    }

    /// Store this record belongs to.
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Node(_) => RecordKind::Node,
            Record::Relationship(_) => RecordKind::Relationship,
            Record::Property(_) => RecordKind::Property,
            Record::PropertyIndex(_) => RecordKind::PropertyIndex,
            Record::RelationshipType(_) => RecordKind::RelationshipType,
            Record::String(_) => RecordKind::String,
            Record::Array(_) => RecordKind::Array,
            Record::TypeName(_) => RecordKind::TypeName,
            Record::PropertyKey(_) => RecordKind::PropertyKey,
        }
    }

    /// Record id.
    pub fn id(&self) -> u64 {
        match self {
            Record::Node(r) => r.id,
            Record::Relationship(r) => r.id,
            Record::Property(r) => r.id,
            Record::PropertyIndex(r) => r.id,
            Record::RelationshipType(r) => r.id,
            Record::String(r) | Record::Array(r) | Record::TypeName(r) | Record::PropertyKey(r) => {
                r.id
            }
        }
    }

    /// Liveness flag.
    pub fn in_use(&self) -> bool {
        match self {
            Record::Node(r) => r.in_use,
            Record::Relationship(r) => r.in_use,
            Record::Property(r) => r.in_use,
            Record::PropertyIndex(r) => r.in_use,
            Record::RelationshipType(r) => r.in_use,
            Record::String(r) | Record::Array(r) | Record::TypeName(r) | Record::PropertyKey(r) => {
                r.in_use
            }
        }
    }

    /// The block, when this is a record of one of the dynamic stores.
    pub fn as_dynamic(&self) -> Option<&DynamicRecord> {
        match self {
            Record::String(r) | Record::Array(r) | Record::TypeName(r) | Record::PropertyKey(r) => {
                Some(r)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Node(r) => r.fmt(f),
            Record::Relationship(r) => r.fmt(f),
            Record::Property(r) => r.fmt(f),
            Record::PropertyIndex(r) => r.fmt(f),
            Record::RelationshipType(r) => r.fmt(f),
            Record::String(r) | Record::Array(r) | Record::TypeName(r) | Record::PropertyKey(r) => {
                r.fmt(f)
            }
        }
    }
}
