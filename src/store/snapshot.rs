use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{
    DynamicRecord, NeoStoreRecord, NodeRecord, PropertyIndexRecord, PropertyRecord, Record,
    RecordKind, RelationshipRecord, RelationshipTypeRecord, StoreAccess, StoreAccessBuilder,
    MAX_ID_GAP,
};

/// Failure to load a store snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot file could not be read.
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The snapshot file is not valid JSON for a snapshot.
    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        /// Snapshot path.
        path: PathBuf,
        /// Parser diagnostic.
        #[source]
        source: serde_json::Error,
    },
    /// A record id lies so far past the records before it that the store
    /// could not be held in memory.
    #[error("{kind} record id {id} is beyond the limit of {limit}")]
    IdOutOfRange {
        /// Store holding the record.
        kind: RecordKind,
        /// Offending id.
        id: u64,
        /// First id that was rejected at that position.
        limit: u64,
    },
}

/// JSON dump of every store of a database, used by the `sombra-check` binary
/// and by tests to describe fixtures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    /// Graph-level record.
    pub neo_store: Option<NeoStoreRecord>,
    /// Node store records.
    pub nodes: Vec<NodeRecord>,
    /// Relationship store records.
    pub relationships: Vec<RelationshipRecord>,
    /// Property store records.
    pub properties: Vec<PropertyRecord>,
    /// Relationship type store records.
    pub relationship_types: Vec<RelationshipTypeRecord>,
    /// Property index store records.
    pub property_indexes: Vec<PropertyIndexRecord>,
    /// String store blocks.
    pub strings: Vec<DynamicRecord>,
    /// Array store blocks.
    pub arrays: Vec<DynamicRecord>,
    /// Relationship type name blocks.
    pub type_names: Vec<DynamicRecord>,
    /// Property key name blocks.
    pub property_keys: Vec<DynamicRecord>,
}

impl StoreSnapshot {
    /// Reads a snapshot from a JSON file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: Self =
            serde_json::from_str(&contents).map_err(|source| SnapshotError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Checks that every store can be laid out densely: walking a store's
    /// records in order, no id may lie more than [`MAX_ID_GAP`] past the end
    /// of the records before it. This is the bound in-memory stores enforce.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        fn check(kind: RecordKind, ids: impl Iterator<Item = u64>) -> Result<(), SnapshotError> {
            let mut high_id = 0u64;
            for id in ids {
                let limit = high_id.saturating_add(MAX_ID_GAP);
                if id >= limit {
                    return Err(SnapshotError::IdOutOfRange { kind, id, limit });
                }
                high_id = high_id.max(id + 1);
            }
            Ok(())
        }

        check(RecordKind::Node, self.nodes.iter().map(|r| r.id))?;
        check(RecordKind::Relationship, self.relationships.iter().map(|r| r.id))?;
        check(RecordKind::Property, self.properties.iter().map(|r| r.id))?;
        check(
            RecordKind::RelationshipType,
            self.relationship_types.iter().map(|r| r.id),
        )?;
        check(
            RecordKind::PropertyIndex,
            self.property_indexes.iter().map(|r| r.id),
        )?;
        for (kind, blocks) in [
            (RecordKind::String, &self.strings),
            (RecordKind::Array, &self.arrays),
            (RecordKind::TypeName, &self.type_names),
            (RecordKind::PropertyKey, &self.property_keys),
        ] {
            check(kind, blocks.iter().map(|r| r.id))?;
        }
        Ok(())
    }

    /// Builds in-memory stores holding the snapshot's records.
    pub fn into_store_access(self) -> StoreAccess {
        self.into_builder().build()
    }

    /// A builder preloaded with the snapshot's records, so individual stores
    /// can still be replaced.
    pub fn into_builder(self) -> StoreAccessBuilder {
        let StoreSnapshot {
            neo_store,
            nodes,
            relationships,
            properties,
            relationship_types,
            property_indexes,
            strings,
            arrays,
            type_names,
            property_keys,
        } = self;
        let records = nodes
            .into_iter()
            .map(Record::Node)
            .chain(relationships.into_iter().map(Record::Relationship))
            .chain(properties.into_iter().map(Record::Property))
            .chain(relationship_types.into_iter().map(Record::RelationshipType))
            .chain(property_indexes.into_iter().map(Record::PropertyIndex))
            .chain(strings.into_iter().map(Record::String))
            .chain(arrays.into_iter().map(Record::Array))
            .chain(type_names.into_iter().map(Record::TypeName))
            .chain(property_keys.into_iter().map(Record::PropertyKey));
        let mut builder = records.fold(StoreAccess::builder(), |builder, record| {
            builder.record(record)
        });
        if let Some(neo_store) = neo_store {
            builder = builder.neo_store(neo_store);
        }
        builder
    }
}
