//! Record operations.
//!
//! A [`RecordOperation`] describes one atomic mutation of one record or one
//! relationship edge. Operations are serialized as objects tagged by `op`,
//! e.g. `{"op": "replaceAttribute", "record": {...}, "attribute": "name", "value": "Earth"}`.

use crate::record::{Record, RecordIdentity};
use crate::schema::RecordInitializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A mutation of a record or of one of its relationships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RecordOperation {
    /// Adds a record.
    AddRecord {
        /// The record to add.
        record: Record,
    },
    /// Replaces the fields present on `record`.
    ReplaceRecord {
        /// The replacement payload.
        record: Record,
    },
    /// Removes a record.
    RemoveRecord {
        /// The record to remove.
        record: RecordIdentity,
    },
    /// Sets a key.
    ReplaceKey {
        /// Target record.
        record: RecordIdentity,
        /// Key name.
        key: String,
        /// Key value.
        value: String,
    },
    /// Sets an attribute.
    ReplaceAttribute {
        /// Target record.
        record: RecordIdentity,
        /// Attribute name.
        attribute: String,
        /// Attribute value.
        value: Value,
    },
    /// Adds an identity to a has-many relationship.
    #[serde(rename_all = "camelCase")]
    AddToRelatedRecords {
        /// Target record.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// Identity to add.
        related_record: RecordIdentity,
    },
    /// Removes an identity from a has-many relationship.
    #[serde(rename_all = "camelCase")]
    RemoveFromRelatedRecords {
        /// Target record.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// Identity to remove.
        related_record: RecordIdentity,
    },
    /// Replaces the whole contents of a has-many relationship.
    #[serde(rename_all = "camelCase")]
    ReplaceRelatedRecords {
        /// Target record.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// New related identities.
        related_records: Vec<RecordIdentity>,
    },
    /// Replaces a has-one relationship.
    #[serde(rename_all = "camelCase")]
    ReplaceRelatedRecord {
        /// Target record.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// New related identity, or `None` to clear.
        related_record: Option<RecordIdentity>,
    },
}

/// The kind of a [`RecordOperation`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// `addRecord`
    AddRecord,
    /// `replaceRecord`
    ReplaceRecord,
    /// `removeRecord`
    RemoveRecord,
    /// `replaceKey`
    ReplaceKey,
    /// `replaceAttribute`
    ReplaceAttribute,
    /// `addToRelatedRecords`
    AddToRelatedRecords,
    /// `removeFromRelatedRecords`
    RemoveFromRelatedRecords,
    /// `replaceRelatedRecords`
    ReplaceRelatedRecords,
    /// `replaceRelatedRecord`
    ReplaceRelatedRecord,
}

impl OperationKind {
    /// Returns the wire tag of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::AddRecord => "addRecord",
            OperationKind::ReplaceRecord => "replaceRecord",
            OperationKind::RemoveRecord => "removeRecord",
            OperationKind::ReplaceKey => "replaceKey",
            OperationKind::ReplaceAttribute => "replaceAttribute",
            OperationKind::AddToRelatedRecords => "addToRelatedRecords",
            OperationKind::RemoveFromRelatedRecords => "removeFromRelatedRecords",
            OperationKind::ReplaceRelatedRecords => "replaceRelatedRecords",
            OperationKind::ReplaceRelatedRecord => "replaceRelatedRecord",
        }
    }

    /// Returns true for the operations that overwrite a single field:
    /// `replaceAttribute`, `replaceRelatedRecord` and `replaceRelatedRecords`.
    pub fn is_replace_field(&self) -> bool {
        matches!(
            self,
            OperationKind::ReplaceAttribute
                | OperationKind::ReplaceRelatedRecord
                | OperationKind::ReplaceRelatedRecords
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RecordOperation {
    /// Creates an `addRecord` operation.
    pub fn add_record(record: Record) -> Self {
        RecordOperation::AddRecord { record }
    }

    /// Creates an `addRecord` operation after letting `initializer` assign
    /// defaults (such as a generated id) to the record.
    pub fn add_record_initialized(mut record: Record, initializer: &dyn RecordInitializer) -> Self {
        initializer.initialize_record(&mut record);
        RecordOperation::AddRecord { record }
    }

    /// Creates a `replaceRecord` operation.
    pub fn replace_record(record: Record) -> Self {
        RecordOperation::ReplaceRecord { record }
    }

    /// Creates a `removeRecord` operation.
    pub fn remove_record(record: RecordIdentity) -> Self {
        RecordOperation::RemoveRecord { record }
    }

    /// Creates a `replaceKey` operation.
    pub fn replace_key(
        record: RecordIdentity,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        RecordOperation::ReplaceKey {
            record,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a `replaceAttribute` operation.
    pub fn replace_attribute(
        record: RecordIdentity,
        attribute: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        RecordOperation::ReplaceAttribute {
            record,
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Creates an `addToRelatedRecords` operation.
    pub fn add_to_related_records(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related_record: RecordIdentity,
    ) -> Self {
        RecordOperation::AddToRelatedRecords {
            record,
            relationship: relationship.into(),
            related_record,
        }
    }

    /// Creates a `removeFromRelatedRecords` operation.
    pub fn remove_from_related_records(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related_record: RecordIdentity,
    ) -> Self {
        RecordOperation::RemoveFromRelatedRecords {
            record,
            relationship: relationship.into(),
            related_record,
        }
    }

    /// Creates a `replaceRelatedRecords` operation.
    pub fn replace_related_records(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related_records: Vec<RecordIdentity>,
    ) -> Self {
        RecordOperation::ReplaceRelatedRecords {
            record,
            relationship: relationship.into(),
            related_records,
        }
    }

    /// Creates a `replaceRelatedRecord` operation.
    pub fn replace_related_record(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related_record: Option<RecordIdentity>,
    ) -> Self {
        RecordOperation::ReplaceRelatedRecord {
            record,
            relationship: relationship.into(),
            related_record,
        }
    }

    /// Returns the kind of this operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            RecordOperation::AddRecord { .. } => OperationKind::AddRecord,
            RecordOperation::ReplaceRecord { .. } => OperationKind::ReplaceRecord,
            RecordOperation::RemoveRecord { .. } => OperationKind::RemoveRecord,
            RecordOperation::ReplaceKey { .. } => OperationKind::ReplaceKey,
            RecordOperation::ReplaceAttribute { .. } => OperationKind::ReplaceAttribute,
            RecordOperation::AddToRelatedRecords { .. } => OperationKind::AddToRelatedRecords,
            RecordOperation::RemoveFromRelatedRecords { .. } => {
                OperationKind::RemoveFromRelatedRecords
            }
            RecordOperation::ReplaceRelatedRecords { .. } => OperationKind::ReplaceRelatedRecords,
            RecordOperation::ReplaceRelatedRecord { .. } => OperationKind::ReplaceRelatedRecord,
        }
    }

    /// Returns true if the target record has the given identity.
    pub fn targets(&self, identity: &RecordIdentity) -> bool {
        match self {
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record } => {
                record.is(identity)
            }
            RecordOperation::RemoveRecord { record }
            | RecordOperation::ReplaceKey { record, .. }
            | RecordOperation::ReplaceAttribute { record, .. }
            | RecordOperation::AddToRelatedRecords { record, .. }
            | RecordOperation::RemoveFromRelatedRecords { record, .. }
            | RecordOperation::ReplaceRelatedRecords { record, .. }
            | RecordOperation::ReplaceRelatedRecord { record, .. } => record == identity,
        }
    }

    /// Returns the identity of the target record.
    pub fn record(&self) -> RecordIdentity {
        match self {
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record } => {
                record.identity()
            }
            RecordOperation::RemoveRecord { record }
            | RecordOperation::ReplaceKey { record, .. }
            | RecordOperation::ReplaceAttribute { record, .. }
            | RecordOperation::AddToRelatedRecords { record, .. }
            | RecordOperation::RemoveFromRelatedRecords { record, .. }
            | RecordOperation::ReplaceRelatedRecords { record, .. }
            | RecordOperation::ReplaceRelatedRecord { record, .. } => record.clone(),
        }
    }

    /// Returns true if both operations target the same record.
    pub fn same_record(&self, other: &RecordOperation) -> bool {
        other.targets(&self.record())
    }
}
