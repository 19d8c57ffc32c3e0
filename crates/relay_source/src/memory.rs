//! In-memory record cache.

use crate::capability::{
    PatchResult, Pullable, Pushable, QueryResult, Queryable, Syncable, Updatable,
};
use crate::error::SourceResult;
use parking_lot::RwLock;
use relay_data::{
    DataError, DataResult, Query, QueryExpression, Record, RecordIdentity, RecordOperation,
    RelationshipData, Transform,
};
use std::collections::BTreeMap;
use tracing::trace;

type RecordMap = BTreeMap<RecordIdentity, Record>;

/// A record cache held in memory.
///
/// Implements every capability, which makes it usable both as a local cache
/// and as a stand-in for a remote source in tests.
///
/// Patches are strict: adding a record that exists, or touching a record or
/// relationship that does not, fails the whole transform. Operations are
/// applied to a staged copy of the cache, so a failed transform leaves the
/// cache unchanged.
///
/// # Example
///
/// ```rust
/// use relay_data::{Record, RecordIdentity, RecordOperation};
/// use relay_source::MemorySource;
///
/// let cache = MemorySource::new();
/// let earth = RecordIdentity::new("planet", "earth");
///
/// cache
///     .patch(&[RecordOperation::add_record(Record::new(earth.clone()))])
///     .unwrap();
/// assert!(cache.contains(&earth));
/// ```
#[derive(Debug, Default)]
pub struct MemorySource {
    records: RwLock<RecordMap>,
}

impl MemorySource {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.identity(), record))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Returns a copy of a record.
    pub fn record(&self, identity: &RecordIdentity) -> Option<Record> {
        self.records.read().get(identity).cloned()
    }

    /// Returns copies of every record, ordered by identity.
    pub fn records(&self) -> Vec<Record> {
        self.records.read().values().cloned().collect()
    }

    /// Returns true if the cache holds a record.
    pub fn contains(&self, identity: &RecordIdentity) -> bool {
        self.records.read().contains_key(identity)
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the cache holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Applies operations atomically.
    ///
    /// On success, returns the affected record after each operation and the
    /// operations that undo the patch.
    pub fn patch(&self, operations: &[RecordOperation]) -> DataResult<PatchResult> {
        let mut records = self.records.write();
        let mut staged = records.clone();
        let mut data = Vec::with_capacity(operations.len());
        let mut inverses = Vec::with_capacity(operations.len());

        for operation in operations {
            let (record, inverse) = apply(&mut staged, operation)?;
            data.push(record);
            inverses.push(inverse);
        }

        *records = staged;
        trace!(
            operations = operations.len(),
            records = records.len(),
            "patch applied"
        );

        Ok(PatchResult {
            data,
            inverse: inverses.into_iter().rev().flatten().collect(),
        })
    }

    /// Evaluates a query expression against the cache.
    pub fn evaluate(&self, expression: &QueryExpression) -> DataResult<QueryResult> {
        let records = self.records.read();

        match expression {
            QueryExpression::FindRecord { record } => {
                let found = records.get(record).ok_or_else(|| not_found(record))?;
                Ok(QueryResult::Record(Some(found.clone())))
            }
            QueryExpression::FindRecords { record_type } => Ok(QueryResult::Records(
                records
                    .values()
                    .filter(|r| &r.record_type == record_type)
                    .cloned()
                    .collect(),
            )),
            QueryExpression::FindRelatedRecord {
                record,
                relationship,
            } => match related(&records, record, relationship)? {
                None => Ok(QueryResult::Record(None)),
                Some(RelationshipData::One(id)) => {
                    Ok(QueryResult::Record(records.get(id).cloned()))
                }
                Some(RelationshipData::Many(_)) => {
                    Err(shape_mismatch(expression, record, relationship))
                }
            },
            QueryExpression::FindRelatedRecords {
                record,
                relationship,
            } => match related(&records, record, relationship)? {
                None => Ok(QueryResult::Records(Vec::new())),
                Some(RelationshipData::Many(ids)) => Ok(QueryResult::Records(
                    ids.iter().filter_map(|id| records.get(id)).cloned().collect(),
                )),
                Some(RelationshipData::One(_)) => {
                    Err(shape_mismatch(expression, record, relationship))
                }
            },
        }
    }
}

fn not_found(record: &RecordIdentity) -> DataError {
    DataError::RecordNotFound {
        record: record.clone(),
    }
}

fn shape_mismatch(
    expression: &QueryExpression,
    record: &RecordIdentity,
    relationship: &str,
) -> DataError {
    DataError::QueryNotAllowed {
        description: format!(
            "{} does not match the shape of {relationship} on {record}",
            expression.op()
        ),
    }
}

/// Returns the data of an existing relationship on an existing record.
fn related<'a>(
    records: &'a RecordMap,
    record: &RecordIdentity,
    relationship: &str,
) -> DataResult<Option<&'a RelationshipData>> {
    let owner = records.get(record).ok_or_else(|| not_found(record))?;
    let entry = owner
        .relationship(relationship)
        .ok_or_else(|| DataError::RelationshipNotFound {
            record: record.clone(),
            relationship: relationship.to_string(),
        })?;
    Ok(entry.data.as_ref())
}

fn existing<'a>(
    records: &'a mut RecordMap,
    record: &RecordIdentity,
) -> DataResult<&'a mut Record> {
    records.get_mut(record).ok_or_else(|| not_found(record))
}

/// Operations that put back `previous` exactly, in application order.
fn restore(previous: Record) -> Vec<RecordOperation> {
    vec![
        RecordOperation::remove_record(previous.identity()),
        RecordOperation::add_record(previous),
    ]
}

/// Applies one operation, returning the affected record and the operations
/// that undo it, in application order.
///
/// A field that existed is undone by writing its old value back. A field
/// that did not exist has no removal operation, so the whole record is put
/// back instead.
fn apply(
    records: &mut RecordMap,
    operation: &RecordOperation,
) -> DataResult<(Option<Record>, Vec<RecordOperation>)> {
    match operation {
        RecordOperation::AddRecord { record } => {
            let identity = record.identity();
            if records.contains_key(&identity) {
                return Err(DataError::RecordAlreadyExists { record: identity });
            }
            records.insert(identity.clone(), record.clone());
            Ok((
                Some(record.clone()),
                vec![RecordOperation::remove_record(identity)],
            ))
        }

        RecordOperation::ReplaceRecord { record } => {
            let identity = record.identity();
            match records.get_mut(&identity) {
                Some(current) => {
                    let inverse = restore(current.clone());
                    current.merge(record);
                    Ok((Some(current.clone()), inverse))
                }
                None => {
                    records.insert(identity.clone(), record.clone());
                    Ok((
                        Some(record.clone()),
                        vec![RecordOperation::remove_record(identity)],
                    ))
                }
            }
        }

        RecordOperation::RemoveRecord { record } => {
            let previous = records.remove(record).ok_or_else(|| not_found(record))?;
            Ok((None, vec![RecordOperation::add_record(previous)]))
        }

        RecordOperation::ReplaceKey { record, key, value } => {
            let current = existing(records, record)?;
            let inverse = match current.key(key) {
                Some(previous) => vec![RecordOperation::replace_key(
                    record.clone(),
                    key.clone(),
                    previous,
                )],
                None => restore(current.clone()),
            };
            current.replace_key(key.clone(), value.clone());
            Ok((Some(current.clone()), inverse))
        }

        RecordOperation::ReplaceAttribute {
            record,
            attribute,
            value,
        } => {
            let current = existing(records, record)?;
            let inverse = match current.attribute(attribute) {
                Some(previous) => vec![RecordOperation::replace_attribute(
                    record.clone(),
                    attribute.clone(),
                    previous.clone(),
                )],
                None => restore(current.clone()),
            };
            current.replace_attribute(attribute.clone(), value.clone());
            Ok((Some(current.clone()), inverse))
        }

        RecordOperation::AddToRelatedRecords {
            record,
            relationship,
            related_record,
        } => {
            let current = existing(records, record)?;
            let inverse = match current.relationship_data(relationship) {
                Some(RelationshipData::Many(ids)) if !ids.contains(related_record) => {
                    vec![RecordOperation::remove_from_related_records(
                        record.clone(),
                        relationship.clone(),
                        related_record.clone(),
                    )]
                }
                _ => restore(current.clone()),
            };
            current.add_to_has_many(relationship, related_record.clone());
            Ok((Some(current.clone()), inverse))
        }

        RecordOperation::RemoveFromRelatedRecords {
            record,
            relationship,
            related_record,
        } => {
            let current = existing(records, record)?;
            let inverse = match current.relationship_data(relationship) {
                None => {
                    return Err(DataError::RelationshipNotFound {
                        record: record.clone(),
                        relationship: relationship.clone(),
                    })
                }
                Some(RelationshipData::Many(ids)) => {
                    vec![RecordOperation::replace_related_records(
                        record.clone(),
                        relationship.clone(),
                        ids.clone(),
                    )]
                }
                // Has-one data is left as it is.
                Some(RelationshipData::One(_)) => Vec::new(),
            };
            current.remove_from_has_many(relationship, related_record);
            Ok((Some(current.clone()), inverse))
        }

        RecordOperation::ReplaceRelatedRecords {
            record,
            relationship,
            related_records,
        } => {
            let current = existing(records, record)?;
            let inverse = match current.relationship_data(relationship) {
                Some(RelationshipData::Many(ids)) => {
                    vec![RecordOperation::replace_related_records(
                        record.clone(),
                        relationship.clone(),
                        ids.clone(),
                    )]
                }
                _ => restore(current.clone()),
            };
            current.replace_has_many(relationship.clone(), related_records.clone());
            Ok((Some(current.clone()), inverse))
        }

        RecordOperation::ReplaceRelatedRecord {
            record,
            relationship,
            related_record,
        } => {
            let current = existing(records, record)?;
            let previous = current.relationship(relationship).map(|r| r.data.as_ref());
            let inverse = match previous {
                Some(None) => vec![RecordOperation::replace_related_record(
                    record.clone(),
                    relationship.clone(),
                    None,
                )],
                Some(Some(RelationshipData::One(id))) => {
                    vec![RecordOperation::replace_related_record(
                        record.clone(),
                        relationship.clone(),
                        Some(id.clone()),
                    )]
                }
                _ => restore(current.clone()),
            };
            current.replace_has_one(relationship.clone(), related_record.clone());
            Ok((Some(current.clone()), inverse))
        }
    }
}

impl Queryable for MemorySource {
    async fn query(&self, query: &Query) -> SourceResult<QueryResult> {
        Ok(self.evaluate(&query.expression)?)
    }
}

impl Pullable for MemorySource {
    /// Answers with one transform replacing every matched record, or nothing
    /// if no record matched.
    async fn pull(&self, query: &Query) -> SourceResult<Vec<Transform>> {
        let result = self.evaluate(&query.expression)?;
        let operations: Vec<_> = result
            .records()
            .into_iter()
            .map(|record| RecordOperation::replace_record(record.clone()))
            .collect();

        if operations.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Transform::new(operations)])
    }
}

impl Pushable for MemorySource {
    async fn push(&self, transform: &Transform) -> SourceResult<Vec<Transform>> {
        self.patch(&transform.operations)?;
        Ok(vec![transform.clone()])
    }
}

impl Updatable for MemorySource {
    async fn update(&self, transform: &Transform) -> SourceResult<PatchResult> {
        Ok(self.patch(&transform.operations)?)
    }
}

impl Syncable for MemorySource {
    async fn sync(&self, transform: &Transform) -> SourceResult<()> {
        self.patch(&transform.operations)?;
        Ok(())
    }
}
