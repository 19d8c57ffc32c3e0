//! Operation coalescing.
//!
//! [`coalesce_record_operations`] reduces an ordered list of operations to a
//! shorter list with the same end state. Each operation is compared with every
//! later operation on the same record; pairs are merged according to a fixed
//! rule set, and merged-away operations are marked for deletion. Survivors
//! keep their original relative order.
//!
//! Two operations are *consecutive* when every operation between them has
//! already been marked for deletion. Relationship edits are order sensitive,
//! so most rules only merge consecutive operations. Attribute writes are the
//! exception: a `replaceAttribute` may supersede an earlier field write
//! even when other surviving operations sit between the two.

use crate::operation::{OperationKind, RecordOperation};
use crate::record::Record;

/// Outcome of comparing a superseded operation with a superseding one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Merge {
    /// Nothing merged.
    Keep,
    /// The earlier operation is redundant.
    DropSuperseded,
    /// The later operation was folded into the earlier one.
    DropSuperseding,
    /// The two operations cancel out.
    DropBoth,
}

/// Coalesces a sequence of record operations.
///
/// The input is not modified. Operations on different records are never
/// merged, and operations that match no rule are returned untouched.
pub fn coalesce_record_operations(operations: &[RecordOperation]) -> Vec<RecordOperation> {
    let mut ops = operations.to_vec();
    let mut deleted = vec![false; ops.len()];

    for i in 0..ops.len() {
        if deleted[i] {
            continue;
        }

        let mut consecutive = true;

        for j in (i + 1)..ops.len() {
            let (head, tail) = ops.split_at_mut(j);
            let superseded = &mut head[i];
            let superseding = &tail[0];

            if superseded.same_record(superseding) {
                match merge(superseded, superseding, deleted[j], consecutive) {
                    Merge::Keep => {}
                    Merge::DropSuperseded => deleted[i] = true,
                    Merge::DropSuperseding => deleted[j] = true,
                    Merge::DropBoth => {
                        deleted[i] = true;
                        deleted[j] = true;
                    }
                }
            }

            if deleted[i] {
                break;
            }
            if !deleted[j] {
                consecutive = false;
            }
        }
    }

    ops.into_iter()
        .zip(deleted)
        .filter_map(|(op, deleted)| (!deleted).then_some(op))
        .collect()
}

/// Applies the merge rules to two operations on the same record.
///
/// `superseded` may be rewritten in place when `superseding` is folded into
/// it.
fn merge(
    superseded: &mut RecordOperation,
    superseding: &RecordOperation,
    superseding_deleted: bool,
    consecutive: bool,
) -> Merge {
    let a = superseded.kind();
    let b = superseding.kind();

    // Removal dominates everything that came before it.
    if b == OperationKind::RemoveRecord {
        return if a == OperationKind::AddRecord {
            Merge::DropBoth
        } else {
            Merge::DropSuperseded
        };
    }

    if superseding_deleted {
        return Merge::Keep;
    }

    let attribute_write = b == OperationKind::ReplaceAttribute && a.is_replace_field();
    if !consecutive && !attribute_write {
        return Merge::Keep;
    }

    if a.is_replace_field() && b.is_replace_field() {
        if replaces_same_field(superseded, superseding) {
            return Merge::DropSuperseded;
        }

        let mut record = Record::new(superseded.record());
        apply_field(&mut record, superseded);
        apply_field(&mut record, superseding);
        *superseded = RecordOperation::ReplaceRecord { record };
        return Merge::DropSuperseding;
    }

    let is_new = a == OperationKind::AddRecord;

    match (superseded, superseding) {
        (
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record },
            field,
        ) if b.is_replace_field() => {
            apply_field(record, field);
            Merge::DropSuperseding
        }
        (
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record },
            RecordOperation::AddToRelatedRecords {
                relationship,
                related_record,
                ..
            },
        ) => {
            if is_new || record.relationship_data(relationship).is_some() {
                record.add_to_has_many(relationship, related_record.clone());
                Merge::DropSuperseding
            } else {
                Merge::Keep
            }
        }
        (
            RecordOperation::AddToRelatedRecords {
                relationship: added_to,
                related_record: added,
                ..
            },
            RecordOperation::RemoveFromRelatedRecords {
                relationship,
                related_record,
                ..
            },
        ) => {
            if added_to == relationship && added == related_record {
                Merge::DropBoth
            } else {
                Merge::Keep
            }
        }
        (
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record },
            RecordOperation::RemoveFromRelatedRecords {
                relationship,
                related_record,
                ..
            },
        ) => {
            if record.relationship_data(relationship).is_some() {
                record.remove_from_has_many(relationship, related_record);
                Merge::DropSuperseding
            } else {
                Merge::Keep
            }
        }
        _ => Merge::Keep,
    }
}

/// Returns true if both operations overwrite the same field in the same way.
fn replaces_same_field(a: &RecordOperation, b: &RecordOperation) -> bool {
    match (a, b) {
        (
            RecordOperation::ReplaceAttribute { attribute: x, .. },
            RecordOperation::ReplaceAttribute { attribute: y, .. },
        ) => x == y,
        (
            RecordOperation::ReplaceRelatedRecord { relationship: x, .. },
            RecordOperation::ReplaceRelatedRecord { relationship: y, .. },
        )
        | (
            RecordOperation::ReplaceRelatedRecords { relationship: x, .. },
            RecordOperation::ReplaceRelatedRecords { relationship: y, .. },
        ) => x == y,
        _ => false,
    }
}

/// Writes the field carried by a field-replace operation into `record`.
fn apply_field(record: &mut Record, op: &RecordOperation) {
    match op {
        RecordOperation::ReplaceAttribute {
            attribute, value, ..
        } => record.replace_attribute(attribute.clone(), value.clone()),
        RecordOperation::ReplaceRelatedRecord {
            relationship,
            related_record,
            ..
        } => record.replace_has_one(relationship.clone(), related_record.clone()),
        RecordOperation::ReplaceRelatedRecords {
            relationship,
            related_records,
            ..
        } => record.replace_has_many(relationship.clone(), related_records.clone()),
        _ => {}
    }
}
