//! Record diffing.

use crate::operation::RecordOperation;
use crate::record::Record;

/// Computes the operations that turn `before` into `after`.
///
/// Both snapshots must describe the same record; the identity of `before` is
/// used for the emitted operations. One `replaceAttribute` is emitted for each
/// attribute of `after` that is new or differs (by deep equality) from
/// `before`, followed by one `replaceKey` for each such key.
///
/// Relationships are not diffed, and fields present only on `before` produce
/// no operation.
pub fn record_diffs(before: &Record, after: &Record) -> Vec<RecordOperation> {
    let identity = before.identity();
    let mut diffs = Vec::new();

    if let Some(attributes) = &after.attributes {
        for (attribute, value) in attributes {
            if before.attribute(attribute) != Some(value) {
                diffs.push(RecordOperation::replace_attribute(
                    identity.clone(),
                    attribute.clone(),
                    value.clone(),
                ));
            }
        }
    }

    if let Some(keys) = &after.keys {
        for (key, value) in keys {
            if before.key(key) != Some(value.as_str()) {
                diffs.push(RecordOperation::replace_key(
                    identity.clone(),
                    key.clone(),
                    value.clone(),
                ));
            }
        }
    }

    diffs
}
