//! Property-based test generators using proptest.
//!
//! Identities are drawn from a small pool so that generated operation
//! sequences frequently target the same record, which is where coalescing
//! rules apply.

use proptest::prelude::*;
use relay_data::{Record, RecordIdentity, RecordOperation};
use serde_json::Value;

/// Strategy for generating identities from a small pool.
pub fn identity_strategy() -> impl Strategy<Value = RecordIdentity> {
    (prop::sample::select(vec!["planet", "moon"]), "[a-c]")
        .prop_map(|(record_type, id)| RecordIdentity::new(record_type, id))
}

/// Strategy for generating field names (attributes, keys and relationships).
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["name", "mass", "color", "age"]).prop_map(str::to_string)
}

/// Strategy for generating attribute values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Strategy for generating records with attributes.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    (
        identity_strategy(),
        prop::collection::btree_map(field_name_strategy(), value_strategy(), 0..3),
    )
        .prop_map(|(identity, attributes)| {
            attributes
                .into_iter()
                .fold(Record::new(identity), |record, (name, value)| {
                    record.with_attribute(name, value)
                })
        })
}

/// Strategy for generating `replaceAttribute` operations.
pub fn attribute_operation_strategy() -> impl Strategy<Value = RecordOperation> {
    (identity_strategy(), field_name_strategy(), value_strategy()).prop_map(
        |(record, attribute, value)| RecordOperation::replace_attribute(record, attribute, value),
    )
}

/// Strategy for generating any of the nine record operations.
pub fn operation_strategy() -> impl Strategy<Value = RecordOperation> {
    prop_oneof![
        1 => record_strategy().prop_map(RecordOperation::add_record),
        1 => record_strategy().prop_map(RecordOperation::replace_record),
        1 => identity_strategy().prop_map(RecordOperation::remove_record),
        1 => (identity_strategy(), field_name_strategy(), "[a-z0-9]{1,4}")
            .prop_map(|(r, key, value)| RecordOperation::replace_key(r, key, value)),
        4 => attribute_operation_strategy(),
        2 => (identity_strategy(), field_name_strategy(), identity_strategy())
            .prop_map(|(r, rel, related)| RecordOperation::add_to_related_records(r, rel, related)),
        2 => (identity_strategy(), field_name_strategy(), identity_strategy())
            .prop_map(|(r, rel, related)| {
                RecordOperation::remove_from_related_records(r, rel, related)
            }),
        1 => (
            identity_strategy(),
            field_name_strategy(),
            prop::collection::vec(identity_strategy(), 0..3),
        )
            .prop_map(|(r, rel, related)| {
                RecordOperation::replace_related_records(r, rel, related)
            }),
        1 => (
            identity_strategy(),
            field_name_strategy(),
            prop::option::of(identity_strategy()),
        )
            .prop_map(|(r, rel, related)| RecordOperation::replace_related_record(r, rel, related)),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<RecordOperation>> {
    prop::collection::vec(operation_strategy(), min_ops..max_ops)
}

/// Strategy for generating a sequence of `replaceAttribute` operations.
pub fn attribute_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<RecordOperation>> {
    prop::collection::vec(attribute_operation_strategy(), min_ops..max_ops)
}

/// Strategy for generating relationship names.
///
/// The pool is smaller than [`field_name_strategy`] so that has-many edits
/// in a sequence keep landing on the same relationship.
pub fn relationship_name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["moons", "sun"]).prop_map(str::to_string)
}

/// Strategy for generating identities that are only ever removed from
/// relationships, never added one at a time.
pub fn detached_identity_strategy() -> impl Strategy<Value = RecordIdentity> {
    "[a-c]".prop_map(|id| RecordIdentity::new("ring", id))
}

/// Strategy for generating operations that edit an existing record's
/// fields, or remove it.
pub fn edit_operation_strategy() -> impl Strategy<Value = RecordOperation> {
    let related = prop_oneof![identity_strategy(), detached_identity_strategy()];
    prop_oneof![
        3 => attribute_operation_strategy(),
        1 => (identity_strategy(), field_name_strategy(), "[a-z0-9]{1,4}")
            .prop_map(|(r, key, value)| RecordOperation::replace_key(r, key, value)),
        2 => (identity_strategy(), relationship_name_strategy(), identity_strategy())
            .prop_map(|(r, rel, related)| RecordOperation::add_to_related_records(r, rel, related)),
        2 => (
            identity_strategy(),
            relationship_name_strategy(),
            detached_identity_strategy(),
        )
            .prop_map(|(r, rel, related)| {
                RecordOperation::remove_from_related_records(r, rel, related)
            }),
        1 => (
            identity_strategy(),
            relationship_name_strategy(),
            prop::collection::vec(related, 0..3),
        )
            .prop_map(|(r, rel, related)| {
                RecordOperation::replace_related_records(r, rel, related)
            }),
        1 => (
            identity_strategy(),
            relationship_name_strategy(),
            prop::option::of(identity_strategy()),
        )
            .prop_map(|(r, rel, related)| RecordOperation::replace_related_record(r, rel, related)),
        1 => identity_strategy().prop_map(RecordOperation::remove_record),
    ]
}

/// Strategy for generating sequences whose coalesced form reaches the same
/// end state as the original.
///
/// Sequences open with `addRecord` for some distinct records, followed by
/// edits from [`edit_operation_strategy`]. No record payload is written
/// after the opening, since an attribute write may be folded into an earlier
/// field write across it. Identities added to a has-many one at a time are
/// never removed one at a time, since such a pair cancels out.
pub fn edit_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<RecordOperation>> {
    (
        prop::collection::vec(record_strategy(), 0..3),
        prop::collection::vec(edit_operation_strategy(), min_ops..max_ops),
    )
        .prop_map(|(added, edits)| {
            let mut seen = Vec::new();
            added
                .into_iter()
                .filter(|record| {
                    let identity = record.identity();
                    let fresh = !seen.contains(&identity);
                    seen.push(identity);
                    fresh
                })
                .map(RecordOperation::add_record)
                .chain(edits)
                .collect()
        })
}

/// Case count and sequence length for a group of property tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyBudget {
    /// Number of test cases to run.
    pub cases: u32,
    /// Exclusive upper bound on generated sequence length.
    pub max_ops: usize,
}

impl PropertyBudget {
    /// For checks on the generators themselves.
    pub const QUICK: Self = Self {
        cases: 32,
        max_ops: 6,
    };

    /// For coalescing properties.
    pub const STANDARD: Self = Self {
        cases: 256,
        max_ops: 16,
    };

    /// For end-state equivalence, where longer sequences reach more merge
    /// rules.
    pub const DEEP: Self = Self {
        cases: 512,
        max_ops: 24,
    };

    /// Builds the proptest configuration. Other settings keep proptest's
    /// defaults, including the `PROPTEST_*` environment overrides.
    #[must_use]
    pub fn config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            ..ProptestConfig::default()
        }
    }
}
