//! Transforms: named batches of record operations.

use crate::coalesce::coalesce_record_operations;
use crate::operation::RecordOperation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a transform. Used as the deduplication key when a transform
/// is applied to a source.
pub type TransformId = String;

/// An ordered batch of operations applied together.
///
/// A transform is immutable once built; its `id` identifies it in every
/// source's transform log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Unique id.
    pub id: TransformId,
    /// Operations, in application order.
    pub operations: Vec<RecordOperation>,
    /// Free-form options passed through to sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl Transform {
    /// Creates a transform with a generated id.
    pub fn new(operations: Vec<RecordOperation>) -> Self {
        Self {
            id: generate_id(),
            operations,
            options: None,
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<TransformId>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Returns the operations of this transform coalesced into a minimal
    /// equivalent sequence.
    pub fn coalesced_operations(&self) -> Vec<RecordOperation> {
        coalesce_record_operations(&self.operations)
    }

    /// Returns true if the transform has no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Anything a transform can be built from.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformInput {
    /// A single operation.
    Operation(RecordOperation),
    /// A list of operations.
    Operations(Vec<RecordOperation>),
    /// An already built transform.
    Transform(Transform),
}

impl From<RecordOperation> for TransformInput {
    fn from(op: RecordOperation) -> Self {
        TransformInput::Operation(op)
    }
}

impl From<Vec<RecordOperation>> for TransformInput {
    fn from(ops: Vec<RecordOperation>) -> Self {
        TransformInput::Operations(ops)
    }
}

impl From<Transform> for TransformInput {
    fn from(transform: Transform) -> Self {
        TransformInput::Transform(transform)
    }
}

/// Builds a transform.
///
/// An existing transform is returned as-is, ignoring `options` and `id`.
/// Otherwise the operations are wrapped in a new transform with the given
/// options and id, generating an id if none is given.
pub fn build_transform(
    input: impl Into<TransformInput>,
    options: Option<Value>,
    id: Option<TransformId>,
) -> Transform {
    let operations = match input.into() {
        TransformInput::Transform(transform) => return transform,
        TransformInput::Operation(op) => vec![op],
        TransformInput::Operations(ops) => ops,
    };

    Transform {
        id: id.unwrap_or_else(generate_id),
        operations,
        options,
    }
}

pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
