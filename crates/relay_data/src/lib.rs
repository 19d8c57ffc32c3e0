//! # Relay Data
//!
//! Record, operation and transform model for Relay.
//!
//! This crate provides:
//! - `Record` and `RecordIdentity`
//! - `RecordOperation`, the nine record mutations
//! - Operation coalescing (`coalesce_record_operations`)
//! - Attribute/key diffing (`record_diffs`)
//! - `Transform` and `Query` work items
//! - The error taxonomy shared by all sources
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod coalesce;
mod diff;
mod error;
mod operation;
mod query;
mod record;
mod schema;
mod transform;

pub use coalesce::coalesce_record_operations;
pub use diff::record_diffs;
pub use error::{DataError, DataResult};
pub use operation::{OperationKind, RecordOperation};
pub use query::{build_query, Query, QueryExpression, QueryId};
pub use record::{Record, RecordIdentity, Relationship, RelationshipData};
pub use schema::{RecordInitializer, UuidInitializer};
pub use transform::{build_transform, Transform, TransformId, TransformInput};
