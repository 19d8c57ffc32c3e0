//! Queries and query expressions.

use crate::error::{DataError, DataResult};
use crate::record::RecordIdentity;
use crate::transform::generate_id;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a query.
pub type QueryId = String;

/// A read expression, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum QueryExpression {
    /// Finds a single record.
    FindRecord {
        /// Record to find.
        record: RecordIdentity,
    },
    /// Finds every record of a type.
    FindRecords {
        /// Model type.
        #[serde(rename = "type")]
        record_type: String,
    },
    /// Finds the record a has-one relationship points at.
    FindRelatedRecord {
        /// Owner of the relationship.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
    },
    /// Finds the records in a has-many relationship.
    FindRelatedRecords {
        /// Owner of the relationship.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
    },
}

impl QueryExpression {
    /// Returns the `op` tag of this expression.
    pub fn op(&self) -> &'static str {
        match self {
            QueryExpression::FindRecord { .. } => "findRecord",
            QueryExpression::FindRecords { .. } => "findRecords",
            QueryExpression::FindRelatedRecord { .. } => "findRelatedRecord",
            QueryExpression::FindRelatedRecords { .. } => "findRelatedRecords",
        }
    }

    /// Parses an expression from its JSON form.
    pub fn parse(value: Value) -> DataResult<Self> {
        let shown = value.to_string();
        serde_json::from_value(value).map_err(|e| DataError::QueryExpressionParse {
            expression: shown,
            message: e.to_string(),
        })
    }
}

/// A read request: an expression plus options, identified like a transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Unique id.
    pub id: QueryId,
    /// Expression to evaluate.
    pub expression: QueryExpression,
    /// Free-form options passed through to sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl Query {
    /// Creates a query with a generated id.
    pub fn new(expression: QueryExpression) -> Self {
        Self {
            id: generate_id(),
            expression,
            options: None,
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<QueryId>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }
}

impl From<QueryExpression> for Query {
    fn from(expression: QueryExpression) -> Self {
        Query::new(expression)
    }
}

/// Builds a query from an expression, options and an optional id.
pub fn build_query(
    expression: QueryExpression,
    options: Option<Value>,
    id: Option<QueryId>,
) -> Query {
    Query {
        id: id.unwrap_or_else(generate_id),
        expression,
        options,
    }
}
