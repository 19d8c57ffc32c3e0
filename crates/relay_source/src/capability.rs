//! Capabilities a source can implement.
//!
//! Each capability is a trait with one method: the work a concrete source
//! does once the coordinator has decided the request should run. The
//! [`Capability`] trait ties a verb to its work item, its result shape and
//! its capability trait so that one coordinator serves every verb.

use crate::error::SourceResult;
use crate::events::{Outcome, Request, Verb};
use relay_data::{Query, Record, RecordOperation, Transform};
use std::future::Future;

/// Result of a `query`.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// A single record lookup; `None` if the lookup found nothing.
    Record(Option<Record>),
    /// A list of records.
    Records(Vec<Record>),
}

impl Default for QueryResult {
    fn default() -> Self {
        QueryResult::Records(Vec::new())
    }
}

impl QueryResult {
    /// Returns the records in this result.
    pub fn records(&self) -> Vec<&Record> {
        match self {
            QueryResult::Record(record) => record.iter().collect(),
            QueryResult::Records(records) => records.iter().collect(),
        }
    }
}

/// Result of an `update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchResult {
    /// One entry per applied operation: the affected record after the
    /// operation, or `None` if it was removed.
    pub data: Vec<Option<Record>>,
    /// Operations that undo the update, in application order.
    pub inverse: Vec<RecordOperation>,
}

/// Answers queries.
pub trait Queryable {
    /// Evaluates a query.
    fn query(&self, query: &Query) -> impl Future<Output = SourceResult<QueryResult>>;
}

/// Produces transforms describing the source's state.
pub trait Pullable {
    /// Returns transforms that bring a caller up to date with `query`.
    fn pull(&self, query: &Query) -> impl Future<Output = SourceResult<Vec<Transform>>>;
}

/// Accepts transforms and reports what was applied.
pub trait Pushable {
    /// Applies `transform`, returning every transform the source applied as a
    /// result.
    fn push(&self, transform: &Transform) -> impl Future<Output = SourceResult<Vec<Transform>>>;
}

/// Applies transforms and returns the patch result.
pub trait Updatable {
    /// Applies `transform`.
    fn update(&self, transform: &Transform) -> impl Future<Output = SourceResult<PatchResult>>;
}

/// Applies transforms that were already applied by another source.
pub trait Syncable {
    /// Applies `transform`.
    fn sync(&self, transform: &Transform) -> impl Future<Output = SourceResult<()>>;
}

/// Which queue serializes a verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Shared by `query`, `pull`, `push` and `update`.
    Request,
    /// Used by `sync` only.
    Sync,
}

/// A work item handed to a capability.
pub trait WorkItem {
    /// Borrows the item as an event payload.
    fn request(&self) -> Request<'_>;

    /// Returns the id guarded against replay, if the item is a transform.
    fn replay_id(&self) -> Option<&str>;
}

impl WorkItem for Query {
    fn request(&self) -> Request<'_> {
        Request::Query(self)
    }

    fn replay_id(&self) -> Option<&str> {
        None
    }
}

impl WorkItem for Transform {
    fn request(&self) -> Request<'_> {
        Request::Transform(self)
    }

    fn replay_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// Binds a verb to its capability trait on handler type `H`.
pub trait Capability<H> {
    /// The verb.
    const VERB: Verb;
    /// The queue that serializes this verb.
    const QUEUE: QueueKind;

    /// Work item type.
    type Input: WorkItem;
    /// Result type. `Default` is the result of a skipped request.
    type Output: Default;

    /// Runs the capability on the handler.
    fn perform<'a>(
        handler: &'a H,
        input: &'a Self::Input,
    ) -> impl Future<Output = SourceResult<Self::Output>> + 'a;

    /// Transforms that were applied by a successful request.
    fn applied<'a>(input: &'a Self::Input, output: &'a Self::Output) -> &'a [Transform];

    /// Borrows the result as an event payload.
    fn outcome(output: &Self::Output) -> Outcome<'_>;
}

/// `query`
#[derive(Debug, Clone, Copy)]
pub struct QueryCapability;

/// `pull`
#[derive(Debug, Clone, Copy)]
pub struct PullCapability;

/// `push`
#[derive(Debug, Clone, Copy)]
pub struct PushCapability;

/// `update`
#[derive(Debug, Clone, Copy)]
pub struct UpdateCapability;

/// `sync`
#[derive(Debug, Clone, Copy)]
pub struct SyncCapability;

impl<H: Queryable> Capability<H> for QueryCapability {
    const VERB: Verb = Verb::Query;
    const QUEUE: QueueKind = QueueKind::Request;
    type Input = Query;
    type Output = QueryResult;

    fn perform<'a>(
        handler: &'a H,
        input: &'a Query,
    ) -> impl Future<Output = SourceResult<QueryResult>> + 'a {
        handler.query(input)
    }

    fn applied<'a>(_input: &'a Query, _output: &'a QueryResult) -> &'a [Transform] {
        &[]
    }

    fn outcome(output: &QueryResult) -> Outcome<'_> {
        Outcome::Query(output)
    }
}

impl<H: Pullable> Capability<H> for PullCapability {
    const VERB: Verb = Verb::Pull;
    const QUEUE: QueueKind = QueueKind::Request;
    type Input = Query;
    type Output = Vec<Transform>;

    fn perform<'a>(
        handler: &'a H,
        input: &'a Query,
    ) -> impl Future<Output = SourceResult<Vec<Transform>>> + 'a {
        handler.pull(input)
    }

    fn applied<'a>(_input: &'a Query, output: &'a Vec<Transform>) -> &'a [Transform] {
        output
    }

    fn outcome(output: &Vec<Transform>) -> Outcome<'_> {
        Outcome::Transforms(output)
    }
}

impl<H: Pushable> Capability<H> for PushCapability {
    const VERB: Verb = Verb::Push;
    const QUEUE: QueueKind = QueueKind::Request;
    type Input = Transform;
    type Output = Vec<Transform>;

    fn perform<'a>(
        handler: &'a H,
        input: &'a Transform,
    ) -> impl Future<Output = SourceResult<Vec<Transform>>> + 'a {
        handler.push(input)
    }

    fn applied<'a>(_input: &'a Transform, output: &'a Vec<Transform>) -> &'a [Transform] {
        output
    }

    fn outcome(output: &Vec<Transform>) -> Outcome<'_> {
        Outcome::Transforms(output)
    }
}

impl<H: Updatable> Capability<H> for UpdateCapability {
    const VERB: Verb = Verb::Update;
    const QUEUE: QueueKind = QueueKind::Request;
    type Input = Transform;
    type Output = PatchResult;

    fn perform<'a>(
        handler: &'a H,
        input: &'a Transform,
    ) -> impl Future<Output = SourceResult<PatchResult>> + 'a {
        handler.update(input)
    }

    fn applied<'a>(input: &'a Transform, _output: &'a PatchResult) -> &'a [Transform] {
        std::slice::from_ref(input)
    }

    fn outcome(output: &PatchResult) -> Outcome<'_> {
        Outcome::Patch(output)
    }
}

impl<H: Syncable> Capability<H> for SyncCapability {
    const VERB: Verb = Verb::Sync;
    const QUEUE: QueueKind = QueueKind::Sync;
    type Input = Transform;
    type Output = ();

    fn perform<'a>(
        handler: &'a H,
        input: &'a Transform,
    ) -> impl Future<Output = SourceResult<()>> + 'a {
        handler.sync(input)
    }

    fn applied<'a>(input: &'a Transform, _output: &'a ()) -> &'a [Transform] {
        std::slice::from_ref(input)
    }

    fn outcome(_output: &()) -> Outcome<'_> {
        Outcome::Synced
    }
}
