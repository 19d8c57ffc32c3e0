//! Sources and the request flow.
//!
//! A [`Source`] wraps a handler that implements one or more capabilities and
//! runs every request through the same flow:
//!
//! 1. A transform whose id is already in the transform log resolves at once
//!    with an empty result.
//! 2. The request waits its turn on a queue (`sync` has its own queue). A
//!    transform logged while it waited resolves empty.
//! 3. `before<Verb>` listeners run in series; a rejection fails the request.
//!    If a listener applied the transform, the request resolves empty.
//! 4. The handler performs the request.
//! 5. Every resulting transform not yet logged is appended to the log and
//!    announced with a `transform` event.
//! 6. `<verb>` listeners observe the result, which is then returned.
//!
//! Any error raises `<verb>Fail` and is then returned unchanged. Requests
//! skipped before step 3 raise no events. Nothing is retried.

use crate::capability::{
    Capability, PatchResult, PullCapability, Pullable, PushCapability, Pushable, QueryCapability,
    QueryResult, Queryable, QueueKind, Syncable, SyncCapability, UpdateCapability, Updatable,
    WorkItem,
};
use crate::config::SourceConfig;
use crate::error::SourceResult;
use crate::events::{EventBus, EventName, ListenerFuture, SourceEvent, Subscription};
use crate::log::TransformLog;
use crate::queue::TaskQueue;
use relay_data::{
    build_query, build_transform, Query, QueryExpression, QueryId, Transform, TransformId,
    TransformInput,
};
use serde_json::Value;
use tracing::{debug, trace};

/// A data source: a capability handler plus its transform log, queues and
/// event bus.
pub struct Source<H> {
    config: SourceConfig,
    handler: H,
    log: TransformLog,
    events: EventBus,
    request_queue: TaskQueue,
    sync_queue: TaskQueue,
}

impl<H> Source<H> {
    /// Creates a source around `handler`.
    pub fn new(config: SourceConfig, handler: H) -> Self {
        Self {
            log: TransformLog::with_name(config.name.clone()),
            events: EventBus::new(),
            request_queue: TaskQueue::new(config.request_queue.clone()),
            sync_queue: TaskQueue::new(config.sync_queue.clone()),
            handler,
            config,
        }
    }

    /// Returns the source name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Returns the capability handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns the transform log.
    pub fn transform_log(&self) -> &TransformLog {
        &self.log
    }

    /// Returns the event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Returns the queue serializing `query`, `pull`, `push` and `update`.
    pub fn request_queue(&self) -> &TaskQueue {
        &self.request_queue
    }

    /// Returns the queue serializing `sync`.
    pub fn sync_queue(&self) -> &TaskQueue {
        &self.sync_queue
    }

    /// Registers an event listener. See [`EventBus::on`].
    pub fn on<F>(&self, name: EventName, listener: F) -> Subscription
    where
        F: Fn(&SourceEvent<'_>) -> ListenerFuture + Send + Sync + 'static,
    {
        self.events.on(name, listener)
    }

    /// Records transforms as applied to this source.
    ///
    /// Transforms already in the log are ignored. Each new transform is
    /// appended to the log and then announced with a `transform` event.
    pub async fn transformed(&self, transforms: &[Transform]) {
        for transform in transforms {
            if !self.log.append(transform.id.clone()) {
                continue;
            }
            trace!(source = %self.name(), transform_id = %transform.id, "transform applied");
            self.events
                .settle_in_series(&SourceEvent::Transform(transform))
                .await;
        }
    }

    fn is_applied(&self, item: &impl WorkItem) -> bool {
        item.replay_id().is_some_and(|id| self.log.contains(id))
    }

    fn queue(&self, kind: QueueKind) -> &TaskQueue {
        match kind {
            QueueKind::Request => &self.request_queue,
            QueueKind::Sync => &self.sync_queue,
        }
    }

    /// Runs a request through the request flow.
    async fn coordinate<C: Capability<H>>(&self, input: &C::Input) -> SourceResult<C::Output> {
        if self.is_applied(input) {
            debug!(
                source = %self.name(),
                verb = %C::VERB,
                id = input.request().id(),
                "already applied, skipping"
            );
            return Ok(C::Output::default());
        }

        self.queue(C::QUEUE).push(self.process::<C>(input)).await
    }

    /// Runs a dequeued request, raising the fail event on error.
    async fn process<C: Capability<H>>(&self, input: &C::Input) -> SourceResult<C::Output> {
        match self.run::<C>(input).await {
            Ok(output) => Ok(output),
            Err(error) => {
                debug!(
                    source = %self.name(),
                    verb = %C::VERB,
                    id = input.request().id(),
                    %error,
                    "request failed"
                );
                self.events
                    .settle_in_series(&SourceEvent::Failed {
                        verb: C::VERB,
                        request: input.request(),
                        error: &error,
                    })
                    .await;
                Err(error)
            }
        }
    }

    async fn run<C: Capability<H>>(&self, input: &C::Input) -> SourceResult<C::Output> {
        let verb = C::VERB;
        let request = input.request();

        if self.is_applied(input) {
            debug!(
                source = %self.name(),
                %verb,
                id = request.id(),
                "applied while queued, skipping"
            );
            return Ok(C::Output::default());
        }

        self.events
            .fulfill_in_series(&SourceEvent::Before { verb, request })
            .await?;

        if self.is_applied(input) {
            debug!(
                source = %self.name(),
                %verb,
                id = request.id(),
                "applied by a listener, skipping"
            );
            return Ok(C::Output::default());
        }

        trace!(source = %self.name(), %verb, id = request.id(), "performing");
        let output = C::perform(&self.handler, input).await?;

        self.transformed(C::applied(input, &output)).await;

        self.events
            .settle_in_series(&SourceEvent::Settled {
                verb,
                request,
                outcome: C::outcome(&output),
            })
            .await;

        Ok(output)
    }
}

impl<H: Queryable> Source<H> {
    /// Queries the source. Queries are never deduplicated.
    pub async fn query(&self, query: impl Into<Query>) -> SourceResult<QueryResult> {
        let query = query.into();
        self.coordinate::<QueryCapability>(&query).await
    }

    /// Builds a query from an expression and runs it.
    pub async fn query_expression(
        &self,
        expression: QueryExpression,
        options: Option<Value>,
        id: Option<QueryId>,
    ) -> SourceResult<QueryResult> {
        self.query(build_query(expression, options, id)).await
    }
}

impl<H: Pullable> Source<H> {
    /// Pulls transforms matching `query` and records them as applied.
    pub async fn pull(&self, query: impl Into<Query>) -> SourceResult<Vec<Transform>> {
        let query = query.into();
        self.coordinate::<PullCapability>(&query).await
    }

    /// Builds a query from an expression and pulls with it.
    pub async fn pull_expression(
        &self,
        expression: QueryExpression,
        options: Option<Value>,
        id: Option<QueryId>,
    ) -> SourceResult<Vec<Transform>> {
        self.pull(build_query(expression, options, id)).await
    }
}

impl<H: Pushable> Source<H> {
    /// Pushes a transform. Returns an empty list if the transform was
    /// already applied.
    pub async fn push(&self, input: impl Into<TransformInput>) -> SourceResult<Vec<Transform>> {
        let transform = build_transform(input, None, None);
        self.coordinate::<PushCapability>(&transform).await
    }

    /// Wraps operations in a transform with the given options and id, then
    /// pushes it.
    pub async fn push_operations(
        &self,
        operations: impl Into<TransformInput>,
        options: Option<Value>,
        id: Option<TransformId>,
    ) -> SourceResult<Vec<Transform>> {
        self.push(build_transform(operations, options, id)).await
    }
}

impl<H: Updatable> Source<H> {
    /// Updates the source. Returns an empty result if the transform was
    /// already applied.
    pub async fn update(&self, input: impl Into<TransformInput>) -> SourceResult<PatchResult> {
        let transform = build_transform(input, None, None);
        self.coordinate::<UpdateCapability>(&transform).await
    }

    /// Wraps operations in a transform with the given options and id, then
    /// updates the source with it.
    pub async fn update_operations(
        &self,
        operations: impl Into<TransformInput>,
        options: Option<Value>,
        id: Option<TransformId>,
    ) -> SourceResult<PatchResult> {
        self.update(build_transform(operations, options, id)).await
    }
}

impl<H: Syncable> Source<H> {
    /// Syncs a transform applied elsewhere. Does nothing if the transform
    /// was already applied.
    pub async fn sync(&self, input: impl Into<TransformInput>) -> SourceResult<()> {
        let transform = build_transform(input, None, None);
        self.coordinate::<SyncCapability>(&transform).await
    }

    /// Wraps operations in a transform with the given options and id, then
    /// syncs it.
    pub async fn sync_operations(
        &self,
        operations: impl Into<TransformInput>,
        options: Option<Value>,
        id: Option<TransformId>,
    ) -> SourceResult<()> {
        self.sync(build_transform(operations, options, id)).await
    }
}

impl<H> std::fmt::Debug for Source<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.config.name)
            .field("log", &self.log)
            .field("request_queue", &self.request_queue)
            .field("sync_queue", &self.sync_queue)
            .finish()
    }
}
