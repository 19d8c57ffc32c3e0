//! Source lifecycle events.
//!
//! Every request a source handles raises events around the capability call:
//! `before<Verb>` first, then `<verb>` on success or `<verb>Fail` on failure.
//! Applying a transform raises `transform`. Listeners return futures and are
//! awaited one after another in registration order.

use crate::capability::{PatchResult, QueryResult};
use crate::error::{SourceError, SourceResult};
use futures::future::LocalBoxFuture;
use parking_lot::RwLock;
use relay_data::{Query, Transform};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::warn;

/// A request verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Read from the source.
    Query,
    /// Fetch transforms describing the source's state.
    Pull,
    /// Hand a transform to the source and receive the transforms it applied.
    Push,
    /// Apply a transform and receive the patch result.
    Update,
    /// Apply a transform that was already applied elsewhere.
    Sync,
}

impl Verb {
    /// Returns the verb name, e.g. `"update"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Query => "query",
            Verb::Pull => "pull",
            Verb::Push => "push",
            Verb::Update => "update",
            Verb::Sync => "sync",
        }
    }

    fn capitalized(&self) -> &'static str {
        match self {
            Verb::Query => "Query",
            Verb::Pull => "Pull",
            Verb::Push => "Push",
            Verb::Update => "Update",
            Verb::Sync => "Sync",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of an event a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// `before<Verb>`: raised before the capability call. Listeners may veto.
    Before(Verb),
    /// `<verb>`: raised after a successful request.
    Settled(Verb),
    /// `<verb>Fail`: raised after a failed request.
    Failed(Verb),
    /// `transform`: raised once per transform applied to the source.
    Transform,
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventName::Before(verb) => write!(f, "before{}", verb.capitalized()),
            EventName::Settled(verb) => f.write_str(verb.as_str()),
            EventName::Failed(verb) => write!(f, "{}Fail", verb.as_str()),
            EventName::Transform => f.write_str("transform"),
        }
    }
}

/// The work item a request carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Request<'a> {
    /// A query (for `query` and `pull`).
    Query(&'a Query),
    /// A transform (for `push`, `update` and `sync`).
    Transform(&'a Transform),
}

impl<'a> Request<'a> {
    /// Returns the id of the work item.
    pub fn id(&self) -> &'a str {
        match self {
            Request::Query(q) => &q.id,
            Request::Transform(t) => &t.id,
        }
    }
}

/// The result a successful request produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome<'a> {
    /// Result of `query`.
    Query(&'a QueryResult),
    /// Result of `pull` or `push`.
    Transforms(&'a [Transform]),
    /// Result of `update`.
    Patch(&'a PatchResult),
    /// `sync` has no result.
    Synced,
}

/// An event raised by a source.
#[derive(Debug, Clone, Copy)]
pub enum SourceEvent<'a> {
    /// Before the capability call.
    Before {
        /// Request verb.
        verb: Verb,
        /// Work item.
        request: Request<'a>,
    },
    /// After a successful request.
    Settled {
        /// Request verb.
        verb: Verb,
        /// Work item.
        request: Request<'a>,
        /// What the request produced.
        outcome: Outcome<'a>,
    },
    /// After a failed request.
    Failed {
        /// Request verb.
        verb: Verb,
        /// Work item.
        request: Request<'a>,
        /// The error returned to the caller.
        error: &'a SourceError,
    },
    /// A transform was applied.
    Transform(&'a Transform),
}

impl SourceEvent<'_> {
    /// Returns the name listeners subscribe to for this event.
    pub fn name(&self) -> EventName {
        match self {
            SourceEvent::Before { verb, .. } => EventName::Before(*verb),
            SourceEvent::Settled { verb, .. } => EventName::Settled(*verb),
            SourceEvent::Failed { verb, .. } => EventName::Failed(*verb),
            SourceEvent::Transform(_) => EventName::Transform,
        }
    }
}

/// Future returned by a listener.
pub type ListenerFuture = LocalBoxFuture<'static, SourceResult<()>>;

/// A registered listener.
///
/// Listeners get a borrowed event and must clone whatever their future needs.
pub type Listener = Arc<dyn Fn(&SourceEvent<'_>) -> ListenerFuture + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, EventName, Listener)>,
}

impl Registry {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _, _)| *listener_id != id);
        self.listeners.len() != before
    }
}

/// Publish/subscribe hub owned by a source.
#[derive(Default)]
pub struct EventBus {
    registry: Arc<RwLock<Registry>>,
}

impl EventBus {
    /// Creates a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for `name`.
    pub fn on<F>(&self, name: EventName, listener: F) -> Subscription
    where
        F: Fn(&SourceEvent<'_>) -> ListenerFuture + Send + Sync + 'static,
    {
        let mut registry = self.registry.write();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, name, Arc::new(listener)));

        Subscription {
            id,
            name,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Removes a listener. Returns false if it was already removed.
    pub fn off(&self, subscription: &Subscription) -> bool {
        self.registry.write().remove(subscription.id)
    }

    /// Returns the number of listeners registered for `name`.
    pub fn listener_count(&self, name: EventName) -> usize {
        self.registry
            .read()
            .listeners
            .iter()
            .filter(|(_, n, _)| *n == name)
            .count()
    }

    /// Snapshot of the listeners for `name`, so that listeners may subscribe
    /// or unsubscribe while an event is being delivered.
    fn listeners(&self, name: EventName) -> Vec<Listener> {
        self.registry
            .read()
            .listeners
            .iter()
            .filter(|(_, n, _)| *n == name)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect()
    }

    /// Delivers `event` to each listener in turn, stopping at the first
    /// rejection and returning it.
    pub async fn fulfill_in_series(&self, event: &SourceEvent<'_>) -> SourceResult<()> {
        for listener in self.listeners(event.name()) {
            listener(event).await?;
        }
        Ok(())
    }

    /// Delivers `event` to every listener in turn. Rejections are logged and
    /// otherwise ignored.
    pub async fn settle_in_series(&self, event: &SourceEvent<'_>) {
        let name = event.name();
        for listener in self.listeners(name) {
            if let Err(error) = listener(event).await {
                warn!(event = %name, %error, "listener rejected event");
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.registry.read().listeners.len())
            .finish()
    }
}

/// Handle to a registered listener.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    name: EventName,
    registry: Weak<RwLock<Registry>>,
}

impl Subscription {
    /// Returns the event this listener is registered for.
    pub fn name(&self) -> EventName {
        self.name
    }

    /// Removes the listener. Returns false if it was already removed or the
    /// bus no longer exists.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.write().remove(self.id),
            None => false,
        }
    }
}
