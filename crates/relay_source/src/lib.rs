//! # Relay Source
//!
//! Request-flow coordination for Relay data sources.
//!
//! This crate provides:
//! - `Source`, which runs every request through one flow
//! - Capability traits a concrete source implements
//! - An append-only transform log per source
//! - FIFO task queues (one for requests, one for `sync`)
//! - Lifecycle events with vetoing `before*` listeners
//! - `MemorySource`, an in-memory record cache
//!
//! ## Request flow
//!
//! 1. Replayed transforms resolve at once with an empty result
//! 2. The request waits its turn on its queue
//! 3. `before<Verb>` listeners run and may veto
//! 4. The capability runs
//! 5. Applied transforms are logged and announced
//! 6. `<verb>` listeners observe the result
//!
//! ## Key Invariants
//!
//! - A transform is applied to a source at most once
//! - Requests on one queue run one at a time, in issue order
//! - Errors reach the caller unchanged, after `<verb>Fail` listeners ran
//! - Log entries are never removed

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod capability;
mod config;
mod error;
mod events;
mod log;
mod memory;
mod queue;
mod source;

pub use capability::{
    Capability, PatchResult, PullCapability, Pullable, PushCapability, Pushable, QueryCapability,
    QueryResult, Queryable, QueueKind, SyncCapability, Syncable, UpdateCapability, Updatable,
    WorkItem,
};
pub use config::{QueueConfig, SourceConfig};
pub use error::{SourceError, SourceResult};
pub use events::{
    EventBus, EventName, Listener, ListenerFuture, Outcome, Request, SourceEvent, Subscription,
    Verb,
};
pub use log::TransformLog;
pub use memory::MemorySource;
pub use queue::TaskQueue;
pub use source::Source;
