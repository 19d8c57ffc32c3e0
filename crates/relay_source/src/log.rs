//! Transform log.

use parking_lot::RwLock;
use relay_data::TransformId;
use std::collections::HashSet;

/// Append-only record of the transforms a source has applied.
///
/// The log answers one question: has this transform already been applied
/// here? It is consulted before a transform is performed and written after
/// it has been performed.
///
/// # Invariants
///
/// - Ids are kept in append order
/// - Each id appears at most once
/// - Ids are never removed
pub struct TransformLog {
    name: String,
    inner: RwLock<LogInner>,
}

#[derive(Default)]
struct LogInner {
    /// Ids in append order.
    entries: Vec<TransformId>,
    /// Membership index over `entries`.
    index: HashSet<TransformId>,
}

impl TransformLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::with_name("transform-log")
    }

    /// Creates an empty log with a diagnostic name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(LogInner::default()),
        }
    }

    /// Returns the name of the log.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a transform id.
    ///
    /// Returns false if the id was already present, in which case the log is
    /// unchanged.
    pub fn append(&self, id: impl Into<TransformId>) -> bool {
        let id = id.into();
        let mut inner = self.inner.write();
        if !inner.index.insert(id.clone()) {
            return false;
        }
        inner.entries.push(id);
        true
    }

    /// Appends several ids, in order.
    ///
    /// Returns the number of ids that were not already present.
    pub fn append_all<I>(&self, ids: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<TransformId>,
    {
        let mut added = 0;
        for id in ids {
            if self.append(id) {
                added += 1;
            }
        }
        added
    }

    /// Returns true if the id has been appended.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().index.contains(id)
    }

    /// Returns the number of ids.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns true if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Returns the most recently appended id.
    pub fn head(&self) -> Option<TransformId> {
        self.inner.read().entries.last().cloned()
    }

    /// Returns all ids in append order.
    pub fn entries(&self) -> Vec<TransformId> {
        self.inner.read().entries.clone()
    }

    /// Returns the ids appended after `id`.
    ///
    /// Returns `None` if `id` is not in the log.
    pub fn after(&self, id: &str) -> Option<Vec<TransformId>> {
        let inner = self.inner.read();
        let position = inner.entries.iter().position(|e| e == id)?;
        Some(inner.entries[position + 1..].to_vec())
    }
}

impl Default for TransformLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransformLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformLog")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}
