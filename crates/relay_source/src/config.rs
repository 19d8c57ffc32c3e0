//! Source configuration.

/// Configuration for a task queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Queue name, used in logs.
    pub name: String,
}

impl QueueConfig {
    /// Creates a queue configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Configuration for a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Source name, used in logs and errors.
    pub name: String,
    /// Queue serializing `query`, `pull`, `push` and `update`.
    pub request_queue: QueueConfig,
    /// Queue serializing `sync`.
    pub sync_queue: QueueConfig,
}

impl SourceConfig {
    /// Creates a configuration with queue names derived from `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            request_queue: QueueConfig::new(format!("{name}-requests")),
            sync_queue: QueueConfig::new(format!("{name}-sync")),
            name,
        }
    }

    /// Sets the request queue configuration.
    #[must_use]
    pub fn with_request_queue(mut self, queue: QueueConfig) -> Self {
        self.request_queue = queue;
        self
    }

    /// Sets the sync queue configuration.
    #[must_use]
    pub fn with_sync_queue(mut self, queue: QueueConfig) -> Self {
        self.sync_queue = queue;
        self
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::new("source")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_queue_names() {
        let config = SourceConfig::new("memory");
        assert_eq!(config.name, "memory");
        assert_eq!(config.request_queue.name, "memory-requests");
        assert_eq!(config.sync_queue.name, "memory-sync");
    }

    #[test]
    fn config_builder() {
        let config = SourceConfig::new("remote")
            .with_request_queue(QueueConfig::new("outbox"))
            .with_sync_queue(QueueConfig::new("inbox"));

        assert_eq!(config.request_queue.name, "outbox");
        assert_eq!(config.sync_queue.name, "inbox");
        assert_eq!(SourceConfig::default().name, "source");
    }
}
