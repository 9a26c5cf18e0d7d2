//! Ledger scopes.
//!
//! A scope namespaces ledger keys as `"{id}:{key}"` so that the same clip
//! may play once per scope (e.g. once per feedback page) instead of once per
//! session. The scope remembers what it requested and removes those keys
//! from the ledger on [`reset`](PlaybackScope::reset) or drop.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::Orchestrator;
use crate::types::{RequestOptions, RequestOutcome};

/// Per-scope view of the orchestrator.
#[derive(Debug)]
pub struct PlaybackScope {
    id: String,
    orchestrator: Orchestrator,
    tracked: Mutex<BTreeSet<String>>,
}

impl PlaybackScope {
    /// Creates a scope with the given id.
    pub fn new(orchestrator: &Orchestrator, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            orchestrator: orchestrator.clone(),
            tracked: Mutex::new(BTreeSet::new()),
        }
    }

    /// Returns the scope id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the ledger key this scope uses for `key`.
    pub fn ledger_key(&self, key: &str) -> String {
        format!("{}:{}", self.id, key)
    }

    /// Returns true if `key` already played in this scope.
    pub fn has_played(&self, key: &str) -> bool {
        self.orchestrator.has_played(&self.ledger_key(key))
    }

    /// Immediate regular request, de-duplicated within the scope.
    pub async fn request_regular(&self, key: &str, priority: i32) -> RequestOutcome {
        let opts = self.options(key, priority);
        self.orchestrator.request_regular(key, opts).await
    }

    /// Queued regular request, de-duplicated within the scope.
    pub fn enqueue(&self, key: &str, priority: i32) -> RequestOutcome {
        let opts = self.options(key, priority);
        self.orchestrator.enqueue_regular(key, opts)
    }

    /// Protected request, de-duplicated within the scope.
    pub async fn request_protected(&self, key: &str) -> RequestOutcome {
        let opts = self.options(key, RequestOptions::default().priority);
        self.orchestrator.request_protected(key, opts).await
    }

    /// Forgets every ledger key this scope recorded.
    pub fn reset(&self) {
        let keys = std::mem::take(
            &mut *self.tracked.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if keys.is_empty() {
            return;
        }
        self.orchestrator.forget(keys.iter().map(String::as_str));
        debug!(scope = %self.id, count = keys.len(), "Scope reset");
    }

    fn options(&self, key: &str, priority: i32) -> RequestOptions {
        let ledger_key = self.ledger_key(key);
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ledger_key.clone());
        RequestOptions::priority(priority).with_dedup_key(ledger_key)
    }
}

impl Drop for PlaybackScope {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::{ClipCatalog, ClipResolver};
    use crate::engine::{MockClipBackend, PlaybackEngine};
    use crate::orchestrator::OrchestratorDriver;
    use crate::types::PlaybackConfig;

    fn create_orchestrator() -> (Orchestrator, OrchestratorDriver, Arc<MockClipBackend>) {
        let backend = Arc::new(MockClipBackend::new());
        let (engine, signals) =
            PlaybackEngine::new(backend.clone(), PlaybackEngine::DEFAULT_TIMEOUT);
        let catalog =
            ClipCatalog::from_entries(&ClipResolver::default(), [("welcome", "W"), ("tip", "T")])
                .unwrap();
        let (orch, driver) = Orchestrator::new(catalog, engine, signals, &PlaybackConfig::default());
        (orch, driver, backend)
    }

    #[test]
    fn test_ledger_key_is_prefixed() {
        let (orch, _driver, _backend) = create_orchestrator();
        let scope = PlaybackScope::new(&orch, "page-1");
        assert_eq!(scope.id(), "page-1");
        assert_eq!(scope.ledger_key("welcome"), "page-1:welcome");
    }

    #[tokio::test]
    async fn test_dedup_is_per_scope() {
        let (orch, _driver, backend) = create_orchestrator();
        let first = PlaybackScope::new(&orch, "a");
        let second = PlaybackScope::new(&orch, "b");

        assert_eq!(first.request_regular("tip", 5).await, RequestOutcome::Played);
        assert_eq!(first.request_regular("tip", 5).await, RequestOutcome::Skipped);
        assert_eq!(second.request_regular("tip", 5).await, RequestOutcome::Played);

        assert!(first.has_played("tip"));
        assert!(!orch.has_played("tip"));
        assert_eq!(backend.start_count(), 2);
    }

    #[tokio::test]
    async fn test_reset_allows_replay() {
        let (orch, _driver, _backend) = create_orchestrator();
        let scope = PlaybackScope::new(&orch, "page");

        scope.request_protected("welcome").await;
        orch.stop_protected();
        scope.reset();

        assert!(!scope.has_played("welcome"));
        assert_eq!(scope.request_protected("welcome").await, RequestOutcome::Played);
    }

    #[tokio::test]
    async fn test_drop_forgets_keys() {
        let (orch, _driver, _backend) = create_orchestrator();
        {
            let scope = PlaybackScope::new(&orch, "page");
            scope.request_regular("tip", 5).await;
            assert!(orch.has_played("page:tip"));
        }
        assert!(!orch.has_played("page:tip"));
    }

    #[tokio::test]
    async fn test_enqueue_dedups_within_scope() {
        let (orch, _driver, _backend) = create_orchestrator();
        let scope = PlaybackScope::new(&orch, "page");

        assert_eq!(scope.enqueue("tip", 3), RequestOutcome::Queued);
        assert_eq!(scope.enqueue("tip", 3), RequestOutcome::Skipped);
        assert_eq!(orch.queue_length(), 1);
    }
}
