//! Application state for Axum handlers.

use std::sync::Arc;
use todo_relay_core::{AuthGate, Broadcaster, ServiceConfig, TodoStore};

/// Shared state behind every HTTP and WebSocket handler.
///
/// Both listeners (REST API and updates endpoint) hold clones of the same
/// state, so every surface observes one store and one event sequence.
#[derive(Clone)]
pub struct AppState {
    /// The canonical todo collection.
    pub store: TodoStore,
    /// Fan-out of committed change events.
    pub broadcaster: Arc<Broadcaster>,
    /// Credential gate for protected operations.
    pub auth: AuthGate,
}

impl AppState {
    /// Wires up store, broadcaster and auth gate from a configuration.
    ///
    /// Must be called from within a tokio runtime (the broadcaster spawns
    /// its dispatch task).
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Self {
        let broadcaster = Arc::new(Broadcaster::new(config.subscriber_queue_capacity));
        let store = TodoStore::new(broadcaster.publisher());
        let auth = AuthGate::new(Arc::new(config.credentials.clone()));

        Self {
            store,
            broadcaster,
            auth,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_is_clone_and_shares_the_store() {
        let state = AppState::from_config(&ServiceConfig::default());
        let clone = state.clone();

        state
            .store
            .create(todo_relay_core::Todo::new(
                todo_relay_core::TodoId(1),
                "shared".to_string(),
                false,
            ))
            .await
            .expect("fresh id");

        assert_eq!(clone.store.len().await, 1);
    }
}
