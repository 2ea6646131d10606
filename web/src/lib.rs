//! Axum boundary for the todo-relay service.
//!
//! This crate is the imperative shell around `todo-relay-core`: it parses
//! requests, consults the auth gate for protected verbs, calls the store,
//! and maps typed outcomes back to wire responses. All business rules
//! live in the core crate.
//!
//! # Surfaces
//!
//! Two routers over one shared [`AppState`]:
//!
//! | Listener | Routes |
//! |---|---|
//! | API (8080) | `GET/POST /todos`, `PUT/DELETE /todos/:id` |
//! | Updates (4242) | `GET /ws` (server-push change events) |
//!
//! Both see the same store and the same event sequence.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::BasicAuth;
pub use state::AppState;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Builds the REST API router.
#[must_use]
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/todos", get(handlers::todos::list))
        .route("/todos", post(handlers::todos::create))
        .route("/todos/:id", put(handlers::todos::update))
        .route("/todos/:id", delete(handlers::todos::delete))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the updates (WebSocket) router.
#[must_use]
pub fn updates_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(handlers::updates::handle))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
