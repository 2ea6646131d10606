//! Core of the todo-relay service.
//!
//! A single-process todo collection with CRUD semantics, lenient
//! pagination, a credential gate on destructive operations and a
//! broadcaster that pushes every committed change to live subscribers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   typed calls   ┌───────────┐
//! │ API boundary │ ───────────────>│ TodoStore │  owns todos + sequence
//! │  (web crate) │                 └─────┬─────┘
//! └──────┬───────┘                       │ ChangeEvent (commit order)
//!        │ subscribe/unsubscribe   ┌─────▼───────┐
//!        └────────────────────────>│ Broadcaster │  fan-out, eviction
//!                                  └─────────────┘
//! ```
//!
//! The store is the sole mutator of state. Every successful mutation
//! assigns the next sequence number and hands exactly one [`ChangeEvent`]
//! to the broadcaster; failed mutations leave state untouched and emit
//! nothing. Reads never touch the auth gate or the broadcaster.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod broadcaster;
pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use auth::{AuthGate, CredentialVerifier, StaticCredentials};
pub use broadcaster::{Broadcaster, EventSink, SubscriberId, Subscription};
pub use config::ServiceConfig;
pub use error::{AuthError, StoreError, StoreResult};
pub use store::{ListParams, TodoStore};
pub use types::{ChangeEvent, ChangeKind, Todo, TodoId};
