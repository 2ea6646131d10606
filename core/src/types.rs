//! Domain types for the todo-relay service.
//!
//! A todo is the smallest possible record: a caller-chosen numeric id, a
//! text label and a completion flag. Ids are supplied by clients, not
//! generated by the server; the store only enforces their uniqueness.

use serde::{Deserialize, Serialize};

/// Unique identifier for a todo item.
///
/// Clients pick the id themselves (any `u64`); the store rejects a create
/// whose id is already live. On the wire the id is a plain JSON number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(pub u64);

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TodoId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A single todo item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Caller-chosen identifier, unique among live todos.
    pub id: TodoId,
    /// Text label of the todo.
    pub text: String,
    /// Whether the todo is completed.
    pub completed: bool,
}

impl Todo {
    /// Creates a new todo item.
    #[must_use]
    pub const fn new(id: TodoId, text: String, completed: bool) -> Self {
        Self {
            id,
            text,
            completed,
        }
    }
}

/// The kind of mutation a [`ChangeEvent`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A todo was inserted.
    Created,
    /// An existing todo's text/completed fields were replaced.
    Updated,
    /// A todo was removed.
    Deleted,
}

/// An immutable record of one committed store mutation.
///
/// Sequence numbers are scoped to the store's lifetime, strictly
/// increasing and never reused; events are emitted in the exact order
/// mutations commit. The `todo` field carries the state after the change,
/// or the last-known state for a deletion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Monotonic sequence number assigned at commit time.
    pub sequence: u64,
    /// What happened.
    pub kind: ChangeKind,
    /// Snapshot of the todo after the change (last-known for deletes).
    pub todo: Todo,
}
