//! The canonical todo collection.
//!
//! [`TodoStore`] is the sole mutator of state. Internally it keeps todos
//! in insertion order (a `Vec`) with a hash index from id to position, all
//! behind one `RwLock`: reads share the lock, mutations are exclusive.
//! Every successful mutation assigns the next sequence number and pushes
//! exactly one [`ChangeEvent`] into the broadcaster's internal channel
//! before the write lock is released — a non-blocking queue push, so
//! sequence order is exactly commit order and fan-out latency never
//! serializes against mutation latency.

use crate::broadcaster::EventSink;
use crate::error::{StoreError, StoreResult};
use crate::types::{ChangeEvent, ChangeKind, Todo, TodoId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Page size used when the client supplies no usable `limit`.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Sanitized pagination window.
///
/// Query parameters arrive as raw strings and pagination is advisory, not
/// authoritative: garbage never fails a list call. [`ListParams::from_raw`]
/// degrades unusable values to safe defaults and the store additionally
/// clamps the window to the current collection size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListParams {
    /// Number of leading todos to skip.
    pub offset: usize,
    /// Maximum number of todos to return.
    pub limit: usize,
}

impl ListParams {
    /// Builds parameters from raw query values.
    ///
    /// A missing, non-numeric or negative `offset` becomes 0. A missing,
    /// non-numeric, negative or zero `limit` becomes
    /// [`DEFAULT_PAGE_LIMIT`]. Values are parsed as `u64` (so negatives
    /// fail the parse and fall back), then saturated into `usize`; the
    /// store clamps the window to the collection anyway.
    #[must_use]
    pub fn from_raw(offset: Option<&str>, limit: Option<&str>) -> Self {
        let offset = offset
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(|value| usize::try_from(value).unwrap_or(usize::MAX))
            .unwrap_or(0);

        let limit = limit
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|&value| value > 0)
            .map(|value| usize::try_from(value).unwrap_or(usize::MAX))
            .unwrap_or(DEFAULT_PAGE_LIMIT);

        Self { offset, limit }
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Interior of the store, guarded by one `RwLock`.
struct StoreInner {
    /// Todos in insertion order.
    order: Vec<Todo>,
    /// Position of each live id within `order`.
    index: HashMap<TodoId, usize>,
    /// Last assigned event sequence number.
    sequence: u64,
}

impl StoreInner {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

/// Concurrency-safe owner of the todo collection.
///
/// Cheap to clone; clones share the same underlying collection.
#[derive(Clone)]
pub struct TodoStore {
    inner: Arc<RwLock<StoreInner>>,
    events: EventSink,
}

impl TodoStore {
    /// Creates an empty store publishing change events into `events`.
    #[must_use]
    pub fn new(events: EventSink) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                order: Vec::new(),
                index: HashMap::new(),
                sequence: 0,
            })),
            events,
        }
    }

    /// Lists todos within the given window, in insertion order.
    ///
    /// Never fails: the window is clamped to the collection, so an offset
    /// past the end yields an empty page and an oversized limit yields the
    /// remainder.
    pub async fn list(&self, params: ListParams) -> Vec<Todo> {
        let inner = self.inner.read().await;
        let start = params.offset.min(inner.order.len());
        let end = start.saturating_add(params.limit).min(inner.order.len());
        inner.order[start..end].to_vec()
    }

    /// Inserts a new todo at the end of iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the id is already live;
    /// the store is left unchanged.
    pub async fn create(&self, todo: Todo) -> StoreResult<Todo> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        if inner.index.contains_key(&todo.id) {
            return Err(StoreError::AlreadyExists(todo.id));
        }

        let position = inner.order.len();
        inner.order.push(todo.clone());
        inner.index.insert(todo.id, position);

        let sequence = inner.next_sequence();
        debug!(id = %todo.id, sequence, "Todo created");
        self.events.publish(ChangeEvent {
            sequence,
            kind: ChangeKind::Created,
            todo: todo.clone(),
        });

        Ok(todo)
    }

    /// Replaces the text/completed fields of an existing todo in place.
    ///
    /// The todo keeps its id and its position in iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the id is not live.
    pub async fn update(&self, id: TodoId, text: String, completed: bool) -> StoreResult<Todo> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let position = *inner.index.get(&id).ok_or(StoreError::NotFound(id))?;

        let entry = &mut inner.order[position];
        entry.text = text;
        entry.completed = completed;
        let updated = entry.clone();

        let sequence = inner.next_sequence();
        debug!(id = %id, sequence, "Todo updated");
        self.events.publish(ChangeEvent {
            sequence,
            kind: ChangeKind::Updated,
            todo: updated.clone(),
        });

        Ok(updated)
    }

    /// Removes a todo, emitting its last-known snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the id is not live.
    pub async fn delete(&self, id: TodoId) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let position = inner
            .index
            .remove(&id)
            .ok_or(StoreError::NotFound(id))?;

        let removed = inner.order.remove(position);
        // Removal shifted everything after `position` left by one.
        for todo in &inner.order[position..] {
            if let Some(entry) = inner.index.get_mut(&todo.id) {
                *entry -= 1;
            }
        }

        let sequence = inner.next_sequence();
        debug!(id = %id, sequence, "Todo deleted");
        self.events.publish(ChangeEvent {
            sequence,
            kind: ChangeKind::Deleted,
            todo: removed,
        });

        Ok(())
    }

    /// Fetches a single todo by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the id is not live.
    pub async fn get(&self, id: TodoId) -> StoreResult<Todo> {
        let inner = self.inner.read().await;
        let position = *inner.index.get(&id).ok_or(StoreError::NotFound(id))?;
        Ok(inner.order[position].clone())
    }

    /// Current number of live todos.
    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    /// Whether the store holds no todos.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.order.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    /// Store wired to a capture channel for asserting emitted events.
    fn store_with_events() -> (TodoStore, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink::from_sender(tx);
        (TodoStore::new(sink), rx)
    }

    fn store() -> TodoStore {
        store_with_events().0
    }

    fn todo(id: u64, text: &str, completed: bool) -> Todo {
        Todo::new(TodoId(id), text.to_string(), completed)
    }

    #[test]
    fn from_raw_degrades_garbage_to_defaults() {
        // Typical garbage clients send: negative, zero, non-numeric.
        assert_eq!(
            ListParams::from_raw(Some("5"), Some("-66")),
            ListParams {
                offset: 5,
                limit: DEFAULT_PAGE_LIMIT
            }
        );
        assert_eq!(
            ListParams::from_raw(Some("-55"), Some("5")),
            ListParams {
                offset: 0,
                limit: 5
            }
        );
        assert_eq!(
            ListParams::from_raw(Some("10"), Some("15")),
            ListParams {
                offset: 10,
                limit: 15
            }
        );
        assert_eq!(
            ListParams::from_raw(Some("b"), Some("j")),
            ListParams::default()
        );
        assert_eq!(ListParams::from_raw(None, None), ListParams::default());
        assert_eq!(
            ListParams::from_raw(Some("0"), Some("0")),
            ListParams {
                offset: 0,
                limit: DEFAULT_PAGE_LIMIT
            }
        );
    }

    #[test]
    fn from_raw_keeps_huge_offsets_past_the_end() {
        // An offset beyond i64::MAX is still a legal u64; it must land
        // past the end of any collection, not reset to the first page.
        let params = ListParams::from_raw(Some(&u64::MAX.to_string()), Some("10"));
        assert_eq!(params.offset, usize::MAX);
        assert_eq!(params.limit, 10);
    }

    #[tokio::test]
    async fn list_with_huge_offset_is_an_empty_page() {
        let store = store();
        store.create(todo(1, "task", false)).await.unwrap();

        let params = ListParams::from_raw(Some("9223372036854775808"), None);
        assert!(store.list(params).await.is_empty());
    }

    #[tokio::test]
    async fn list_clamps_window_to_collection() {
        let store = store();
        for id in 1..=5 {
            store.create(todo(id, "task", false)).await.unwrap();
        }

        let all = store.list(ListParams::default()).await;
        assert_eq!(all.len(), 5);

        let tail = store
            .list(ListParams {
                offset: 3,
                limit: 10,
            })
            .await;
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].id, TodoId(4));

        let past_end = store
            .list(ListParams {
                offset: 99,
                limit: 10,
            })
            .await;
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = store();
        for id in [30, 10, 20] {
            store.create(todo(id, "task", false)).await.unwrap();
        }

        let ids: Vec<_> = store
            .list(ListParams::default())
            .await
            .into_iter()
            .map(|t| t.id.0)
            .collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = store();
        let created = store.create(todo(7, "Exercise at gym", true)).await.unwrap();
        assert_eq!(created.id, TodoId(7));

        let fetched = store.get(TodoId(7)).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected_and_state_unchanged() {
        let store = store();
        store.create(todo(7, "first", false)).await.unwrap();

        let err = store.create(todo(7, "second", true)).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists(TodoId(7)));

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(TodoId(7)).await.unwrap().text, "first");
    }

    #[tokio::test]
    async fn update_replaces_fields_in_place() {
        let store = store();
        store.create(todo(1, "one", false)).await.unwrap();
        store.create(todo(2, "two", false)).await.unwrap();
        store.create(todo(3, "three", false)).await.unwrap();

        let updated = store
            .update(TodoId(2), "two, revised".to_string(), true)
            .await
            .unwrap();
        assert_eq!(updated, todo(2, "two, revised", true));

        // Read-after-write, position and id unchanged.
        let ids: Vec<_> = store
            .list(ListParams::default())
            .await
            .into_iter()
            .map(|t| t.id.0)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(store.get(TodoId(2)).await.unwrap().completed);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = store();
        let err = store
            .update(TodoId(404), "nope".to_string(), false)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound(TodoId(404)));
    }

    #[tokio::test]
    async fn delete_removes_entry_and_keeps_index_consistent() {
        let store = store();
        for id in 1..=4 {
            store.create(todo(id, "task", false)).await.unwrap();
        }

        store.delete(TodoId(2)).await.unwrap();

        assert_eq!(store.get(TodoId(2)).await, Err(StoreError::NotFound(TodoId(2))));
        assert_eq!(store.len().await, 3);

        // Entries shifted by the removal are still reachable by id.
        assert_eq!(store.get(TodoId(3)).await.unwrap().id, TodoId(3));
        assert_eq!(store.get(TodoId(4)).await.unwrap().id, TodoId(4));
        store.delete(TodoId(4)).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let store = store();
        assert_eq!(
            store.delete(TodoId(404)).await,
            Err(StoreError::NotFound(TodoId(404)))
        );
    }

    #[tokio::test]
    async fn mutations_emit_sequenced_events_in_commit_order() {
        let (store, mut events) = store_with_events();

        store.create(todo(1, "one", false)).await.unwrap();
        store
            .update(TodoId(1), "one, revised".to_string(), true)
            .await
            .unwrap();
        store.delete(TodoId(1)).await.unwrap();

        let first = events.recv().await.unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.kind, ChangeKind::Created);

        let second = events.recv().await.unwrap();
        assert_eq!(second.sequence, 2);
        assert_eq!(second.kind, ChangeKind::Updated);
        assert_eq!(second.todo.text, "one, revised");

        let third = events.recv().await.unwrap();
        assert_eq!(third.sequence, 3);
        assert_eq!(third.kind, ChangeKind::Deleted);
        // Deleted carries the last-known snapshot.
        assert_eq!(third.todo.text, "one, revised");
    }

    #[tokio::test]
    async fn failed_mutations_emit_nothing() {
        let (store, mut events) = store_with_events();
        store.create(todo(1, "one", false)).await.unwrap();
        events.recv().await.unwrap();

        let _ = store.create(todo(1, "dup", false)).await.unwrap_err();
        let _ = store.delete(TodoId(99)).await.unwrap_err();
        let _ = store
            .update(TodoId(99), "x".to_string(), false)
            .await
            .unwrap_err();

        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn concurrent_creates_with_distinct_ids_all_land() {
        let store = store();
        let tasks: Vec<_> = (0..64u64)
            .map(|id| {
                let store = store.clone();
                tokio::spawn(async move { store.create(todo(id, "task", false)).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 64);
    }

    #[tokio::test]
    async fn concurrent_creates_with_same_id_admit_exactly_one() {
        let store = store();
        let tasks: Vec<_> = (0..8)
            .map(|attempt| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.create(todo(7, &format!("attempt {attempt}"), false)).await
                })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(StoreError::AlreadyExists(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(store.len().await, 1);
    }
}
