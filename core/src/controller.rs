//! Optimistic Update Controller.
//!
//! # Overview
//! Every user action (fetch, add, complete, edit) goes through here. Errors
//! are caught at the action boundary and stored as the global error message;
//! nothing is returned to the caller.
//!
//! - **add**: no optimistic phase. The saved record is appended on success.
//! - **complete**: the item is flipped locally before the request is sent.
//!   Success reconciles `is_completed` from the server, failure restores the
//!   captured snapshot verbatim.
//! - **edit**: the store is only touched once the server confirms. Failure
//!   restores the captured snapshot.
//!
//! # Ordering
//! Responses can settle in any order. Each complete/edit takes a sequence
//! number for its item id, and each fetch takes one for the list as a whole.
//! A settled response is only written to the store if its number is still
//! the latest issued; older ones are logged and dropped. Error messages are
//! reported either way.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

use crate::remote::{RemoteTable, Transport};
use crate::query::ViewQuery;
use crate::store::{AppState, StateStore};
use crate::types::{NewTodo, TodoFields, TodoItem, TodoPatch};

pub struct TodoController<T> {
    remote: RemoteTable<T>,
    store: StateStore,
    sequencer: Sequencer,
    writes: WriteCounter,
}

impl<T: Transport> TodoController<T> {
    pub fn new(remote: RemoteTable<T>) -> Self {
        Self::with_store(remote, StateStore::default())
    }

    pub fn with_store(remote: RemoteTable<T>, store: StateStore) -> Self {
        Self {
            remote,
            store,
            sequencer: Sequencer::default(),
            writes: WriteCounter::default(),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn snapshot(&self) -> AppState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.store.subscribe()
    }

    pub fn dismiss_error(&self) {
        self.store.clear_error();
    }

    /// Replace the list with the server's view for `query`.
    pub async fn fetch_all(&self, query: &ViewQuery) {
        let seq = self.sequencer.issue_fetch();
        let _loading = LoadingGuard::begin(&self.store, &self.sequencer, seq);

        match self.remote.fetch_all(query).await {
            Ok(items) if self.sequencer.is_latest_fetch(seq) => {
                tracing::debug!(count = items.len(), "loaded todos");
                self.store.load(items);
                self.store.clear_error();
            }
            Ok(_) => tracing::debug!(seq, "dropping superseded fetch"),
            Err(err) => {
                tracing::warn!(error = %err, "fetch failed");
                self.store.set_error(format!("Failed to fetch todos: {err}"));
            }
        }
    }

    pub async fn add(&self, title: impl Into<String>) {
        let todo = NewTodo {
            title: title.into(),
            is_completed: false,
        };

        let _saving = SavingGuard::begin(&self.store, &self.writes);
        match self.remote.create(&todo).await {
            Ok(saved) => {
                tracing::debug!(id = %saved.id, "todo added");
                self.store.append(saved);
                self.store.clear_error();
            }
            Err(err) => {
                tracing::warn!(error = %err, "add failed");
                self.store.set_error(format!("Failed to add todo: {err}"));
            }
        }
    }

    pub async fn complete(&self, id: &str) {
        let Some(original) = self.store.snapshot().item(id).cloned() else {
            self.store
                .set_error(format!("Failed to complete todo: no todo with id {id}"));
            return;
        };
        let seq = self.sequencer.issue(id);

        self.store.patch(id, &TodoPatch::completed(true));

        let fields = TodoFields {
            title: original.title.clone(),
            is_completed: true,
        };
        let _saving = SavingGuard::begin(&self.store, &self.writes);
        let result = self.remote.update(id, &fields).await;
        let latest = self.sequencer.settle(id, seq);
        match result {
            Ok(saved) if latest => {
                self.store
                    .patch(&saved.id, &TodoPatch::completed(saved.is_completed));
                self.store.clear_error();
            }
            Ok(_) => tracing::debug!(id, seq, "dropping superseded complete"),
            Err(err) => {
                tracing::warn!(id, error = %err, "complete failed");
                self.store.set_error(format!("Failed to complete todo: {err}"));
                if latest {
                    self.store.revert(id, &original);
                } else {
                    tracing::debug!(id, seq, "skipping revert of superseded complete");
                }
            }
        }
    }

    /// Save `edited` and show it once the server confirms.
    pub async fn edit(&self, edited: &TodoItem) {
        let id = edited.id.as_str();
        let Some(original) = self.store.snapshot().item(id).cloned() else {
            self.store
                .set_error(format!("Failed to update todo: no todo with id {id}"));
            return;
        };
        let seq = self.sequencer.issue(id);

        let fields = TodoFields::from(edited);
        let _saving = SavingGuard::begin(&self.store, &self.writes);
        let result = self.remote.update(id, &fields).await;
        let latest = self.sequencer.settle(id, seq);
        match result {
            Ok(saved) if latest => {
                let patch = TodoPatch {
                    title: Some(saved.title),
                    is_completed: Some(saved.is_completed),
                };
                self.store.patch(&saved.id, &patch);
                self.store.clear_error();
            }
            Ok(_) => tracing::debug!(id, seq, "dropping superseded edit"),
            Err(err) => {
                tracing::warn!(id, error = %err, "edit failed");
                self.store
                    .set_error(format!("Failed to update todo: {err}. Reverting todo..."));
                if latest {
                    self.store.revert(id, &original);
                } else {
                    tracing::debug!(id, seq, "skipping revert of superseded edit");
                }
            }
        }
    }

    /// Fetch once for the current query, then once per committed change.
    ///
    /// Returns when the sending side of `queries` is dropped.
    pub async fn drive_queries(&self, mut queries: watch::Receiver<ViewQuery>) {
        let query = queries.borrow_and_update().clone();
        self.fetch_all(&query).await;

        while queries.changed().await.is_ok() {
            let query = queries.borrow_and_update().clone();
            self.fetch_all(&query).await;
        }
    }
}

/// Issues sequence numbers and remembers the latest per item id and for fetches.
///
/// An id stays in `latest_by_id` only while its latest request is unsettled.
#[derive(Debug, Default)]
struct Sequencer {
    next: AtomicU64,
    latest_fetch: AtomicU64,
    latest_by_id: Mutex<HashMap<String, u64>>,
}

impl Sequencer {
    fn bump(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn issue(&self, id: &str) -> u64 {
        let seq = self.bump();
        self.latest_by_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), seq);
        seq
    }

    /// Report whether `seq` is still the latest for `id`, forgetting the id if so.
    fn settle(&self, id: &str, seq: u64) -> bool {
        let mut latest = self.latest_by_id.lock().unwrap_or_else(PoisonError::into_inner);
        if latest.get(id) != Some(&seq) {
            return false;
        }
        latest.remove(id);
        true
    }

    fn issue_fetch(&self) -> u64 {
        let seq = self.bump();
        self.latest_fetch.store(seq, Ordering::Relaxed);
        seq
    }

    fn is_latest_fetch(&self, seq: u64) -> bool {
        self.latest_fetch.load(Ordering::Relaxed) == seq
    }
}

/// Number of create/update calls in flight. `is_saving` mirrors `count > 0`.
#[derive(Debug, Default)]
struct WriteCounter {
    count: Mutex<usize>,
}

impl WriteCounter {
    fn adjust(&self, store: &StateStore, f: impl FnOnce(usize) -> usize) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = f(*count);
        store.set_saving(*count > 0);
    }
}

/// Counts one write in flight until dropped, whatever the outcome.
struct SavingGuard<'a> {
    store: &'a StateStore,
    writes: &'a WriteCounter,
}

impl<'a> SavingGuard<'a> {
    fn begin(store: &'a StateStore, writes: &'a WriteCounter) -> Self {
        writes.adjust(store, |n| n + 1);
        Self { store, writes }
    }
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.writes.adjust(self.store, |n| n.saturating_sub(1));
    }
}

/// Holds `is_loading` true until the latest fetch settles.
struct LoadingGuard<'a> {
    store: &'a StateStore,
    sequencer: &'a Sequencer,
    seq: u64,
}

impl<'a> LoadingGuard<'a> {
    fn begin(store: &'a StateStore, sequencer: &'a Sequencer, seq: u64) -> Self {
        store.set_loading(true);
        Self {
            store,
            sequencer,
            seq,
        }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.sequencer.is_latest_fetch(self.seq) {
            self.store.set_loading(false);
        }
    }
}
