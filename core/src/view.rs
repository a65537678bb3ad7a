//! View Query Controller: sort selection and debounced search.
//!
//! # Design
//! The committed `ViewQuery` lives in a `watch` channel so the fetch driver
//! sees every committed change. Sort changes commit immediately. Search text
//! has a draft that follows every keystroke and a committed value that only
//! moves once input has been quiet for the debounce window: each keystroke
//! aborts the pending commit task and spawns a fresh one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::query::{SortDirection, SortField, ViewQuery};

pub struct ViewQueryController {
    committed: Arc<watch::Sender<ViewQuery>>,
    draft: String,
    pending: Option<JoinHandle<()>>,
    debounce: Duration,
}

impl ViewQueryController {
    pub fn new(initial: ViewQuery, debounce: Duration) -> Self {
        let draft = initial.search_text.clone();
        let (committed, _) = watch::channel(initial);
        Self {
            committed: Arc::new(committed),
            draft,
            pending: None,
            debounce,
        }
    }

    /// Receiver notified on every committed change.
    pub fn subscribe(&self) -> watch::Receiver<ViewQuery> {
        self.committed.subscribe()
    }

    pub fn committed(&self) -> ViewQuery {
        self.committed.borrow().clone()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn set_sort_field(&mut self, field: SortField) {
        self.committed.send_if_modified(|q| {
            if q.sort_field == field {
                return false;
            }
            q.sort_field = field;
            true
        });
    }

    pub fn set_sort_direction(&mut self, direction: SortDirection) {
        self.committed.send_if_modified(|q| {
            if q.sort_direction == direction {
                return false;
            }
            q.sort_direction = direction;
            true
        });
    }

    /// Record a keystroke. Must be called from within a tokio runtime.
    pub fn set_search_draft(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.draft.clone_from(&text);

        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        let committed = Arc::clone(&self.committed);
        let deadline = Instant::now() + self.debounce;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            commit_search(&committed, text);
        }));
    }

    pub fn clear_search(&mut self) {
        self.set_search_draft(String::new());
    }

    /// True while a debounced commit is waiting to fire.
    pub fn has_pending_commit(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_finished())
    }
}

impl Drop for ViewQueryController {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

fn commit_search(committed: &watch::Sender<ViewQuery>, text: String) {
    let changed = committed.send_if_modified(|q| {
        if q.search_text == text {
            return false;
        }
        q.search_text = text;
        true
    });
    if changed {
        tracing::debug!(search = %committed.borrow().search_text, "search committed");
    }
}
