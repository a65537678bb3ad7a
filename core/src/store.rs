//! State Store: the in-memory to-do list and UI flags.
//!
//! # Design
//! `AppState` is an immutable value. Each operation is a pure function from
//! the current snapshot to the next one, and `StateStore` publishes the
//! result on a `watch` channel. Consumers only ever see cloned snapshots, so
//! nothing outside the store can alias the list it holds.

use tokio::sync::watch;

use crate::types::{TodoItem, TodoPatch};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub items: Vec<TodoItem>,
    pub is_loading: bool,
    pub is_saving: bool,
    pub error_message: Option<String>,
}

impl AppState {
    pub fn item(&self, id: &str) -> Option<&TodoItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn loaded(&self, items: Vec<TodoItem>) -> Self {
        Self {
            items,
            ..self.clone()
        }
    }

    pub fn appended(&self, item: TodoItem) -> Self {
        let mut items = self.items.clone();
        items.push(item);
        Self {
            items,
            ..self.clone()
        }
    }

    pub fn patched(&self, id: &str, patch: &TodoPatch) -> Self {
        let items = self
            .items
            .iter()
            .map(|item| if item.id == id { patch.apply(item) } else { item.clone() })
            .collect();
        Self {
            items,
            ..self.clone()
        }
    }

    /// Put `original` back verbatim in place of the entry with the same id.
    pub fn reverted(&self, id: &str, original: &TodoItem) -> Self {
        let items = self
            .items
            .iter()
            .map(|item| if item.id == id { original.clone() } else { item.clone() })
            .collect();
        Self {
            items,
            ..self.clone()
        }
    }

    pub fn with_loading(&self, is_loading: bool) -> Self {
        Self {
            is_loading,
            ..self.clone()
        }
    }

    pub fn with_saving(&self, is_saving: bool) -> Self {
        Self {
            is_saving,
            ..self.clone()
        }
    }

    pub fn with_error(&self, error_message: Option<String>) -> Self {
        Self {
            error_message,
            ..self.clone()
        }
    }
}

/// Publishes `AppState` snapshots. Never fails.
#[derive(Debug)]
pub struct StateStore {
    tx: watch::Sender<AppState>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

impl StateStore {
    pub fn new(initial: AppState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    fn update(&self, f: impl FnOnce(&AppState) -> AppState) {
        self.tx.send_modify(|state| {
            let next = f(state);
            *state = next;
        });
    }

    pub fn load(&self, items: Vec<TodoItem>) {
        self.update(|s| s.loaded(items));
    }

    pub fn append(&self, item: TodoItem) {
        self.update(|s| s.appended(item));
    }

    pub fn patch(&self, id: &str, patch: &TodoPatch) {
        self.update(|s| s.patched(id, patch));
    }

    pub fn revert(&self, id: &str, original: &TodoItem) {
        self.update(|s| s.reverted(id, original));
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.update(|s| s.with_loading(is_loading));
    }

    pub fn set_saving(&self, is_saving: bool) {
        self.update(|s| s.with_saving(is_saving));
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|s| s.with_error(Some(message)));
    }

    pub fn clear_error(&self) {
        self.update(|s| s.with_error(None));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, title: &str, is_completed: bool) -> TodoItem {
        TodoItem {
            id: id.to_string(),
            title: title.to_string(),
            is_completed,
            created_time: None,
        }
    }

    #[test]
    fn load_replaces_list() {
        let store = StateStore::default();
        store.append(item("a", "old", false));
        store.load(vec![item("b", "new", true)]);
        assert_eq!(store.snapshot().items, vec![item("b", "new", true)]);
    }

    #[test]
    fn snapshots_are_not_aliased() {
        let store = StateStore::default();
        store.append(item("a", "one", false));
        let before = store.snapshot();
        store.patch("a", &TodoPatch::completed(true));
        assert!(!before.items[0].is_completed);
        assert!(store.snapshot().items[0].is_completed);
    }

    #[test]
    fn revert_restores_exact_snapshot() {
        let store = StateStore::default();
        let original = item("a", "one", false);
        store.load(vec![original.clone(), item("b", "two", false)]);
        store.patch(
            "a",
            &TodoPatch {
                title: Some("changed".to_string()),
                is_completed: Some(true),
            },
        );
        store.revert("a", &original);
        let snap = store.snapshot();
        assert_eq!(snap.item("a"), Some(&original));
        assert_eq!(snap.items.len(), 2);
    }

    #[test]
    fn unknown_id_leaves_list_untouched() {
        let store = StateStore::default();
        store.load(vec![item("a", "one", false)]);
        store.patch("missing", &TodoPatch::completed(true));
        store.revert("missing", &item("missing", "x", true));
        assert_eq!(store.snapshot().items, vec![item("a", "one", false)]);
    }

    #[test]
    fn subscribers_see_updates() {
        let store = StateStore::default();
        let mut rx = store.subscribe();
        store.set_error("boom");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().error_message.as_deref(), Some("boom"));
        store.clear_error();
        assert_eq!(rx.borrow_and_update().error_message, None);
    }

    #[test]
    fn flags_do_not_touch_items() {
        let store = StateStore::default();
        store.append(item("a", "one", false));
        store.set_loading(true);
        store.set_saving(true);
        let snap = store.snapshot();
        assert!(snap.is_loading && snap.is_saving);
        assert_eq!(snap.items.len(), 1);
    }
}
