//! Domain types and wire DTOs for the table API.
//!
//! # Design
//! The wire format wraps everything in a `{"records": [...]}` envelope where
//! each record is `{id, createdTime, fields}`. These DTOs are defined
//! independently from the mock-server crate; integration tests catch schema
//! drift.
//!
//! A stored `TodoItem` always has a server-assigned id. Items that have not
//! been saved yet are represented by `NewTodo`, which has no id at all.

use serde::{Deserialize, Serialize};

/// A to-do item as held in the state store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub title: String,
    pub is_completed: bool,
    /// Server creation timestamp, used for the default sort order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

/// An item that has not been saved yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
}

/// The full set of writable fields sent with every create or update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoFields {
    pub title: String,
    pub is_completed: bool,
}

impl From<&NewTodo> for TodoFields {
    fn from(todo: &NewTodo) -> Self {
        Self {
            title: todo.title.clone(),
            is_completed: todo.is_completed,
        }
    }
}

impl From<&TodoItem> for TodoFields {
    fn from(todo: &TodoItem) -> Self {
        Self {
            title: todo.title.clone(),
            is_completed: todo.is_completed,
        }
    }
}

/// A partial change applied to a stored item. Omitted fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

impl TodoPatch {
    pub fn completed(is_completed: bool) -> Self {
        Self {
            title: None,
            is_completed: Some(is_completed),
        }
    }

    pub(crate) fn apply(&self, item: &TodoItem) -> TodoItem {
        TodoItem {
            id: item.id.clone(),
            title: self.title.clone().unwrap_or_else(|| item.title.clone()),
            is_completed: self.is_completed.unwrap_or(item.is_completed),
            created_time: item.created_time.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Response envelope returned by every endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct RecordList {
    #[serde(default)]
    pub records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Record {
    pub id: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub fields: RecordFields,
}

/// Fields as the server returns them. Checkbox fields are omitted when false.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecordFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_completed: Option<bool>,
}

impl From<Record> for TodoItem {
    fn from(record: Record) -> Self {
        TodoItem {
            id: record.id,
            title: record.fields.title,
            is_completed: record.fields.is_completed.unwrap_or(false),
            created_time: record.created_time,
        }
    }
}

/// Request envelope for create and update.
#[derive(Debug, Serialize)]
pub(crate) struct WriteRecords<'a> {
    pub records: Vec<WriteRecord<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WriteRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub fields: &'a TodoFields,
}

/// Error body shapes: `{"error": {"type", "message"}}` or `{"error": "TYPE"}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorDetail {
    Object {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Code(String),
}

impl ErrorDetail {
    pub fn into_message(self) -> Option<String> {
        match self {
            ErrorDetail::Object { message: Some(m), .. } => Some(m),
            ErrorDetail::Object { kind, message: None } => kind,
            ErrorDetail::Code(code) => Some(code),
        }
    }
}
