//! Client core for a to-do list kept in a remote table API.
//!
//! # Overview
//! - `TableClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern).
//! - `RemoteTable` pairs the client with a `Transport` that performs the
//!   round-trip; `UreqTransport` is the stock implementation.
//! - `StateStore` holds immutable `AppState` snapshots.
//! - `TodoController` applies user actions optimistically and reconciles or
//!   reverts them once the server answers.
//! - `ViewQueryController` owns sort selection and debounced search, and
//!   `TodoController::drive_queries` refetches whenever the committed view
//!   changes.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod query;
pub mod remote;
pub mod store;
pub mod types;
pub mod view;

pub use async_trait::async_trait;
pub use client::TableClient;
pub use config::{Config, ConfigError};
pub use controller::TodoController;
pub use error::SyncError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::{SortDirection, SortField, ViewQuery};
pub use remote::{RemoteTable, Transport, UreqTransport};
pub use store::{AppState, StateStore};
pub use types::{NewTodo, TodoFields, TodoItem, TodoPatch};
pub use view::ViewQueryController;
