//! Remote Sync Adapter: executes built requests through a `Transport`.
//!
//! # Design
//! `TableClient` never performs I/O. `RemoteTable` pairs it with a
//! `Transport`, the single seam where requests leave the process. Each call
//! is one attempt; any failure comes back as a `SyncError` with no retry.

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::TableClient;
use crate::error::SyncError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query::ViewQuery;
use crate::types::{NewTodo, TodoFields, TodoItem};

/// Executes an `HttpRequest` and returns the raw response.
///
/// Implementations must return non-2xx responses as `Ok`; status handling
/// belongs to `TableClient`. `Err` is reserved for transport failures.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, SyncError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, SyncError> {
        (**self).execute(request).await
    }
}

/// Blocking ureq agent driven from tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, SyncError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || execute_blocking(&agent, request))
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?
    }
}

fn execute_blocking(agent: &ureq::Agent, request: HttpRequest) -> Result<HttpResponse, SyncError> {
    let HttpRequest {
        method,
        url,
        headers,
        body,
    } = request;

    let result = match method {
        HttpMethod::Get => {
            let mut builder = agent.get(&url);
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()
        }
        HttpMethod::Post | HttpMethod::Patch => {
            let mut builder = if method == HttpMethod::Post {
                agent.post(&url)
            } else {
                agent.patch(&url)
            };
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.send(body.unwrap_or_default().as_bytes())
        }
    };

    let mut response = result.map_err(|e| SyncError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| SyncError::Transport(e.to_string()))?;

    Ok(HttpResponse { status, headers, body })
}

/// The remote table: `fetch_all`, `create`, `update`.
#[derive(Debug)]
pub struct RemoteTable<T> {
    client: TableClient,
    transport: T,
}

impl<T: Transport> RemoteTable<T> {
    pub fn new(client: TableClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &TableClient {
        &self.client
    }

    pub async fn fetch_all(&self, query: &ViewQuery) -> Result<Vec<TodoItem>, SyncError> {
        let request = self.client.build_fetch_all(query);
        tracing::debug!(url = %request.url, "fetching todos");
        let response = self.transport.execute(request).await?;
        self.client.parse_fetch_all(response)
    }

    pub async fn create(&self, todo: &NewTodo) -> Result<TodoItem, SyncError> {
        let request = self.client.build_create(todo)?;
        tracing::debug!(title = %todo.title, "creating todo");
        let response = self.transport.execute(request).await?;
        self.client.parse_create(response)
    }

    pub async fn update(&self, id: &str, fields: &TodoFields) -> Result<TodoItem, SyncError> {
        let request = self.client.build_update(id, fields)?;
        tracing::debug!(id, "updating todo");
        let response = self.transport.execute(request).await?;
        self.client.parse_update(response)
    }
}
