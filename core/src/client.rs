//! Stateless HTTP request builder and response parser for the table API.
//!
//! # Design
//! `TableClient` holds the resource URL and bearer token and nothing else.
//! Each remote operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`, so
//! request shape and response handling are testable without a network.

use crate::config::Config;
use crate::error::SyncError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query::ViewQuery;
use crate::types::{ErrorEnvelope, NewTodo, RecordList, TodoFields, TodoItem, WriteRecord, WriteRecords};

#[derive(Debug, Clone)]
pub struct TableClient {
    resource_url: String,
    token: String,
}

impl TableClient {
    /// `resource_url` is the full table URL, e.g. `https://host/v0/<base>/<table>`.
    pub fn new(resource_url: &str, token: &str) -> Self {
        Self {
            resource_url: resource_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.resource_url(), &config.token)
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    fn auth_header(&self) -> (String, String) {
        ("authorization".to_string(), format!("Bearer {}", self.token))
    }

    fn write_request(&self, method: HttpMethod, body: &WriteRecords<'_>) -> Result<HttpRequest, SyncError> {
        let body = serde_json::to_string(body).map_err(|e| SyncError::Encode(e.to_string()))?;
        Ok(HttpRequest {
            method,
            url: self.resource_url.clone(),
            headers: vec![
                self.auth_header(),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        })
    }

    pub fn build_fetch_all(&self, query: &ViewQuery) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}?{}", self.resource_url, query.to_query_string()),
            headers: vec![self.auth_header()],
            body: None,
        }
    }

    pub fn build_create(&self, todo: &NewTodo) -> Result<HttpRequest, SyncError> {
        let fields = TodoFields::from(todo);
        self.write_request(
            HttpMethod::Post,
            &WriteRecords {
                records: vec![WriteRecord { id: None, fields: &fields }],
            },
        )
    }

    pub fn build_update(&self, id: &str, fields: &TodoFields) -> Result<HttpRequest, SyncError> {
        self.write_request(
            HttpMethod::Patch,
            &WriteRecords {
                records: vec![WriteRecord { id: Some(id), fields }],
            },
        )
    }

    pub fn parse_fetch_all(&self, response: HttpResponse) -> Result<Vec<TodoItem>, SyncError> {
        let list = parse_records(response)?;
        Ok(list.records.into_iter().map(TodoItem::from).collect())
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<TodoItem, SyncError> {
        parse_single(response)
    }

    pub fn parse_update(&self, response: HttpResponse) -> Result<TodoItem, SyncError> {
        parse_single(response)
    }
}

fn parse_records(response: HttpResponse) -> Result<RecordList, SyncError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| SyncError::Decode(e.to_string()))
}

/// Writes send one record and expect the saved record back first.
fn parse_single(response: HttpResponse) -> Result<TodoItem, SyncError> {
    parse_records(response)?
        .records
        .into_iter()
        .next()
        .map(TodoItem::from)
        .ok_or_else(|| SyncError::Decode("response contained no records".to_string()))
}

/// Map a non-2xx response to `SyncError::Status` with the most useful message available.
fn check_status(response: &HttpResponse) -> Result<(), SyncError> {
    if response.is_success() {
        return Ok(());
    }
    let message = serde_json::from_str::<ErrorEnvelope>(&response.body)
        .ok()
        .and_then(|env| env.error.into_message())
        .unwrap_or_else(|| {
            let body = response.body.trim();
            if body.is_empty() {
                format!("request failed with status {}", response.status)
            } else {
                body.to_string()
            }
        });
    Err(SyncError::Status {
        status: response.status,
        message,
    })
}
