//! In-memory stand-in for the remote table API.
//!
//! Serves `/v0/{base}/{table}` with the records envelope, bearer auth,
//! `sort[0][field]` / `sort[0][direction]` ordering and a `SEARCH` filter
//! formula. Like the real service, checkbox fields that are false are left
//! out of responses.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub created_time: String,
    pub fields: Fields,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fields {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_completed: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordList {
    pub records: Vec<Record>,
}

#[derive(Deserialize)]
pub struct CreateRecords {
    pub records: Vec<CreateRecord>,
}

#[derive(Deserialize)]
pub struct CreateRecord {
    #[serde(default)]
    pub fields: Fields,
}

#[derive(Deserialize)]
pub struct UpdateRecords {
    pub records: Vec<UpdateRecord>,
}

#[derive(Deserialize)]
pub struct UpdateRecord {
    pub id: String,
    #[serde(default)]
    pub fields: PatchFields,
}

/// Only the fields present in the JSON are applied.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchFields {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

/// Records per `base/table`, in creation order.
pub type Db = Arc<RwLock<HashMap<String, Vec<Record>>>>;

#[derive(Clone)]
struct AppState {
    token: Arc<str>,
    db: Db,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, kind: &str, message: &str) -> ApiError {
    (status, Json(json!({"error": {"type": kind, "message": message}})))
}

pub fn app(token: &str) -> Router {
    let state = AppState {
        token: Arc::from(token),
        db: Arc::new(RwLock::new(HashMap::new())),
    };
    Router::new()
        .route(
            "/v0/{base}/{table}",
            get(list_records).post(create_records).patch(update_records),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(token)).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = format!("Bearer {}", state.token);
    let given = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if given == Some(expected.as_str()) {
        return Ok(());
    }
    Err(api_error(
        StatusCode::UNAUTHORIZED,
        "AUTHENTICATION_REQUIRED",
        "Authentication required",
    ))
}

/// Extract the search text from `SEARCH("<text>",{title})`.
pub fn parse_search_formula(formula: &str) -> Option<String> {
    let inner = formula.strip_prefix("SEARCH(\"")?.strip_suffix("\",{title})")?;
    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            text.push(chars.next()?);
        } else {
            text.push(c);
        }
    }
    Some(text)
}

async fn list_records(
    State(state): State<AppState>,
    Path((base, table)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<RecordList>, ApiError> {
    authorize(&state, &headers)?;

    let search = match params.get("filterByFormula") {
        Some(formula) => Some(parse_search_formula(formula).ok_or_else(|| {
            api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_FILTER_BY_FORMULA",
                "The formula for filtering records is invalid",
            )
        })?),
        None => None,
    };

    let db = state.db.read().await;
    let mut records: Vec<Record> = db
        .get(&format!("{base}/{table}"))
        .map(|records| {
            records
                .iter()
                .filter(|r| search.as_deref().map_or(true, |s| r.fields.title.contains(s)))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    match params.get("sort[0][field]").map(String::as_str) {
        None | Some("createdTime") => {}
        Some("title") => records.sort_by(|a, b| a.fields.title.cmp(&b.fields.title)),
        Some(other) => {
            return Err(api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNKNOWN_FIELD_NAME",
                &format!("Unknown field name: \"{other}\""),
            ))
        }
    }
    if params.get("sort[0][direction]").map(String::as_str) == Some("desc") {
        records.reverse();
    }

    tracing::debug!(%base, %table, count = records.len(), "listed records");
    Ok(Json(RecordList { records }))
}

async fn create_records(
    State(state): State<AppState>,
    Path((base, table)): Path<(String, String)>,
    headers: HeaderMap,
    Json(input): Json<CreateRecords>,
) -> Result<Json<RecordList>, ApiError> {
    authorize(&state, &headers)?;
    if input.records.is_empty() {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_RECORDS",
            "At least one record is required",
        ));
    }

    let created_time = OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR", &e.to_string())
    })?;

    let created: Vec<Record> = input
        .records
        .into_iter()
        .map(|r| Record {
            id: new_record_id(),
            created_time: created_time.clone(),
            fields: r.fields,
        })
        .collect();

    state
        .db
        .write()
        .await
        .entry(format!("{base}/{table}"))
        .or_default()
        .extend(created.iter().cloned());

    tracing::info!(%base, %table, count = created.len(), "created records");
    Ok(Json(RecordList { records: created }))
}

async fn update_records(
    State(state): State<AppState>,
    Path((base, table)): Path<(String, String)>,
    headers: HeaderMap,
    Json(input): Json<UpdateRecords>,
) -> Result<Json<RecordList>, ApiError> {
    authorize(&state, &headers)?;

    let mut db = state.db.write().await;
    let records = db.entry(format!("{base}/{table}")).or_default();

    // Validate every id before touching anything.
    if input
        .records
        .iter()
        .any(|u| !records.iter().any(|r| r.id == u.id))
    {
        return Err((StatusCode::NOT_FOUND, Json(json!({"error": "NOT_FOUND"}))));
    }

    let mut updated = Vec::with_capacity(input.records.len());
    for update in input.records {
        if let Some(record) = records.iter_mut().find(|r| r.id == update.id) {
            if let Some(title) = update.fields.title {
                record.fields.title = title;
            }
            if let Some(is_completed) = update.fields.is_completed {
                record.fields.is_completed = is_completed;
            }
            updated.push(record.clone());
        }
    }

    tracing::info!(%base, %table, count = updated.len(), "updated records");
    Ok(Json(RecordList { records: updated }))
}

/// `rec` followed by 14 alphanumerics, the shape real record ids have.
fn new_record_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("rec{}", &hex[..14])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn false_checkbox_is_omitted() {
        let record = Record {
            id: "rec1".to_string(),
            created_time: "2024-01-01T00:00:00Z".to_string(),
            fields: Fields {
                title: "Test".to_string(),
                is_completed: false,
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fields"]["title"], "Test");
        assert!(json["fields"].get("isCompleted").is_none());
        assert_eq!(json["createdTime"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn true_checkbox_is_present() {
        let fields = Fields {
            title: "Done".to_string(),
            is_completed: true,
        };
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["isCompleted"], true);
    }

    #[test]
    fn create_fields_default_to_empty() {
        let input: CreateRecords = serde_json::from_str(r#"{"records":[{"fields":{}}]}"#).unwrap();
        assert_eq!(input.records[0].fields.title, "");
        assert!(!input.records[0].fields.is_completed);
    }

    #[test]
    fn update_requires_id() {
        let result: Result<UpdateRecords, _> =
            serde_json::from_str(r#"{"records":[{"fields":{"title":"x"}}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn patch_fields_are_optional() {
        let input: UpdateRecords =
            serde_json::from_str(r#"{"records":[{"id":"rec1","fields":{"title":"New"}}]}"#).unwrap();
        assert_eq!(input.records[0].fields.title.as_deref(), Some("New"));
        assert!(input.records[0].fields.is_completed.is_none());
    }

    #[test]
    fn search_formula_round_trips_escapes() {
        assert_eq!(parse_search_formula(r#"SEARCH("milk",{title})"#).as_deref(), Some("milk"));
        assert_eq!(
            parse_search_formula(r#"SEARCH("say \"hi\"",{title})"#).as_deref(),
            Some(r#"say "hi""#)
        );
        assert!(parse_search_formula("TRUE()").is_none());
    }

    #[test]
    fn record_ids_look_like_records() {
        let id = new_record_id();
        assert!(id.starts_with("rec"));
        assert_eq!(id.len(), 17);
    }
}
