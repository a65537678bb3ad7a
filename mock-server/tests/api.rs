use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_table_api::{app, Record, RecordList};
use tower::{Service, ServiceExt};

const TOKEN: &str = "test-token";
const TABLE: &str = "/v0/appBase/Todos";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

async fn send(app: &mut Router, request: Request<String>) -> axum::response::Response {
    ServiceExt::<Request<String>>::ready(app)
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap()
}

async fn create(app: &mut Router, title: &str) -> Record {
    let body = format!(r#"{{"records":[{{"fields":{{"title":"{title}"}}}}]}}"#);
    let resp = send(app, json_request("POST", TABLE, &body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let mut list: RecordList = body_json(resp).await;
    list.records.remove(0)
}

async fn titles(app: &mut Router, uri: &str) -> Vec<String> {
    let resp = send(app, get_request(uri)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: RecordList = body_json(resp).await;
    list.records.into_iter().map(|r| r.fields.title).collect()
}

// --- auth ---

#[tokio::test]
async fn missing_token_returns_401() {
    let resp = app(TOKEN)
        .oneshot(Request::builder().uri(TABLE).body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["error"]["type"], "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn wrong_token_returns_401() {
    let resp = app("other-token").oneshot(get_request(TABLE)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- list ---

#[tokio::test]
async fn list_empty_table() {
    let resp = app(TOKEN).oneshot(get_request(TABLE)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let list: RecordList = body_json(resp).await;
    assert!(list.records.is_empty());
}

#[tokio::test]
async fn unknown_sort_field_returns_422() {
    let resp = app(TOKEN)
        .oneshot(get_request(&format!("{TABLE}?sort[0][field]=color")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn bad_formula_returns_422() {
    let resp = app(TOKEN)
        .oneshot(get_request(&format!("{TABLE}?filterByFormula=TRUE%28%29")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- create ---

#[tokio::test]
async fn create_assigns_id_and_time() {
    let resp = app(TOKEN)
        .oneshot(json_request(
            "POST",
            TABLE,
            r#"{"records":[{"fields":{"title":"Buy milk","isCompleted":false}}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    let record = &body["records"][0];
    assert!(record["id"].as_str().unwrap().starts_with("rec"));
    assert!(record["createdTime"].is_string());
    assert_eq!(record["fields"]["title"], "Buy milk");
    assert!(record["fields"].get("isCompleted").is_none());
}

#[tokio::test]
async fn create_without_records_returns_422() {
    let resp = app(TOKEN)
        .oneshot(json_request("POST", TABLE, r#"{"records":[]}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn create_malformed_json_returns_422() {
    let resp = app(TOKEN)
        .oneshot(json_request("POST", TABLE, r#"{"not_records":1}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- update ---

#[tokio::test]
async fn update_unknown_record_returns_404() {
    let resp = app(TOKEN)
        .oneshot(json_request(
            "PATCH",
            TABLE,
            r#"{"records":[{"id":"recMissing","fields":{"title":"Nope"}}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_bytes(resp).await;
    assert_eq!(&body[..], br#"{"error":"NOT_FOUND"}"#);
}

// --- full lifecycle ---

#[tokio::test]
async fn sort_search_and_update_lifecycle() {
    let mut app = app(TOKEN);

    let milk = create(&mut app, "Buy milk").await;
    create(&mut app, "Walk dog").await;
    create(&mut app, "Answer mail").await;

    // createdTime follows creation order
    assert_eq!(
        titles(&mut app, &format!("{TABLE}?sort[0][field]=createdTime&sort[0][direction]=asc")).await,
        ["Buy milk", "Walk dog", "Answer mail"]
    );
    assert_eq!(
        titles(&mut app, &format!("{TABLE}?sort[0][field]=createdTime&sort[0][direction]=desc")).await,
        ["Answer mail", "Walk dog", "Buy milk"]
    );
    assert_eq!(
        titles(&mut app, &format!("{TABLE}?sort[0][field]=title&sort[0][direction]=asc")).await,
        ["Answer mail", "Buy milk", "Walk dog"]
    );

    // SEARCH("a",{title}) percent-encoded
    assert_eq!(
        titles(
            &mut app,
            &format!("{TABLE}?sort[0][field]=title&sort[0][direction]=asc&filterByFormula=SEARCH%28%22mil%22%2C%7Btitle%7D%29")
        )
        .await,
        ["Buy milk"]
    );

    // partial update: only isCompleted
    let body = format!(r#"{{"records":[{{"id":"{}","fields":{{"isCompleted":true}}}}]}}"#, milk.id);
    let resp = send(&mut app, json_request("PATCH", TABLE, &body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: RecordList = body_json(resp).await;
    assert_eq!(list.records[0].fields.title, "Buy milk");
    assert!(list.records[0].fields.is_completed);

    // partial update: only title
    let body = format!(r#"{{"records":[{{"id":"{}","fields":{{"title":"Buy oat milk"}}}}]}}"#, milk.id);
    let resp = send(&mut app, json_request("PATCH", TABLE, &body)).await;
    let list: RecordList = body_json(resp).await;
    assert_eq!(list.records[0].fields.title, "Buy oat milk");
    assert!(list.records[0].fields.is_completed);

    // other tables are separate
    assert!(titles(&mut app, "/v0/appBase/Other").await.is_empty());
}
