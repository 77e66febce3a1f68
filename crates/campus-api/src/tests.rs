//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use campus_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn router() -> axum::Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Arc::new(store))
}

async fn send(
  router: &axum::Router,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> Response {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string())),
    None => builder.body(Body::empty()),
  }
  .unwrap();
  router.clone().oneshot(req).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn create_school(router: &axum::Router, name: &str) -> Value {
  let resp = send(
    router,
    "POST",
    "/schools",
    Some(json!({ "user_id": "u1", "name": name, "address": "Main St" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  json_body(resp).await
}

// ── Schools ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn school_lifecycle() {
  let router = router().await;
  let school = create_school(&router, "Lincoln").await;
  let id = school["school_id"].as_str().unwrap().to_owned();
  assert_eq!(school["status"], "active");

  let resp = send(&router, "GET", "/users/u1/schools", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let list = json_body(resp).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
  assert_eq!(list[0]["name"], "Lincoln");

  let resp = send(
    &router,
    "PATCH",
    &format!("/schools/{id}"),
    Some(json!({ "name": "Lincoln High" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["name"], "Lincoln High");

  let resp = send(&router, "DELETE", &format!("/schools/{id}"), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = send(&router, "GET", &format!("/schools/{id}"), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(json_body(resp).await["code"], "not_found");
}

#[tokio::test]
async fn second_delete_is_not_found() {
  let router = router().await;
  let school = create_school(&router, "Lincoln").await;
  let uri = format!("/schools/{}", school["school_id"].as_str().unwrap());

  assert_eq!(send(&router, "DELETE", &uri, None).await.status(), StatusCode::NO_CONTENT);
  assert_eq!(send(&router, "DELETE", &uri, None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_school_is_unprocessable() {
  let router = router().await;
  let resp = send(
    &router,
    "POST",
    "/schools",
    Some(json!({ "user_id": "u1", "name": "  ", "address": "Main St" })),
  )
  .await;

  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body = json_body(resp).await;
  assert_eq!(body["code"], "validation");
  assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
  let router = router().await;
  let req = Request::builder()
    .method("POST")
    .uri("/schools")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{not json"))
    .unwrap();
  let resp = router.oneshot(req).await.unwrap();

  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_body(resp).await["code"], "validation");
}

// ── Lists ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_params_come_from_the_query_string() {
  let router = router().await;
  create_school(&router, "Lincoln").await;
  create_school(&router, "Roosevelt").await;

  let list = json_body(send(&router, "GET", "/users/u1/schools?limit=0", None).await).await;
  assert_eq!(list, json!([]));

  let list =
    json_body(send(&router, "GET", "/users/u1/schools?search=roose", None).await).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
  assert_eq!(list[0]["name"], "Roosevelt");

  let list = json_body(send(&router, "GET", "/users/nobody/schools", None).await).await;
  assert_eq!(list, json!([]));
}

#[tokio::test]
async fn bad_query_is_a_bad_request() {
  let router = router().await;
  let resp = send(&router, "GET", "/users/u1/schools?limit=many", None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ── Children ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn grade_under_missing_school_is_rejected() {
  let router = router().await;
  let resp = send(
    &router,
    "POST",
    "/grades",
    Some(json!({
      "school_id": "missing",
      "name": "1A",
      "level": "1",
      "academic_year": "2024",
    })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn grades_are_listed_under_their_school() {
  let router = router().await;
  let school = create_school(&router, "Lincoln").await;
  let school_id = school["school_id"].as_str().unwrap();

  let resp = send(
    &router,
    "POST",
    "/grades",
    Some(json!({
      "school_id": school_id,
      "name": "1A",
      "level": "1",
      "academic_year": "2024",
    })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let list =
    json_body(send(&router, "GET", &format!("/schools/{school_id}/grades"), None).await)
      .await;
  assert_eq!(list.as_array().unwrap().len(), 1);
  assert_eq!(list[0]["name"], "1A");
  assert_eq!(list[0]["stats"]["student_count"], 0);
}
