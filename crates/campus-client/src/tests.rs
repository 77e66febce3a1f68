//! End-to-end tests against a real `campus-api` server on an ephemeral port.

use std::sync::Arc;

use campus_core::{
  Error, ListParams, Repository,
  grade::{Grade, NewGrade},
  id::{SchoolId, UserId},
  school::{NewSchool, School, SchoolPatch},
};
use campus_query::{CacheConfig, Session};
use campus_store_sqlite::SqliteStore;
use tokio::net::TcpListener;

use crate::{ClientConfig, HttpStore};

async fn serve() -> HttpStore {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let app = axum::Router::new().nest("/api", campus_api::api_router(Arc::new(store)));
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

  HttpStore::new(&ClientConfig {
    base_url: format!("http://{addr}"),
    ..ClientConfig::default()
  })
  .unwrap()
}

fn lincoln() -> NewSchool { NewSchool::new(UserId::new("u1"), "Lincoln", "Main St") }

#[tokio::test]
async fn crud_round_trip_over_http() {
  let store = serve().await;

  let school = Repository::<School>::create(&store, lincoln()).await.unwrap();
  let fetched =
    Repository::<School>::fetch_by_id(&store, school.school_id.clone()).await.unwrap();
  assert_eq!(fetched.school_id, school.school_id);
  assert_eq!(fetched.name, "Lincoln");

  let patch = SchoolPatch { name: Some("Lincoln High".into()), ..Default::default() };
  let updated = Repository::<School>::update(&store, school.school_id.clone(), patch)
    .await
    .unwrap();
  assert_eq!(updated.name, "Lincoln High");

  Repository::<School>::delete(&store, school.school_id.clone()).await.unwrap();
  let err = Repository::<School>::delete(&store, school.school_id.clone())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn missing_entity_is_not_found() {
  let store = serve().await;
  let err = Repository::<School>::fetch_by_id(&store, SchoolId::new("nope"))
    .await
    .unwrap_err();
  assert_eq!(err, Error::not_found(campus_core::EntityKind::School, "nope"));
}

#[tokio::test]
async fn validation_errors_keep_their_category() {
  let store = serve().await;
  let err = Repository::<Grade>::create(
    &store,
    NewGrade::new(SchoolId::new("missing"), "1A", "1", "2024"),
  )
  .await
  .unwrap_err();

  let Error::Validation(message) = err else { panic!("expected validation, got {err:?}") };
  assert!(!message.starts_with("invalid input"));
}

#[tokio::test]
async fn list_params_travel_in_the_query_string() {
  let store = serve().await;
  Repository::<School>::create(&store, lincoln()).await.unwrap();
  Repository::<School>::create(
    &store,
    NewSchool::new(UserId::new("u1"), "Roosevelt", "Oak Ave"),
  )
  .await
  .unwrap();

  let found = Repository::<School>::fetch_by_parent(
    &store,
    UserId::new("u1"),
    ListParams::default().with_search("roose"),
  )
  .await
  .unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].name, "Roosevelt");

  let none =
    Repository::<School>::fetch_by_parent(&store, UserId::new("u1"), ListParams::limit(0))
      .await
      .unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn session_runs_against_a_remote_store() {
  let store = serve().await;
  let session = Session::new(UserId::new("u1"), Arc::new(store), &CacheConfig::default());

  assert!(session.schools(ListParams::default()).settled().await.data.unwrap().is_empty());
  session.create_school(lincoln()).await.unwrap();

  let schools = session.schools(ListParams::default()).settled().await.data.unwrap();
  assert_eq!(schools.len(), 1);
  assert_eq!(schools[0].name, "Lincoln");
}
