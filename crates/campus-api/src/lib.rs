//! JSON REST API for Campus.
//!
//! Exposes an axum [`Router`] backed by any [`campus_core::CampusStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", campus_api::api_router(store.clone()))
//! ```
//!
//! # Routes
//!
//! Every entity gets the same five endpoints, named after its collection:
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/{parent_collection}/{id}/{collection}` | [`ListParams`](campus_core::ListParams) as query |
//! | `POST`   | `/{collection}` | Body: draft; 201 + stored entity |
//! | `GET`    | `/{collection}/{id}` | 404 if not found |
//! | `PATCH`  | `/{collection}/{id}` | Body: patch; returns merged entity |
//! | `DELETE` | `/{collection}/{id}` | 204 |

pub mod entities;
pub mod error;
pub mod extract;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use campus_core::{
  CampusStore, Entity, Repository, grade::Grade, payment::Payment,
  school::School, student::Student,
};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CampusStore + 'static,
{
  let router = Router::new();
  let router = entity_routes::<S, School>(router);
  let router = entity_routes::<S, Grade>(router);
  let router = entity_routes::<S, Student>(router);
  let router = entity_routes::<S, Payment>(router);
  router.with_state(store)
}

fn entity_routes<S, E>(router: Router<Arc<S>>) -> Router<Arc<S>>
where
  S: Repository<E> + 'static,
  E: Entity,
{
  let list = format!("/{}/{{id}}/{}", E::PARENT_COLLECTION, E::COLLECTION);
  let collection = format!("/{}", E::COLLECTION);
  let item = format!("/{}/{{id}}", E::COLLECTION);

  router
    .route(&list, get(entities::list::<S, E>))
    .route(&collection, post(entities::create::<S, E>))
    .route(
      &item,
      get(entities::get_one::<S, E>)
        .patch(entities::update::<S, E>)
        .delete(entities::delete::<S, E>),
    )
}

#[cfg(test)]
mod tests;
