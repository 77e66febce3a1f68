//! Generic CRUD handlers, instantiated once per entity type by
//! [`crate::api_router`].

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use campus_core::{Entity, ListParams, Repository};

use crate::{
  error::ApiError,
  extract::{ApiJson, ApiQuery},
};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /{parent_collection}/{id}/{collection}[?limit=&offset=&order=&search=]`
pub async fn list<S, E>(
  State(store): State<Arc<S>>,
  Path(parent): Path<String>,
  ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<E>>, ApiError>
where
  S: Repository<E>,
  E: Entity,
{
  let items =
    Repository::<E>::fetch_by_parent(&*store, parent.into(), params).await?;
  Ok(Json(items))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /{collection}`: body is the entity's draft.
pub async fn create<S, E>(
  State(store): State<Arc<S>>,
  ApiJson(draft): ApiJson<E::Draft>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Repository<E>,
  E: Entity,
{
  let entity = Repository::<E>::create(&*store, draft).await?;
  tracing::debug!(kind = %E::KIND, id = %entity.id(), "created");
  Ok((StatusCode::CREATED, Json(entity)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /{collection}/{id}`
pub async fn get_one<S, E>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<E>, ApiError>
where
  S: Repository<E>,
  E: Entity,
{
  Ok(Json(Repository::<E>::fetch_by_id(&*store, id.into()).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /{collection}/{id}`: body is the entity's patch.
pub async fn update<S, E>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  ApiJson(patch): ApiJson<E::Patch>,
) -> Result<Json<E>, ApiError>
where
  S: Repository<E>,
  E: Entity,
{
  Ok(Json(Repository::<E>::update(&*store, id.into(), patch).await?))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /{collection}/{id}`
pub async fn delete<S, E>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: Repository<E>,
  E: Entity,
{
  let id: E::Id = id.into();
  Repository::<E>::delete(&*store, id.clone()).await?;
  tracing::debug!(kind = %E::KIND, %id, "deleted");
  Ok(StatusCode::NO_CONTENT)
}
