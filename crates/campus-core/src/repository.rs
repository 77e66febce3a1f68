//! The [`Repository`] trait and supporting list parameters.
//!
//! The trait is implemented by storage backends (`campus-store-sqlite`) and by
//! the HTTP client (`campus-client`). The query layer depends on this
//! abstraction, never on a concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  Result, entity::Entity, grade::Grade, payment::Payment, school::School,
  student::Student,
};

// ─── List parameters ─────────────────────────────────────────────────────────

/// Sort order of a [`Repository::fetch_by_parent`] page.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
  /// Alphabetical by display name (due date for payments).
  #[default]
  Name,
  NewestFirst,
  OldestFirst,
}

/// Parameters for [`Repository::fetch_by_parent`].
///
/// Part of the query cache key, so it is `Hash + Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ListParams {
  /// `Some(0)` yields an empty page; `None` means no limit.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub limit:  Option<usize>,
  #[serde(default)]
  pub offset: usize,
  #[serde(default)]
  pub order:  ListOrder,
  /// Case-insensitive substring filter on the display name.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
}

impl ListParams {
  pub fn limit(limit: usize) -> Self {
    Self { limit: Some(limit), ..Self::default() }
  }

  pub fn with_search(mut self, text: impl Into<String>) -> Self {
    self.search = Some(text.into());
    self
  }

  pub fn with_order(mut self, order: ListOrder) -> Self {
    self.order = order;
    self
  }

  /// True when no rows can possibly be returned.
  pub fn is_empty_page(&self) -> bool { self.limit == Some(0) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Remote CRUD for one entity type.
///
/// All methods return `Send` futures so implementations can be driven from
/// spawned tokio tasks.
pub trait Repository<E: Entity>: Send + Sync {
  /// Fails with [`crate::Error::NotFound`] if no entity has `id`.
  fn fetch_by_id(&self, id: E::Id) -> impl Future<Output = Result<E>> + Send + '_;

  /// An ordered page of the entities owned by `parent`. Returns an empty list,
  /// not an error, when the parent has no children or does not exist.
  fn fetch_by_parent(
    &self,
    parent: E::Parent,
    params: ListParams,
  ) -> impl Future<Output = Result<Vec<E>>> + Send + '_;

  /// Validate and persist a new entity with a backend-generated id.
  fn create(&self, draft: E::Draft) -> impl Future<Output = Result<E>> + Send + '_;

  /// Merge `patch` into the stored entity. Either the whole merged entity is
  /// written or nothing is.
  fn update(
    &self,
    id: E::Id,
    patch: E::Patch,
  ) -> impl Future<Output = Result<E>> + Send + '_;

  /// Remove an entity (and, per backend policy, its children). Deleting an id
  /// that does not exist, including one already deleted, is `NotFound`.
  fn delete(&self, id: E::Id) -> impl Future<Output = Result<()>> + Send + '_;
}

/// A backend serving every entity type of the hierarchy.
pub trait CampusStore:
  Repository<School> + Repository<Grade> + Repository<Student> + Repository<Payment>
{
}

impl<T> CampusStore for T where
  T: Repository<School>
    + Repository<Grade>
    + Repository<Student>
    + Repository<Payment>
{
}
