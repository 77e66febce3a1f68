//! Write coordination.
//!
//! [`MutationCoordinator::run`] executes one write, tracks it as pending under
//! its [`MutationKey`], and on success invalidates the cache entries the write
//! affected. A second run of the same key while the first is pending is
//! rejected with [`Error::Conflict`] without executing.

use std::{collections::HashSet, fmt, future::Future, sync::Arc};

use campus_core::{Entity, EntityKind, Error, Result, entity::Draft};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::{cache::QueryCache, key::KeyPattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationOp {
  Create,
  Update,
  Delete,
}

impl fmt::Display for MutationOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Create => "create",
      Self::Update => "update",
      Self::Delete => "delete",
    })
  }
}

/// Logical identity of a write. For creates the target is the parent id, so
/// two creates under the same parent conflict.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutationKey {
  pub op:     MutationOp,
  pub kind:   EntityKind,
  pub target: String,
}

impl MutationKey {
  pub fn create<E: Entity>(draft: &E::Draft) -> Self {
    Self {
      op:     MutationOp::Create,
      kind:   E::KIND,
      target: draft.parent_id().to_string(),
    }
  }

  pub fn update<E: Entity>(id: &E::Id) -> Self {
    Self { op: MutationOp::Update, kind: E::KIND, target: id.to_string() }
  }

  pub fn delete<E: Entity>(id: &E::Id) -> Self {
    Self { op: MutationOp::Delete, kind: E::KIND, target: id.to_string() }
  }
}

impl fmt::Display for MutationKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.op {
      MutationOp::Create => {
        write!(f, "create {} under {}", self.kind, self.target)
      }
      op => write!(f, "{op} {} {}", self.kind, self.target),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationEvent {
  Started(MutationKey),
  Succeeded(MutationKey),
  Failed { key: MutationKey, error: Error },
}

impl MutationEvent {
  pub fn key(&self) -> &MutationKey {
    match self {
      Self::Started(key) | Self::Succeeded(key) | Self::Failed { key, .. } => key,
    }
  }

  /// User-facing text for failures, naming the operation.
  pub fn message(&self) -> Option<String> {
    match self {
      Self::Failed { key, error } => Some(format!("could not {key}: {error}")),
      _ => None,
    }
  }
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

/// Removes its key from the pending set when dropped, so a cancelled `run`
/// does not leave the operation locked.
struct PendingGuard {
  pending: Arc<Mutex<HashSet<MutationKey>>>,
  key:     MutationKey,
}

impl Drop for PendingGuard {
  fn drop(&mut self) { self.pending.lock().remove(&self.key); }
}

#[derive(Clone)]
pub struct MutationCoordinator {
  cache:   QueryCache,
  pending: Arc<Mutex<HashSet<MutationKey>>>,
  events:  broadcast::Sender<MutationEvent>,
}

impl MutationCoordinator {
  pub fn new(cache: QueryCache, event_capacity: usize) -> Self {
    let (events, _) = broadcast::channel(event_capacity.max(1));
    Self { cache, pending: Arc::default(), events }
  }

  /// Execute a write under `key`. On success every pattern in `invalidate`
  /// is applied to the cache; on failure the cache is left as it was.
  pub async fn run<T, F, Fut>(
    &self,
    key: MutationKey,
    execute: F,
    invalidate: Vec<KeyPattern>,
  ) -> Result<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let _guard = self.begin(&key)?;
    self.emit(MutationEvent::Started(key.clone()));

    match execute().await {
      Ok(value) => {
        let invalidated: usize =
          invalidate.iter().map(|pattern| self.cache.invalidate(pattern)).sum();
        tracing::debug!(%key, invalidated, "mutation succeeded");
        self.emit(MutationEvent::Succeeded(key));
        Ok(value)
      }
      Err(error) => {
        tracing::warn!(%key, %error, "mutation failed");
        self.emit(MutationEvent::Failed { key, error: error.clone() });
        Err(error)
      }
    }
  }

  pub fn is_pending(&self, key: &MutationKey) -> bool {
    self.pending.lock().contains(key)
  }

  pub fn pending_count(&self) -> usize { self.pending.lock().len() }

  pub fn subscribe(&self) -> broadcast::Receiver<MutationEvent> {
    self.events.subscribe()
  }

  fn begin(&self, key: &MutationKey) -> Result<PendingGuard> {
    if !self.pending.lock().insert(key.clone()) {
      tracing::debug!(%key, "rejecting duplicate mutation");
      return Err(Error::Conflict(format!("{key} is already in progress")));
    }
    Ok(PendingGuard { pending: Arc::clone(&self.pending), key: key.clone() })
  }

  fn emit(&self, event: MutationEvent) {
    // No subscribers is fine.
    let _ = self.events.send(event);
  }
}
