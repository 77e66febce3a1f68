//! Error types for `campus-core`.
//!
//! This is the taxonomy every repository reports in. Backend crates keep
//! their own richer error enums internally and convert into [`Error`] at the
//! repository boundary. The type is `Clone` because the query cache stores
//! errors in its entries and hands the same error to every coalesced waiter.

use thiserror::Error;

use crate::entity::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("{kind} not found: {id}")]
  NotFound { kind: EntityKind, id: String },

  #[error("invalid input: {0}")]
  Validation(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("transport error: {0}")]
  Transport(String),
}

impl Error {
  pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
    Self::NotFound { kind, id: id.to_string() }
  }

  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  /// Transport failures are the only ones worth retrying unchanged.
  pub fn is_retryable(&self) -> bool { matches!(self, Self::Transport(_)) }

  /// Stable machine-readable code, used on the wire.
  pub fn code(&self) -> &'static str {
    match self {
      Self::NotFound { .. } => "not_found",
      Self::Validation(_) => "validation",
      Self::Conflict(_) => "conflict",
      Self::Transport(_) => "transport",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
