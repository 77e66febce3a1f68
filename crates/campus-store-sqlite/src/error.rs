//! Error type for `campus-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] campus_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A column held a value that does not decode into the domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { Self::Database(e.into()) }
}

impl Error {
  /// The message of a UNIQUE, CHECK or foreign-key failure, if this is one.
  fn constraint_violation(&self) -> Option<String> {
    let Self::Database(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
      failure,
      message,
    ))) = self
    else {
      return None;
    };
    (failure.code == ErrorCode::ConstraintViolation).then(|| {
      message
        .clone()
        .unwrap_or_else(|| "constraint violated".to_owned())
    })
  }
}

/// Domain errors pass through unchanged. A constraint the schema enforced
/// is bad input; everything else is a backend failure from the caller's
/// point of view.
impl From<Error> for campus_core::Error {
  fn from(e: Error) -> Self {
    if let Some(message) = e.constraint_violation() {
      return campus_core::Error::Validation(message);
    }
    match e {
      Error::Core(e) => e,
      other => campus_core::Error::Transport(other.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sqlite_failure(code: std::os::raw::c_int, message: &str) -> Error {
    rusqlite::Error::SqliteFailure(
      rusqlite::ffi::Error::new(code),
      Some(message.to_owned()),
    )
    .into()
  }

  #[test]
  fn constraint_failures_are_validation() {
    let err = sqlite_failure(
      rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
      "UNIQUE constraint failed: students.grade_id, students.student_code",
    );
    let core: campus_core::Error = err.into();
    let campus_core::Error::Validation(message) = core else {
      panic!("expected validation, got {core:?}");
    };
    assert!(message.contains("student_code"));
  }

  #[test]
  fn other_failures_are_transport() {
    let err = sqlite_failure(rusqlite::ffi::SQLITE_BUSY, "database is locked");
    assert!(matches!(
      campus_core::Error::from(err),
      campus_core::Error::Transport(_)
    ));
  }
}
