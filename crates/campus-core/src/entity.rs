//! The [`Entity`] abstraction shared by schools, grades, students and
//! payments.
//!
//! Each entity type names its id, its parent id, the draft it is created
//! from and the patch it is updated with. Repositories, the REST API and the
//! query cache are all written once against these traits.

use std::fmt;

use serde::{Serialize, de::DeserializeOwned};

use crate::{Result, id::EntityId};

/// The kind of record, used in cache keys, errors and mutation identities.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  serde::Serialize,
  serde::Deserialize,
  strum::Display,
  strum::AsRefStr,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
  School,
  Grade,
  Student,
  Payment,
}

/// A persisted record owned by exactly one parent.
pub trait Entity:
  Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
  type Id: EntityId;
  type Parent: EntityId;
  type Draft: Draft<Parent = Self::Parent>;
  type Patch: Patch<Self>;

  const KIND: EntityKind;
  /// Path segment of the REST collection, e.g. `"schools"`.
  const COLLECTION: &'static str;
  /// Path segment of the parent collection the list endpoint hangs off.
  const PARENT_COLLECTION: &'static str;

  fn id(&self) -> &Self::Id;

  fn parent_id(&self) -> &Self::Parent;

  /// Check the invariants a stored record must satisfy. Run after a patch
  /// has been merged and before anything is written.
  fn validate(&self) -> Result<()>;
}

/// Input to [`crate::Repository::create`]. Ids and timestamps are assigned
/// by the backend, never accepted from callers.
pub trait Draft:
  Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
  type Parent;

  fn parent_id(&self) -> &Self::Parent;

  fn validate(&self) -> Result<()>;
}

/// A partial update. Absent fields are left untouched.
pub trait Patch<E>:
  Clone + fmt::Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
  fn apply(self, entity: &mut E);
}

/// Human-readable label for lists, search and breadcrumbs.
pub trait Named {
  fn display_name(&self) -> &str;
}

// ─── Validation helpers ──────────────────────────────────────────────────────

pub(crate) fn require(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(crate::Error::validation(format!("{field} is required")));
  }
  Ok(())
}

pub(crate) fn check_email(value: Option<&str>) -> Result<()> {
  let Some(email) = value else { return Ok(()) };
  let valid = match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
    }
    None => false,
  };
  if !valid {
    return Err(crate::Error::validation(format!(
      "malformed email address: {email:?}"
    )));
  }
  Ok(())
}

/// Required text is stored trimmed, whether it arrived in a draft or a patch.
pub(crate) fn trimmed(value: String) -> String {
  value.trim().to_owned()
}

/// Patches use an empty string to clear an optional text field.
pub(crate) fn clearable(value: String) -> Option<String> {
  let trimmed = value.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn require_rejects_whitespace() {
    assert!(require("name", "Lincoln").is_ok());
    assert!(matches!(
      require("name", "   "),
      Err(crate::Error::Validation(_))
    ));
  }

  #[test]
  fn email_shapes() {
    assert!(check_email(None).is_ok());
    assert!(check_email(Some("office@lincoln.edu")).is_ok());
    assert!(check_email(Some("office")).is_err());
    assert!(check_email(Some("@lincoln.edu")).is_err());
    assert!(check_email(Some("office@lincoln")).is_err());
    assert!(check_email(Some("of fice@lincoln.edu")).is_err());
  }

  #[test]
  fn kind_string_forms() {
    assert_eq!(EntityKind::Grade.to_string(), "grade");
    assert_eq!("student".parse::<EntityKind>().unwrap(), EntityKind::Student);
  }
}
