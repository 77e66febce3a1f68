//! Schools: the top of the hierarchy, owned by a user account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  entity::{
    Draft, Entity, EntityKind, Named, Patch, check_email, clearable, require, trimmed,
  },
  id::{SchoolId, UserId},
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::AsRefStr,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SchoolStatus {
  #[default]
  Active,
  Inactive,
  Suspended,
}

/// Counts derived from the school's grades and students at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolStats {
  pub total_grades:   u32,
  pub total_students: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
  pub school_id:   SchoolId,
  pub user_id:     UserId,
  pub name:        String,
  pub address:     String,
  pub phone:       Option<String>,
  pub email:       Option<String>,
  pub status:      SchoolStatus,
  /// Outstanding debt in minor currency units; never negative.
  pub debt_amount: i64,
  pub stats:       SchoolStats,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Entity for School {
  type Draft = NewSchool;
  type Id = SchoolId;
  type Parent = UserId;
  type Patch = SchoolPatch;

  const COLLECTION: &'static str = "schools";
  const KIND: EntityKind = EntityKind::School;
  const PARENT_COLLECTION: &'static str = "users";

  fn id(&self) -> &SchoolId { &self.school_id }

  fn parent_id(&self) -> &UserId { &self.user_id }

  fn validate(&self) -> Result<()> {
    validate_fields(&self.name, &self.address, self.email.as_deref(), self.debt_amount)
  }
}

impl Named for School {
  fn display_name(&self) -> &str { &self.name }
}

fn validate_fields(
  name: &str,
  address: &str,
  email: Option<&str>,
  debt_amount: i64,
) -> Result<()> {
  require("school name", name)?;
  require("school address", address)?;
  check_email(email)?;
  if debt_amount < 0 {
    return Err(crate::Error::validation("debt amount cannot be negative"));
  }
  Ok(())
}

// ─── NewSchool ───────────────────────────────────────────────────────────────

/// Input to [`crate::Repository::create`] for schools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchool {
  pub user_id:     UserId,
  pub name:        String,
  pub address:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:       Option<String>,
  #[serde(default)]
  pub status:      SchoolStatus,
  #[serde(default)]
  pub debt_amount: i64,
}

impl NewSchool {
  /// Convenience constructor with all optional fields set to their defaults.
  pub fn new(
    user_id: UserId,
    name: impl Into<String>,
    address: impl Into<String>,
  ) -> Self {
    Self {
      user_id,
      name: name.into(),
      address: address.into(),
      phone: None,
      email: None,
      status: SchoolStatus::default(),
      debt_amount: 0,
    }
  }
}

impl Draft for NewSchool {
  type Parent = UserId;

  fn parent_id(&self) -> &UserId { &self.user_id }

  fn validate(&self) -> Result<()> {
    validate_fields(&self.name, &self.address, self.email.as_deref(), self.debt_amount)
  }
}

// ─── SchoolPatch ─────────────────────────────────────────────────────────────

/// Partial update for a school. `phone` and `email` are cleared by sending an
/// empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoolPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status:      Option<SchoolStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub debt_amount: Option<i64>,
}

impl Patch<School> for SchoolPatch {
  fn apply(self, school: &mut School) {
    if let Some(name) = self.name {
      school.name = trimmed(name);
    }
    if let Some(address) = self.address {
      school.address = trimmed(address);
    }
    if let Some(phone) = self.phone {
      school.phone = clearable(phone);
    }
    if let Some(email) = self.email {
      school.email = clearable(email);
    }
    if let Some(status) = self.status {
      school.status = status;
    }
    if let Some(debt) = self.debt_amount {
      school.debt_amount = debt;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn school() -> School {
    School {
      school_id:   SchoolId::new("s1"),
      user_id:     UserId::new("u1"),
      name:        "Lincoln".into(),
      address:     "12 Main St".into(),
      phone:       Some("555-0100".into()),
      email:       None,
      status:      SchoolStatus::Active,
      debt_amount: 0,
      stats:       SchoolStats::default(),
      created_at:  Utc::now(),
      updated_at:  Utc::now(),
    }
  }

  #[test]
  fn draft_requires_name_and_address() {
    let user = UserId::new("u1");
    assert!(NewSchool::new(user.clone(), "Lincoln", "12 Main St").validate().is_ok());
    assert!(NewSchool::new(user.clone(), "", "12 Main St").validate().is_err());
    assert!(NewSchool::new(user, "Lincoln", " ").validate().is_err());
  }

  #[test]
  fn draft_rejects_negative_debt() {
    let mut draft = NewSchool::new(UserId::new("u1"), "Lincoln", "12 Main St");
    draft.debt_amount = -1;
    assert!(matches!(draft.validate(), Err(crate::Error::Validation(_))));
  }

  #[test]
  fn patch_merges_only_present_fields() {
    let mut s = school();
    SchoolPatch {
      name: Some("Lincoln High".into()),
      phone: Some(String::new()),
      ..Default::default()
    }
    .apply(&mut s);

    assert_eq!(s.name, "Lincoln High");
    assert_eq!(s.address, "12 Main St");
    assert_eq!(s.phone, None);
    assert!(s.validate().is_ok());
  }

  #[test]
  fn patched_names_are_trimmed() {
    let mut s = school();
    SchoolPatch { name: Some(" Lincoln High ".into()), ..Default::default() }
      .apply(&mut s);
    assert_eq!(s.name, "Lincoln High");
  }

  #[test]
  fn patched_school_is_revalidated() {
    let mut s = school();
    SchoolPatch { name: Some(String::new()), ..Default::default() }.apply(&mut s);
    assert!(s.validate().is_err());
  }

  #[test]
  fn status_wire_form_is_lowercase() {
    assert_eq!(
      serde_json::to_string(&SchoolStatus::Suspended).unwrap(),
      "\"suspended\""
    );
    assert_eq!("inactive".parse::<SchoolStatus>().unwrap(), SchoolStatus::Inactive);
  }
}
