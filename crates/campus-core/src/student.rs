//! Students: enrolled in exactly one grade of one school.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  entity::{
    Draft, Entity, EntityKind, Named, Patch, check_email, clearable, require, trimmed,
  },
  id::{GradeId, SchoolId, StudentId},
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
pub enum StudentStatus {
  #[default]
  Active,
  Inactive,
}

/// Figures derived from the student's payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentStats {
  pub payment_count: u32,
  /// Sum of pending payments, in minor currency units.
  pub total_debt:    i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
  pub student_id:      StudentId,
  pub school_id:       SchoolId,
  pub grade_id:        GradeId,
  pub first_name:      String,
  pub last_name:       String,
  /// Always `"{first_name} {last_name}"`; kept in sync by [`Student::refresh_full_name`].
  pub full_name:       String,
  /// Human-readable code, unique within the grade.
  pub student_code:    String,
  pub email:           Option<String>,
  pub phone:           Option<String>,
  pub status:          StudentStatus,
  pub enrollment_date: NaiveDate,
  pub stats:           StudentStats,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

pub fn full_name(first: &str, last: &str) -> String {
  format!("{} {}", first.trim(), last.trim()).trim().to_owned()
}

impl Student {
  pub fn refresh_full_name(&mut self) {
    self.full_name = full_name(&self.first_name, &self.last_name);
  }
}

fn validate_fields(
  first_name: &str,
  last_name: &str,
  student_code: &str,
  email: Option<&str>,
) -> Result<()> {
  require("first name", first_name)?;
  require("last name", last_name)?;
  require("student code", student_code)?;
  check_email(email)
}

impl Entity for Student {
  type Draft = NewStudent;
  type Id = StudentId;
  type Parent = GradeId;
  type Patch = StudentPatch;

  const COLLECTION: &'static str = "students";
  const KIND: EntityKind = EntityKind::Student;
  const PARENT_COLLECTION: &'static str = "grades";

  fn id(&self) -> &StudentId { &self.student_id }

  fn parent_id(&self) -> &GradeId { &self.grade_id }

  fn validate(&self) -> Result<()> {
    validate_fields(
      &self.first_name,
      &self.last_name,
      &self.student_code,
      self.email.as_deref(),
    )
  }
}

impl Named for Student {
  fn display_name(&self) -> &str { &self.full_name }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
  pub school_id:       SchoolId,
  pub grade_id:        GradeId,
  pub first_name:      String,
  pub last_name:       String,
  pub student_code:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone:           Option<String>,
  #[serde(default)]
  pub status:          StudentStatus,
  /// Defaults to the day the record is created.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub enrollment_date: Option<NaiveDate>,
}

impl NewStudent {
  pub fn new(
    school_id: SchoolId,
    grade_id: GradeId,
    first_name: impl Into<String>,
    last_name: impl Into<String>,
    student_code: impl Into<String>,
  ) -> Self {
    Self {
      school_id,
      grade_id,
      first_name: first_name.into(),
      last_name: last_name.into(),
      student_code: student_code.into(),
      email: None,
      phone: None,
      status: StudentStatus::default(),
      enrollment_date: None,
    }
  }
}

impl Draft for NewStudent {
  type Parent = GradeId;

  fn parent_id(&self) -> &GradeId { &self.grade_id }

  fn validate(&self) -> Result<()> {
    require("school id", self.school_id.as_str())?;
    require("grade id", self.grade_id.as_str())?;
    validate_fields(
      &self.first_name,
      &self.last_name,
      &self.student_code,
      self.email.as_deref(),
    )
  }
}

/// Partial update for a student. Moving a student to another grade is not
/// a patch; delete and re-create instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub first_name:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_name:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub student_code:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status:          Option<StudentStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub enrollment_date: Option<NaiveDate>,
}

impl Patch<Student> for StudentPatch {
  fn apply(self, student: &mut Student) {
    if let Some(first) = self.first_name {
      student.first_name = trimmed(first);
    }
    if let Some(last) = self.last_name {
      student.last_name = trimmed(last);
    }
    if let Some(code) = self.student_code {
      student.student_code = trimmed(code);
    }
    if let Some(email) = self.email {
      student.email = clearable(email);
    }
    if let Some(phone) = self.phone {
      student.phone = clearable(phone);
    }
    if let Some(status) = self.status {
      student.status = status;
    }
    if let Some(date) = self.enrollment_date {
      student.enrollment_date = date;
    }
    student.refresh_full_name();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn student() -> Student {
    Student {
      student_id:      StudentId::new("st1"),
      school_id:       SchoolId::new("s1"),
      grade_id:        GradeId::new("g1"),
      first_name:      "Ada".into(),
      last_name:       "Lovelace".into(),
      full_name:       "Ada Lovelace".into(),
      student_code:    "A-001".into(),
      email:           None,
      phone:           None,
      status:          StudentStatus::Active,
      enrollment_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
      stats:           StudentStats::default(),
      created_at:      Utc::now(),
      updated_at:      Utc::now(),
    }
  }

  #[test]
  fn full_name_is_derived() {
    assert_eq!(full_name(" Ada ", "Lovelace"), "Ada Lovelace");

    let mut s = student();
    StudentPatch { last_name: Some("Byron".into()), ..Default::default() }
      .apply(&mut s);
    assert_eq!(s.full_name, "Ada Byron");
  }

  #[test]
  fn patched_text_is_trimmed() {
    let mut s = student();
    StudentPatch {
      first_name: Some("  Bob".into()),
      student_code: Some(" A-002 ".into()),
      ..Default::default()
    }
    .apply(&mut s);
    assert_eq!(s.first_name, "Bob");
    assert_eq!(s.student_code, "A-002");
    assert_eq!(s.full_name, "Bob Lovelace");
  }

  #[test]
  fn draft_requires_both_parents() {
    let draft = NewStudent::new(
      SchoolId::new("s1"),
      GradeId::new(""),
      "Ada",
      "Lovelace",
      "A-001",
    );
    assert!(draft.validate().is_err());
  }

  #[test]
  fn patch_rejects_malformed_email_on_revalidation() {
    let mut s = student();
    StudentPatch { email: Some("ada".into()), ..Default::default() }.apply(&mut s);
    assert!(matches!(s.validate(), Err(crate::Error::Validation(_))));
  }
}
