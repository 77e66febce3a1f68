//! Grades: classes within a school for one academic year.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  entity::{Draft, Entity, EntityKind, Named, Patch, require, trimmed},
  id::{GradeId, SchoolId},
};

/// Figures derived from the grade's students and their payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeStats {
  pub student_count:   u32,
  pub active_students: u32,
  /// Sum of paid payments, in minor currency units.
  pub revenue:         i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
  pub grade_id:      GradeId,
  pub school_id:     SchoolId,
  pub name:          String,
  /// Free-text level, e.g. "Primaria" or "3".
  pub level:         String,
  /// e.g. "2024-2025".
  pub academic_year: String,
  pub stats:         GradeStats,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

fn validate_fields(name: &str, level: &str, academic_year: &str) -> Result<()> {
  require("grade name", name)?;
  require("grade level", level)?;
  require("academic year", academic_year)
}

impl Entity for Grade {
  type Draft = NewGrade;
  type Id = GradeId;
  type Parent = SchoolId;
  type Patch = GradePatch;

  const COLLECTION: &'static str = "grades";
  const KIND: EntityKind = EntityKind::Grade;
  const PARENT_COLLECTION: &'static str = "schools";

  fn id(&self) -> &GradeId { &self.grade_id }

  fn parent_id(&self) -> &SchoolId { &self.school_id }

  fn validate(&self) -> Result<()> {
    validate_fields(&self.name, &self.level, &self.academic_year)
  }
}

impl Named for Grade {
  fn display_name(&self) -> &str { &self.name }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGrade {
  pub school_id:     SchoolId,
  pub name:          String,
  pub level:         String,
  pub academic_year: String,
}

impl NewGrade {
  pub fn new(
    school_id: SchoolId,
    name: impl Into<String>,
    level: impl Into<String>,
    academic_year: impl Into<String>,
  ) -> Self {
    Self {
      school_id,
      name: name.into(),
      level: level.into(),
      academic_year: academic_year.into(),
    }
  }
}

impl Draft for NewGrade {
  type Parent = SchoolId;

  fn parent_id(&self) -> &SchoolId { &self.school_id }

  fn validate(&self) -> Result<()> {
    require("school id", self.school_id.as_str())?;
    validate_fields(&self.name, &self.level, &self.academic_year)
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradePatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:          Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub level:         Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub academic_year: Option<String>,
}

impl Patch<Grade> for GradePatch {
  fn apply(self, grade: &mut Grade) {
    if let Some(name) = self.name {
      grade.name = trimmed(name);
    }
    if let Some(level) = self.level {
      grade.level = trimmed(level);
    }
    if let Some(year) = self.academic_year {
      grade.academic_year = trimmed(year);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn draft_requires_parent_linkage() {
    let draft = NewGrade::new(SchoolId::new(""), "1A", "1", "2024-2025");
    assert!(matches!(draft.validate(), Err(crate::Error::Validation(_))));

    let draft = NewGrade::new(SchoolId::new("s1"), "1A", "1", "2024-2025");
    assert!(draft.validate().is_ok());
  }

  #[test]
  fn draft_requires_name() {
    let draft = NewGrade::new(SchoolId::new("s1"), " ", "1", "2024-2025");
    assert!(draft.validate().is_err());
  }
}
