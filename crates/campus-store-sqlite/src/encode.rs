//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, and
//! status enums use their lowercase names. Derived stats arrive as extra
//! columns computed by correlated sub-queries.

use std::{fmt::Display, str::FromStr};

use campus_core::{
  grade::{Grade, GradeStats},
  payment::Payment,
  school::{School, SchoolStats},
  student::{Student, StudentStats},
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Ids ─────────────────────────────────────────────────────────────────────

/// Fresh opaque id for a new row.
pub fn new_id() -> String { Uuid::new_v4().hyphenated().to_string() }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Fixed-width so that lexical order in SQL matches chronological order.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

// ─── Status enums ────────────────────────────────────────────────────────────

pub fn decode_enum<T>(s: &str) -> Result<T>
where
  T: FromStr,
  T::Err: Display,
{
  s.parse()
    .map_err(|e| Error::Decode(format!("enum value {s:?}: {e}")))
}

/// Aggregates come back as `i64`; counts never exceed `u32` in practice.
fn count(n: i64) -> u32 { u32::try_from(n.max(0)).unwrap_or(u32::MAX) }

/// `LIMIT` argument: SQLite treats a negative limit as "no limit".
pub fn sql_limit(limit: Option<usize>) -> i64 {
  limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

pub fn sql_offset(offset: usize) -> i64 { i64::try_from(offset).unwrap_or(i64::MAX) }

/// `LIKE` pattern for an optional search string. Wildcards in the search
/// text match literally; queries must say `ESCAPE '\'`.
pub fn like_pattern(search: Option<&str>) -> Option<String> {
  search
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      let escaped = s
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
      format!("%{escaped}%")
    })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `schools` row plus its derived counts.
pub struct RawSchool {
  pub school_id:      String,
  pub user_id:        String,
  pub name:           String,
  pub address:        String,
  pub phone:          Option<String>,
  pub email:          Option<String>,
  pub status:         String,
  pub debt_amount:    i64,
  pub created_at:     String,
  pub updated_at:     String,
  pub total_grades:   i64,
  pub total_students: i64,
}

impl RawSchool {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      school_id:      row.get(0)?,
      user_id:        row.get(1)?,
      name:           row.get(2)?,
      address:        row.get(3)?,
      phone:          row.get(4)?,
      email:          row.get(5)?,
      status:         row.get(6)?,
      debt_amount:    row.get(7)?,
      created_at:     row.get(8)?,
      updated_at:     row.get(9)?,
      total_grades:   row.get(10)?,
      total_students: row.get(11)?,
    })
  }

  pub fn into_school(self) -> Result<School> {
    Ok(School {
      school_id:   self.school_id.into(),
      user_id:     self.user_id.into(),
      name:        self.name,
      address:     self.address,
      phone:       self.phone,
      email:       self.email,
      status:      decode_enum(&self.status)?,
      debt_amount: self.debt_amount,
      stats:       SchoolStats {
        total_grades:   count(self.total_grades),
        total_students: count(self.total_students),
      },
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read from a `grades` row plus its derived figures.
pub struct RawGrade {
  pub grade_id:        String,
  pub school_id:       String,
  pub name:            String,
  pub level:           String,
  pub academic_year:   String,
  pub created_at:      String,
  pub updated_at:      String,
  pub student_count:   i64,
  pub active_students: i64,
  pub revenue:         i64,
}

impl RawGrade {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      grade_id:        row.get(0)?,
      school_id:       row.get(1)?,
      name:            row.get(2)?,
      level:           row.get(3)?,
      academic_year:   row.get(4)?,
      created_at:      row.get(5)?,
      updated_at:      row.get(6)?,
      student_count:   row.get(7)?,
      active_students: row.get(8)?,
      revenue:         row.get(9)?,
    })
  }

  pub fn into_grade(self) -> Result<Grade> {
    Ok(Grade {
      grade_id:      self.grade_id.into(),
      school_id:     self.school_id.into(),
      name:          self.name,
      level:         self.level,
      academic_year: self.academic_year,
      stats:         GradeStats {
        student_count:   count(self.student_count),
        active_students: count(self.active_students),
        revenue:         self.revenue,
      },
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read from a `students` row plus its payment figures.
pub struct RawStudent {
  pub student_id:      String,
  pub school_id:       String,
  pub grade_id:        String,
  pub first_name:      String,
  pub last_name:       String,
  pub student_code:    String,
  pub email:           Option<String>,
  pub phone:           Option<String>,
  pub status:          String,
  pub enrollment_date: String,
  pub created_at:      String,
  pub updated_at:      String,
  pub payment_count:   i64,
  pub total_debt:      i64,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:      row.get(0)?,
      school_id:       row.get(1)?,
      grade_id:        row.get(2)?,
      first_name:      row.get(3)?,
      last_name:       row.get(4)?,
      student_code:    row.get(5)?,
      email:           row.get(6)?,
      phone:           row.get(7)?,
      status:          row.get(8)?,
      enrollment_date: row.get(9)?,
      created_at:      row.get(10)?,
      updated_at:      row.get(11)?,
      payment_count:   row.get(12)?,
      total_debt:      row.get(13)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    let full_name = campus_core::student::full_name(&self.first_name, &self.last_name);
    Ok(Student {
      student_id: self.student_id.into(),
      school_id: self.school_id.into(),
      grade_id: self.grade_id.into(),
      first_name: self.first_name,
      last_name: self.last_name,
      full_name,
      student_code: self.student_code,
      email: self.email,
      phone: self.phone,
      status: decode_enum(&self.status)?,
      enrollment_date: decode_date(&self.enrollment_date)?,
      stats: StudentStats {
        payment_count: count(self.payment_count),
        total_debt:    self.total_debt,
      },
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read from a `payments` row.
pub struct RawPayment {
  pub payment_id: String,
  pub student_id: String,
  pub amount:     i64,
  pub concept:    String,
  pub status:     String,
  pub due_date:   String,
  pub paid_at:    Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawPayment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      payment_id: row.get(0)?,
      student_id: row.get(1)?,
      amount:     row.get(2)?,
      concept:    row.get(3)?,
      status:     row.get(4)?,
      due_date:   row.get(5)?,
      paid_at:    row.get(6)?,
      created_at: row.get(7)?,
      updated_at: row.get(8)?,
    })
  }

  pub fn into_payment(self) -> Result<Payment> {
    Ok(Payment {
      payment_id: self.payment_id.into(),
      student_id: self.student_id.into(),
      amount:     self.amount,
      concept:    self.concept,
      status:     decode_enum(&self.status)?,
      due_date:   decode_date(&self.due_date)?,
      paid_at:    self.paid_at.as_deref().map(decode_dt).transpose()?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use campus_core::school::SchoolStatus;

  use super::*;

  #[test]
  fn dates_round_trip() {
    let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    assert_eq!(encode_date(d), "2024-03-01");
    assert_eq!(decode_date("2024-03-01").unwrap(), d);
    assert!(decode_date("03/01/2024").is_err());
  }

  #[test]
  fn unknown_enum_value_is_a_decode_error() {
    assert_eq!(decode_enum::<SchoolStatus>("active").unwrap(), SchoolStatus::Active);
    assert!(matches!(
      decode_enum::<SchoolStatus>("closed"),
      Err(Error::Decode(_))
    ));
  }

  #[test]
  fn limits_and_patterns() {
    assert_eq!(sql_limit(None), -1);
    assert_eq!(sql_limit(Some(10)), 10);
    assert_eq!(like_pattern(Some(" lin ")).as_deref(), Some("%lin%"));
    assert_eq!(like_pattern(Some("  ")), None);
    assert_eq!(like_pattern(Some("50%_a\\b")).as_deref(), Some(r"%50\%\_a\\b%"));
  }
}
