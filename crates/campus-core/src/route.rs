//! Typed route model for the school → grade → student screens.
//!
//! URL paths are parsed once at the boundary; everything downstream matches
//! on [`Route`] instead of inspecting strings.

use crate::id::{GradeId, SchoolId, StudentId};

pub const SCHOOLS_SEGMENT: &str = "escuelas";
pub const GRADES_SEGMENT: &str = "grados";
pub const STUDENT_SEGMENT: &str = "estudiante";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  Home,
  SchoolList,
  School {
    school_id: SchoolId,
  },
  Grade {
    school_id: SchoolId,
    grade_id:  GradeId,
  },
  Student {
    school_id:  SchoolId,
    grade_id:   GradeId,
    student_id: StudentId,
  },
}

/// The parent whose children the current screen lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
  /// The signed-in user's schools.
  Schools,
  Grades(SchoolId),
  Students(GradeId),
}

/// An id segment counts only if it is non-empty and not a placeholder left
/// by an unresolved client-side value.
fn id_segment(segment: Option<&str>) -> Option<&str> {
  let s = segment?.trim();
  match s {
    "" | "undefined" | "null" => None,
    s => Some(s),
  }
}

impl Route {
  /// Parse a slash-separated path such as `/escuelas/s1/grados/g1`.
  pub fn parse(path: &str) -> Self {
    let segments: Vec<&str> =
      path.split('/').filter(|s| !s.is_empty()).collect();
    Self::from_segments(&segments)
  }

  /// Parse already-split path segments. Parsing stops at the first segment
  /// that is unrecognised or is a missing id, keeping the levels before it.
  pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
    let mut it = segments.iter().map(AsRef::as_ref);

    if it.next() != Some(SCHOOLS_SEGMENT) {
      return Self::Home;
    }
    let Some(school) = id_segment(it.next()) else {
      return Self::SchoolList;
    };
    let school_id = SchoolId::new(school);

    if it.next() != Some(GRADES_SEGMENT) {
      return Self::School { school_id };
    }
    let Some(grade) = id_segment(it.next()) else {
      return Self::School { school_id };
    };
    let grade_id = GradeId::new(grade);

    if it.next() != Some(STUDENT_SEGMENT) {
      return Self::Grade { school_id, grade_id };
    }
    let Some(student) = id_segment(it.next()) else {
      return Self::Grade { school_id, grade_id };
    };

    Self::Student { school_id, grade_id, student_id: StudentId::new(student) }
  }

  /// Canonical path of this route.
  pub fn path(&self) -> String {
    match self {
      Self::Home => "/".to_owned(),
      Self::SchoolList => format!("/{SCHOOLS_SEGMENT}"),
      Self::School { school_id } => format!("/{SCHOOLS_SEGMENT}/{school_id}"),
      Self::Grade { school_id, grade_id } => {
        format!("/{SCHOOLS_SEGMENT}/{school_id}/{GRADES_SEGMENT}/{grade_id}")
      }
      Self::Student { school_id, grade_id, student_id } => format!(
        "/{SCHOOLS_SEGMENT}/{school_id}/{GRADES_SEGMENT}/{grade_id}/{STUDENT_SEGMENT}/{student_id}"
      ),
    }
  }

  pub fn school_id(&self) -> Option<&SchoolId> {
    match self {
      Self::Home | Self::SchoolList => None,
      Self::School { school_id }
      | Self::Grade { school_id, .. }
      | Self::Student { school_id, .. } => Some(school_id),
    }
  }

  pub fn grade_id(&self) -> Option<&GradeId> {
    match self {
      Self::Grade { grade_id, .. } | Self::Student { grade_id, .. } => {
        Some(grade_id)
      }
      _ => None,
    }
  }

  pub fn student_id(&self) -> Option<&StudentId> {
    match self {
      Self::Student { student_id, .. } => Some(student_id),
      _ => None,
    }
  }

  /// Which list the screen for this route filters by. A student screen
  /// scopes to its grade's roster.
  pub fn scope(&self) -> Option<ListScope> {
    match self {
      Self::Home => None,
      Self::SchoolList => Some(ListScope::Schools),
      Self::School { school_id } => Some(ListScope::Grades(school_id.clone())),
      Self::Grade { grade_id, .. } | Self::Student { grade_id, .. } => {
        Some(ListScope::Students(grade_id.clone()))
      }
    }
  }
}
