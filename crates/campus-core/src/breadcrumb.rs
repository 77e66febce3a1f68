//! Breadcrumb trail derivation.
//!
//! [`resolve`] is pure: given the current [`Route`] and whichever entities
//! the screen has loaded, it yields the trail from `Home` down to the deepest
//! level whose entity is available. A level whose entity has not loaded yet
//! is omitted together with everything below it, so no crumb ever links to a
//! placeholder.

use serde::Serialize;

use crate::{
  entity::Named,
  grade::Grade,
  route::{Route, SCHOOLS_SEGMENT},
  school::School,
  student::Student,
};

pub const HOME_LABEL: &str = "Home";
pub const SCHOOLS_LABEL: &str = "Escuelas";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
  pub label:  String,
  /// Where tapping the crumb navigates. `None` for the current screen.
  pub target: Option<String>,
}

impl Crumb {
  fn link(label: impl Into<String>, target: String) -> Self {
    Self { label: label.into(), target: Some(target) }
  }
}

/// Entities currently loaded by the screen, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct Loaded<'a> {
  pub school:  Option<&'a School>,
  pub grade:   Option<&'a Grade>,
  pub student: Option<&'a Student>,
}

pub fn resolve(route: &Route, loaded: &Loaded<'_>) -> Vec<Crumb> {
  let mut crumbs = vec![Crumb::link(HOME_LABEL, Route::Home.path())];

  if *route != Route::Home {
    crumbs.push(Crumb::link(SCHOOLS_LABEL, format!("/{SCHOOLS_SEGMENT}")));
    push_levels(route, loaded, &mut crumbs);
  }

  if let Some(last) = crumbs.last_mut() {
    last.target = None;
  }
  crumbs
}

fn push_levels(route: &Route, loaded: &Loaded<'_>, crumbs: &mut Vec<Crumb>) {
  let Some(school_id) = route.school_id() else { return };
  let Some(school) = loaded.school.filter(|s| &s.school_id == school_id) else {
    return;
  };
  crumbs.push(Crumb::link(
    school.display_name(),
    Route::School { school_id: school_id.clone() }.path(),
  ));

  let Some(grade_id) = route.grade_id() else { return };
  let Some(grade) = loaded
    .grade
    .filter(|g| &g.grade_id == grade_id && &g.school_id == school_id)
  else {
    return;
  };
  crumbs.push(Crumb::link(
    grade.display_name(),
    Route::Grade { school_id: school_id.clone(), grade_id: grade_id.clone() }
      .path(),
  ));

  let Some(student_id) = route.student_id() else { return };
  let Some(student) = loaded
    .student
    .filter(|s| &s.student_id == student_id && &s.grade_id == grade_id)
  else {
    return;
  };
  crumbs.push(Crumb::link(student.display_name(), route.path()));
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, Utc};

  use super::*;
  use crate::{
    grade::GradeStats,
    school::{SchoolStats, SchoolStatus},
    student::{StudentStats, StudentStatus},
  };

  fn school(id: &str, name: &str) -> School {
    School {
      school_id:   id.into(),
      user_id:     "u1".into(),
      name:        name.into(),
      address:     "12 Main St".into(),
      phone:       None,
      email:       None,
      status:      SchoolStatus::Active,
      debt_amount: 0,
      stats:       SchoolStats::default(),
      created_at:  Utc::now(),
      updated_at:  Utc::now(),
    }
  }

  fn grade(id: &str, school_id: &str, name: &str) -> Grade {
    Grade {
      grade_id:      id.into(),
      school_id:     school_id.into(),
      name:          name.into(),
      level:         "1".into(),
      academic_year: "2024-2025".into(),
      stats:         GradeStats::default(),
      created_at:    Utc::now(),
      updated_at:    Utc::now(),
    }
  }

  fn student(id: &str, grade_id: &str) -> Student {
    Student {
      student_id:      id.into(),
      school_id:       "s1".into(),
      grade_id:        grade_id.into(),
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

  fn labels(crumbs: &[Crumb]) -> Vec<&str> {
    crumbs.iter().map(|c| c.label.as_str()).collect()
  }

  #[test]
  fn grade_screen_with_everything_loaded() {
    let s1 = school("s1", "Lincoln");
    let g1 = grade("g1", "s1", "Primero A");
    let route = Route::from_segments(&["escuelas", "s1", "grados", "g1"]);

    let crumbs = resolve(
      &route,
      &Loaded { school: Some(&s1), grade: Some(&g1), student: None },
    );

    assert_eq!(labels(&crumbs), ["Home", "Escuelas", "Lincoln", "Primero A"]);
    assert_eq!(crumbs[0].target.as_deref(), Some("/"));
    assert_eq!(crumbs[1].target.as_deref(), Some("/escuelas"));
    assert_eq!(crumbs[2].target.as_deref(), Some("/escuelas/s1"));
    assert_eq!(crumbs[3].target, None);
  }

  #[test]
  fn unloaded_grade_is_omitted() {
    let s1 = school("s1", "Lincoln");
    let route = Route::from_segments(&["escuelas", "s1", "grados", "g1"]);

    let crumbs =
      resolve(&route, &Loaded { school: Some(&s1), ..Loaded::default() });

    assert_eq!(labels(&crumbs), ["Home", "Escuelas", "Lincoln"]);
    assert_eq!(crumbs.last().unwrap().target, None);
  }

  #[test]
  fn entity_for_a_different_id_does_not_count_as_loaded() {
    let other = school("s2", "Roosevelt");
    let route = Route::parse("/escuelas/s1");

    let crumbs =
      resolve(&route, &Loaded { school: Some(&other), ..Loaded::default() });
    assert_eq!(labels(&crumbs), ["Home", "Escuelas"]);
  }

  #[test]
  fn missing_school_hides_loaded_descendants() {
    let g1 = grade("g1", "s1", "Primero A");
    let route = Route::parse("/escuelas/s1/grados/g1");

    let crumbs =
      resolve(&route, &Loaded { grade: Some(&g1), ..Loaded::default() });
    assert_eq!(labels(&crumbs), ["Home", "Escuelas"]);
  }

  #[test]
  fn student_screen() {
    let s1 = school("s1", "Lincoln");
    let g1 = grade("g1", "s1", "Primero A");
    let st = student("st1", "g1");
    let route = Route::parse("/escuelas/s1/grados/g1/estudiante/st1");

    let crumbs = resolve(
      &route,
      &Loaded { school: Some(&s1), grade: Some(&g1), student: Some(&st) },
    );
    assert_eq!(
      labels(&crumbs),
      ["Home", "Escuelas", "Lincoln", "Primero A", "Ada Lovelace"]
    );
    assert_eq!(crumbs[3].target.as_deref(), Some("/escuelas/s1/grados/g1"));
    assert_eq!(crumbs[4].target, None);
  }

  #[test]
  fn home_is_a_single_current_crumb() {
    let crumbs = resolve(&Route::Home, &Loaded::default());
    assert_eq!(crumbs, vec![Crumb { label: "Home".into(), target: None }]);

    let crumbs = resolve(&Route::SchoolList, &Loaded::default());
    assert_eq!(labels(&crumbs), ["Home", "Escuelas"]);
    assert_eq!(crumbs[1].target, None);
  }
}
