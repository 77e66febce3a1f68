//! `Repository<Grade>` for [`SqliteStore`].

use campus_core::{
  Draft as _, Entity as _, EntityKind, ListParams, Patch as _, Repository,
  grade::{Grade, GradePatch, GradeStats, NewGrade},
  id::{GradeId, SchoolId},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result, SqliteStore,
  encode::{RawGrade, encode_dt, like_pattern, new_id, sql_limit, sql_offset},
  store::{order_clause, row_exists},
};

const SELECT_GRADE: &str = "
  SELECT
    g.grade_id, g.school_id, g.name, g.level, g.academic_year,
    g.created_at, g.updated_at,
    (SELECT COUNT(*) FROM students st WHERE st.grade_id = g.grade_id),
    (SELECT COUNT(*) FROM students st
       WHERE st.grade_id = g.grade_id AND st.status = 'active'),
    (SELECT COALESCE(SUM(p.amount), 0)
       FROM payments p JOIN students st ON st.student_id = p.student_id
       WHERE st.grade_id = g.grade_id AND p.status = 'paid')
  FROM grades g";

fn select_grade(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<RawGrade>> {
  conn
    .query_row(
      &format!("{SELECT_GRADE} WHERE g.grade_id = ?1"),
      rusqlite::params![id],
      RawGrade::from_row,
    )
    .optional()
}

pub(crate) fn write_grade(conn: &rusqlite::Connection, grade: &Grade) -> Result<()> {
  let changed = conn.execute(
    "UPDATE grades
     SET name = ?2, level = ?3, academic_year = ?4, updated_at = ?5
     WHERE grade_id = ?1",
    rusqlite::params![
      grade.grade_id.as_str(),
      grade.name,
      grade.level,
      grade.academic_year,
      encode_dt(grade.updated_at),
    ],
  )?;
  if changed == 0 {
    return Err(campus_core::Error::not_found(EntityKind::Grade, &grade.grade_id).into());
  }
  Ok(())
}

impl SqliteStore {
  async fn get_grade(&self, id: GradeId) -> Result<Grade> {
    let id_str = id.as_str().to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(select_grade(conn, &id_str)?))
      .await?;

    raw
      .ok_or_else(|| Error::Core(campus_core::Error::not_found(EntityKind::Grade, &id)))?
      .into_grade()
  }

  async fn list_grades(&self, school: SchoolId, params: ListParams) -> Result<Vec<Grade>> {
    if params.is_empty_page() {
      return Ok(Vec::new());
    }

    let school_str = school.into_inner();
    let pattern    = like_pattern(params.search.as_deref());
    let limit      = sql_limit(params.limit);
    let offset     = sql_offset(params.offset);
    let order      = order_clause(params.order, "g", "g.name", "grade_id");

    let raws: Vec<RawGrade> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{SELECT_GRADE}
           WHERE g.school_id = ?1 AND (?2 IS NULL OR g.name LIKE ?2 ESCAPE '\\')
           {order}
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![school_str, pattern, limit, offset],
            RawGrade::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGrade::into_grade).collect()
  }

  async fn insert_grade(&self, draft: NewGrade) -> Result<Grade> {
    draft.validate()?;

    let now = Utc::now();
    let grade = Grade {
      grade_id:      new_id().into(),
      school_id:     draft.school_id,
      name:          draft.name.trim().to_owned(),
      level:         draft.level.trim().to_owned(),
      academic_year: draft.academic_year.trim().to_owned(),
      stats:         GradeStats::default(),
      created_at:    now,
      updated_at:    now,
    };

    let row = grade.clone();
    self
      .transact(move |conn| {
        if !row_exists(conn, "schools", "school_id", row.school_id.as_str())? {
          return Err(
            campus_core::Error::validation(format!(
              "school {} does not exist",
              row.school_id
            ))
            .into(),
          );
        }
        conn.execute(
          "INSERT INTO grades (
             grade_id, school_id, name, level, academic_year, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            row.grade_id.as_str(),
            row.school_id.as_str(),
            row.name,
            row.level,
            row.academic_year,
            encode_dt(row.created_at),
            encode_dt(row.updated_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(grade_id = %grade.grade_id, school_id = %grade.school_id, "created grade");
    Ok(grade)
  }

  async fn patch_grade(&self, id: GradeId, patch: GradePatch) -> Result<Grade> {
    self
      .transact(move |conn| {
        let mut grade = select_grade(conn, id.as_str())?
          .ok_or_else(|| campus_core::Error::not_found(EntityKind::Grade, &id))?
          .into_grade()?;
        patch.apply(&mut grade);
        grade.validate()?;
        grade.updated_at = Utc::now();
        write_grade(conn, &grade)?;
        Ok(grade)
      })
      .await
  }
}

impl Repository<Grade> for SqliteStore {
  async fn fetch_by_id(&self, id: GradeId) -> campus_core::Result<Grade> {
    Ok(self.get_grade(id).await?)
  }

  async fn fetch_by_parent(
    &self,
    parent: SchoolId,
    params: ListParams,
  ) -> campus_core::Result<Vec<Grade>> {
    Ok(self.list_grades(parent, params).await?)
  }

  async fn create(&self, draft: NewGrade) -> campus_core::Result<Grade> {
    Ok(self.insert_grade(draft).await?)
  }

  async fn update(&self, id: GradeId, patch: GradePatch) -> campus_core::Result<Grade> {
    Ok(self.patch_grade(id, patch).await?)
  }

  async fn delete(&self, id: GradeId) -> campus_core::Result<()> {
    if !self.delete_row("grades", "grade_id", id.as_str().to_owned()).await? {
      return Err(campus_core::Error::not_found(EntityKind::Grade, id));
    }
    Ok(())
  }
}
