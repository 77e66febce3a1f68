//! `Repository<Student>` for [`SqliteStore`].

use campus_core::{
  Draft as _, Entity as _, EntityKind, ListParams, Patch as _, Repository,
  id::{GradeId, StudentId},
  student::{NewStudent, Student, StudentPatch, StudentStats, full_name},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result, SqliteStore,
  encode::{
    RawStudent, encode_date, encode_dt, like_pattern, new_id, sql_limit, sql_offset,
  },
  store::order_clause,
};

const SELECT_STUDENT: &str = "
  SELECT
    st.student_id, st.school_id, st.grade_id, st.first_name, st.last_name,
    st.student_code, st.email, st.phone, st.status, st.enrollment_date,
    st.created_at, st.updated_at,
    (SELECT COUNT(*) FROM payments p WHERE p.student_id = st.student_id),
    (SELECT COALESCE(SUM(p.amount), 0) FROM payments p
       WHERE p.student_id = st.student_id AND p.status = 'pending')
  FROM students st";

fn invalid(message: String) -> Error {
  Error::Core(campus_core::Error::Validation(message))
}

fn select_student(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawStudent>> {
  conn
    .query_row(
      &format!("{SELECT_STUDENT} WHERE st.student_id = ?1"),
      rusqlite::params![id],
      RawStudent::from_row,
    )
    .optional()
}

/// The school a grade belongs to, or `None` if the grade does not exist.
fn school_of_grade(
  conn: &rusqlite::Connection,
  grade: &GradeId,
) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      "SELECT school_id FROM grades WHERE grade_id = ?1",
      rusqlite::params![grade.as_str()],
      |r| r.get::<_, String>(0),
    )
    .optional()
}

/// Fails when another student in the same grade already uses the code.
fn ensure_code_free(conn: &rusqlite::Connection, student: &Student) -> Result<()> {
  let taken = conn
    .query_row(
      "SELECT 1 FROM students
       WHERE grade_id = ?1 AND student_code = ?2 AND student_id != ?3",
      rusqlite::params![
        student.grade_id.as_str(),
        student.student_code,
        student.student_id.as_str(),
      ],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);
  if taken {
    return Err(invalid(format!(
      "student code {:?} is already used in grade {}",
      student.student_code, student.grade_id
    )));
  }
  Ok(())
}

pub(crate) fn write_student(conn: &rusqlite::Connection, student: &Student) -> Result<()> {
  let changed = conn.execute(
    "UPDATE students
     SET first_name = ?2, last_name = ?3, student_code = ?4, email = ?5,
         phone = ?6, status = ?7, enrollment_date = ?8, updated_at = ?9
     WHERE student_id = ?1",
    rusqlite::params![
      student.student_id.as_str(),
      student.first_name,
      student.last_name,
      student.student_code,
      student.email,
      student.phone,
      student.status.as_ref(),
      encode_date(student.enrollment_date),
      encode_dt(student.updated_at),
    ],
  )?;
  if changed == 0 {
    return Err(
      campus_core::Error::not_found(EntityKind::Student, &student.student_id).into(),
    );
  }
  Ok(())
}

impl SqliteStore {
  async fn get_student(&self, id: StudentId) -> Result<Student> {
    let id_str = id.as_str().to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(select_student(conn, &id_str)?))
      .await?;

    raw
      .ok_or_else(|| Error::Core(campus_core::Error::not_found(EntityKind::Student, &id)))?
      .into_student()
  }

  async fn list_students(&self, grade: GradeId, params: ListParams) -> Result<Vec<Student>> {
    if params.is_empty_page() {
      return Ok(Vec::new());
    }

    let grade_str = grade.into_inner();
    let pattern   = like_pattern(params.search.as_deref());
    let limit     = sql_limit(params.limit);
    let offset    = sql_offset(params.offset);
    let order     = order_clause(
      params.order,
      "st",
      "st.last_name || ' ' || st.first_name",
      "student_id",
    );

    let raws: Vec<RawStudent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{SELECT_STUDENT}
           WHERE st.grade_id = ?1
             AND (?2 IS NULL
                  OR st.first_name   LIKE ?2 ESCAPE '\\'
                  OR st.last_name    LIKE ?2 ESCAPE '\\'
                  OR st.student_code LIKE ?2 ESCAPE '\\')
           {order}
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![grade_str, pattern, limit, offset],
            RawStudent::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStudent::into_student).collect()
  }

  async fn insert_student(&self, draft: NewStudent) -> Result<Student> {
    draft.validate()?;

    let now = Utc::now();
    let first_name = draft.first_name.trim().to_owned();
    let last_name = draft.last_name.trim().to_owned();
    let student = Student {
      student_id: new_id().into(),
      school_id: draft.school_id,
      grade_id: draft.grade_id,
      full_name: full_name(&first_name, &last_name),
      first_name,
      last_name,
      student_code: draft.student_code.trim().to_owned(),
      email: draft.email,
      phone: draft.phone,
      status: draft.status,
      enrollment_date: draft.enrollment_date.unwrap_or_else(|| now.date_naive()),
      stats: StudentStats::default(),
      created_at: now,
      updated_at: now,
    };

    let row = student.clone();
    self
      .transact(move |conn| {
        match school_of_grade(conn, &row.grade_id)? {
          None => {
            return Err(invalid(format!("grade {} does not exist", row.grade_id)));
          }
          Some(school) if school != row.school_id.as_str() => {
            return Err(invalid(format!(
              "grade {} does not belong to school {}",
              row.grade_id, row.school_id
            )));
          }
          Some(_) => {}
        }
        ensure_code_free(conn, &row)?;

        conn.execute(
          "INSERT INTO students (
             student_id, school_id, grade_id, first_name, last_name,
             student_code, email, phone, status, enrollment_date,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            row.student_id.as_str(),
            row.school_id.as_str(),
            row.grade_id.as_str(),
            row.first_name,
            row.last_name,
            row.student_code,
            row.email,
            row.phone,
            row.status.as_ref(),
            encode_date(row.enrollment_date),
            encode_dt(row.created_at),
            encode_dt(row.updated_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(student_id = %student.student_id, grade_id = %student.grade_id, "created student");
    Ok(student)
  }

  async fn patch_student(&self, id: StudentId, patch: StudentPatch) -> Result<Student> {
    self
      .transact(move |conn| {
        let mut student = select_student(conn, id.as_str())?
          .ok_or_else(|| campus_core::Error::not_found(EntityKind::Student, &id))?
          .into_student()?;
        patch.apply(&mut student);
        student.validate()?;
        ensure_code_free(conn, &student)?;
        student.updated_at = Utc::now();
        write_student(conn, &student)?;
        Ok(student)
      })
      .await
  }
}

impl Repository<Student> for SqliteStore {
  async fn fetch_by_id(&self, id: StudentId) -> campus_core::Result<Student> {
    Ok(self.get_student(id).await?)
  }

  async fn fetch_by_parent(
    &self,
    parent: GradeId,
    params: ListParams,
  ) -> campus_core::Result<Vec<Student>> {
    Ok(self.list_students(parent, params).await?)
  }

  async fn create(&self, draft: NewStudent) -> campus_core::Result<Student> {
    Ok(self.insert_student(draft).await?)
  }

  async fn update(
    &self,
    id: StudentId,
    patch: StudentPatch,
  ) -> campus_core::Result<Student> {
    Ok(self.patch_student(id, patch).await?)
  }

  async fn delete(&self, id: StudentId) -> campus_core::Result<()> {
    if !self.delete_row("students", "student_id", id.as_str().to_owned()).await? {
      return Err(campus_core::Error::not_found(EntityKind::Student, id));
    }
    Ok(())
  }
}
