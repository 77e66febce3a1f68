//! `Repository<School>` for [`SqliteStore`].

use campus_core::{
  Draft as _, Entity as _, EntityKind, ListParams, Patch as _, Repository,
  id::{SchoolId, UserId},
  school::{NewSchool, School, SchoolPatch, SchoolStats},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result, SqliteStore,
  encode::{RawSchool, encode_dt, like_pattern, new_id, sql_limit, sql_offset},
  store::order_clause,
};

const SELECT_SCHOOL: &str = "
  SELECT
    s.school_id, s.user_id, s.name, s.address, s.phone, s.email,
    s.status, s.debt_amount, s.created_at, s.updated_at,
    (SELECT COUNT(*) FROM grades   g  WHERE g.school_id  = s.school_id),
    (SELECT COUNT(*) FROM students st WHERE st.school_id = s.school_id)
  FROM schools s";

fn select_school(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawSchool>> {
  conn
    .query_row(
      &format!("{SELECT_SCHOOL} WHERE s.school_id = ?1"),
      rusqlite::params![id],
      RawSchool::from_row,
    )
    .optional()
}

/// Overwrite the stored row with `school`. A row that vanished is
/// `NotFound`, never a silent no-op.
pub(crate) fn write_school(conn: &rusqlite::Connection, school: &School) -> Result<()> {
  let changed = conn.execute(
    "UPDATE schools
     SET name = ?2, address = ?3, phone = ?4, email = ?5,
         status = ?6, debt_amount = ?7, updated_at = ?8
     WHERE school_id = ?1",
    rusqlite::params![
      school.school_id.as_str(),
      school.name,
      school.address,
      school.phone,
      school.email,
      school.status.as_ref(),
      school.debt_amount,
      encode_dt(school.updated_at),
    ],
  )?;
  if changed == 0 {
    return Err(campus_core::Error::not_found(EntityKind::School, &school.school_id).into());
  }
  Ok(())
}

impl SqliteStore {
  async fn get_school(&self, id: SchoolId) -> Result<School> {
    let id_str = id.as_str().to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(select_school(conn, &id_str)?))
      .await?;

    raw
      .ok_or_else(|| Error::Core(campus_core::Error::not_found(EntityKind::School, &id)))?
      .into_school()
  }

  async fn list_schools(&self, user: UserId, params: ListParams) -> Result<Vec<School>> {
    if params.is_empty_page() {
      return Ok(Vec::new());
    }

    let user_str = user.into_inner();
    let pattern  = like_pattern(params.search.as_deref());
    let limit    = sql_limit(params.limit);
    let offset   = sql_offset(params.offset);
    let order    = order_clause(params.order, "s", "s.name", "school_id");

    let raws: Vec<RawSchool> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{SELECT_SCHOOL}
           WHERE s.user_id = ?1 AND (?2 IS NULL OR s.name LIKE ?2 ESCAPE '\\')
           {order}
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![user_str, pattern, limit, offset],
            RawSchool::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSchool::into_school).collect()
  }

  async fn insert_school(&self, draft: NewSchool) -> Result<School> {
    draft.validate()?;

    let now = Utc::now();
    let school = School {
      school_id:   new_id().into(),
      user_id:     draft.user_id,
      name:        draft.name.trim().to_owned(),
      address:     draft.address.trim().to_owned(),
      phone:       draft.phone,
      email:       draft.email,
      status:      draft.status,
      debt_amount: draft.debt_amount,
      stats:       SchoolStats::default(),
      created_at:  now,
      updated_at:  now,
    };

    let row = school.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO schools (
             school_id, user_id, name, address, phone, email,
             status, debt_amount, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            row.school_id.as_str(),
            row.user_id.as_str(),
            row.name,
            row.address,
            row.phone,
            row.email,
            row.status.as_ref(),
            row.debt_amount,
            encode_dt(row.created_at),
            encode_dt(row.updated_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(school_id = %school.school_id, "created school");
    Ok(school)
  }

  /// Read, merge, revalidate and write in one transaction, so a concurrent
  /// delete either wins outright or happens after the update.
  async fn patch_school(&self, id: SchoolId, patch: SchoolPatch) -> Result<School> {
    self
      .transact(move |conn| {
        let mut school = select_school(conn, id.as_str())?
          .ok_or_else(|| campus_core::Error::not_found(EntityKind::School, &id))?
          .into_school()?;
        patch.apply(&mut school);
        school.validate()?;
        school.updated_at = Utc::now();
        write_school(conn, &school)?;
        Ok(school)
      })
      .await
  }
}

impl Repository<School> for SqliteStore {
  async fn fetch_by_id(&self, id: SchoolId) -> campus_core::Result<School> {
    Ok(self.get_school(id).await?)
  }

  async fn fetch_by_parent(
    &self,
    parent: UserId,
    params: ListParams,
  ) -> campus_core::Result<Vec<School>> {
    Ok(self.list_schools(parent, params).await?)
  }

  async fn create(&self, draft: NewSchool) -> campus_core::Result<School> {
    Ok(self.insert_school(draft).await?)
  }

  async fn update(
    &self,
    id: SchoolId,
    patch: SchoolPatch,
  ) -> campus_core::Result<School> {
    Ok(self.patch_school(id, patch).await?)
  }

  async fn delete(&self, id: SchoolId) -> campus_core::Result<()> {
    if !self.delete_row("schools", "school_id", id.as_str().to_owned()).await? {
      return Err(campus_core::Error::not_found(EntityKind::School, id));
    }
    Ok(())
  }
}
