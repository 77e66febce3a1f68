//! `Repository<Payment>` for [`SqliteStore`].

use campus_core::{
  Draft as _, Entity as _, EntityKind, ListParams, Patch as _, Repository,
  id::{PaymentId, StudentId},
  payment::{NewPayment, Payment, PaymentPatch},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result, SqliteStore,
  encode::{
    RawPayment, encode_date, encode_dt, like_pattern, new_id, sql_limit, sql_offset,
  },
  store::{order_clause, row_exists},
};

const SELECT_PAYMENT: &str = "
  SELECT
    p.payment_id, p.student_id, p.amount, p.concept, p.status,
    p.due_date, p.paid_at, p.created_at, p.updated_at
  FROM payments p";

fn select_payment(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawPayment>> {
  conn
    .query_row(
      &format!("{SELECT_PAYMENT} WHERE p.payment_id = ?1"),
      rusqlite::params![id],
      RawPayment::from_row,
    )
    .optional()
}

pub(crate) fn write_payment(conn: &rusqlite::Connection, payment: &Payment) -> Result<()> {
  let changed = conn.execute(
    "UPDATE payments
     SET amount = ?2, concept = ?3, status = ?4, due_date = ?5,
         paid_at = ?6, updated_at = ?7
     WHERE payment_id = ?1",
    rusqlite::params![
      payment.payment_id.as_str(),
      payment.amount,
      payment.concept,
      payment.status.as_ref(),
      encode_date(payment.due_date),
      payment.paid_at.map(encode_dt),
      encode_dt(payment.updated_at),
    ],
  )?;
  if changed == 0 {
    return Err(
      campus_core::Error::not_found(EntityKind::Payment, &payment.payment_id).into(),
    );
  }
  Ok(())
}

impl SqliteStore {
  async fn get_payment(&self, id: PaymentId) -> Result<Payment> {
    let id_str = id.as_str().to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(select_payment(conn, &id_str)?))
      .await?;

    raw
      .ok_or_else(|| Error::Core(campus_core::Error::not_found(EntityKind::Payment, &id)))?
      .into_payment()
  }

  async fn list_payments(&self, student: StudentId, params: ListParams) -> Result<Vec<Payment>> {
    if params.is_empty_page() {
      return Ok(Vec::new());
    }

    let student_str = student.into_inner();
    let pattern     = like_pattern(params.search.as_deref());
    let limit       = sql_limit(params.limit);
    let offset      = sql_offset(params.offset);
    // Payments read best in due-date order; "name" order means that here.
    let order       = order_clause(params.order, "p", "p.due_date", "payment_id");

    let raws: Vec<RawPayment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{SELECT_PAYMENT}
           WHERE p.student_id = ?1 AND (?2 IS NULL OR p.concept LIKE ?2 ESCAPE '\\')
           {order}
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![student_str, pattern, limit, offset],
            RawPayment::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPayment::into_payment).collect()
  }

  async fn insert_payment(&self, draft: NewPayment) -> Result<Payment> {
    draft.validate()?;

    let now = Utc::now();
    let mut payment = Payment {
      payment_id: new_id().into(),
      student_id: draft.student_id,
      amount:     draft.amount,
      concept:    draft.concept.trim().to_owned(),
      status:     draft.status,
      due_date:   draft.due_date,
      paid_at:    None,
      created_at: now,
      updated_at: now,
    };
    payment.sync_paid_at(now);

    let row = payment.clone();
    self
      .transact(move |conn| {
        if !row_exists(conn, "students", "student_id", row.student_id.as_str())? {
          return Err(
            campus_core::Error::validation(format!(
              "student {} does not exist",
              row.student_id
            ))
            .into(),
          );
        }
        conn.execute(
          "INSERT INTO payments (
             payment_id, student_id, amount, concept, status,
             due_date, paid_at, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            row.payment_id.as_str(),
            row.student_id.as_str(),
            row.amount,
            row.concept,
            row.status.as_ref(),
            encode_date(row.due_date),
            row.paid_at.map(encode_dt),
            encode_dt(row.created_at),
            encode_dt(row.updated_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(payment_id = %payment.payment_id, student_id = %payment.student_id, "recorded payment");
    Ok(payment)
  }

  async fn patch_payment(&self, id: PaymentId, patch: PaymentPatch) -> Result<Payment> {
    self
      .transact(move |conn| {
        let mut payment = select_payment(conn, id.as_str())?
          .ok_or_else(|| campus_core::Error::not_found(EntityKind::Payment, &id))?
          .into_payment()?;
        patch.apply(&mut payment);
        payment.validate()?;

        let now = Utc::now();
        payment.sync_paid_at(now);
        payment.updated_at = now;
        write_payment(conn, &payment)?;
        Ok(payment)
      })
      .await
  }
}

impl Repository<Payment> for SqliteStore {
  async fn fetch_by_id(&self, id: PaymentId) -> campus_core::Result<Payment> {
    Ok(self.get_payment(id).await?)
  }

  async fn fetch_by_parent(
    &self,
    parent: StudentId,
    params: ListParams,
  ) -> campus_core::Result<Vec<Payment>> {
    Ok(self.list_payments(parent, params).await?)
  }

  async fn create(&self, draft: NewPayment) -> campus_core::Result<Payment> {
    Ok(self.insert_payment(draft).await?)
  }

  async fn update(
    &self,
    id: PaymentId,
    patch: PaymentPatch,
  ) -> campus_core::Result<Payment> {
    Ok(self.patch_payment(id, patch).await?)
  }

  async fn delete(&self, id: PaymentId) -> campus_core::Result<()> {
    if !self.delete_row("payments", "payment_id", id.as_str().to_owned()).await? {
      return Err(campus_core::Error::not_found(EntityKind::Payment, id));
    }
    Ok(())
  }
}
