//! Payments: charges against a student, either pending or paid.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  entity::{Draft, Entity, EntityKind, Named, Patch, require, trimmed},
  id::{PaymentId, StudentId},
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
pub enum PaymentStatus {
  #[default]
  Pending,
  Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
  pub payment_id: PaymentId,
  pub student_id: StudentId,
  /// Minor currency units; always positive.
  pub amount:     i64,
  /// What the charge is for, e.g. "Mensualidad marzo".
  pub concept:    String,
  pub status:     PaymentStatus,
  pub due_date:   NaiveDate,
  /// Set when the payment transitions to [`PaymentStatus::Paid`].
  pub paid_at:    Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Payment {
  /// Keep `paid_at` consistent with `status`.
  pub fn sync_paid_at(&mut self, now: DateTime<Utc>) {
    match self.status {
      PaymentStatus::Paid => {
        self.paid_at.get_or_insert(now);
      }
      PaymentStatus::Pending => self.paid_at = None,
    }
  }
}

fn validate_fields(amount: i64, concept: &str) -> Result<()> {
  require("payment concept", concept)?;
  if amount <= 0 {
    return Err(crate::Error::validation("payment amount must be positive"));
  }
  Ok(())
}

impl Entity for Payment {
  type Draft = NewPayment;
  type Id = PaymentId;
  type Parent = StudentId;
  type Patch = PaymentPatch;

  const COLLECTION: &'static str = "payments";
  const KIND: EntityKind = EntityKind::Payment;
  const PARENT_COLLECTION: &'static str = "students";

  fn id(&self) -> &PaymentId { &self.payment_id }

  fn parent_id(&self) -> &StudentId { &self.student_id }

  fn validate(&self) -> Result<()> { validate_fields(self.amount, &self.concept) }
}

impl Named for Payment {
  fn display_name(&self) -> &str { &self.concept }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
  pub student_id: StudentId,
  pub amount:     i64,
  pub concept:    String,
  #[serde(default)]
  pub status:     PaymentStatus,
  pub due_date:   NaiveDate,
}

impl NewPayment {
  pub fn new(
    student_id: StudentId,
    amount: i64,
    concept: impl Into<String>,
    due_date: NaiveDate,
  ) -> Self {
    Self {
      student_id,
      amount,
      concept: concept.into(),
      status: PaymentStatus::default(),
      due_date,
    }
  }
}

impl Draft for NewPayment {
  type Parent = StudentId;

  fn parent_id(&self) -> &StudentId { &self.student_id }

  fn validate(&self) -> Result<()> {
    require("student id", self.student_id.as_str())?;
    validate_fields(self.amount, &self.concept)
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub amount:   Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub concept:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status:   Option<PaymentStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub due_date: Option<NaiveDate>,
}

impl Patch<Payment> for PaymentPatch {
  fn apply(self, payment: &mut Payment) {
    if let Some(amount) = self.amount {
      payment.amount = amount;
    }
    if let Some(concept) = self.concept {
      payment.concept = trimmed(concept);
    }
    if let Some(status) = self.status {
      payment.status = status;
    }
    if let Some(date) = self.due_date {
      payment.due_date = date;
    }
  }
}
