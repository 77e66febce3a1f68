//! [`SqliteStore`]: the SQLite implementation of every
//! [`campus_core::Repository`].
//!
//! The per-entity `Repository` impls live in sibling modules; this module
//! owns the connection and the helpers they share.

use std::path::Path;

use campus_core::ListOrder;
use rusqlite::OptionalExtension as _;

use crate::{Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Campus store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` in one transaction on the connection thread. The transaction
  /// commits only when `f` succeeds, so reads and the write that depends on
  /// them cannot interleave with another call.
  pub(crate) async fn transact<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let outcome = f(&*tx);
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;
    outcome
  }

  /// Delete the row with `id` from `table`, returning whether one existed.
  /// Child rows go with it through `ON DELETE CASCADE`.
  pub(crate) async fn delete_row(
    &self,
    table: &'static str,
    column: &'static str,
    id: String,
  ) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("DELETE FROM {table} WHERE {column} = ?1"),
          rusqlite::params![id],
        )?)
      })
      .await?;
    tracing::debug!(table, removed, "deleted row");
    Ok(removed > 0)
  }
}

/// Whether a row with `id` exists in `table`.
pub(crate) fn row_exists(
  conn: &rusqlite::Connection,
  table: &str,
  column: &str,
  id: &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        &format!("SELECT 1 FROM {table} WHERE {column} = ?1"),
        rusqlite::params![id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// `ORDER BY` clause for a list query. `name_expr` is the column the entity
/// is alphabetised by; `alias` is the table alias used in the query.
pub(crate) fn order_clause(
  order: ListOrder,
  alias: &str,
  name_expr: &str,
  id_column: &str,
) -> String {
  match order {
    ListOrder::Name => {
      format!("ORDER BY {name_expr} COLLATE NOCASE ASC, {alias}.{id_column} ASC")
    }
    ListOrder::NewestFirst => {
      format!("ORDER BY {alias}.created_at DESC, {alias}.{id_column} ASC")
    }
    ListOrder::OldestFirst => {
      format!("ORDER BY {alias}.created_at ASC, {alias}.{id_column} ASC")
    }
  }
}
