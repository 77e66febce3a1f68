//! SQLite backend for the Campus data layer.
//!
//! Implements [`campus_core::Repository`] for every entity type on a single
//! [`SqliteStore`]. Wraps [`tokio_rusqlite`] so all database access runs on a
//! dedicated thread without blocking the async runtime.

mod encode;
mod grade;
mod payment;
mod schema;
mod school;
mod store;
mod student;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
