//! [`Repository`](campus_core::Repository) over the Campus JSON API.
//!
//! [`HttpStore`] is a [`campus_core::CampusStore`], so a
//! `campus_query::Session` can run against a remote server exactly as it
//! does against a local SQLite file.

pub mod error;
mod store;

pub use error::ClientError;
pub use store::{ClientConfig, HttpStore};

#[cfg(test)]
mod tests;
