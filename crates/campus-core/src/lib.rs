//! Core types and trait definitions for the Campus school data layer.
//!
//! This crate is free of HTTP, database and runtime dependencies. Every other
//! crate depends on it: the storage backends implement [`Repository`], the
//! query layer caches what repositories return, and the UI derives its
//! breadcrumbs from [`route::Route`].

// We intentionally use native `async fn` in traits.
#![allow(async_fn_in_trait)]

pub mod breadcrumb;
pub mod entity;
pub mod error;
pub mod grade;
pub mod id;
pub mod payment;
pub mod repository;
pub mod route;
pub mod school;
pub mod student;

pub use entity::{Draft, Entity, EntityKind, Named, Patch};
pub use error::{Error, Result};
pub use repository::{CampusStore, ListOrder, ListParams, Repository};
