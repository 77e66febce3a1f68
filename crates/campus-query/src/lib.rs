//! Client-side data layer for Campus screens.
//!
//! - [`QueryCache`] serves reads: keyed snapshots with loading / error state,
//!   staleness, and coalescing of concurrent fetches for the same key.
//! - [`MutationCoordinator`] runs writes, rejects duplicate in-flight writes
//!   of the same operation, and invalidates cache entries on success.
//! - [`Session`] ties both to a [`campus_core::CampusStore`] for one signed-in
//!   user and knows which keys each mutation affects.

pub mod cache;
pub mod config;
pub mod filter;
pub mod key;
pub mod mutation;
pub mod session;

pub use cache::{QueryCache, QueryHandle, QueryOptions, QueryStatus, Snapshot};
pub use config::CacheConfig;
pub use filter::filter_by_name;
pub use key::{KeyPattern, QueryKey};
pub use mutation::{MutationCoordinator, MutationEvent, MutationKey, MutationOp};
pub use session::Session;
