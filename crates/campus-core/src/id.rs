//! Opaque string identifiers.
//!
//! Ids are generated by the backend and never interpreted by this crate; the
//! newtypes only keep a `SchoolId` from being passed where a `GradeId` is
//! expected.

use std::{fmt, hash::Hash};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Bounds shared by every identifier newtype.
pub trait EntityId:
  Clone
  + Eq
  + Hash
  + fmt::Debug
  + fmt::Display
  + AsRef<str>
  + From<String>
  + Serialize
  + DeserializeOwned
  + Send
  + Sync
  + 'static
{
}

macro_rules! entity_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(String);

    impl $name {
      pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

      pub fn as_str(&self) -> &str { &self.0 }

      pub fn into_inner(self) -> String { self.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl AsRef<str> for $name {
      fn as_ref(&self) -> &str { &self.0 }
    }

    impl From<String> for $name {
      fn from(id: String) -> Self { Self(id) }
    }

    impl From<&str> for $name {
      fn from(id: &str) -> Self { Self(id.to_owned()) }
    }

    impl EntityId for $name {}
  };
}

entity_id!(
  /// The account that owns a set of schools.
  UserId
);
entity_id!(SchoolId);
entity_id!(GradeId);
entity_id!(StudentId);
entity_id!(PaymentId);
