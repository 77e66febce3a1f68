//! Cache keys and the patterns used to invalidate them.

use std::fmt;

use campus_core::{Entity, EntityKind, ListParams};

/// Identifies one cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
  /// A single entity by id.
  One { kind: EntityKind, id: String },
  /// A page of the children of `parent`.
  List {
    kind:   EntityKind,
    parent: String,
    params: ListParams,
  },
}

impl QueryKey {
  pub fn one<E: Entity>(id: &E::Id) -> Self {
    Self::One { kind: E::KIND, id: id.to_string() }
  }

  pub fn list<E: Entity>(parent: &E::Parent, params: ListParams) -> Self {
    Self::List { kind: E::KIND, parent: parent.to_string(), params }
  }

  pub fn kind(&self) -> EntityKind {
    match self {
      Self::One { kind, .. } | Self::List { kind, .. } => *kind,
    }
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::One { kind, id } => write!(f, "{kind}({id})"),
      Self::List { kind, parent, params } => {
        write!(f, "{kind}-list({parent})")?;
        if *params != ListParams::default() {
          write!(f, "{params:?}")?;
        }
        Ok(())
      }
    }
  }
}

/// Selects a set of cache entries for invalidation or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
  All,
  /// Every entry of a kind, single or list.
  Kind(EntityKind),
  /// Every list of a kind, whatever the parent.
  Lists(EntityKind),
  /// Every list of a kind under one parent, whatever the params.
  ListsUnder { kind: EntityKind, parent: String },
  One { kind: EntityKind, id: String },
  Exact(QueryKey),
}

impl KeyPattern {
  pub fn kind<E: Entity>() -> Self { Self::Kind(E::KIND) }

  pub fn lists<E: Entity>() -> Self { Self::Lists(E::KIND) }

  pub fn lists_under<E: Entity>(parent: &E::Parent) -> Self {
    Self::ListsUnder { kind: E::KIND, parent: parent.to_string() }
  }

  pub fn one<E: Entity>(id: &E::Id) -> Self {
    Self::One { kind: E::KIND, id: id.to_string() }
  }

  pub fn matches(&self, key: &QueryKey) -> bool {
    match (self, key) {
      (Self::All, _) => true,
      (Self::Kind(kind), key) => key.kind() == *kind,
      (Self::Lists(kind), QueryKey::List { kind: k, .. }) => k == kind,
      (
        Self::ListsUnder { kind, parent },
        QueryKey::List { kind: k, parent: p, .. },
      ) => k == kind && p == parent,
      (Self::One { kind, id }, QueryKey::One { kind: k, id: i }) => {
        k == kind && i == id
      }
      (Self::Exact(exact), key) => exact == key,
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use campus_core::{
    grade::Grade,
    id::{SchoolId, UserId},
    school::School,
  };

  use super::*;

  #[test]
  fn lists_under_ignores_params_but_not_parent() {
    let s1 = SchoolId::new("s1");
    let pattern = KeyPattern::lists_under::<Grade>(&s1);

    assert!(pattern.matches(&QueryKey::list::<Grade>(&s1, ListParams::default())));
    assert!(pattern.matches(&QueryKey::list::<Grade>(&s1, ListParams::limit(5))));
    assert!(!pattern.matches(&QueryKey::list::<Grade>(
      &SchoolId::new("s2"),
      ListParams::default()
    )));
    assert!(!pattern.matches(&QueryKey::one::<School>(&s1)));
  }

  #[test]
  fn kind_covers_single_and_list() {
    let pattern = KeyPattern::kind::<School>();
    assert!(pattern.matches(&QueryKey::one::<School>(&"s1".into())));
    assert!(pattern.matches(&QueryKey::list::<School>(
      &UserId::new("u1"),
      ListParams::default()
    )));
    assert!(!pattern.matches(&QueryKey::one::<Grade>(&"g1".into())));
  }

  #[test]
  fn display_names_the_query() {
    assert_eq!(QueryKey::one::<School>(&"s1".into()).to_string(), "school(s1)");
    assert_eq!(
      QueryKey::list::<School>(&"u1".into(), ListParams::default()).to_string(),
      "school-list(u1)"
    );
  }
}
