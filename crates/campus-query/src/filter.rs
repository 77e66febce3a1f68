//! Search-box filtering over loaded items.

use campus_core::Named;
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};

/// Items whose display name fuzzy-matches `query`, best match first. Ties
/// keep their original order. A blank query returns everything as is.
pub fn filter_by_name<'a, T: Named>(items: &'a [T], query: &str) -> Vec<&'a T> {
  let query = query.trim();
  if query.is_empty() {
    return items.iter().collect();
  }

  let matcher = SkimMatcherV2::default().ignore_case();
  let mut scored: Vec<(i64, &T)> = items
    .iter()
    .filter_map(|item| {
      matcher
        .fuzzy_match(item.display_name(), query)
        .map(|score| (score, item))
    })
    .collect();
  scored.sort_by(|a, b| b.0.cmp(&a.0));
  scored.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Item(&'static str);

  impl Named for Item {
    fn display_name(&self) -> &str { self.0 }
  }

  fn names<'a>(items: &[&'a Item]) -> Vec<&'a str> {
    items.iter().map(|i| i.0).collect()
  }

  #[test]
  fn blank_query_keeps_everything() {
    let items = [Item("Lincoln"), Item("Roosevelt")];
    assert_eq!(names(&filter_by_name(&items, "  ")), ["Lincoln", "Roosevelt"]);
  }

  #[test]
  fn non_matching_items_are_dropped() {
    let items = [Item("Lincoln High"), Item("Roosevelt"), Item("Lincoln Elementary")];
    let found = filter_by_name(&items, "linc");
    assert_eq!(found.len(), 2);
    assert!(names(&found).iter().all(|n| n.starts_with("Lincoln")));
  }

  #[test]
  fn matching_ignores_case() {
    let items = [Item("Ana Ruiz")];
    assert_eq!(filter_by_name(&items, "ANA").len(), 1);
  }
}
