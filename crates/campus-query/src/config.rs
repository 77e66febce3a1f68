//! Cache configuration.

use chrono::TimeDelta;
use serde::Deserialize;

/// Tunables for a [`crate::Session`]'s cache and coordinator.
///
/// Deserialisable so it can sit in the same config file as the rest of the
/// application settings; every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// How long a successful fetch is served without refetching.
  pub stale_time_secs: u64,
  /// Buffered mutation events per subscriber before the oldest are dropped.
  pub event_capacity:  usize,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { stale_time_secs: 60, event_capacity: 64 }
  }
}

impl CacheConfig {
  pub fn stale_time(&self) -> TimeDelta {
    i64::try_from(self.stale_time_secs)
      .ok()
      .and_then(TimeDelta::try_seconds)
      .unwrap_or(TimeDelta::MAX)
  }
}
