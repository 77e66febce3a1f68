//! Keyed cache of fetched results.
//!
//! Each key owns a `watch` channel holding its current [`Slot`]. Handles
//! returned by [`QueryCache::get`] subscribe to that channel, so a snapshot
//! is always available synchronously and consumers can await updates.
//!
//! Fetches run on spawned tasks. Dropping every handle does not cancel a
//! fetch; its result still lands in the cache. Each fetch carries an id and a
//! completion is applied only while that id is the one in flight, so a fetch
//! that outlived a `remove` or `clear` is discarded.

use std::{
  any::Any,
  collections::HashMap,
  future::Future,
  marker::PhantomData,
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
};

use campus_core::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
  config::CacheConfig,
  key::{KeyPattern, QueryKey},
};

type AnyData = Arc<dyn Any + Send + Sync>;

// ─── Public state ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// Never fetched (or fetching is disabled).
  Idle,
  Loading,
  Success,
  /// The last fetch failed. Data from an earlier success may still be present.
  Error,
}

/// Per-call options for [`QueryCache::get`].
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
  /// When false the cache is read but no fetch is started.
  pub enabled:    bool,
  /// Overrides the cache-wide stale time for this call.
  pub stale_time: Option<TimeDelta>,
}

impl Default for QueryOptions {
  fn default() -> Self { Self { enabled: true, stale_time: None } }
}

impl QueryOptions {
  pub fn disabled() -> Self { Self { enabled: false, ..Self::default() } }

  pub fn with_stale_time(mut self, stale_time: TimeDelta) -> Self {
    self.stale_time = Some(stale_time);
    self
  }
}

/// A consistent view of one cache entry.
#[derive(Debug)]
pub struct Snapshot<T> {
  pub data:       Option<Arc<T>>,
  pub status:     QueryStatus,
  pub error:      Option<Error>,
  pub fetched_at: Option<DateTime<Utc>>,
  /// Invalidated since the data was fetched.
  pub is_stale:   bool,
}

impl<T> Clone for Snapshot<T> {
  fn clone(&self) -> Self {
    Self {
      data:       self.data.clone(),
      status:     self.status,
      error:      self.error.clone(),
      fetched_at: self.fetched_at,
      is_stale:   self.is_stale,
    }
  }
}

impl<T> Snapshot<T> {
  pub fn is_loading(&self) -> bool { self.status == QueryStatus::Loading }

  /// The error of a failed fetch, otherwise the data.
  pub fn into_result(self) -> Result<Arc<T>> {
    if let Some(error) = self.error.filter(|_| self.status == QueryStatus::Error) {
      return Err(error);
    }
    self.data.ok_or_else(|| match self.status {
      QueryStatus::Success => {
        Error::Transport("cached value has an unexpected type".to_owned())
      }
      _ => Error::Transport("query has not produced data".to_owned()),
    })
  }
}

// ─── Slot ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Slot {
  data:       Option<AnyData>,
  status:     QueryStatus,
  error:      Option<Error>,
  fetched_at: Option<DateTime<Utc>>,
  stale:      bool,
  in_flight:  Option<u64>,
}

impl Slot {
  fn idle() -> Self {
    Self {
      data:       None,
      status:     QueryStatus::Idle,
      error:      None,
      fetched_at: None,
      stale:      false,
      in_flight:  None,
    }
  }

  fn needs_fetch(&self, now: DateTime<Utc>, stale_time: TimeDelta) -> bool {
    if self.in_flight.is_some() {
      return false;
    }
    match self.status {
      QueryStatus::Idle | QueryStatus::Error | QueryStatus::Loading => true,
      QueryStatus::Success => {
        self.stale
          || self
            .fetched_at
            .is_none_or(|at| now.signed_duration_since(at) > stale_time)
      }
    }
  }

  fn begin(&mut self, fetch_id: u64) {
    self.in_flight = Some(fetch_id);
    self.status = QueryStatus::Loading;
    // Invalidations from here on apply to the new fetch.
    self.stale = false;
  }

  fn project<T: Send + Sync + 'static>(&self) -> Snapshot<T> {
    Snapshot {
      data:       self.data.clone().and_then(|d| d.downcast::<T>().ok()),
      status:     self.status,
      error:      self.error.clone(),
      fetched_at: self.fetched_at,
      is_stale:   self.stale,
    }
  }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Live view of one key, typed as the data the fetcher produces.
pub struct QueryHandle<T> {
  key:     QueryKey,
  rx:      watch::Receiver<Slot>,
  _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> QueryHandle<T> {
  pub fn key(&self) -> &QueryKey { &self.key }

  pub fn snapshot(&self) -> Snapshot<T> { self.rx.borrow().project() }

  /// Wait for the next update. `None` once the entry has been removed.
  pub async fn changed(&mut self) -> Option<Snapshot<T>> {
    self.rx.changed().await.ok()?;
    Some(self.rx.borrow_and_update().project())
  }

  /// Wait until the entry is no longer loading.
  pub async fn settled(&mut self) -> Snapshot<T> {
    loop {
      let snapshot: Snapshot<T> = self.rx.borrow_and_update().project();
      if !snapshot.is_loading() {
        return snapshot;
      }
      if self.rx.changed().await.is_err() {
        return self.snapshot();
      }
    }
  }
}

// ─── Cache ───────────────────────────────────────────────────────────────────

struct Inner {
  entries:    Mutex<HashMap<QueryKey, watch::Sender<Slot>>>,
  next_fetch: AtomicU64,
  stale_time: TimeDelta,
}

/// Cheaply cloneable; clones share the same entries.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Inner>,
}

impl QueryCache {
  pub fn new(config: &CacheConfig) -> Self {
    Self {
      inner: Arc::new(Inner {
        entries:    Mutex::new(HashMap::new()),
        next_fetch: AtomicU64::new(1),
        stale_time: config.stale_time(),
      }),
    }
  }

  /// Subscribe to `key`, starting a fetch if the entry is missing, stale or
  /// errored and nothing is in flight. `fetcher` is only called when a fetch
  /// actually starts.
  pub fn get<T, F, Fut>(
    &self,
    key: QueryKey,
    fetcher: F,
    options: QueryOptions,
  ) -> QueryHandle<T>
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let stale_time = options.stale_time.unwrap_or(self.inner.stale_time);

    let (rx, fetch_id) = {
      let mut entries = self.inner.entries.lock();
      let tx = entries
        .entry(key.clone())
        .or_insert_with(|| watch::channel(Slot::idle()).0);

      let start =
        options.enabled && tx.borrow().needs_fetch(Utc::now(), stale_time);
      let fetch_id = start.then(|| {
        let id = self.inner.next_fetch.fetch_add(1, Ordering::Relaxed);
        tx.send_modify(|slot| slot.begin(id));
        id
      });
      // Subscribed after `begin` so the loading state counts as seen.
      (tx.subscribe(), fetch_id)
    };

    match fetch_id {
      Some(id) => {
        tracing::debug!(%key, fetch = id, "starting fetch");
        let future = fetcher();
        let cache = self.clone();
        let task_key = key.clone();
        tokio::spawn(async move {
          let result = future.await.map(|data| Arc::new(data) as AnyData);
          cache.complete(&task_key, id, result);
        });
      }
      None => tracing::trace!(%key, "served from cache"),
    }

    QueryHandle { key, rx, _marker: PhantomData }
  }

  /// [`get`](Self::get) and wait for the result.
  pub async fn fetch<T, F, Fut>(
    &self,
    key: QueryKey,
    fetcher: F,
    options: QueryOptions,
  ) -> Result<Arc<T>>
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    self.get(key, fetcher, options).settled().await.into_result()
  }

  /// Current snapshot of `key` without fetching. Idle if absent.
  pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Snapshot<T> {
    let entries = self.inner.entries.lock();
    match entries.get(key) {
      Some(tx) => tx.borrow().project(),
      None => Slot::idle().project(),
    }
  }

  /// Mark every matching entry stale. Returns how many matched.
  pub fn invalidate(&self, pattern: &KeyPattern) -> usize {
    let entries = self.inner.entries.lock();
    let mut count = 0;
    for (key, tx) in entries.iter().filter(|(key, _)| pattern.matches(key)) {
      tx.send_modify(|slot| slot.stale = true);
      tracing::trace!(%key, "invalidated");
      count += 1;
    }
    count
  }

  /// Drop every matching entry. Open handles see their channel close.
  pub fn remove(&self, pattern: &KeyPattern) -> usize {
    let mut entries = self.inner.entries.lock();
    let before = entries.len();
    entries.retain(|key, _| !pattern.matches(key));
    before - entries.len()
  }

  pub fn clear(&self) {
    let removed = self.remove(&KeyPattern::All);
    tracing::debug!(removed, "cache cleared");
  }

  pub fn len(&self) -> usize { self.inner.entries.lock().len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  fn complete(&self, key: &QueryKey, fetch_id: u64, result: Result<AnyData>) {
    let entries = self.inner.entries.lock();
    let Some(tx) = entries.get(key) else {
      tracing::debug!(%key, fetch = fetch_id, "entry removed, dropping result");
      return;
    };

    tx.send_if_modified(|slot| {
      if slot.in_flight != Some(fetch_id) {
        return false;
      }
      slot.in_flight = None;
      match result {
        Ok(data) => {
          slot.data = Some(data);
          slot.status = QueryStatus::Success;
          slot.error = None;
          slot.fetched_at = Some(Utc::now());
          tracing::debug!(%key, fetch = fetch_id, "fetch succeeded");
        }
        Err(error) => {
          tracing::warn!(%key, fetch = fetch_id, %error, "fetch failed");
          slot.status = QueryStatus::Error;
          slot.error = Some(error);
        }
      }
      true
    });
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;

  use campus_core::{EntityKind, ListParams};
  use tokio::sync::oneshot;

  use super::*;

  fn cache() -> QueryCache { QueryCache::new(&CacheConfig::default()) }

  fn key(id: &str) -> QueryKey {
    QueryKey::One { kind: EntityKind::School, id: id.to_owned() }
  }

  fn counted(
    calls: &Arc<AtomicUsize>,
    value: Result<u32>,
  ) -> impl FnOnce() -> std::future::Ready<Result<u32>> {
    let calls = Arc::clone(calls);
    move || {
      calls.fetch_add(1, Ordering::SeqCst);
      std::future::ready(value)
    }
  }

  #[tokio::test]
  async fn concurrent_gets_share_one_fetch() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let (release, gate) = oneshot::channel::<()>();

    let c = Arc::clone(&calls);
    let mut first = cache.get(
      key("s1"),
      move || {
        c.fetch_add(1, Ordering::SeqCst);
        async move {
          let _ = gate.await;
          Ok(7_u32)
        }
      },
      QueryOptions::default(),
    );
    let mut second =
      cache.get(key("s1"), counted(&calls, Ok(99)), QueryOptions::default());

    assert!(first.snapshot().is_loading());
    assert!(second.snapshot().is_loading());

    release.send(()).unwrap();
    let a = first.settled().await;
    let b = second.settled().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.data.as_deref(), Some(&7));
    assert_eq!(b.data.as_deref(), Some(&7));
  }

  #[tokio::test]
  async fn fresh_entry_is_served_without_fetching() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));

    cache
      .fetch(key("s1"), counted(&calls, Ok(1)), QueryOptions::default())
      .await
      .unwrap();
    let handle =
      cache.get(key("s1"), counted(&calls, Ok(2)), QueryOptions::default());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.status, QueryStatus::Success);
    assert_eq!(snapshot.data.as_deref(), Some(&1));
  }

  #[tokio::test]
  async fn invalidation_forces_a_refetch() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));

    cache
      .fetch(key("s1"), counted(&calls, Ok(1)), QueryOptions::default())
      .await
      .unwrap();
    assert_eq!(cache.invalidate(&KeyPattern::Exact(key("s1"))), 1);
    assert!(cache.peek::<u32>(&key("s1")).is_stale);

    let value = cache
      .fetch(key("s1"), counted(&calls, Ok(2)), QueryOptions::default())
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*value, 2);
    assert!(!cache.peek::<u32>(&key("s1")).is_stale);
  }

  #[tokio::test]
  async fn expired_stale_time_refetches() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = QueryOptions::default().with_stale_time(TimeDelta::seconds(-1));

    cache.fetch(key("s1"), counted(&calls, Ok(1)), options).await.unwrap();
    cache.fetch(key("s1"), counted(&calls, Ok(2)), options).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn failure_keeps_last_known_good_data() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));

    cache
      .fetch(key("s1"), counted(&calls, Ok(1)), QueryOptions::default())
      .await
      .unwrap();
    cache.invalidate(&KeyPattern::All);

    let err = cache
      .fetch(
        key("s1"),
        counted(&calls, Err(Error::Transport("offline".into()))),
        QueryOptions::default(),
      )
      .await
      .unwrap_err();
    assert_eq!(err, Error::Transport("offline".into()));

    let snapshot = cache.peek::<u32>(&key("s1"));
    assert_eq!(snapshot.status, QueryStatus::Error);
    assert_eq!(snapshot.data.as_deref(), Some(&1));
    assert!(snapshot.error.is_some());
  }

  #[tokio::test]
  async fn errored_entry_retries_on_next_get() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));

    let _ = cache
      .fetch(
        key("s1"),
        counted(&calls, Err(Error::Transport("offline".into()))),
        QueryOptions::default(),
      )
      .await;
    let value = cache
      .fetch(key("s1"), counted(&calls, Ok(3)), QueryOptions::default())
      .await
      .unwrap();

    assert_eq!(*value, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn invalidation_during_flight_leaves_entry_stale() {
    let cache = cache();
    let (release, gate) = oneshot::channel::<()>();

    let mut handle = cache.get(
      key("s1"),
      move || async move {
        let _ = gate.await;
        Ok(1_u32)
      },
      QueryOptions::default(),
    );
    cache.invalidate(&KeyPattern::All);
    release.send(()).unwrap();

    let snapshot = handle.settled().await;
    assert_eq!(snapshot.status, QueryStatus::Success);
    assert!(snapshot.is_stale);
  }

  #[tokio::test]
  async fn dropped_handle_does_not_cancel_fetch() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let (release, gate) = oneshot::channel::<()>();

    drop(cache.get(
      key("s1"),
      move || async move {
        let _ = gate.await;
        Ok(5_u32)
      },
      QueryOptions::default(),
    ));
    release.send(()).unwrap();

    // Joins the in-flight fetch rather than starting another.
    let value = cache
      .fetch(key("s1"), counted(&calls, Ok(0)), QueryOptions::default())
      .await
      .unwrap();
    assert_eq!(*value, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn disabled_query_stays_idle() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));

    let handle =
      cache.get(key("s1"), counted(&calls, Ok(1)), QueryOptions::disabled());

    assert_eq!(handle.snapshot().status, QueryStatus::Idle);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn clear_discards_late_results() {
    let cache = cache();
    let (release, gate) = oneshot::channel::<()>();

    let mut handle = cache.get(
      key("s1"),
      move || async move {
        let _ = gate.await;
        Ok(1_u32)
      },
      QueryOptions::default(),
    );
    cache.clear();
    release.send(()).unwrap();

    assert!(handle.changed().await.is_none());
    assert!(cache.is_empty());
    assert_eq!(cache.peek::<u32>(&key("s1")).status, QueryStatus::Idle);
  }

  #[tokio::test]
  async fn remove_only_drops_matching_entries() {
    let cache = cache();
    let list = QueryKey::List {
      kind:   EntityKind::Grade,
      parent: "s1".into(),
      params: ListParams::default(),
    };

    let options = QueryOptions::default();
    cache.fetch(key("s1"), || async { Ok(1_u32) }, options).await.unwrap();
    cache.fetch(list.clone(), || async { Ok(2_u32) }, options).await.unwrap();

    assert_eq!(cache.remove(&KeyPattern::Lists(EntityKind::Grade)), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.peek::<u32>(&list).status, QueryStatus::Idle);
  }
}
