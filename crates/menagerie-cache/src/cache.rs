//! [`TtlCache`]: a bounded key-to-value cache with write-time expiry.
//!
//! Expiry is measured from the write (`put`), never extended by reads;
//! reads only refresh the recency used for size eviction. All bookkeeping
//! sits behind one mutex, so concurrent `get`/`put`/`evict` cannot corrupt
//! it, and every entry is replaced atomically as a whole.

use std::{
  collections::HashMap,
  time::{Duration, Instant},
};

use parking_lot::Mutex;

struct Entry<V> {
  value:      V,
  expires_at: Instant,
  last_used:  u64,
}

struct Inner<V> {
  entries: HashMap<String, Entry<V>>,
  tick:    u64,
}

pub struct TtlCache<V> {
  inner:    Mutex<Inner<V>>,
  capacity: usize,
  ttl:      Duration,
}

impl<V: Clone> TtlCache<V> {
  pub fn new(capacity: usize, ttl: Duration) -> Self {
    assert!(capacity > 0, "cache capacity must be at least 1");
    Self {
      inner: Mutex::new(Inner { entries: HashMap::new(), tick: 0 }),
      capacity,
      ttl,
    }
  }

  /// Look up `key`. Expired entries are treated as absent.
  pub fn get(&self, key: &str) -> Option<V> {
    let mut inner = self.inner.lock();
    inner.tick += 1;
    let tick = inner.tick;

    let entry = inner.entries.get_mut(key)?;
    if entry.expires_at <= Instant::now() {
      inner.entries.remove(key);
      return None;
    }
    entry.last_used = tick;
    Some(entry.value.clone())
  }

  /// Insert or replace `key`. The entry's lifetime restarts from now.
  pub fn put(&self, key: impl Into<String>, value: V) {
    let key = key.into();
    let now = Instant::now();
    let mut inner = self.inner.lock();
    inner.tick += 1;
    let tick = inner.tick;

    if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
      // Drop expired entries first; evict by recency only if still full.
      inner.entries.retain(|_, e| e.expires_at > now);
      if inner.entries.len() >= self.capacity {
        if let Some(lru) = inner
          .entries
          .iter()
          .min_by_key(|(_, e)| e.last_used)
          .map(|(k, _)| k.clone())
        {
          inner.entries.remove(&lru);
        }
      }
    }

    inner.entries.insert(
      key,
      Entry { value, expires_at: now + self.ttl, last_used: tick },
    );
  }

  pub fn evict(&self, key: &str) {
    self.inner.lock().entries.remove(key);
  }

  /// Remove every entry whose key starts with `prefix`.
  pub fn evict_prefix(&self, prefix: &str) {
    self
      .inner
      .lock()
      .entries
      .retain(|k, _| !k.starts_with(prefix));
  }

  pub fn clear(&self) {
    self.inner.lock().entries.clear();
  }

  /// Number of live (unexpired) entries.
  pub fn len(&self) -> usize {
    let now = Instant::now();
    self
      .inner
      .lock()
      .entries
      .values()
      .filter(|e| e.expires_at > now)
      .count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cache(capacity: usize, ttl_ms: u64) -> TtlCache<String> {
    TtlCache::new(capacity, Duration::from_millis(ttl_ms))
  }

  #[test]
  fn get_returns_what_was_put() {
    let c = cache(4, 60_000);
    c.put("a", "one".to_owned());
    assert_eq!(c.get("a").as_deref(), Some("one"));
    assert_eq!(c.get("b"), None);
  }

  #[test]
  fn put_replaces_the_whole_entry() {
    let c = cache(4, 60_000);
    c.put("a", "one".to_owned());
    c.put("a", "two".to_owned());
    assert_eq!(c.get("a").as_deref(), Some("two"));
    assert_eq!(c.len(), 1);
  }

  #[test]
  fn entries_expire_after_ttl() {
    let c = cache(4, 20);
    c.put("a", "one".to_owned());
    assert!(c.get("a").is_some());
    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(c.get("a"), None);
    assert!(c.is_empty());
  }

  #[test]
  fn reads_do_not_extend_the_ttl() {
    let c = cache(4, 50);
    c.put("a", "one".to_owned());
    std::thread::sleep(Duration::from_millis(30));
    assert!(c.get("a").is_some());
    std::thread::sleep(Duration::from_millis(30));
    // 60ms after the write the entry is gone, read or no read.
    assert_eq!(c.get("a"), None);
  }

  #[test]
  fn full_cache_evicts_least_recently_used() {
    let c = cache(2, 60_000);
    c.put("a", "one".to_owned());
    c.put("b", "two".to_owned());
    c.get("a"); // b is now least recently used
    c.put("c", "three".to_owned());

    assert!(c.get("a").is_some());
    assert_eq!(c.get("b"), None);
    assert!(c.get("c").is_some());
  }

  #[test]
  fn expired_entries_are_dropped_before_lru_eviction() {
    let c = cache(2, 30);
    c.put("a", "one".to_owned());
    c.put("b", "two".to_owned());
    std::thread::sleep(Duration::from_millis(50));
    c.put("c", "three".to_owned());
    // a and b were expired, so c did not need to evict anything live.
    assert!(c.get("c").is_some());
    assert_eq!(c.len(), 1);
  }

  #[test]
  fn evict_prefix_only_touches_matching_keys() {
    let c = cache(8, 60_000);
    c.put("r1:title:asc:0:10", "x".to_owned());
    c.put("r1:title:desc:0:10", "y".to_owned());
    c.put("r2:title:asc:0:10", "z".to_owned());

    c.evict_prefix("r1:");

    assert_eq!(c.get("r1:title:asc:0:10"), None);
    assert_eq!(c.get("r1:title:desc:0:10"), None);
    assert_eq!(c.get("r2:title:asc:0:10").as_deref(), Some("z"));
  }
}
