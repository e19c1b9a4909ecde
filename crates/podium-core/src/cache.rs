//! Memoised query results, scoped by season.
//!
//! The cache is an explicit value owned by the [`crate::analyzer::Analyzer`];
//! nothing in the process reaches it through a global. Warm reads share a read
//! lock. Every invalidation bumps one cache-wide epoch, so a recompute that
//! started before an invalidation cannot store its result afterwards (see
//! [`QueryCache::put_if_epoch`]). Invalidated seasons are removed outright.

use std::{
  collections::HashMap,
  sync::{
    Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    atomic::{AtomicU64, Ordering},
  },
};

use serde::Serialize;

use crate::{
  search::{BestPosition, SearchMode},
  season::{DriverCode, SeasonId},
  store::{WinProbability, WinProbabilityTable},
};

// ─── Keys and values ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
  BestPositions(SearchMode),
  WinProbability { driver: DriverCode, num_races: u32 },
  WinProbabilityTable,
}

#[derive(Debug, Clone)]
pub enum CachedValue {
  BestPositions(Arc<Vec<BestPosition>>),
  WinProbability(WinProbability),
  WinProbabilityTable(Arc<WinProbabilityTable>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
  pub hits:    u64,
  pub misses:  u64,
  pub entries: usize,
  /// Seasons holding at least one entry.
  pub seasons: usize,
}

type SeasonEntries = HashMap<QueryKey, CachedValue>;

#[derive(Debug, Default)]
struct Entries {
  epoch:   u64,
  seasons: HashMap<SeasonId, SeasonEntries>,
}

// ─── Cache ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct QueryCache {
  entries: RwLock<Entries>,
  hits:    AtomicU64,
  misses:  AtomicU64,
}

impl QueryCache {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, season: SeasonId, key: &QueryKey) -> Option<CachedValue> {
    let found = self
      .read()
      .seasons
      .get(&season)
      .and_then(|s| s.get(key))
      .cloned();
    let counter = if found.is_some() { &self.hits } else { &self.misses };
    counter.fetch_add(1, Ordering::Relaxed);
    found
  }

  pub fn put(&self, season: SeasonId, key: QueryKey, value: CachedValue) {
    self.write().seasons.entry(season).or_default().insert(key, value);
  }

  /// Store `value` only if `season` has not been invalidated since `epoch`
  /// was read. Returns whether the value was stored.
  pub fn put_if_epoch(
    &self,
    season: SeasonId,
    epoch: u64,
    key: QueryKey,
    value: CachedValue,
  ) -> bool {
    let mut entries = self.write();
    if entries.epoch != epoch {
      return false;
    }
    entries.seasons.entry(season).or_default().insert(key, value);
    true
  }

  /// Current invalidation epoch.
  pub fn epoch(&self) -> u64 { self.read().epoch }

  /// Drop every entry for `season`.
  pub fn invalidate(&self, season: SeasonId) {
    let mut entries = self.write();
    entries.seasons.remove(&season);
    entries.epoch += 1;
  }

  /// Drop every entry for every season.
  pub fn clear_all(&self) {
    let mut entries = self.write();
    entries.seasons.clear();
    entries.epoch += 1;
  }

  pub fn stats(&self) -> CacheStats {
    let entries = self.read();
    CacheStats {
      hits:    self.hits.load(Ordering::Relaxed),
      misses:  self.misses.load(Ordering::Relaxed),
      entries: entries.seasons.values().map(HashMap::len).sum(),
      seasons: entries.seasons.len(),
    }
  }

  fn read(&self) -> RwLockReadGuard<'_, Entries> {
    self.entries.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, Entries> {
    self.entries.write().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn win(wins: u64) -> CachedValue {
    CachedValue::WinProbability(WinProbability {
      driver: "VER".into(),
      num_races: 2,
      wins,
      total: 3,
    })
  }

  fn key() -> QueryKey {
    QueryKey::WinProbability { driver: "VER".into(), num_races: 2 }
  }

  fn wins_of(value: Option<CachedValue>) -> Option<u64> {
    match value? {
      CachedValue::WinProbability(p) => Some(p.wins),
      _ => None,
    }
  }

  #[test]
  fn get_after_put_hits() {
    let cache = QueryCache::new();
    assert!(cache.get(2025, &key()).is_none());
    cache.put(2025, key(), win(2));
    assert_eq!(wins_of(cache.get(2025, &key())), Some(2));

    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
  }

  #[test]
  fn invalidate_is_scoped_to_one_season() {
    let cache = QueryCache::new();
    cache.put(2024, key(), win(1));
    cache.put(2025, key(), win(2));
    cache.invalidate(2025);
    assert!(cache.get(2025, &key()).is_none());
    assert_eq!(wins_of(cache.get(2024, &key())), Some(1));
  }

  #[test]
  fn invalidating_unknown_seasons_does_not_grow_the_cache() {
    let cache = QueryCache::new();
    cache.put(2024, key(), win(1));
    for season in 0..1_000 {
      cache.invalidate(season + 10_000);
    }
    assert_eq!(cache.stats().seasons, 1);

    cache.invalidate(2024);
    assert_eq!(cache.stats().seasons, 0);
  }

  #[test]
  fn clear_all_drops_everything() {
    let cache = QueryCache::new();
    cache.put(2024, key(), win(1));
    cache.put(2025, QueryKey::WinProbabilityTable, win(2));
    cache.clear_all();
    assert_eq!(cache.stats().entries, 0);
  }

  #[test]
  fn stale_recompute_is_discarded() {
    let cache = QueryCache::new();
    let epoch = cache.epoch();
    // An import lands while the recompute is in flight.
    cache.invalidate(2025);
    assert!(!cache.put_if_epoch(2025, epoch, key(), win(9)));
    assert!(cache.get(2025, &key()).is_none());

    let epoch = cache.epoch();
    assert!(cache.put_if_epoch(2025, epoch, key(), win(3)));
    assert_eq!(wins_of(cache.get(2025, &key())), Some(3));
  }

  #[test]
  fn concurrent_readers_share_warm_entries() {
    let cache = Arc::new(QueryCache::new());
    cache.put(2025, key(), win(2));

    let readers: Vec<_> = (0..8)
      .map(|_| {
        let cache = Arc::clone(&cache);
        std::thread::spawn(move || {
          (0..100).all(|_| wins_of(cache.get(2025, &key())) == Some(2))
        })
      })
      .collect();

    for r in readers {
      assert!(r.join().unwrap());
    }
    assert_eq!(cache.stats().hits, 800);
  }
}
