//! [`Analyzer`], the service root that fronts a [`ChampionshipStore`].
//!
//! Every mutation goes through the analyzer so the cache for the affected
//! season is invalidated once the store call returns. Best positions and win
//! probabilities are served from the cache when warm.

use std::{sync::Arc, time::Instant};

use serde::Deserialize;

use crate::{
  cache::{CacheStats, CachedValue, QueryCache, QueryKey},
  search::{BestPosition, DEFAULT_PER_SIZE_CAP, SearchMode},
  season::{DriverCode, RaceResult, Season, SeasonId},
  store::{
    Championship, ChampionshipDetail, ChampionshipId, ChampionshipStore,
    DriverStats, HeadToHead, MinRacesToWin, Page, PositionCount, SeasonInfo,
    TitleCount, WinProbability, WinProbabilityTable,
  },
  subset::RaceSubset,
};

/// Query tuning, deserialised from the `[query]` config section.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
  /// Per-size row cap for heuristic best-position scans.
  pub best_position_cap: u32,
}

impl Default for QueryConfig {
  fn default() -> Self { Self { best_position_cap: DEFAULT_PER_SIZE_CAP } }
}

pub struct Analyzer<S> {
  store:  Arc<S>,
  cache:  Arc<QueryCache>,
  config: QueryConfig,
}

impl<S> Clone for Analyzer<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      cache:  Arc::clone(&self.cache),
      config: self.config,
    }
  }
}

impl<S: ChampionshipStore> Analyzer<S> {
  pub fn new(store: Arc<S>, cache: Arc<QueryCache>, config: QueryConfig) -> Self {
    Self { store, cache, config }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn cache_stats(&self) -> CacheStats { self.cache.stats() }

  /// The configured heuristic strategy, or the exhaustive one.
  pub fn search_mode(&self, exhaustive: bool) -> SearchMode {
    if exhaustive {
      SearchMode::Exhaustive
    } else {
      SearchMode::heuristic(self.config.best_position_cap)
    }
  }

  // ── Mutations ─────────────────────────────────────────────────────────

  pub async fn import_season(
    &self,
    season: SeasonId,
    data: Season,
    clear_existing: bool,
  ) -> Result<u64, S::Error> {
    let started = Instant::now();
    let races = data.race_count();
    let result = self.store.import_season(season, data, clear_existing).await;
    // Invalidate even on failure: a failed import may already have cleared
    // the season's old records.
    self.cache.invalidate(season);
    let written = result?;
    tracing::info!(
      season,
      races,
      records = written,
      elapsed_ms = started.elapsed().as_millis() as u64,
      "season imported"
    );
    Ok(written)
  }

  pub async fn add_race(
    &self,
    season: SeasonId,
    race: RaceResult,
  ) -> Result<u64, S::Error> {
    let started = Instant::now();
    let result = self.store.add_race(season, race).await;
    self.cache.invalidate(season);
    let written = result?;
    tracing::info!(
      season,
      records = written,
      elapsed_ms = started.elapsed().as_millis() as u64,
      "race appended"
    );
    Ok(written)
  }

  pub async fn clear_season(&self, season: SeasonId) -> Result<u64, S::Error> {
    let result = self.store.clear_season(season).await;
    self.cache.invalidate(season);
    let removed = result?;
    tracing::info!(season, records = removed, "season cleared");
    Ok(removed)
  }

  /// Drop cached results for one season, or for all of them.
  pub fn clear_cache(&self, season: Option<SeasonId>) {
    match season {
      Some(season) => self.cache.invalidate(season),
      None => self.cache.clear_all(),
    }
    tracing::debug!(?season, "query cache cleared");
  }

  // ── Metadata and records ──────────────────────────────────────────────

  pub async fn season_info(
    &self,
    season: SeasonId,
  ) -> Result<Option<SeasonInfo>, S::Error> {
    self.store.season_info(season).await
  }

  pub async fn list_seasons(&self) -> Result<Vec<SeasonInfo>, S::Error> {
    self.store.list_seasons().await
  }

  pub async fn season_digest(
    &self,
    season: SeasonId,
  ) -> Result<Option<String>, S::Error> {
    self.store.season_digest(season).await
  }

  /// Find the championship for `indices`, given in any order. Empty lists and
  /// out-of-range indices are simply not found.
  pub async fn lookup_by_subset(
    &self,
    season: SeasonId,
    indices: &[u32],
  ) -> Result<Option<ChampionshipId>, S::Error> {
    let Ok(subset) = RaceSubset::from_indices(indices) else {
      return Ok(None);
    };
    self.store.lookup_by_subset(season, subset).await
  }

  pub async fn championship_detail(
    &self,
    season: SeasonId,
    id: ChampionshipId,
  ) -> Result<Option<ChampionshipDetail>, S::Error> {
    self.store.championship_detail(season, id).await
  }

  pub async fn championships(
    &self,
    season: SeasonId,
    page: u32,
    per_page: u32,
  ) -> Result<Page<Championship>, S::Error> {
    self.store.championships(season, page.max(1), per_page).await
  }

  // ── Cached queries ────────────────────────────────────────────────────

  /// Best position of every driver.
  pub async fn best_positions(
    &self,
    season: SeasonId,
    mode: SearchMode,
  ) -> Result<Arc<Vec<BestPosition>>, S::Error> {
    let key = QueryKey::BestPositions(mode);
    if let Some(CachedValue::BestPositions(hit)) = self.cache.get(season, &key) {
      return Ok(hit);
    }

    let epoch = self.cache.epoch();
    let fresh = Arc::new(self.store.best_positions(season, mode).await?);
    self.store_if_current(
      season,
      epoch,
      key,
      CachedValue::BestPositions(Arc::clone(&fresh)),
    );
    Ok(fresh)
  }

  /// Best position of one driver; `None` if the driver never appears.
  pub async fn best_position(
    &self,
    season: SeasonId,
    driver: &str,
    mode: SearchMode,
  ) -> Result<Option<BestPosition>, S::Error> {
    let all = self.best_positions(season, mode).await?;
    Ok(all.iter().find(|b| b.driver == driver).cloned())
  }

  pub async fn win_probability(
    &self,
    season: SeasonId,
    driver: DriverCode,
    num_races: u32,
  ) -> Result<WinProbability, S::Error> {
    let key = QueryKey::WinProbability { driver: driver.clone(), num_races };
    if let Some(CachedValue::WinProbability(hit)) = self.cache.get(season, &key) {
      return Ok(hit);
    }

    let epoch = self.cache.epoch();
    let fresh = self.store.win_probability(season, driver, num_races).await?;
    self.store_if_current(
      season,
      epoch,
      key,
      CachedValue::WinProbability(fresh.clone()),
    );
    Ok(fresh)
  }

  pub async fn win_probability_table(
    &self,
    season: SeasonId,
  ) -> Result<Arc<WinProbabilityTable>, S::Error> {
    let key = QueryKey::WinProbabilityTable;
    if let Some(CachedValue::WinProbabilityTable(hit)) = self.cache.get(season, &key)
    {
      return Ok(hit);
    }

    let epoch = self.cache.epoch();
    let fresh = Arc::new(self.store.win_probability_table(season).await?);
    self.store_if_current(
      season,
      epoch,
      key,
      CachedValue::WinProbabilityTable(Arc::clone(&fresh)),
    );
    Ok(fresh)
  }

  fn store_if_current(
    &self,
    season: SeasonId,
    epoch: u64,
    key: QueryKey,
    value: CachedValue,
  ) {
    if !self.cache.put_if_epoch(season, epoch, key, value) {
      tracing::debug!(season, "discarded result computed before invalidation");
    }
  }

  // ── Uncached queries ──────────────────────────────────────────────────

  pub async fn head_to_head(
    &self,
    season: SeasonId,
    driver_a: DriverCode,
    driver_b: DriverCode,
  ) -> Result<HeadToHead, S::Error> {
    self.store.head_to_head(season, driver_a, driver_b).await
  }

  pub async fn min_races_to_win(
    &self,
    season: SeasonId,
    driver: DriverCode,
  ) -> Result<Option<u32>, S::Error> {
    self.store.min_races_to_win(season, driver).await
  }

  pub async fn all_min_races_to_win(
    &self,
    season: SeasonId,
  ) -> Result<Vec<MinRacesToWin>, S::Error> {
    self.store.all_min_races_to_win(season).await
  }

  pub async fn championship_wins(
    &self,
    season: SeasonId,
  ) -> Result<Vec<TitleCount>, S::Error> {
    self.store.championship_wins(season).await
  }

  pub async fn driver_stats(
    &self,
    season: SeasonId,
    driver: DriverCode,
  ) -> Result<DriverStats, S::Error> {
    self.store.driver_stats(season, driver).await
  }

  pub async fn position_counts(
    &self,
    season: SeasonId,
    position: u32,
  ) -> Result<Vec<PositionCount>, S::Error> {
    self.store.position_counts(season, position).await
  }
}
