//! The `ChampionshipStore` trait and the result types it returns.
//!
//! The trait is implemented by storage backends (e.g. `podium-store-sqlite`).
//! Higher layers ([`crate::analyzer::Analyzer`], `podium-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  error::Classify,
  search::{BestPosition, SearchMode},
  season::{DriverCode, RaceResult, Season, SeasonId},
  standings::{RoundPoints, StandingEntry},
  subset::RaceSubset,
};

/// Surrogate key of a persisted championship record.
pub type ChampionshipId = i64;

// ─── Season metadata ─────────────────────────────────────────────────────────

/// Whether a season's records may be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonState {
  /// Every record of the last import or append has been committed.
  Complete,
  /// An import or append is running, or one failed part-way. Only a clear
  /// followed by a fresh import recovers a failed season.
  Incomplete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonInfo {
  pub season:      SeasonId,
  pub roster:      Vec<DriverCode>,
  pub num_races:   u32,
  pub state:       SeasonState,
  /// Number of championship records currently stored.
  pub records:     u64,
  pub imported_at: DateTime<Utc>,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One persisted championship: the standings of a single race subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Championship {
  pub championship_id: ChampionshipId,
  pub season:          SeasonId,
  pub num_races:       u32,
  pub rounds:          RaceSubset,
  pub winner:          DriverCode,
  pub standings:       Vec<StandingEntry>,
}

/// A championship together with every driver's points race by race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChampionshipDetail {
  #[serde(flatten)]
  pub championship: Championship,
  /// In standings order.
  pub round_points: Vec<RoundPoints>,
}

/// A page of results plus the total across all pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
  pub items:    Vec<T>,
  pub total:    u64,
  /// 1-based.
  pub page:     u32,
  pub per_page: u32,
}

impl<T> Page<T> {
  pub fn total_pages(&self) -> u64 {
    if self.per_page == 0 {
      return 0;
    }
    self.total.div_ceil(u64::from(self.per_page))
  }
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Titles won by `driver` among all subsets of exactly `num_races` races.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinProbability {
  pub driver:    DriverCode,
  pub num_races: u32,
  pub wins:      u64,
  /// Number of subsets of that size, `C(N, num_races)`.
  pub total:     u64,
}

impl WinProbability {
  /// `wins / total`, or 0 when no subset has that size.
  pub fn probability(&self) -> f64 {
    if self.total == 0 {
      0.0
    } else {
      self.wins as f64 / self.total as f64
    }
  }
}

/// How often each of two drivers finished ahead of the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadToHead {
  pub driver_a: DriverCode,
  pub driver_b: DriverCode,
  pub ahead_a:  u64,
  pub ahead_b:  u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleCount {
  pub driver: DriverCode,
  pub titles: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinRacesToWin {
  pub driver:    DriverCode,
  pub num_races: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionCount {
  pub driver:     DriverCode,
  pub count:      u64,
  /// Share of all the season's records, 0–100, two decimals.
  pub percentage: f64,
}

/// Summary of one driver across all of a season's championships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverStats {
  pub driver:                DriverCode,
  pub titles:                u64,
  pub championships:         u64,
  /// 0–100, two decimals.
  pub title_percentage:      f64,
  /// `None` only for a season without records.
  pub highest_position:      Option<u32>,
  pub min_races_to_win:      Option<u32>,
  /// Ascending by position; positions never reached are left out.
  pub position_distribution: Vec<PositionTally>,
  /// Largest lead over second place among the driver's titles.
  pub best_margin:           Option<WinningMargin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionTally {
  pub position: u32,
  pub count:    u64,
}

/// Points between the winner and second place in one championship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningMargin {
  pub margin:          u32,
  pub championship_id: ChampionshipId,
}

/// Win counts for every driver at every season length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinProbabilityTable {
  /// Ascending; `1..=N`.
  pub season_lengths:   Vec<u32>,
  /// Subsets per length, parallel to `season_lengths`.
  pub possible_seasons: Vec<u64>,
  /// Sorted by win percentage at the longest length, highest first.
  pub drivers:          Vec<DriverWinRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverWinRow {
  pub driver:          DriverCode,
  pub total_titles:    u64,
  /// Parallel to [`WinProbabilityTable::season_lengths`].
  pub wins_per_length: Vec<u64>,
  /// Parallel to [`WinProbabilityTable::season_lengths`]; 0–100.
  pub percentages:     Vec<f64>,
}

/// Round to two decimals for display-oriented percentages.
pub fn percentage(part: u64, whole: u64) -> f64 {
  if whole == 0 {
    return 0.0;
  }
  (part as f64 * 10_000.0 / whole as f64).round() / 100.0
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a championship store backend.
///
/// Records are written in bulk by `import_season` or appended by `add_race`
/// and are otherwise immutable. At most one mutation per season runs at a
/// time; reads never wait for the writer, and a season that is being written
/// (or whose write failed) is reported as incomplete rather than read.
pub trait ChampionshipStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Mutations ─────────────────────────────────────────────────────────

  /// Generate and persist the standings of every non-empty race subset of
  /// `data`. Returns the number of records written.
  ///
  /// If the season already has records, fails unless `clear_existing`, in
  /// which case they are deleted first.
  fn import_season(
    &self,
    season: SeasonId,
    data: Season,
    clear_existing: bool,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Append race `N + 1`, writing only the `2^N` new subsets that include
  /// it. Existing records are never rewritten.
  fn add_race(
    &self,
    season: SeasonId,
    race: RaceResult,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Delete every record of `season`. Returns the number of championship
  /// records removed.
  fn clear_season(
    &self,
    season: SeasonId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Metadata ──────────────────────────────────────────────────────────

  fn season_info(
    &self,
    season: SeasonId,
  ) -> impl Future<Output = Result<Option<SeasonInfo>, Self::Error>> + Send + '_;

  fn list_seasons(
    &self,
  ) -> impl Future<Output = Result<Vec<SeasonInfo>, Self::Error>> + Send + '_;

  /// Hex SHA-256 over the season's records in subset order, ignoring
  /// surrogate keys. Identical inputs produce identical digests.
  fn season_digest(
    &self,
    season: SeasonId,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  // ── Records ───────────────────────────────────────────────────────────

  /// The championship holding exactly `subset`, if it was generated.
  fn lookup_by_subset(
    &self,
    season: SeasonId,
    subset: RaceSubset,
  ) -> impl Future<Output = Result<Option<ChampionshipId>, Self::Error>> + Send + '_;

  fn championship(
    &self,
    season: SeasonId,
    id: ChampionshipId,
  ) -> impl Future<Output = Result<Option<Championship>, Self::Error>> + Send + '_;

  /// [`ChampionshipStore::championship`] with the per-race points of every
  /// driver, taken from the season's point matrix.
  fn championship_detail(
    &self,
    season: SeasonId,
    id: ChampionshipId,
  ) -> impl Future<Output = Result<Option<ChampionshipDetail>, Self::Error>> + Send + '_;

  /// Records in id order; `page` is 1-based.
  fn championships(
    &self,
    season: SeasonId,
    page: u32,
    per_page: u32,
  ) -> impl Future<Output = Result<Page<Championship>, Self::Error>> + Send + '_;

  // ── Analytical queries ────────────────────────────────────────────────

  /// Best position reached by every driver, searched according to `mode`.
  fn best_positions(
    &self,
    season: SeasonId,
    mode: SearchMode,
  ) -> impl Future<Output = Result<Vec<BestPosition>, Self::Error>> + Send + '_;

  fn win_probability(
    &self,
    season: SeasonId,
    driver: DriverCode,
    num_races: u32,
  ) -> impl Future<Output = Result<WinProbability, Self::Error>> + Send + '_;

  fn win_probability_table(
    &self,
    season: SeasonId,
  ) -> impl Future<Output = Result<WinProbabilityTable, Self::Error>> + Send + '_;

  fn head_to_head(
    &self,
    season: SeasonId,
    driver_a: DriverCode,
    driver_b: DriverCode,
  ) -> impl Future<Output = Result<HeadToHead, Self::Error>> + Send + '_;

  /// Smallest subset size for which `driver` wins at least once.
  fn min_races_to_win(
    &self,
    season: SeasonId,
    driver: DriverCode,
  ) -> impl Future<Output = Result<Option<u32>, Self::Error>> + Send + '_;

  /// [`ChampionshipStore::min_races_to_win`] for every driver who ever wins,
  /// smallest first.
  fn all_min_races_to_win(
    &self,
    season: SeasonId,
  ) -> impl Future<Output = Result<Vec<MinRacesToWin>, Self::Error>> + Send + '_;

  /// Titles per driver across all subsets, most first.
  fn championship_wins(
    &self,
    season: SeasonId,
  ) -> impl Future<Output = Result<Vec<TitleCount>, Self::Error>> + Send + '_;

  /// Titles, position distribution and best winning margin of `driver`.
  fn driver_stats(
    &self,
    season: SeasonId,
    driver: DriverCode,
  ) -> impl Future<Output = Result<DriverStats, Self::Error>> + Send + '_;

  /// How often each driver finishes at `position`, most first.
  fn position_counts(
    &self,
    season: SeasonId,
    position: u32,
  ) -> impl Future<Output = Result<Vec<PositionCount>, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn probability_of_empty_bucket_is_zero() {
    let p = WinProbability { driver: "VER".into(), num_races: 4, wins: 0, total: 0 };
    assert_eq!(p.probability(), 0.0);
  }

  #[test]
  fn probability_is_exact_ratio() {
    let p = WinProbability { driver: "VER".into(), num_races: 2, wins: 3, total: 3 };
    assert_eq!(p.probability(), 1.0);
  }

  #[test]
  fn percentage_rounds_to_two_decimals() {
    assert_eq!(percentage(1, 3), 33.33);
    assert_eq!(percentage(2, 3), 66.67);
    assert_eq!(percentage(5, 0), 0.0);
  }

  #[test]
  fn page_count_rounds_up() {
    let page: Page<()> = Page { items: vec![], total: 7, page: 1, per_page: 3 };
    assert_eq!(page.total_pages(), 3);
  }
}
