//! Best-position search over the championship space.
//!
//! Finding a driver's best position exactly means looking at every record. The
//! heuristic strategy walks subset sizes from largest to smallest and reads at
//! most `per_size_cap` records per size; the exhaustive strategy reads them
//! all. Both feed the same [`PositionTracker`], so the only difference between
//! them is the row limit the backend applies to each size bucket.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{season::DriverCode, store::ChampionshipId};

/// Default per-size row cap for [`SearchMode::Heuristic`].
///
/// This is an approximation parameter, not a bound with a proof behind it: a
/// driver's true best position can hide in a row past the cap.
pub const DEFAULT_PER_SIZE_CAP: u32 = 10_000;

/// Witnessing championship ids kept per driver.
pub const WITNESS_LIMIT: usize = 5;

// ─── Strategy ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchMode {
  /// Read at most `per_size_cap` records of each subset size.
  Heuristic { per_size_cap: u32 },
  /// Read every record. Used to verify heuristic answers.
  Exhaustive,
}

impl SearchMode {
  pub fn heuristic(per_size_cap: u32) -> Self { Self::Heuristic { per_size_cap } }

  /// Rows to fetch per size bucket; `None` means unlimited.
  pub fn row_limit(self) -> Option<u32> {
    match self {
      Self::Heuristic { per_size_cap } => Some(per_size_cap),
      Self::Exhaustive => None,
    }
  }
}

impl Default for SearchMode {
  fn default() -> Self { Self::heuristic(DEFAULT_PER_SIZE_CAP) }
}

/// Whether a reported position is proven optimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exactness {
  Exact,
  /// A better position may exist in a record the capped scan skipped.
  Approximate,
}

/// The best position a driver reached, with championships that witness it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestPosition {
  pub driver:           DriverCode,
  pub position:         u32,
  /// Up to [`WITNESS_LIMIT`] ids, in scan order.
  pub championship_ids: Vec<ChampionshipId>,
  pub exactness:        Exactness,
}

impl BestPosition {
  pub fn witness(&self) -> Option<ChampionshipId> {
    self.championship_ids.first().copied()
  }

  pub fn is_exact(&self) -> bool { self.exactness == Exactness::Exact }
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

/// Accumulates best positions while a backend streams standings to it.
///
/// Backends call [`PositionTracker::observe`] for every record read and
/// [`PositionTracker::finish_bucket`] after each size bucket, and stop as soon
/// as [`PositionTracker::is_done`] reports that every driver reached first
/// place.
#[derive(Debug)]
pub struct PositionTracker {
  mode:      SearchMode,
  roster:    Vec<DriverCode>,
  pending:   HashSet<DriverCode>,
  best:      HashMap<DriverCode, (u32, Vec<ChampionshipId>)>,
  truncated: bool,
}

impl PositionTracker {
  pub fn new(roster: &[DriverCode], mode: SearchMode) -> Self {
    Self {
      mode,
      roster: roster.to_vec(),
      pending: roster.iter().cloned().collect(),
      best: HashMap::with_capacity(roster.len()),
      truncated: false,
    }
  }

  pub fn mode(&self) -> SearchMode { self.mode }

  /// True once every driver has been seen in first place.
  pub fn is_done(&self) -> bool { self.pending.is_empty() }

  /// Record one championship's finishing order.
  pub fn observe<'a>(
    &mut self,
    championship_id: ChampionshipId,
    standings: impl IntoIterator<Item = &'a str>,
  ) {
    for (driver, position) in standings.into_iter().zip(1u32..) {
      match self.best.get_mut(driver) {
        Some((best, ids)) if position < *best => {
          *best = position;
          ids.clear();
          ids.push(championship_id);
        }
        Some((best, ids)) if position == *best => {
          if ids.len() < WITNESS_LIMIT {
            ids.push(championship_id);
          }
        }
        Some(_) => {}
        None => {
          self
            .best
            .insert(driver.to_owned(), (position, vec![championship_id]));
        }
      }
      if position == 1 {
        self.pending.remove(driver);
      }
    }
  }

  /// Note that a size bucket returned `rows` records. A bucket that filled
  /// the cap may have had more.
  pub fn finish_bucket(&mut self, rows: usize) {
    if let Some(limit) = self.mode.row_limit()
      && rows >= limit as usize
    {
      self.truncated = true;
    }
  }

  /// Results ordered by position, then roster order. Drivers never seen in any
  /// record are omitted.
  pub fn finish(self) -> Vec<BestPosition> {
    let Self { roster, mut best, truncated, .. } = self;
    let mut out: Vec<BestPosition> = roster
      .into_iter()
      .filter_map(|driver| {
        let (position, championship_ids) = best.remove(&driver)?;
        let exactness = if position == 1 || !truncated {
          Exactness::Exact
        } else {
          Exactness::Approximate
        };
        Some(BestPosition { driver, position, championship_ids, exactness })
      })
      .collect();
    out.sort_by_key(|b| b.position);
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn roster() -> Vec<DriverCode> {
    vec!["VER".into(), "NOR".into(), "LEC".into()]
  }

  #[test]
  fn tracks_minimum_position_and_witnesses() {
    let mut t = PositionTracker::new(&roster(), SearchMode::Exhaustive);
    t.observe(7, ["VER", "NOR", "LEC"]);
    t.observe(6, ["NOR", "LEC", "VER"]);
    t.observe(5, ["VER", "LEC", "NOR"]);
    t.finish_bucket(3);

    let out = t.finish();
    let by_driver: HashMap<&str, &BestPosition> =
      out.iter().map(|b| (b.driver.as_str(), b)).collect();

    assert_eq!(by_driver["VER"].position, 1);
    assert_eq!(by_driver["VER"].championship_ids, vec![7, 5]);
    assert_eq!(by_driver["NOR"].championship_ids, vec![6]);
    assert_eq!(by_driver["LEC"].position, 2);
    assert_eq!(by_driver["LEC"].championship_ids, vec![6, 5]);
    assert!(out.iter().all(BestPosition::is_exact));
  }

  #[test]
  fn done_once_everyone_has_won() {
    let mut t = PositionTracker::new(&roster(), SearchMode::default());
    t.observe(1, ["VER", "NOR", "LEC"]);
    assert!(!t.is_done());
    t.observe(2, ["NOR", "VER", "LEC"]);
    t.observe(3, ["LEC", "VER", "NOR"]);
    assert!(t.is_done());
  }

  #[test]
  fn witnesses_are_capped() {
    let mut t = PositionTracker::new(&roster(), SearchMode::Exhaustive);
    for id in 0..10 {
      t.observe(id, ["VER", "NOR", "LEC"]);
    }
    let out = t.finish();
    assert_eq!(out[0].championship_ids.len(), WITNESS_LIMIT);
  }

  #[test]
  fn truncated_scan_marks_non_winners_approximate() {
    let mut t = PositionTracker::new(&roster(), SearchMode::heuristic(2));
    t.observe(1, ["VER", "NOR", "LEC"]);
    t.observe(2, ["VER", "LEC", "NOR"]);
    t.finish_bucket(2);

    let out = t.finish();
    assert_eq!(out[0].driver, "VER");
    assert_eq!(out[0].exactness, Exactness::Exact);
    assert!(out[1..].iter().all(|b| b.exactness == Exactness::Approximate));
  }

  #[test]
  fn short_bucket_keeps_heuristic_exact() {
    let mut t = PositionTracker::new(&roster(), SearchMode::heuristic(10));
    t.observe(1, ["VER", "NOR", "LEC"]);
    t.finish_bucket(1);
    assert!(t.finish().iter().all(BestPosition::is_exact));
  }

  #[test]
  fn unseen_drivers_are_omitted() {
    let t = PositionTracker::new(&roster(), SearchMode::Exhaustive);
    assert!(t.finish().is_empty());
  }

  #[test]
  fn mode_serializes_with_tag() {
    let json = serde_json::to_string(&SearchMode::heuristic(50)).unwrap();
    assert_eq!(json, r#"{"mode":"heuristic","per_size_cap":50}"#);
    let back: SearchMode = serde_json::from_str(r#"{"mode":"exhaustive"}"#).unwrap();
    assert_eq!(back, SearchMode::Exhaustive);
  }
}
