//! Standings for one race subset.
//!
//! Drivers are ranked by total points, highest first. Equal totals keep roster
//! order, which makes the ranking a strict total order and decides the winner
//! of a tied championship.

use serde::{Deserialize, Serialize};

use crate::{
  season::{DriverCode, Season},
  subset::RaceSubset,
};

/// One driver's line in a standings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingEntry {
  pub driver:   DriverCode,
  /// 1-based.
  pub position: u32,
  pub points:   u32,
}

/// Ranked outcome of the mini-championship formed by `subset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
  pub subset:  RaceSubset,
  /// Ordered by position.
  pub entries: Vec<StandingEntry>,
}

impl Standings {
  /// The rank-1 driver.
  pub fn winner(&self) -> Option<&DriverCode> {
    self.entries.first().map(|e| &e.driver)
  }

  pub fn position_of(&self, driver: &str) -> Option<u32> {
    self
      .entries
      .iter()
      .find(|e| e.driver == driver)
      .map(|e| e.position)
  }

  pub fn total_points(&self) -> u64 {
    self.entries.iter().map(|e| u64::from(e.points)).sum()
  }
}

/// A driver's points race by race within one championship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundPoints {
  pub driver:       DriverCode,
  /// Parallel to the championship's rounds, ascending.
  pub round_points: Vec<u32>,
  pub total_points: u32,
}

/// Break `standings` down into per-race points, keeping standings order.
/// Drivers missing from the roster are skipped.
pub fn round_breakdown(season: &Season, standings: &Standings) -> Vec<RoundPoints> {
  standings
    .entries
    .iter()
    .filter_map(|entry| {
      let d = season.driver_index(&entry.driver)?;
      let round_points: Vec<u32> = standings
        .subset
        .races()
        .map(|race| season.points(d, race))
        .collect();
      Some(RoundPoints {
        driver: entry.driver.clone(),
        total_points: round_points.iter().sum(),
        round_points,
      })
    })
    .collect()
}

/// Sum each driver's points over `subset` and rank them.
pub fn compute_standings(season: &Season, subset: RaceSubset) -> Standings {
  let totals: Vec<u32> = season
    .point_rows()
    .iter()
    .map(|row| {
      subset
        .races()
        .filter_map(|race| row.get(race as usize - 1))
        .sum()
    })
    .collect();

  Standings { subset, entries: rank(season.roster(), &totals) }
}

/// Rank drivers whose totals are given in roster order.
///
/// The sort is stable, so tied drivers keep their roster order.
pub fn rank(roster: &[DriverCode], totals: &[u32]) -> Vec<StandingEntry> {
  let mut order: Vec<usize> = (0..roster.len().min(totals.len())).collect();
  order.sort_by(|&a, &b| totals[b].cmp(&totals[a]));

  order
    .into_iter()
    .zip(1..)
    .map(|(d, position)| StandingEntry {
      driver: roster[d].clone(),
      position,
      points: totals[d],
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subset::enumerate;

  fn scenario() -> Season {
    Season::new(vec![
      ("VER".into(), vec![25, 18, 25]),
      ("NOR".into(), vec![18, 25, 18]),
      ("LEC".into(), vec![15, 15, 15]),
    ])
    .unwrap()
  }

  fn subset(races: &[u32]) -> RaceSubset { RaceSubset::from_indices(races).unwrap() }

  fn table(s: &Standings) -> Vec<(&str, u32)> {
    s.entries.iter().map(|e| (e.driver.as_str(), e.points)).collect()
  }

  #[test]
  fn single_race() {
    let s = compute_standings(&scenario(), subset(&[1]));
    assert_eq!(table(&s), vec![("VER", 25), ("NOR", 18), ("LEC", 15)]);
    assert_eq!(s.winner().map(String::as_str), Some("VER"));
  }

  #[test]
  fn tie_is_broken_by_roster_order() {
    let s = compute_standings(&scenario(), subset(&[1, 2]));
    assert_eq!(table(&s), vec![("VER", 43), ("NOR", 43), ("LEC", 30)]);
    assert_eq!(s.winner().map(String::as_str), Some("VER"));
    assert_eq!(s.position_of("NOR"), Some(2));
  }

  #[test]
  fn tie_ignores_alphabetical_order() {
    let season = Season::new(vec![
      ("ZHO".into(), vec![10]),
      ("ALO".into(), vec![10]),
    ])
    .unwrap();
    let s = compute_standings(&season, subset(&[1]));
    assert_eq!(s.winner().map(String::as_str), Some("ZHO"));
  }

  #[test]
  fn full_season() {
    let s = compute_standings(&scenario(), subset(&[1, 2, 3]));
    assert_eq!(table(&s), vec![("VER", 68), ("NOR", 61), ("LEC", 45)]);
  }

  #[test]
  fn totals_match_brute_force_for_every_subset() {
    let season = scenario();
    for sub in enumerate(season.race_count()).unwrap() {
      let s = compute_standings(&season, sub);
      for entry in &s.entries {
        let d = season.driver_index(&entry.driver).unwrap();
        let expected: u32 = sub.races().map(|r| season.points(d, r)).sum();
        assert_eq!(entry.points, expected, "{} in {sub}", entry.driver);
      }
      let race_sum: u64 = sub.races().map(|r| season.race_total(r)).sum();
      assert_eq!(s.total_points(), race_sum);
    }
  }

  #[test]
  fn positions_are_distinct_and_dense() {
    let season = scenario();
    for sub in enumerate(season.race_count()).unwrap() {
      let s = compute_standings(&season, sub);
      let positions: Vec<u32> = s.entries.iter().map(|e| e.position).collect();
      assert_eq!(positions, vec![1, 2, 3]);
      assert!(s.entries.windows(2).all(|w| w[0].points >= w[1].points));
    }
  }

  #[test]
  fn round_breakdown_follows_standings_order() {
    let season = scenario();
    let s = compute_standings(&season, subset(&[1, 3]));
    let rounds = round_breakdown(&season, &s);

    let rows: Vec<(&str, &[u32], u32)> = rounds
      .iter()
      .map(|r| (r.driver.as_str(), r.round_points.as_slice(), r.total_points))
      .collect();
    assert_eq!(rows, vec![
      ("VER", &[25, 25][..], 50),
      ("NOR", &[18, 18][..], 36),
      ("LEC", &[15, 15][..], 30),
    ]);
    for (r, e) in rounds.iter().zip(&s.entries) {
      assert_eq!(r.total_points, e.points);
    }
  }

  #[test]
  fn rank_reuses_precomputed_totals() {
    let roster = vec!["A".to_string(), "B".to_string(), "C".to_string()];
    let ranked = rank(&roster, &[5, 9, 5]);
    let order: Vec<&str> = ranked.iter().map(|e| e.driver.as_str()).collect();
    assert_eq!(order, vec!["B", "A", "C"]);
  }
}
