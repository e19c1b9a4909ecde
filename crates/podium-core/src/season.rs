//! Season input: the driver roster and the per-race point matrix.
//!
//! A [`Season`] is validated once on construction, so every later stage can
//! index it without re-checking roster membership or row lengths.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, subset::MAX_RACES};

/// The season year; every persisted row is scoped by it.
pub type SeasonId = u32;

/// A driver's unique short code, e.g. `"VER"`.
pub type DriverCode = String;

/// Points scored in a single race, keyed by driver. Drivers missing from the
/// map scored nothing.
pub type RaceResult = BTreeMap<DriverCode, u32>;

/// A validated season: roster order is significant (it breaks point ties) and
/// `points[d][r]` is driver `d`'s score in race `r + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SeasonParts", into = "SeasonParts")]
pub struct Season {
  roster: Vec<DriverCode>,
  points: Vec<Vec<u32>>,
  races:  u32,
}

impl Season {
  /// Build a season from a point matrix: one `(code, per-race points)` entry
  /// per driver, in roster order.
  pub fn new(drivers: Vec<(DriverCode, Vec<u32>)>) -> Result<Self> {
    let (roster, points): (Vec<_>, Vec<_>) = drivers.into_iter().unzip();
    Self::from_parts(roster, points)
  }

  /// Build a season from race-oriented results. Every driver named in a race
  /// must be in `roster`.
  pub fn from_races(roster: Vec<DriverCode>, races: &[RaceResult]) -> Result<Self> {
    let empty = Self::from_parts(roster.clone(), vec![Vec::new(); roster.len()])?;
    races.iter().try_fold(empty, |season, race| season.with_race(race))
  }

  /// This season with `race` appended as race `N + 1`.
  pub fn with_race(&self, race: &RaceResult) -> Result<Self> {
    let column = self.race_column(race)?;
    let points = self
      .points
      .iter()
      .zip(column)
      .map(|(row, p)| {
        let mut row = row.clone();
        row.push(p);
        row
      })
      .collect();
    Self::from_parts(self.roster.clone(), points)
  }

  /// Points for `race` in roster order. Fails if `race` names a driver that
  /// is not in the roster.
  pub fn race_column(&self, race: &RaceResult) -> Result<Vec<u32>> {
    if let Some(unknown) = race.keys().find(|d| self.driver_index(d).is_none()) {
      return Err(Error::UnknownDriver(unknown.clone()));
    }
    Ok(
      self
        .roster
        .iter()
        .map(|d| race.get(d).copied().unwrap_or(0))
        .collect(),
    )
  }

  fn from_parts(roster: Vec<DriverCode>, points: Vec<Vec<u32>>) -> Result<Self> {
    if roster.is_empty() {
      return Err(Error::EmptyRoster);
    }

    let mut seen = HashSet::with_capacity(roster.len());
    for code in &roster {
      if !is_valid_code(code) {
        return Err(Error::InvalidDriverCode(code.clone()));
      }
      if !seen.insert(code.as_str()) {
        return Err(Error::DuplicateDriver(code.clone()));
      }
    }

    let expected = points.first().map_or(0, Vec::len);
    for (code, row) in roster.iter().zip(&points) {
      if row.len() != expected {
        return Err(Error::RaggedPoints {
          driver: code.clone(),
          expected,
          found: row.len(),
        });
      }
    }
    if expected > MAX_RACES as usize {
      return Err(Error::TooManyRaces {
        max:   MAX_RACES as usize,
        found: expected,
      });
    }
    // Bounds every subset total, so standings can sum in `u32`.
    for (code, row) in roster.iter().zip(&points) {
      if row.iter().try_fold(0u32, |acc, &p| acc.checked_add(p)).is_none() {
        return Err(Error::PointsOverflow(code.clone()));
      }
    }

    Ok(Self { roster, points, races: expected as u32 })
  }

  pub fn roster(&self) -> &[DriverCode] { &self.roster }

  /// Number of races, `N`.
  pub fn race_count(&self) -> u32 { self.races }

  pub fn driver_index(&self, code: &str) -> Option<usize> {
    self.roster.iter().position(|d| d == code)
  }

  pub fn contains_driver(&self, code: &str) -> bool {
    self.driver_index(code).is_some()
  }

  /// Driver `driver`'s score in 1-based race `race`; 0 when out of range.
  pub fn points(&self, driver: usize, race: u32) -> u32 {
    self
      .points
      .get(driver)
      .and_then(|row| row.get((race as usize).wrapping_sub(1)))
      .copied()
      .unwrap_or(0)
  }

  /// The full matrix, one row per roster entry.
  pub fn point_rows(&self) -> &[Vec<u32>] { &self.points }

  /// Total points awarded across all drivers in race `race`.
  pub fn race_total(&self, race: u32) -> u64 {
    (0..self.roster.len())
      .map(|d| u64::from(self.points(d, race)))
      .sum()
  }
}

/// True for non-empty codes of ASCII letters, digits, `-` and `_`, which
/// are safe inside the comma-joined stored columns.
pub fn is_valid_code(code: &str) -> bool {
  !code.is_empty()
    && code
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Serialised layout of a [`Season`]: `{"drivers":[{"code":..,"points":[..]}]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonParts {
  pub drivers: Vec<DriverRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverRow {
  pub code:   DriverCode,
  pub points: Vec<u32>,
}

impl TryFrom<SeasonParts> for Season {
  type Error = Error;

  fn try_from(parts: SeasonParts) -> Result<Self> {
    Self::new(parts.drivers.into_iter().map(|d| (d.code, d.points)).collect())
  }
}

impl From<Season> for SeasonParts {
  fn from(season: Season) -> Self {
    Self {
      drivers: season
        .roster
        .into_iter()
        .zip(season.points)
        .map(|(code, points)| DriverRow { code, points })
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn race(pairs: &[(&str, u32)]) -> RaceResult {
    pairs.iter().map(|(d, p)| (d.to_string(), *p)).collect()
  }

  #[test]
  fn new_accepts_rectangular_matrix() {
    let s = Season::new(vec![
      ("VER".into(), vec![25, 18]),
      ("NOR".into(), vec![18, 25]),
    ])
    .unwrap();
    assert_eq!(s.race_count(), 2);
    assert_eq!(s.points(1, 2), 25);
    assert_eq!(s.points(1, 3), 0);
    assert_eq!(s.race_total(1), 43);
  }

  #[test]
  fn new_rejects_duplicate_codes() {
    let err = Season::new(vec![("VER".into(), vec![1]), ("VER".into(), vec![2])])
      .unwrap_err();
    assert!(matches!(err, Error::DuplicateDriver(ref d) if d == "VER"));
    assert!(err.is_data_integrity());
  }

  #[test]
  fn new_rejects_ragged_rows() {
    let err = Season::new(vec![("VER".into(), vec![1, 2]), ("NOR".into(), vec![3])])
      .unwrap_err();
    assert!(matches!(err, Error::RaggedPoints { expected: 2, found: 1, .. }));
  }

  #[test]
  fn new_rejects_empty_roster() {
    assert!(matches!(Season::new(vec![]), Err(Error::EmptyRoster)));
  }

  #[test]
  fn new_rejects_codes_that_break_stored_columns() {
    for bad in ["", "A,B", "VER:1", "MAX VER"] {
      let err = Season::new(vec![(bad.into(), vec![1]), ("NOR".into(), vec![2])])
        .unwrap_err();
      assert!(matches!(err, Error::InvalidDriverCode(ref d) if d == bad), "{bad:?}");
      assert!(err.is_data_integrity());
    }
    assert!(Season::new(vec![("DE_VRIES-2".into(), vec![1])]).is_ok());
  }

  #[test]
  fn new_rejects_rows_whose_total_overflows() {
    let err = Season::new(vec![
      ("VER".into(), vec![u32::MAX, 1]),
      ("NOR".into(), vec![0, 0]),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::PointsOverflow(ref d) if d == "VER"));
    assert!(err.is_data_integrity());

    assert!(Season::new(vec![("VER".into(), vec![u32::MAX, 0])]).is_ok());
  }

  #[test]
  fn with_race_rejects_overflowing_column() {
    let s = Season::new(vec![("VER".into(), vec![u32::MAX - 1])]).unwrap();
    assert!(s.with_race(&race(&[("VER", 1)])).is_ok());
    let err = s.with_race(&race(&[("VER", 2)])).unwrap_err();
    assert!(matches!(err, Error::PointsOverflow(_)));
  }

  #[test]
  fn season_without_races_is_valid() {
    let s = Season::new(vec![("VER".into(), vec![])]).unwrap();
    assert_eq!(s.race_count(), 0);
  }

  #[test]
  fn from_races_fills_missing_drivers_with_zero() {
    let roster = vec!["VER".to_string(), "NOR".to_string()];
    let s = Season::from_races(roster, &[race(&[("VER", 25)]), race(&[("NOR", 25)])])
      .unwrap();
    assert_eq!(s.point_rows(), &[vec![25, 0], vec![0, 25]]);
  }

  #[test]
  fn from_races_rejects_unknown_driver() {
    let roster = vec!["VER".to_string()];
    let err = Season::from_races(roster, &[race(&[("HAM", 10)])]).unwrap_err();
    assert!(matches!(err, Error::UnknownDriver(ref d) if d == "HAM"));
  }

  #[test]
  fn with_race_appends_a_column() {
    let s = Season::new(vec![("VER".into(), vec![25]), ("NOR".into(), vec![18])])
      .unwrap();
    let next = s.with_race(&race(&[("NOR", 25), ("VER", 18)])).unwrap();
    assert_eq!(next.race_count(), 2);
    assert_eq!(next.point_rows(), &[vec![25, 18], vec![18, 25]]);
    // The original is untouched.
    assert_eq!(s.race_count(), 1);
  }

  #[test]
  fn serde_roundtrip_preserves_roster_order() {
    let s = Season::new(vec![("NOR".into(), vec![1]), ("VER".into(), vec![2])])
      .unwrap();
    let json = serde_json::to_string(&s).unwrap();
    assert!(json.starts_with(r#"{"drivers":[{"code":"NOR""#));
    let back: Season = serde_json::from_str(&json).unwrap();
    assert_eq!(back, s);
  }
}
