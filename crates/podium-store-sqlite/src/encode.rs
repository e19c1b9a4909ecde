//! Encoding and decoding helpers between Podium domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings. Rosters and point matrices are compact
//! JSON. A championship's `rounds`, `standings` and `points` columns are
//! comma-joined lists; `standings` and `points` are parallel and are only ever
//! produced together by [`AggregateRow::from_standings`] and read together by
//! [`decode_standings`].

use chrono::{DateTime, Utc};
use podium_core::{
  season::{DriverCode, Season, SeasonId},
  standings::{StandingEntry, Standings},
  store::{Championship, ChampionshipId, SeasonInfo, SeasonState},
  subset::RaceSubset,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── SeasonState ─────────────────────────────────────────────────────────────

pub fn encode_state(s: SeasonState) -> &'static str {
  match s {
    SeasonState::Complete => "complete",
    SeasonState::Incomplete => "incomplete",
  }
}

pub fn decode_state(s: &str) -> Result<SeasonState> {
  match s {
    "complete" => Ok(SeasonState::Complete),
    "incomplete" => Ok(SeasonState::Incomplete),
    other => Err(Error::Decode(format!("unknown season state: {other:?}"))),
  }
}

// ─── Season matrix ───────────────────────────────────────────────────────────

pub fn encode_roster(season: &Season) -> Result<String> {
  Ok(serde_json::to_string(season.roster())?)
}

pub fn encode_points(season: &Season) -> Result<String> {
  Ok(serde_json::to_string(season.point_rows())?)
}

pub fn decode_roster(s: &str) -> Result<Vec<DriverCode>> { Ok(serde_json::from_str(s)?) }

pub fn decode_season(roster: &str, points: &str) -> Result<Season> {
  let roster = decode_roster(roster)?;
  let points: Vec<Vec<u32>> = serde_json::from_str(points)?;
  if roster.len() != points.len() {
    return Err(Error::Decode(format!(
      "roster has {} drivers but point matrix has {} rows",
      roster.len(),
      points.len()
    )));
  }
  Ok(Season::new(roster.into_iter().zip(points).collect())?)
}

// ─── Championship columns ────────────────────────────────────────────────────

/// The `championships` columns for one standings table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRow {
  pub num_races: u32,
  pub rounds:    String,
  pub standings: String,
  pub winner:    String,
  pub points:    String,
}

impl AggregateRow {
  pub fn from_standings(s: &Standings) -> Self {
    let standings = join(s.entries.iter().map(|e| e.driver.as_str()));
    let points = join(s.entries.iter().map(|e| e.points.to_string()));
    Self {
      num_races: s.subset.len(),
      rounds: s.subset.encode(),
      standings,
      winner: s.winner().cloned().unwrap_or_default(),
      points,
    }
  }
}

fn join<I>(items: I) -> String
where
  I: IntoIterator,
  I::Item: AsRef<str>,
{
  let mut out = String::new();
  for (i, item) in items.into_iter().enumerate() {
    if i > 0 {
      out.push(',');
    }
    out.push_str(item.as_ref());
  }
  out
}

pub fn decode_rounds(s: &str) -> Result<RaceSubset> { Ok(RaceSubset::decode(s)?) }

/// Zip the parallel `standings` and `points` columns back into entries.
pub fn decode_standings(standings: &str, points: &str) -> Result<Vec<StandingEntry>> {
  let drivers: Vec<&str> = standings.split(',').collect();
  let totals: Vec<&str> = points.split(',').collect();
  if drivers.len() != totals.len() {
    return Err(Error::Decode(format!(
      "{} drivers but {} point totals",
      drivers.len(),
      totals.len()
    )));
  }

  drivers
    .into_iter()
    .zip(totals)
    .zip(1u32..)
    .map(|((driver, total), position)| {
      let points = total
        .parse()
        .map_err(|_| Error::Decode(format!("invalid point total {total:?}")))?;
      Ok(StandingEntry { driver: driver.to_owned(), position, points })
    })
    .collect()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `championships` row.
pub struct RawChampionship {
  pub championship_id: ChampionshipId,
  pub num_races:       u32,
  pub rounds:          String,
  pub standings:       String,
  pub winner:          String,
  pub points:          String,
}

impl RawChampionship {
  pub const COLUMNS: &'static str =
    "championship_id, num_races, rounds, standings, winner, points";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      championship_id: row.get(0)?,
      num_races:       row.get(1)?,
      rounds:          row.get(2)?,
      standings:       row.get(3)?,
      winner:          row.get(4)?,
      points:          row.get(5)?,
    })
  }

  pub fn into_championship(self, season: SeasonId) -> Result<Championship> {
    let rounds = decode_rounds(&self.rounds)?;
    if rounds.len() != self.num_races {
      return Err(Error::Decode(format!(
        "championship {} has num_races {} but rounds {:?}",
        self.championship_id, self.num_races, self.rounds
      )));
    }
    Ok(Championship {
      championship_id: self.championship_id,
      season,
      num_races: self.num_races,
      rounds,
      winner: self.winner,
      standings: decode_standings(&self.standings, &self.points)?,
    })
  }
}

/// Raw values read directly from a `seasons` row.
pub struct RawSeason {
  pub season:      SeasonId,
  pub roster:      String,
  pub num_races:   u32,
  pub state:       String,
  pub records:     i64,
  pub imported_at: String,
}

impl RawSeason {
  pub const COLUMNS: &'static str =
    "season, roster, num_races, state, records, imported_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      season:      row.get(0)?,
      roster:      row.get(1)?,
      num_races:   row.get(2)?,
      state:       row.get(3)?,
      records:     row.get(4)?,
      imported_at: row.get(5)?,
    })
  }

  pub fn into_info(self) -> Result<SeasonInfo> {
    Ok(SeasonInfo {
      season:      self.season,
      roster:      decode_roster(&self.roster)?,
      num_races:   self.num_races,
      state:       decode_state(&self.state)?,
      records:     u64::try_from(self.records)
        .map_err(|_| Error::Decode(format!("negative record count {}", self.records)))?,
      imported_at: decode_dt(&self.imported_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use podium_core::standings::compute_standings;

  use super::*;

  fn season() -> Season {
    Season::new(vec![
      ("VER".into(), vec![25, 18, 25]),
      ("NOR".into(), vec![18, 25, 18]),
      ("LEC".into(), vec![15, 15, 15]),
    ])
    .unwrap()
  }

  #[test]
  fn aggregate_row_columns_are_parallel() {
    let subset = RaceSubset::from_indices(&[1, 2]).unwrap();
    let row = AggregateRow::from_standings(&compute_standings(&season(), subset));
    assert_eq!(row.num_races, 2);
    assert_eq!(row.rounds, "1,2");
    assert_eq!(row.standings, "VER,NOR,LEC");
    assert_eq!(row.points, "43,43,30");
    assert_eq!(row.winner, "VER");
  }

  #[test]
  fn standings_roundtrip_through_columns() {
    let subset = RaceSubset::from_indices(&[2, 3]).unwrap();
    let standings = compute_standings(&season(), subset);
    let row = AggregateRow::from_standings(&standings);
    let decoded = decode_standings(&row.standings, &row.points).unwrap();
    assert_eq!(decoded, standings.entries);
    assert_eq!(decode_rounds(&row.rounds).unwrap(), subset);
  }

  #[test]
  fn mismatched_parallel_columns_are_rejected() {
    assert!(matches!(
      decode_standings("VER,NOR", "10"),
      Err(Error::Decode(_))
    ));
    assert!(matches!(
      decode_standings("VER", "ten"),
      Err(Error::Decode(_))
    ));
  }

  #[test]
  fn season_matrix_roundtrip() {
    let s = season();
    let back = decode_season(&encode_roster(&s).unwrap(), &encode_points(&s).unwrap())
      .unwrap();
    assert_eq!(back, s);
  }

  #[test]
  fn state_roundtrip() {
    for s in [SeasonState::Complete, SeasonState::Incomplete] {
      assert_eq!(decode_state(encode_state(s)).unwrap(), s);
    }
    assert!(decode_state("done").is_err());
  }
}
