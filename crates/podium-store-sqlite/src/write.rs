//! Synchronous write path, run on the `tokio-rusqlite` connection thread.
//!
//! Every function here takes the raw connection and commits at most one
//! transaction, so the async layer can interleave reads between batches.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, Transaction};

use podium_core::{
  season::{DriverCode, Season, SeasonId},
  standings::{Standings, compute_standings, rank},
  store::{ChampionshipId, SeasonState},
  subset::RaceSubset,
};

use crate::{
  Error, Result,
  encode::{AggregateRow, decode_rounds, decode_standings, encode_dt, encode_state},
};

/// Durability during bulk writes. Off while loading, normal otherwise.
pub fn set_bulk_mode(conn: &Connection, bulk: bool) -> Result<()> {
  let mode = if bulk { "OFF" } else { "NORMAL" };
  conn.pragma_update(None, "synchronous", mode)?;
  Ok(())
}

fn season_state(conn: &Connection, season: SeasonId) -> Result<Option<String>> {
  Ok(
    conn
      .query_row(
        "SELECT state FROM seasons WHERE season = ?1",
        rusqlite::params![season],
        |r| r.get(0),
      )
      .optional()?,
  )
}

fn delete_rows(tx: &Transaction<'_>, season: SeasonId) -> Result<u64> {
  tx.execute("DELETE FROM positions WHERE season = ?1", rusqlite::params![season])?;
  let removed = tx.execute(
    "DELETE FROM championships WHERE season = ?1",
    rusqlite::params![season],
  )?;
  Ok(removed as u64)
}

// ─── Import ──────────────────────────────────────────────────────────────────

/// Register `season` as incomplete, removing any previous records when
/// `clear_existing` is set.
pub fn begin_import(
  conn: &mut Connection,
  season: SeasonId,
  roster_json: &str,
  points_json: &str,
  num_races: u32,
  clear_existing: bool,
) -> Result<()> {
  let tx = conn.transaction()?;

  let known = season_state(&tx, season)?.is_some();
  let has_rows: bool = tx
    .query_row(
      "SELECT EXISTS (SELECT 1 FROM championships WHERE season = ?1)",
      rusqlite::params![season],
      |r| r.get(0),
    )?;
  if (known || has_rows) && !clear_existing {
    return Err(Error::SeasonExists(season));
  }

  let removed = delete_rows(&tx, season)?;
  if removed > 0 {
    tracing::debug!(season, removed, "cleared previous records");
  }

  tx.execute(
    "INSERT INTO seasons (season, roster, points, num_races, state, records, imported_at)
     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
     ON CONFLICT (season) DO UPDATE SET
       roster      = excluded.roster,
       points      = excluded.points,
       num_races   = excluded.num_races,
       state       = excluded.state,
       records     = 0,
       imported_at = excluded.imported_at",
    rusqlite::params![
      season,
      roster_json,
      points_json,
      num_races,
      encode_state(SeasonState::Incomplete),
      encode_dt(Utc::now()),
    ],
  )?;

  tx.commit()?;
  Ok(())
}

/// Compute and persist the standings of every subset in `batch` in one
/// transaction. Returns the number of championships written.
pub fn write_subsets(
  conn: &mut Connection,
  season: SeasonId,
  data: &Season,
  batch: &[RaceSubset],
) -> Result<u64> {
  let tx = conn.transaction()?;
  for &subset in batch {
    insert_standings(&tx, season, &compute_standings(data, subset))?;
  }
  bump_records(&tx, season, batch.len() as u64)?;
  tx.commit()?;
  Ok(batch.len() as u64)
}

/// Mark `season` complete and stamp the time of completion.
pub fn finish(conn: &Connection, season: SeasonId) -> Result<()> {
  conn.execute(
    "UPDATE seasons SET state = ?2, imported_at = ?3 WHERE season = ?1",
    rusqlite::params![
      season,
      encode_state(SeasonState::Complete),
      encode_dt(Utc::now()),
    ],
  )?;
  Ok(())
}

fn insert_standings(
  tx: &Transaction<'_>,
  season: SeasonId,
  standings: &Standings,
) -> Result<ChampionshipId> {
  let row = AggregateRow::from_standings(standings);

  let mut insert_championship = tx.prepare_cached(
    "INSERT INTO championships (season, num_races, rounds, standings, winner, points)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
  )?;
  insert_championship.execute(rusqlite::params![
    season,
    row.num_races,
    row.rounds,
    row.standings,
    row.winner,
    row.points,
  ])?;
  let id = tx.last_insert_rowid();

  let mut insert_position = tx.prepare_cached(
    "INSERT INTO positions (championship_id, season, driver, position, points)
     VALUES (?1, ?2, ?3, ?4, ?5)",
  )?;
  for entry in &standings.entries {
    insert_position.execute(rusqlite::params![
      id,
      season,
      entry.driver,
      entry.position,
      entry.points,
    ])?;
  }

  Ok(id)
}

fn bump_records(tx: &Transaction<'_>, season: SeasonId, added: u64) -> Result<()> {
  tx.execute(
    "UPDATE seasons SET records = records + ?2 WHERE season = ?1",
    rusqlite::params![season, added as i64],
  )?;
  Ok(())
}

// ─── Append ──────────────────────────────────────────────────────────────────

/// Where an append starts: the new race number and the highest id that
/// existed before it. Rows above that id are the append's own output.
pub struct AppendPlan {
  pub new_race: u32,
  pub last_id:  Option<ChampionshipId>,
}

/// Store the extended point matrix, flag the season incomplete and return
/// the id bound of the rows to extend.
pub fn begin_append(
  conn: &mut Connection,
  season: SeasonId,
  extended: &Season,
  points_json: &str,
) -> Result<AppendPlan> {
  let tx = conn.transaction()?;

  let last_id: Option<ChampionshipId> = tx.query_row(
    "SELECT MAX(championship_id) FROM championships WHERE season = ?1",
    rusqlite::params![season],
    |r| r.get(0),
  )?;

  tx.execute(
    "UPDATE seasons SET points = ?2, num_races = ?3, state = ?4 WHERE season = ?1",
    rusqlite::params![
      season,
      points_json,
      extended.race_count(),
      encode_state(SeasonState::Incomplete),
    ],
  )?;

  tx.commit()?;
  Ok(AppendPlan { new_race: extended.race_count(), last_id })
}

/// Extend one page of existing championships with the new race.
///
/// Reads at most `limit` rows with `after < id <= until`, writes `S ∪ {new}`
/// for each, and returns how many were written and the last id read.
#[allow(clippy::too_many_arguments)]
pub fn append_page(
  conn: &mut Connection,
  season: SeasonId,
  roster: &[DriverCode],
  column: &[u32],
  new_race: u32,
  after: ChampionshipId,
  until: ChampionshipId,
  limit: usize,
) -> Result<(u64, Option<ChampionshipId>)> {
  let tx = conn.transaction()?;

  let page: Vec<(ChampionshipId, String, String, String)> = {
    let mut stmt = tx.prepare_cached(
      "SELECT championship_id, rounds, standings, points FROM championships
       WHERE season = ?1 AND championship_id > ?2 AND championship_id <= ?3
       ORDER BY championship_id
       LIMIT ?4",
    )?;
    stmt
      .query_map(rusqlite::params![season, after, until, limit as i64], |r| {
        Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
      })?
      .collect::<rusqlite::Result<_>>()?
  };

  let Some(&(last, ..)) = page.last() else {
    return Ok((0, None));
  };

  for (_, rounds, standings, points) in &page {
    let subset = decode_rounds(rounds)?.with(new_race)?;
    let mut totals = vec![0u32; roster.len()];
    for entry in decode_standings(standings, points)? {
      let idx = roster
        .iter()
        .position(|d| *d == entry.driver)
        .ok_or_else(|| Error::Decode(format!("driver {} not in roster", entry.driver)))?;
      totals[idx] = entry.points;
    }
    for ((total, add), driver) in totals.iter_mut().zip(column).zip(roster) {
      *total = total
        .checked_add(*add)
        .ok_or_else(|| podium_core::Error::PointsOverflow(driver.clone()))?;
    }
    let standings = Standings { subset, entries: rank(roster, &totals) };
    insert_standings(&tx, season, &standings)?;
  }

  bump_records(&tx, season, page.len() as u64)?;
  tx.commit()?;
  Ok((page.len() as u64, Some(last)))
}

/// Write the singleton `{new_race}` championship.
pub fn append_singleton(
  conn: &mut Connection,
  season: SeasonId,
  extended: &Season,
  new_race: u32,
) -> Result<u64> {
  write_subsets(conn, season, extended, &[RaceSubset::singleton(new_race)?])
}

// ─── Clear ───────────────────────────────────────────────────────────────────

/// Delete all of `season`, metadata included. Returns championships removed.
pub fn clear(conn: &mut Connection, season: SeasonId) -> Result<u64> {
  let tx = conn.transaction()?;
  let removed = delete_rows(&tx, season)?;
  tx.execute("DELETE FROM seasons WHERE season = ?1", rusqlite::params![season])?;
  tx.commit()?;
  Ok(removed)
}
