//! Content digest of a season's tables.
//!
//! Rows are fed to SHA-256 in canonical subset order with surrogate keys and
//! timestamps left out, so a full re-import and an import followed by
//! appends produce the same digest when they hold the same standings.

use rusqlite::Connection;
use sha2::{Digest as _, Sha256};

use podium_core::season::SeasonId;

use crate::{Result, read};

pub fn season_digest(conn: &Connection, season: SeasonId) -> Result<Option<String>> {
  if read::try_readable(conn, season)?.is_none() {
    return Ok(None);
  }

  let mut hasher = Sha256::new();

  let (roster, points, num_races): (String, String, u32) = conn.query_row(
    "SELECT roster, points, num_races FROM seasons WHERE season = ?1",
    rusqlite::params![season],
    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
  )?;
  feed(&mut hasher, &["season", &roster, &points, &num_races.to_string()]);

  let mut stmt = conn.prepare(
    "SELECT num_races, rounds, standings, winner, points FROM championships
     WHERE season = ?1 ORDER BY rounds",
  )?;
  let mut rows = stmt.query(rusqlite::params![season])?;
  while let Some(row) = rows.next()? {
    let num_races: u32 = row.get(0)?;
    let rounds: String = row.get(1)?;
    let standings: String = row.get(2)?;
    let winner: String = row.get(3)?;
    let points: String = row.get(4)?;
    feed(&mut hasher, &[
      "championship",
      &num_races.to_string(),
      &rounds,
      &standings,
      &winner,
      &points,
    ]);
  }

  let mut stmt = conn.prepare(
    "SELECT c.rounds, p.driver, p.position, p.points
     FROM positions p
     JOIN championships c ON c.championship_id = p.championship_id
     WHERE p.season = ?1
     ORDER BY c.rounds, p.position",
  )?;
  let mut rows = stmt.query(rusqlite::params![season])?;
  while let Some(row) = rows.next()? {
    let rounds: String = row.get(0)?;
    let driver: String = row.get(1)?;
    let position: u32 = row.get(2)?;
    let points: u32 = row.get(3)?;
    feed(&mut hasher, &[
      "position",
      &rounds,
      &driver,
      &position.to_string(),
      &points.to_string(),
    ]);
  }

  Ok(Some(hex::encode(hasher.finalize())))
}

/// One record: fields separated by 0x1f, terminated by 0x1e.
fn feed(hasher: &mut Sha256, fields: &[&str]) {
  for (i, field) in fields.iter().enumerate() {
    if i > 0 {
      hasher.update(b"\x1f");
    }
    hasher.update(field.as_bytes());
  }
  hasher.update(b"\x1e");
}
