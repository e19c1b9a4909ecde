//! Synchronous read path, run on the `tokio-rusqlite` connection thread.

use std::cmp::Reverse;

use rusqlite::{Connection, OptionalExtension as _};

use podium_core::{
  search::{BestPosition, PositionTracker, SearchMode},
  season::{DriverCode, Season, SeasonId},
  standings::{Standings, round_breakdown},
  store::{
    Championship, ChampionshipDetail, ChampionshipId, DriverStats, DriverWinRow,
    HeadToHead, MinRacesToWin, Page, PositionCount, PositionTally, SeasonInfo,
    SeasonState, TitleCount, WinProbability, WinProbabilityTable, WinningMargin,
    percentage,
  },
  subset::RaceSubset,
};

use crate::{
  Error, Result,
  encode::{RawChampionship, RawSeason, decode_roster, decode_season, decode_state},
};

// ─── Season guards ───────────────────────────────────────────────────────────

/// Roster and race count of a season that may be read.
pub struct Readable {
  pub roster:    Vec<DriverCode>,
  pub num_races: u32,
}

impl Readable {
  pub fn require_driver(&self, season: SeasonId, driver: &str) -> Result<()> {
    if self.roster.iter().any(|d| d == driver) {
      Ok(())
    } else {
      Err(Error::DriverNotFound { season, driver: driver.to_owned() })
    }
  }

  fn roster_index(&self, driver: &str) -> usize {
    self
      .roster
      .iter()
      .position(|d| d == driver)
      .unwrap_or(self.roster.len())
  }
}

/// `None` for an unknown season; an error if the season is incomplete.
pub fn try_readable(conn: &Connection, season: SeasonId) -> Result<Option<Readable>> {
  let row: Option<(String, u32, String)> = conn
    .query_row(
      "SELECT roster, num_races, state FROM seasons WHERE season = ?1",
      rusqlite::params![season],
      |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )
    .optional()?;

  let Some((roster, num_races, state)) = row else {
    return Ok(None);
  };
  if decode_state(&state)? != SeasonState::Complete {
    return Err(Error::SeasonIncomplete(season));
  }
  Ok(Some(Readable { roster: decode_roster(&roster)?, num_races }))
}

pub fn readable(conn: &Connection, season: SeasonId) -> Result<Readable> {
  try_readable(conn, season)?.ok_or(Error::SeasonNotFound(season))
}

// ─── Metadata ────────────────────────────────────────────────────────────────

pub fn season_info(conn: &Connection, season: SeasonId) -> Result<Option<SeasonInfo>> {
  let sql = format!("SELECT {} FROM seasons WHERE season = ?1", RawSeason::COLUMNS);
  conn
    .query_row(&sql, rusqlite::params![season], RawSeason::from_row)
    .optional()?
    .map(RawSeason::into_info)
    .transpose()
}

pub fn list_seasons(conn: &Connection) -> Result<Vec<SeasonInfo>> {
  let sql = format!("SELECT {} FROM seasons ORDER BY season", RawSeason::COLUMNS);
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map([], RawSeason::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawSeason::into_info).collect()
}

// ─── Records ─────────────────────────────────────────────────────────────────

pub fn lookup_by_subset(
  conn: &Connection,
  season: SeasonId,
  subset: RaceSubset,
) -> Result<Option<ChampionshipId>> {
  let Some(seen) = try_readable(conn, season)? else {
    return Ok(None);
  };
  if !subset.fits(seen.num_races) {
    return Ok(None);
  }
  Ok(
    conn
      .query_row(
        "SELECT championship_id FROM championships WHERE season = ?1 AND rounds = ?2",
        rusqlite::params![season, subset.encode()],
        |r| r.get(0),
      )
      .optional()?,
  )
}

pub fn championship(
  conn: &Connection,
  season: SeasonId,
  id: ChampionshipId,
) -> Result<Option<Championship>> {
  readable(conn, season)?;
  let sql = format!(
    "SELECT {} FROM championships WHERE season = ?1 AND championship_id = ?2",
    RawChampionship::COLUMNS
  );
  conn
    .query_row(&sql, rusqlite::params![season, id], RawChampionship::from_row)
    .optional()?
    .map(|raw| raw.into_championship(season))
    .transpose()
}

/// The stored point matrix of a readable season.
pub fn load_season(conn: &Connection, season: SeasonId) -> Result<Season> {
  readable(conn, season)?;
  let (roster, points): (String, String) = conn.query_row(
    "SELECT roster, points FROM seasons WHERE season = ?1",
    rusqlite::params![season],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;
  decode_season(&roster, &points)
}

pub fn championship_detail(
  conn: &Connection,
  season: SeasonId,
  id: ChampionshipId,
) -> Result<Option<ChampionshipDetail>> {
  let Some(championship) = championship(conn, season, id)? else {
    return Ok(None);
  };
  let data = load_season(conn, season)?;
  let standings = Standings {
    subset:  championship.rounds,
    entries: championship.standings.clone(),
  };
  Ok(Some(ChampionshipDetail {
    round_points: round_breakdown(&data, &standings),
    championship,
  }))
}

pub fn championships(
  conn: &Connection,
  season: SeasonId,
  page: u32,
  per_page: u32,
) -> Result<Page<Championship>> {
  readable(conn, season)?;

  let total: i64 = conn.query_row(
    "SELECT COUNT(*) FROM championships WHERE season = ?1",
    rusqlite::params![season],
    |r| r.get(0),
  )?;

  let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);
  let sql = format!(
    "SELECT {} FROM championships WHERE season = ?1
     ORDER BY championship_id LIMIT ?2 OFFSET ?3",
    RawChampionship::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(
      rusqlite::params![season, per_page, offset],
      RawChampionship::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Page {
    items: raws
      .into_iter()
      .map(|raw| raw.into_championship(season))
      .collect::<Result<_>>()?,
    total: total as u64,
    page,
    per_page,
  })
}

// ─── Best position ───────────────────────────────────────────────────────────

/// Walk subset sizes from largest to smallest, feeding each bucket to a
/// [`PositionTracker`] until every driver has won or the sizes run out.
pub fn best_positions(
  conn: &Connection,
  season: SeasonId,
  mode: SearchMode,
) -> Result<Vec<BestPosition>> {
  let seen = readable(conn, season)?;
  let mut tracker = PositionTracker::new(&seen.roster, mode);
  // SQLite treats a negative LIMIT as no limit.
  let limit = mode.row_limit().map_or(-1, i64::from);

  let mut stmt = conn.prepare_cached(
    "SELECT championship_id, standings FROM championships
     WHERE season = ?1 AND num_races = ?2
     ORDER BY championship_id DESC
     LIMIT ?3",
  )?;

  for size in (1..=seen.num_races).rev() {
    let mut rows = stmt.query(rusqlite::params![season, size, limit])?;
    let mut count = 0usize;
    while let Some(row) = rows.next()? {
      let id: ChampionshipId = row.get(0)?;
      let standings: String = row.get(1)?;
      tracker.observe(id, standings.split(','));
      count += 1;
    }
    tracker.finish_bucket(count);

    if tracker.is_done() {
      tracing::debug!(season, size, "every driver has won; stopping scan");
      break;
    }
  }

  Ok(tracker.finish())
}

// ─── Win probability ─────────────────────────────────────────────────────────

pub fn win_probability(
  conn: &Connection,
  season: SeasonId,
  driver: DriverCode,
  num_races: u32,
) -> Result<WinProbability> {
  readable(conn, season)?.require_driver(season, &driver)?;

  let wins: i64 = conn.query_row(
    "SELECT COUNT(*) FROM championships
     WHERE season = ?1 AND winner = ?2 AND num_races = ?3",
    rusqlite::params![season, driver, num_races],
    |r| r.get(0),
  )?;
  let total: i64 = conn.query_row(
    "SELECT COUNT(*) FROM championships WHERE season = ?1 AND num_races = ?2",
    rusqlite::params![season, num_races],
    |r| r.get(0),
  )?;

  Ok(WinProbability {
    driver,
    num_races,
    wins: wins as u64,
    total: total as u64,
  })
}

pub fn win_probability_table(
  conn: &Connection,
  season: SeasonId,
) -> Result<WinProbabilityTable> {
  let seen = readable(conn, season)?;
  let lengths: Vec<u32> = (1..=seen.num_races).collect();
  let slot = |k: u32| (k as usize).checked_sub(1).filter(|&i| i < lengths.len());

  let mut possible = vec![0u64; lengths.len()];
  {
    let mut stmt = conn.prepare(
      "SELECT num_races, COUNT(*) FROM championships
       WHERE season = ?1 GROUP BY num_races",
    )?;
    let rows = stmt.query_map(rusqlite::params![season], |r| {
      Ok((r.get::<_, u32>(0)?, r.get::<_, i64>(1)?))
    })?;
    for row in rows {
      let (k, n) = row?;
      if let Some(i) = slot(k) {
        possible[i] = n as u64;
      }
    }
  }

  let mut wins = vec![vec![0u64; lengths.len()]; seen.roster.len()];
  {
    let mut stmt = conn.prepare(
      "SELECT winner, num_races, COUNT(*) FROM championships
       WHERE season = ?1 GROUP BY winner, num_races",
    )?;
    let rows = stmt.query_map(rusqlite::params![season], |r| {
      Ok((
        r.get::<_, String>(0)?,
        r.get::<_, u32>(1)?,
        r.get::<_, i64>(2)?,
      ))
    })?;
    for row in rows {
      let (winner, k, n) = row?;
      let d = seen.roster_index(&winner);
      if let (Some(per_length), Some(i)) = (wins.get_mut(d), slot(k)) {
        per_length[i] = n as u64;
      }
    }
  }

  let mut drivers: Vec<DriverWinRow> = seen
    .roster
    .iter()
    .zip(wins)
    .map(|(driver, wins_per_length)| DriverWinRow {
      driver:          driver.clone(),
      total_titles:    wins_per_length.iter().sum(),
      percentages:     wins_per_length
        .iter()
        .zip(&possible)
        .map(|(&w, &p)| percentage(w, p))
        .collect(),
      wins_per_length,
    })
    .collect();
  // Same denominator for every driver, so ranking by wins is ranking by
  // probability.
  drivers.sort_by_key(|row| Reverse(row.wins_per_length.last().copied().unwrap_or(0)));

  Ok(WinProbabilityTable {
    season_lengths: lengths,
    possible_seasons: possible,
    drivers,
  })
}

// ─── Head to head ────────────────────────────────────────────────────────────

pub fn head_to_head(
  conn: &Connection,
  season: SeasonId,
  driver_a: DriverCode,
  driver_b: DriverCode,
) -> Result<HeadToHead> {
  if driver_a == driver_b {
    return Err(podium_core::Error::SameDriver(driver_a).into());
  }
  let seen = readable(conn, season)?;
  seen.require_driver(season, &driver_a)?;
  seen.require_driver(season, &driver_b)?;

  let (ahead_a, ahead_b): (i64, i64) = conn.query_row(
    "SELECT
       COALESCE(SUM(a.position < b.position), 0),
       COALESCE(SUM(b.position < a.position), 0)
     FROM positions a
     JOIN positions b
       ON b.championship_id = a.championship_id AND b.driver = ?3
     WHERE a.season = ?1 AND a.driver = ?2",
    rusqlite::params![season, driver_a, driver_b],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;

  Ok(HeadToHead {
    driver_a,
    driver_b,
    ahead_a: ahead_a as u64,
    ahead_b: ahead_b as u64,
  })
}

// ─── Titles ──────────────────────────────────────────────────────────────────

pub fn min_races_to_win(
  conn: &Connection,
  season: SeasonId,
  driver: DriverCode,
) -> Result<Option<u32>> {
  readable(conn, season)?.require_driver(season, &driver)?;
  Ok(
    conn
      .query_row(
        "SELECT num_races FROM championships
         WHERE season = ?1 AND winner = ?2
         ORDER BY num_races
         LIMIT 1",
        rusqlite::params![season, driver],
        |r| r.get(0),
      )
      .optional()?,
  )
}

pub fn all_min_races_to_win(
  conn: &Connection,
  season: SeasonId,
) -> Result<Vec<MinRacesToWin>> {
  let seen = readable(conn, season)?;
  let mut stmt = conn.prepare(
    "SELECT winner, MIN(num_races) FROM championships
     WHERE season = ?1 GROUP BY winner",
  )?;
  let mut out = stmt
    .query_map(rusqlite::params![season], |r| {
      Ok(MinRacesToWin { driver: r.get(0)?, num_races: r.get(1)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  out.sort_by_key(|m| (m.num_races, seen.roster_index(&m.driver)));
  Ok(out)
}

pub fn championship_wins(conn: &Connection, season: SeasonId) -> Result<Vec<TitleCount>> {
  let seen = readable(conn, season)?;
  let mut stmt = conn.prepare(
    "SELECT winner, COUNT(*) FROM championships WHERE season = ?1 GROUP BY winner",
  )?;
  let mut out = stmt
    .query_map(rusqlite::params![season], |r| {
      Ok(TitleCount {
        driver: r.get(0)?,
        titles: r.get::<_, i64>(1)? as u64,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  out.sort_by_key(|t| (Reverse(t.titles), seen.roster_index(&t.driver)));
  Ok(out)
}

// ─── Driver stats ────────────────────────────────────────────────────────────

pub fn driver_stats(
  conn: &Connection,
  season: SeasonId,
  driver: DriverCode,
) -> Result<DriverStats> {
  readable(conn, season)?.require_driver(season, &driver)?;

  let (championships, titles): (i64, i64) = conn.query_row(
    "SELECT COUNT(*), COALESCE(SUM(winner = ?2), 0)
     FROM championships WHERE season = ?1",
    rusqlite::params![season, driver],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;

  let mut stmt = conn.prepare_cached(
    "SELECT position, COUNT(*) FROM positions
     WHERE season = ?1 AND driver = ?2
     GROUP BY position ORDER BY position",
  )?;
  let position_distribution = stmt
    .query_map(rusqlite::params![season, driver], |r| {
      Ok(PositionTally {
        position: r.get(0)?,
        count:    r.get::<_, i64>(1)? as u64,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  // Ties on margin go to the earliest championship.
  let best_margin = conn
    .query_row(
      "SELECT w.points - r.points AS margin, w.championship_id
       FROM positions w
       JOIN positions r
         ON r.championship_id = w.championship_id AND r.position = 2
       WHERE w.season = ?1 AND w.driver = ?2 AND w.position = 1
       ORDER BY margin DESC, w.championship_id
       LIMIT 1",
      rusqlite::params![season, driver],
      |r| {
        Ok(WinningMargin {
          margin:          r.get(0)?,
          championship_id: r.get(1)?,
        })
      },
    )
    .optional()?;

  let min_races_to_win = min_races_to_win(conn, season, driver.clone())?;

  Ok(DriverStats {
    title_percentage: percentage(titles as u64, championships as u64),
    highest_position: position_distribution.first().map(|t| t.position),
    driver,
    titles: titles as u64,
    championships: championships as u64,
    min_races_to_win,
    position_distribution,
    best_margin,
  })
}

pub fn position_counts(
  conn: &Connection,
  season: SeasonId,
  position: u32,
) -> Result<Vec<PositionCount>> {
  let seen = readable(conn, season)?;

  let total: i64 = conn.query_row(
    "SELECT COUNT(*) FROM championships WHERE season = ?1",
    rusqlite::params![season],
    |r| r.get(0),
  )?;

  let mut stmt = conn.prepare(
    "SELECT driver, COUNT(*) FROM positions
     WHERE season = ?1 AND position = ?2 GROUP BY driver",
  )?;
  let counts = stmt
    .query_map(rusqlite::params![season, position], |r| {
      Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? as u64))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut out: Vec<PositionCount> = counts
    .into_iter()
    .map(|(driver, count)| PositionCount {
      percentage: percentage(count, total as u64),
      driver,
      count,
    })
    .collect();
  out.sort_by_key(|p| (Reverse(p.count), seen.roster_index(&p.driver)));
  Ok(out)
}
