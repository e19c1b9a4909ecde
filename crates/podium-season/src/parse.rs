//! Parsers for season CSV files and `DRIVER:POINTS` race results.

use podium_core::season::{DriverCode, RaceResult, Season};

use crate::{Error, Result};

// ─── CSV ─────────────────────────────────────────────────────────────────────

/// Parse a point matrix laid out as `Driver,1,2,…,N`, one driver per row.
///
/// Driver codes are trimmed and upper-cased. Blank or non-numeric cells count
/// as 0 and short rows are padded with 0; negative numbers are rejected.
/// Quoted cells may not contain commas.
pub fn parse_csv(input: &str) -> Result<Season> {
  let mut lines = input
    .lines()
    .enumerate()
    .map(|(i, l)| (i + 1, l.trim()))
    .filter(|(_, l)| !l.is_empty());

  let (header_line, header) = lines.next().ok_or(Error::MissingHeader)?;
  let races = split_cells(header_line, header)?.len().saturating_sub(1);

  let mut drivers: Vec<(DriverCode, Vec<u32>)> = Vec::new();
  for (line, row) in lines {
    let mut cells = split_cells(line, row)?.into_iter();
    let code = cells.next().unwrap_or_default().to_ascii_uppercase();

    let mut points = cells
      .map(|cell| parse_points(line, cell))
      .collect::<Result<Vec<_>>>()?;
    if points.len() > races {
      return Err(Error::RowTooLong {
        line,
        expected: races + 1,
        found: points.len() + 1,
      });
    }
    points.resize(races, 0);
    drivers.push((code, points));
  }

  Ok(Season::new(drivers)?)
}

/// Plain comma splitting. Surrounding quotes are dropped, but a quoted cell
/// may not contain a comma.
fn split_cells(line: usize, row: &str) -> Result<Vec<&str>> {
  row
    .split(',')
    .map(|cell| {
      let cell = cell.trim();
      let opens = cell.starts_with('"');
      let closes = cell.len() > 1 && cell.ends_with('"');
      if opens != closes {
        return Err(Error::QuotedComma { line });
      }
      Ok(cell.trim_matches('"').trim())
    })
    .collect()
}

fn parse_points(line: usize, cell: &str) -> Result<u32> {
  let invalid = || Error::InvalidPoints { line, value: cell.to_owned() };

  if cell.is_empty() {
    return Ok(0);
  }
  if let Ok(v) = cell.parse::<i64>() {
    return u32::try_from(v).map_err(|_| invalid());
  }
  match cell.parse::<f64>() {
    Ok(v) if v.is_sign_negative() || !v.is_finite() || v > f64::from(u32::MAX) => {
      Err(invalid())
    }
    Ok(v) => Ok(v.trunc() as u32),
    // Markers such as "DNF" or "DSQ" score nothing.
    Err(_) => Ok(0),
  }
}

// ─── Race results ────────────────────────────────────────────────────────────

/// Parse `"VER:25,NOR:18,LEC:15"` into a [`RaceResult`].
pub fn parse_race_results(input: &str) -> Result<RaceResult> {
  let mut results = RaceResult::new();

  for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
    let (driver, points) = pair
      .split_once(':')
      .filter(|(_, p)| !p.contains(':'))
      .ok_or_else(|| Error::MalformedResult(pair.to_owned()))?;

    let driver = driver.trim().to_ascii_uppercase();
    if driver.len() != 3 || !driver.bytes().all(|b| b.is_ascii_uppercase()) {
      return Err(Error::InvalidDriverCode(driver));
    }

    let points: u32 = points
      .trim()
      .parse()
      .map_err(|_| Error::MalformedResult(pair.to_owned()))?;

    if results.insert(driver.clone(), points).is_some() {
      return Err(Error::DuplicateResult(driver));
    }
  }

  Ok(results)
}
