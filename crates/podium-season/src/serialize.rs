//! Writer for the season CSV layout read by [`crate::parse_csv`].

use std::fmt::Write as _;

use podium_core::season::Season;

pub fn to_csv(season: &Season) -> String {
  let mut out = String::from("Driver");
  for race in 1..=season.race_count() {
    let _ = write!(out, ",{race}");
  }
  out.push('\n');

  for (code, row) in season.roster().iter().zip(season.point_rows()) {
    out.push_str(code);
    for points in row {
      let _ = write!(out, ",{points}");
    }
    out.push('\n');
  }
  out
}
