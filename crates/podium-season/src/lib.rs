//! Season file codec for Podium.
//!
//! Converts between season CSV files (`Driver,1,2,…` point matrices) and
//! [`podium_core::season::Season`], and parses the `DRIVER:POINTS` race-result
//! strings used to append a race. Pure synchronous; no HTTP or database
//! dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use podium_season::parse_csv;
//!
//! let csv = "Driver,1,2\nVER,25,18\nNOR,18,25\n";
//! let season = parse_csv(csv).unwrap();
//! println!("{} drivers, {} races", season.roster().len(), season.race_count());
//! ```

pub mod error;
mod parse;
mod serialize;

pub use error::{Error, Result};
pub use parse::{parse_csv, parse_race_results};
pub use serialize::to_csv;

#[cfg(test)]
mod tests {
  use podium_core::season::Season;

  use super::*;

  #[test]
  fn parses_point_matrix() {
    let csv = "Driver,1,2,3\nVER,25,18,25\nNOR,18,25,18\nLEC,15,15,15\n";
    let season = parse_csv(csv).unwrap();
    assert_eq!(season.roster(), &["VER", "NOR", "LEC"]);
    assert_eq!(season.race_count(), 3);
    assert_eq!(season.point_rows()[1], vec![18, 25, 18]);
  }

  #[test]
  fn normalises_codes_and_coerces_cells() {
    let csv = "Driver,1,2,3\r\n ver ,DNF,,7.0\r\n\r\nnor,\"10\",2\r\n";
    let season = parse_csv(csv).unwrap();
    assert_eq!(season.roster(), &["VER", "NOR"]);
    assert_eq!(season.point_rows(), &[vec![0, 0, 7], vec![10, 2, 0]]);
  }

  #[test]
  fn rejects_negative_points() {
    let err = parse_csv("Driver,1\nVER,-3\n").unwrap_err();
    assert!(matches!(err, Error::InvalidPoints { line: 2, .. }));
  }

  #[test]
  fn rejects_rows_longer_than_header() {
    let err = parse_csv("Driver,1\nVER,1,2\n").unwrap_err();
    assert!(matches!(err, Error::RowTooLong { line: 2, expected: 2, found: 3 }));
  }

  #[test]
  fn rejects_duplicate_drivers() {
    let err = parse_csv("Driver,1\nVER,1\nver,2\n").unwrap_err();
    assert!(matches!(
      err,
      Error::Season(podium_core::Error::DuplicateDriver(ref d)) if d == "VER"
    ));
  }

  #[test]
  fn rejects_quoted_cells_with_commas() {
    let err = parse_csv("Driver,1,2\n\"VER,X\",1,2\n").unwrap_err();
    assert!(matches!(err, Error::QuotedComma { line: 2 }));

    let err = parse_csv("Driver,\"1,2\"\nVER,1\n").unwrap_err();
    assert!(matches!(err, Error::QuotedComma { line: 1 }));
  }

  #[test]
  fn rejects_codes_unsafe_for_storage() {
    let err = parse_csv("Driver,1\nMAX VER,1\n").unwrap_err();
    assert!(matches!(
      err,
      Error::Season(podium_core::Error::InvalidDriverCode(ref d)) if d == "MAX VER"
    ));
  }

  #[test]
  fn empty_input_has_no_header() {
    assert!(matches!(parse_csv("\n\n"), Err(Error::MissingHeader)));
  }

  #[test]
  fn csv_roundtrip() {
    let season = Season::new(vec![
      ("PIA".into(), vec![25, 0, 12]),
      ("NOR".into(), vec![18, 25, 0]),
    ])
    .unwrap();
    let text = to_csv(&season);
    assert_eq!(text, "Driver,1,2,3\nPIA,25,0,12\nNOR,18,25,0\n");
    assert_eq!(parse_csv(&text).unwrap(), season);
  }

  #[test]
  fn parses_race_results() {
    let r = parse_race_results("VER:25, nor:18 ,LEC:15,").unwrap();
    assert_eq!(r.len(), 3);
    assert_eq!(r["NOR"], 18);
  }

  #[test]
  fn race_results_reject_bad_pairs() {
    assert!(matches!(
      parse_race_results("VER25"),
      Err(Error::MalformedResult(_))
    ));
    assert!(matches!(
      parse_race_results("VER:x"),
      Err(Error::MalformedResult(_))
    ));
    assert!(matches!(
      parse_race_results("VERS:1"),
      Err(Error::InvalidDriverCode(_))
    ));
    assert!(matches!(
      parse_race_results("VER:1,VER:2"),
      Err(Error::DuplicateResult(_))
    ));
  }
}
