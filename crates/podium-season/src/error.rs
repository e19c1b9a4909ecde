//! Error types for the season file codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("season file has no header line")]
  MissingHeader,

  #[error("line {line}: expected at most {expected} cells, found {found}")]
  RowTooLong {
    line:     usize,
    expected: usize,
    found:    usize,
  },

  #[error("line {line}: quoted cells containing commas are not supported")]
  QuotedComma { line: usize },

  #[error("line {line}: invalid points value {value:?}")]
  InvalidPoints { line: usize, value: String },

  #[error("malformed race result {0:?}; expected DRIVER:POINTS")]
  MalformedResult(String),

  #[error("invalid driver code {0:?}; expected three letters")]
  InvalidDriverCode(String),

  #[error("driver {0:?} listed twice in one race")]
  DuplicateResult(String),

  #[error("season data: {0}")]
  Season(#[from] podium_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
