//! Error type for `podium-store-sqlite`.

use podium_core::{
  Classify, ErrorKind,
  season::{DriverCode, SeasonId},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] podium_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored encoding could not be decoded.
  #[error("corrupt record: {0}")]
  Decode(String),

  #[error("season {0} already has records; clear it or import with clear_existing")]
  SeasonExists(SeasonId),

  #[error("season {0} not found")]
  SeasonNotFound(SeasonId),

  /// The season is being written, or a write failed part-way. A failed season
  /// must be cleared and re-imported.
  #[error("season {0} is incomplete")]
  SeasonIncomplete(SeasonId),

  #[error("driver {driver:?} is not in the roster of season {season}")]
  DriverNotFound { season: SeasonId, driver: DriverCode },

  /// A batch failed to commit. Batches committed before it remain and the
  /// season is left incomplete.
  #[error("write to season {season} failed: {source}")]
  Persistence {
    season: SeasonId,
    #[source]
    source: Box<Error>,
  },
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::SeasonNotFound(_) | Self::DriverNotFound { .. } => ErrorKind::NotFound,
      Self::SeasonExists(_) | Self::SeasonIncomplete(_) => ErrorKind::Conflict,
      Self::Database(_)
      | Self::Sqlite(_)
      | Self::Json(_)
      | Self::DateParse(_)
      | Self::Decode(_)
      | Self::Persistence { .. } => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
