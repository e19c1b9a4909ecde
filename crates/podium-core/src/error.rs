//! Error types for `podium-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("driver {0:?} appears in race data but not in the season roster")]
  UnknownDriver(String),

  #[error("driver {0:?} appears more than once in the roster")]
  DuplicateDriver(String),

  #[error("season roster is empty")]
  EmptyRoster,

  #[error("invalid driver code {0:?}; use letters, digits, '-' or '_'")]
  InvalidDriverCode(String),

  #[error("driver {0:?} scores more than {max} points over the season", max = u32::MAX)]
  PointsOverflow(String),

  #[error("driver {driver:?} has {found} race results, expected {expected}")]
  RaggedPoints {
    driver:   String,
    expected: usize,
    found:    usize,
  },

  #[error("a season may hold at most {max} races, got {found}")]
  TooManyRaces { max: usize, found: usize },

  #[error("invalid race subset encoding: {0:?}")]
  InvalidSubset(String),

  #[error("head-to-head needs two different drivers, got {0:?} twice")]
  SameDriver(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Broad class of a failure, independent of the layer that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  InvalidInput,
  /// The request conflicts with the season's current state.
  Conflict,
  Internal,
}

/// Errors that can report their [`ErrorKind`].
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Serialization(_) => ErrorKind::Internal,
      _ => ErrorKind::InvalidInput,
    }
  }
}

impl Error {
  /// True for failures caused by inconsistent season input. An import that
  /// hits one of these is rejected before anything is written.
  pub fn is_data_integrity(&self) -> bool {
    matches!(
      self,
      Self::UnknownDriver(_)
        | Self::DuplicateDriver(_)
        | Self::EmptyRoster
        | Self::InvalidDriverCode(_)
        | Self::PointsOverflow(_)
        | Self::RaggedPoints { .. }
        | Self::TooManyRaces { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
