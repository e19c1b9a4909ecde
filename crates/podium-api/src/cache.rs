//! Handlers for the query cache.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/cache/clear` | Optional `?season=`; clears everything without it |
//! | `GET`  | `/cache/stats` | Hit and miss counters |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use podium_core::{
  analyzer::Analyzer,
  cache::CacheStats,
  season::SeasonId,
  store::ChampionshipStore,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct ClearParams {
  pub season: Option<SeasonId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Cleared {
  /// `None` when every season was cleared.
  pub season: Option<SeasonId>,
}

/// `POST /cache/clear[?season=..]`
pub async fn clear<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Query(params): Query<ClearParams>,
) -> Json<Cleared>
where
  S: ChampionshipStore,
{
  analyzer.clear_cache(params.season);
  Json(Cleared { season: params.season })
}

/// `GET /cache/stats`
pub async fn stats<S>(State(analyzer): State<Arc<Analyzer<S>>>) -> Json<CacheStats>
where
  S: ChampionshipStore,
{
  Json(analyzer.cache_stats())
}
