//! Handlers for individual championship records.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/seasons/{season}/championships` | `?page` (1-based) and `?per_page` |
//! | `GET`  | `/seasons/{season}/championships/{id}` | With `round_points`; 404 if not in the season |
//! | `GET`  | `/seasons/{season}/lookup` | `?rounds=1,3,4`, in any order |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use podium_core::{
  analyzer::Analyzer,
  season::SeasonId,
  store::{Championship, ChampionshipDetail, ChampionshipId, ChampionshipStore, Page},
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_PER_PAGE: u32 = 50;
pub const MAX_PER_PAGE: u32 = 1_000;

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub page:     Option<u32>,
  pub per_page: Option<u32>,
}

/// `GET /seasons/{season}/championships[?page=..][&per_page=..]`
pub async fn list<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path(season): Path<SeasonId>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<Championship>>, ApiError>
where
  S: ChampionshipStore,
{
  let page = params.page.unwrap_or(1);
  let per_page = params
    .per_page
    .unwrap_or(DEFAULT_PER_PAGE)
    .clamp(1, MAX_PER_PAGE);

  let records = analyzer
    .championships(season, page, per_page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

/// `GET /seasons/{season}/championships/{id}`
pub async fn get_one<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path((season, id)): Path<(SeasonId, ChampionshipId)>,
) -> Result<Json<ChampionshipDetail>, ApiError>
where
  S: ChampionshipStore,
{
  let record = analyzer
    .championship_detail(season, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("championship {id} not found in season {season}"))
    })?;
  Ok(Json(record))
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LookupParams {
  /// Comma-separated 1-based race numbers.
  pub rounds: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResult {
  pub season:          SeasonId,
  pub rounds:          Vec<u32>,
  pub championship_id: ChampionshipId,
}

/// `GET /seasons/{season}/lookup?rounds=1,2,3`
pub async fn lookup<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path(season): Path<SeasonId>,
  Query(params): Query<LookupParams>,
) -> Result<Json<LookupResult>, ApiError>
where
  S: ChampionshipStore,
{
  let mut rounds = params
    .rounds
    .split(',')
    .map(str::trim)
    .filter(|r| !r.is_empty())
    .map(|r| {
      r.parse::<u32>()
        .map_err(|_| ApiError::BadRequest(format!("invalid race number {r:?}")))
    })
    .collect::<Result<Vec<_>, _>>()?;

  let championship_id = analyzer
    .lookup_by_subset(season, &rounds)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "no championship for rounds {:?} in season {season}",
        params.rounds
      ))
    })?;

  rounds.sort_unstable();
  rounds.dedup();
  Ok(Json(LookupResult { season, rounds, championship_id }))
}
