//! Handlers for `/seasons` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/seasons` | Every season, complete or not |
//! | `GET`    | `/seasons/{season}` | 404 if unknown |
//! | `PUT`    | `/seasons/{season}` | Body: [`ImportBody`]; returns 201 + record count |
//! | `DELETE` | `/seasons/{season}` | Removes every record of the season |
//! | `POST`   | `/seasons/{season}/races` | Body: `{"results":{"VER":25,"NOR":18}}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use podium_core::{
  analyzer::Analyzer,
  season::{DriverRow, RaceResult, Season, SeasonId},
  store::{ChampionshipStore, SeasonInfo},
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Outcome of a mutation: how many championship records it touched.
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteSummary {
  pub season:  SeasonId,
  pub records: u64,
}

/// `GET /seasons`
pub async fn list<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
) -> Result<Json<Vec<SeasonInfo>>, ApiError>
where
  S: ChampionshipStore,
{
  let seasons = analyzer.list_seasons().await.map_err(ApiError::store)?;
  Ok(Json(seasons))
}

/// `GET /seasons/{season}`
pub async fn get_one<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path(season): Path<SeasonId>,
) -> Result<Json<SeasonInfo>, ApiError>
where
  S: ChampionshipStore,
{
  let info = analyzer
    .season_info(season)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("season {season} not found")))?;
  Ok(Json(info))
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ImportBody {
  /// Roster order; it breaks point ties.
  pub drivers:        Vec<DriverRow>,
  /// Replace existing records instead of failing with 409.
  #[serde(default)]
  pub clear_existing: bool,
}

/// `PUT /seasons/{season}`
pub async fn import<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path(season): Path<SeasonId>,
  Json(body): Json<ImportBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ChampionshipStore,
{
  let data = Season::new(
    body
      .drivers
      .into_iter()
      .map(|d| (d.code.trim().to_ascii_uppercase(), d.points))
      .collect(),
  )
  .map_err(ApiError::store)?;

  let records = analyzer
    .import_season(season, data, body.clear_existing)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(WriteSummary { season, records })))
}

/// `DELETE /seasons/{season}`
pub async fn clear<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path(season): Path<SeasonId>,
) -> Result<Json<WriteSummary>, ApiError>
where
  S: ChampionshipStore,
{
  let records = analyzer.clear_season(season).await.map_err(ApiError::store)?;
  Ok(Json(WriteSummary { season, records }))
}

// ─── Append ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RaceBody {
  /// Points per driver; drivers left out score 0.
  pub results: RaceResult,
}

/// `POST /seasons/{season}/races`
pub async fn add_race<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path(season): Path<SeasonId>,
  Json(body): Json<RaceBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ChampionshipStore,
{
  let race: RaceResult = body
    .results
    .into_iter()
    .map(|(code, points)| (code.trim().to_ascii_uppercase(), points))
    .collect();
  if race.is_empty() {
    return Err(ApiError::BadRequest("race has no results".into()));
  }

  let records = analyzer.add_race(season, race).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(WriteSummary { season, records })))
}
