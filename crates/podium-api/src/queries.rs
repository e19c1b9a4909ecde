//! Handlers for the analytical queries over a season.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/seasons/{season}/best_positions` | `?mode=heuristic\|exhaustive`, `?per_size_cap` |
//! | `GET`  | `/seasons/{season}/drivers/{code}/best_position` | same params |
//! | `GET`  | `/seasons/{season}/drivers/{code}/win_probability` | `?num_races=k` required |
//! | `GET`  | `/seasons/{season}/drivers/{code}/min_races_to_win` | `null` if never a winner |
//! | `GET`  | `/seasons/{season}/drivers/{code}/stats` | titles, positions, best margin |
//! | `GET`  | `/seasons/{season}/head_to_head/{a}/{b}` | |
//! | `GET`  | `/seasons/{season}/win_probability` | every driver, every length |
//! | `GET`  | `/seasons/{season}/wins` | titles per driver |
//! | `GET`  | `/seasons/{season}/min_races_to_win` | every driver who wins |
//! | `GET`  | `/seasons/{season}/positions` | `?position=n` required |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use podium_core::{
  analyzer::Analyzer,
  search::{BestPosition, SearchMode},
  season::{DriverCode, SeasonId},
  store::{
    ChampionshipStore, DriverStats, HeadToHead, MinRacesToWin, PositionCount,
    TitleCount, WinProbability, WinProbabilityTable,
  },
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

fn driver_code(code: &str) -> DriverCode { code.trim().to_ascii_uppercase() }

// ─── Best position ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeName {
  #[default]
  Heuristic,
  Exhaustive,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModeParams {
  #[serde(default)]
  pub mode:         ModeName,
  /// Overrides the configured cap for this request.
  pub per_size_cap: Option<u32>,
}

impl ModeParams {
  fn resolve<S: ChampionshipStore>(&self, analyzer: &Analyzer<S>) -> SearchMode {
    match (self.mode, self.per_size_cap) {
      (ModeName::Exhaustive, _) => SearchMode::Exhaustive,
      (ModeName::Heuristic, Some(cap)) => SearchMode::heuristic(cap.max(1)),
      (ModeName::Heuristic, None) => analyzer.search_mode(false),
    }
  }
}

/// `GET /seasons/{season}/best_positions[?mode=..][&per_size_cap=..]`
pub async fn best_positions<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path(season): Path<SeasonId>,
  Query(params): Query<ModeParams>,
) -> Result<Json<Vec<BestPosition>>, ApiError>
where
  S: ChampionshipStore,
{
  let mode = params.resolve(&analyzer);
  let all = analyzer
    .best_positions(season, mode)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(all.as_ref().clone()))
}

/// `GET /seasons/{season}/drivers/{code}/best_position[?mode=..]`
pub async fn best_position<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path((season, code)): Path<(SeasonId, String)>,
  Query(params): Query<ModeParams>,
) -> Result<Json<BestPosition>, ApiError>
where
  S: ChampionshipStore,
{
  let driver = driver_code(&code);
  let mode = params.resolve(&analyzer);
  let best = analyzer
    .best_position(season, &driver, mode)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("driver {driver} has no standings in season {season}"))
    })?;
  Ok(Json(best))
}

// ─── Win probability ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NumRacesParams {
  pub num_races: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WinProbabilityBody {
  #[serde(flatten)]
  pub counts:      WinProbability,
  pub probability: f64,
}

/// `GET /seasons/{season}/drivers/{code}/win_probability?num_races=k`
pub async fn win_probability<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path((season, code)): Path<(SeasonId, String)>,
  Query(params): Query<NumRacesParams>,
) -> Result<Json<WinProbabilityBody>, ApiError>
where
  S: ChampionshipStore,
{
  let counts = analyzer
    .win_probability(season, driver_code(&code), params.num_races)
    .await
    .map_err(ApiError::store)?;
  let probability = counts.probability();
  Ok(Json(WinProbabilityBody { counts, probability }))
}

/// `GET /seasons/{season}/win_probability`
pub async fn win_probability_table<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path(season): Path<SeasonId>,
) -> Result<Json<WinProbabilityTable>, ApiError>
where
  S: ChampionshipStore,
{
  let table = analyzer
    .win_probability_table(season)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(table.as_ref().clone()))
}

// ─── Titles ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct DriverMinRaces {
  pub driver:    DriverCode,
  pub num_races: Option<u32>,
}

/// `GET /seasons/{season}/drivers/{code}/min_races_to_win`
pub async fn min_races_to_win<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path((season, code)): Path<(SeasonId, String)>,
) -> Result<Json<DriverMinRaces>, ApiError>
where
  S: ChampionshipStore,
{
  let driver = driver_code(&code);
  let num_races = analyzer
    .min_races_to_win(season, driver.clone())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(DriverMinRaces { driver, num_races }))
}

/// `GET /seasons/{season}/min_races_to_win`
pub async fn all_min_races_to_win<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path(season): Path<SeasonId>,
) -> Result<Json<Vec<MinRacesToWin>>, ApiError>
where
  S: ChampionshipStore,
{
  let all = analyzer
    .all_min_races_to_win(season)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(all))
}

/// `GET /seasons/{season}/wins`
pub async fn wins<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path(season): Path<SeasonId>,
) -> Result<Json<Vec<TitleCount>>, ApiError>
where
  S: ChampionshipStore,
{
  let titles = analyzer
    .championship_wins(season)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(titles))
}

// ─── Head to head and positions ──────────────────────────────────────────────

/// `GET /seasons/{season}/head_to_head/{a}/{b}`
pub async fn head_to_head<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path((season, a, b)): Path<(SeasonId, String, String)>,
) -> Result<Json<HeadToHead>, ApiError>
where
  S: ChampionshipStore,
{
  let h2h = analyzer
    .head_to_head(season, driver_code(&a), driver_code(&b))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(h2h))
}

#[derive(Debug, Deserialize)]
pub struct PositionParams {
  pub position: u32,
}

/// `GET /seasons/{season}/positions?position=n`
pub async fn positions<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path(season): Path<SeasonId>,
  Query(params): Query<PositionParams>,
) -> Result<Json<Vec<PositionCount>>, ApiError>
where
  S: ChampionshipStore,
{
  if params.position == 0 {
    return Err(ApiError::BadRequest("positions start at 1".into()));
  }
  let counts = analyzer
    .position_counts(season, params.position)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(counts))
}

/// `GET /seasons/{season}/drivers/{code}/stats`
pub async fn driver_stats<S>(
  State(analyzer): State<Arc<Analyzer<S>>>,
  Path((season, code)): Path<(SeasonId, String)>,
) -> Result<Json<DriverStats>, ApiError>
where
  S: ChampionshipStore,
{
  let stats = analyzer
    .driver_stats(season, driver_code(&code))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(stats))
}
