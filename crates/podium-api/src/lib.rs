//! JSON REST API for Podium.
//!
//! Exposes an axum [`Router`] backed by an [`Analyzer`] over any
//! [`podium_core::store::ChampionshipStore`]. Transport concerns such as TLS
//! and request tracing are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", podium_api::api_router(analyzer.clone()))
//! ```

pub mod cache;
pub mod championships;
pub mod error;
pub mod queries;
pub mod seasons;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use podium_core::{analyzer::Analyzer, store::ChampionshipStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `analyzer`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(analyzer: Arc<Analyzer<S>>) -> Router<()>
where
  S: ChampionshipStore + 'static,
{
  Router::new()
    // Seasons
    .route("/seasons", get(seasons::list::<S>))
    .route(
      "/seasons/{season}",
      get(seasons::get_one::<S>)
        .put(seasons::import::<S>)
        .delete(seasons::clear::<S>),
    )
    .route("/seasons/{season}/races", post(seasons::add_race::<S>))
    // Records
    .route("/seasons/{season}/championships", get(championships::list::<S>))
    .route(
      "/seasons/{season}/championships/{id}",
      get(championships::get_one::<S>),
    )
    .route("/seasons/{season}/lookup", get(championships::lookup::<S>))
    // Queries
    .route("/seasons/{season}/best_positions", get(queries::best_positions::<S>))
    .route(
      "/seasons/{season}/drivers/{code}/best_position",
      get(queries::best_position::<S>),
    )
    .route(
      "/seasons/{season}/drivers/{code}/win_probability",
      get(queries::win_probability::<S>),
    )
    .route(
      "/seasons/{season}/drivers/{code}/min_races_to_win",
      get(queries::min_races_to_win::<S>),
    )
    .route(
      "/seasons/{season}/drivers/{code}/stats",
      get(queries::driver_stats::<S>),
    )
    .route(
      "/seasons/{season}/head_to_head/{a}/{b}",
      get(queries::head_to_head::<S>),
    )
    .route(
      "/seasons/{season}/win_probability",
      get(queries::win_probability_table::<S>),
    )
    .route("/seasons/{season}/wins", get(queries::wins::<S>))
    .route(
      "/seasons/{season}/min_races_to_win",
      get(queries::all_min_races_to_win::<S>),
    )
    .route("/seasons/{season}/positions", get(queries::positions::<S>))
    // Cache
    .route("/cache/clear", post(cache::clear::<S>))
    .route("/cache/stats", get(cache::stats::<S>))
    .with_state(analyzer)
}

#[cfg(test)]
mod tests;
