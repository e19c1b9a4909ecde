//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use podium_core::{
  analyzer::{Analyzer, QueryConfig},
  cache::QueryCache,
};
use podium_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let analyzer = Analyzer::new(
    Arc::new(store),
    Arc::new(QueryCache::new()),
    QueryConfig::default(),
  );
  api_router(Arc::new(analyzer))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let response = app
    .clone()
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();

  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn scenario() -> Value {
  json!({
    "drivers": [
      { "code": "VER", "points": [25, 18, 25] },
      { "code": "NOR", "points": [18, 25, 18] },
      { "code": "LEC", "points": [15, 15, 15] },
    ]
  })
}

async fn seeded() -> Router {
  let app = app().await;
  let (status, body) = send(&app, "PUT", "/seasons/2024", Some(scenario())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["records"], 7);
  app
}

// ─── Seasons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn import_and_describe_season() {
  let app = seeded().await;

  let (status, info) = send(&app, "GET", "/seasons/2024", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(info["state"], "complete");
  assert_eq!(info["num_races"], 3);

  let (_, all) = send(&app, "GET", "/seasons", None).await;
  assert_eq!(all.as_array().unwrap().len(), 1);

  let (status, _) = send(&app, "GET", "/seasons/1999", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reimport_requires_clear_existing() {
  let app = seeded().await;

  let (status, body) = send(&app, "PUT", "/seasons/2024", Some(scenario())).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("2024"));

  let mut replace = scenario();
  replace["clear_existing"] = json!(true);
  let (status, body) = send(&app, "PUT", "/seasons/2024", Some(replace)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["records"], 7);
}

#[tokio::test]
async fn invalid_season_is_bad_request() {
  let app = app().await;
  let body = json!({
    "drivers": [
      { "code": "VER", "points": [1, 2] },
      { "code": "ver", "points": [3, 4] },
    ]
  });
  let (status, body) = send(&app, "PUT", "/seasons/1", Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("VER"));
}

#[tokio::test]
async fn unsafe_driver_codes_are_rejected_before_writing() {
  let app = app().await;
  for code in ["A,B", "", "MAX VER"] {
    let body = json!({
      "drivers": [
        { "code": code, "points": [1, 2] },
        { "code": "NOR", "points": [3, 4] },
      ]
    });
    let (status, _) = send(&app, "PUT", "/seasons/3", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{code:?}");
  }

  let (status, _) = send(&app, "GET", "/seasons/3", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn overflowing_points_are_rejected_and_server_keeps_working() {
  let app = app().await;
  let body = json!({
    "drivers": [
      { "code": "VER", "points": [u32::MAX, 1] },
      { "code": "NOR", "points": [0, 0] },
    ]
  });
  let (status, body) = send(&app, "PUT", "/seasons/7", Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("VER"));

  let (status, all) = send(&app, "GET", "/seasons", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(all, json!([]));

  let (status, _) = send(&app, "PUT", "/seasons/2024", Some(scenario())).await;
  assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn delete_clears_season() {
  let app = seeded().await;
  let (status, body) = send(&app, "DELETE", "/seasons/2024", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["records"], 7);

  let (status, _) = send(&app, "GET", "/seasons/2024", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_race_appends_new_subsets() {
  let app = seeded().await;
  let race = json!({ "results": { "nor": 25, "LEC": 18 } });
  let (status, body) = send(&app, "POST", "/seasons/2024/races", Some(race)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["records"], 8);

  let (_, info) = send(&app, "GET", "/seasons/2024", None).await;
  assert_eq!(info["num_races"], 4);
  assert_eq!(info["records"], 15);
}

#[tokio::test]
async fn add_race_with_unknown_driver_is_rejected() {
  let app = seeded().await;
  let race = json!({ "results": { "ALO": 25 } });
  let (status, _) = send(&app, "POST", "/seasons/2024/races", Some(race)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(&app, "POST", "/seasons/2024/races", Some(json!({ "results": {} }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (_, info) = send(&app, "GET", "/seasons/2024", None).await;
  assert_eq!(info["records"], 7);
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn lookup_then_fetch_championship() {
  let app = seeded().await;

  let (status, found) = send(&app, "GET", "/seasons/2024/lookup?rounds=2,1", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(found["rounds"], json!([1, 2]));

  let id = found["championship_id"].as_i64().unwrap();
  let (status, record) =
    send(&app, "GET", &format!("/seasons/2024/championships/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(record["winner"], "VER");
  assert_eq!(record["standings"][1]["driver"], "NOR");
  assert_eq!(record["standings"][1]["points"], 43);
  assert_eq!(record["round_points"][1]["driver"], "NOR");
  assert_eq!(record["round_points"][1]["round_points"], json!([18, 25]));
  assert_eq!(record["round_points"][1]["total_points"], 43);
}

#[tokio::test]
async fn lookup_misses_and_bad_input() {
  let app = seeded().await;

  let (status, _) = send(&app, "GET", "/seasons/2024/lookup?rounds=1,9", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(&app, "GET", "/seasons/2024/lookup?rounds=", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(&app, "GET", "/seasons/2024/lookup?rounds=one", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn championships_are_paginated() {
  let app = seeded().await;
  let (status, page) =
    send(&app, "GET", "/seasons/2024/championships?page=2&per_page=5", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["total"], 7);
  assert_eq!(page["items"].as_array().unwrap().len(), 2);

  let (status, _) = send(&app, "GET", "/seasons/1999/championships", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn best_positions_in_both_modes() {
  let app = seeded().await;

  let (status, all) =
    send(&app, "GET", "/seasons/2024/best_positions?mode=exhaustive", None).await;
  assert_eq!(status, StatusCode::OK);
  let all = all.as_array().unwrap();
  assert_eq!(all.len(), 3);
  assert!(all.iter().all(|b| b["exactness"] == "exact"));

  let (status, lec) = send(
    &app,
    "GET",
    "/seasons/2024/drivers/lec/best_position?per_size_cap=1",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(lec["position"], 3);

  let (status, _) =
    send(&app, "GET", "/seasons/2024/drivers/ALO/best_position", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn win_probability_for_driver_and_table() {
  let app = seeded().await;

  let (status, p) = send(
    &app,
    "GET",
    "/seasons/2024/drivers/VER/win_probability?num_races=2",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(p["wins"], 3);
  assert_eq!(p["total"], 3);
  assert_eq!(p["probability"], 1.0);

  let (status, table) = send(&app, "GET", "/seasons/2024/win_probability", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(table["season_lengths"], json!([1, 2, 3]));
  assert_eq!(table["drivers"][0]["driver"], "VER");
}

#[tokio::test]
async fn head_to_head_and_titles() {
  let app = seeded().await;

  let (status, h2h) = send(&app, "GET", "/seasons/2024/head_to_head/ver/nor", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(h2h["ahead_a"], 6);
  assert_eq!(h2h["ahead_b"], 1);

  let (status, _) = send(&app, "GET", "/seasons/2024/head_to_head/VER/VER", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(&app, "GET", "/seasons/2024/head_to_head/VER/ALO", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, wins) = send(&app, "GET", "/seasons/2024/wins", None).await;
  assert_eq!(wins[0]["driver"], "VER");
  assert_eq!(wins[0]["titles"], 6);

  let (_, min) = send(&app, "GET", "/seasons/2024/drivers/LEC/min_races_to_win", None).await;
  assert_eq!(min["num_races"], Value::Null);

  let (_, all) = send(&app, "GET", "/seasons/2024/min_races_to_win", None).await;
  assert_eq!(all.as_array().unwrap().len(), 2);

  let (_, firsts) = send(&app, "GET", "/seasons/2024/positions?position=1", None).await;
  assert_eq!(firsts[0]["count"], 6);

  let (status, _) = send(&app, "GET", "/seasons/2024/positions?position=0", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn driver_stats_include_best_margin() {
  let app = seeded().await;

  let (status, stats) = send(&app, "GET", "/seasons/2024/drivers/ver/stats", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["titles"], 6);
  assert_eq!(stats["championships"], 7);
  assert_eq!(stats["best_margin"]["margin"], 14);
  assert_eq!(stats["position_distribution"][1], json!({ "position": 2, "count": 1 }));

  let id = stats["best_margin"]["championship_id"].as_i64().unwrap();
  let (_, record) =
    send(&app, "GET", &format!("/seasons/2024/championships/{id}"), None).await;
  assert_eq!(record["rounds"], json!([1, 3]));

  let (_, lec) = send(&app, "GET", "/seasons/2024/drivers/LEC/stats", None).await;
  assert_eq!(lec["best_margin"], Value::Null);

  let (status, _) = send(&app, "GET", "/seasons/2024/drivers/ALO/stats", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Cache ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cache_clear_and_stats() {
  let app = seeded().await;
  let uri = "/seasons/2024/drivers/VER/win_probability?num_races=1";
  send(&app, "GET", uri, None).await;
  send(&app, "GET", uri, None).await;

  let (_, stats) = send(&app, "GET", "/cache/stats", None).await;
  assert_eq!(stats["hits"], 1);
  assert_eq!(stats["entries"], 1);

  let (status, cleared) = send(&app, "POST", "/cache/clear?season=2024", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(cleared["season"], 2024);

  let (_, stats) = send(&app, "GET", "/cache/stats", None).await;
  assert_eq!(stats["entries"], 0);

  for season in [1, 77, 9999] {
    send(&app, "POST", &format!("/cache/clear?season={season}"), None).await;
  }
  let (_, stats) = send(&app, "GET", "/cache/stats", None).await;
  assert_eq!(stats["seasons"], 0);
}
