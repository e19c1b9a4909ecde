//! [`SqliteStore`], the SQLite implementation of [`ChampionshipStore`].

use std::{
  collections::HashMap,
  path::Path,
  sync::{Arc, Mutex, PoisonError},
  time::Instant,
};

use tokio::sync::OwnedMutexGuard;

use podium_core::{
  search::{BestPosition, SearchMode},
  season::{DriverCode, RaceResult, Season, SeasonId},
  store::{
    Championship, ChampionshipDetail, ChampionshipId, ChampionshipStore,
    DriverStats, HeadToHead, MinRacesToWin, Page, PositionCount, SeasonInfo,
    TitleCount, WinProbability, WinProbabilityTable,
  },
  subset::{RaceSubset, enumerate},
};

use crate::{
  Error, Result, digest,
  encode::{encode_points, encode_roster},
  read,
  schema::SCHEMA,
  write,
};

/// Subsets committed per import transaction unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A championship store backed by a single SQLite file.
///
/// Cloning is cheap; the connection and the writer locks are shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn:       tokio_rusqlite::Connection,
  writers:    Arc<Mutex<HashMap<SeasonId, Arc<tokio::sync::Mutex<()>>>>>,
  batch_size: usize,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_connection(conn).await
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_connection(conn).await
  }

  async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self {
      conn,
      writers: Arc::default(),
      batch_size: DEFAULT_BATCH_SIZE,
    };
    store.init_schema().await?;
    Ok(store)
  }

  /// Subsets written per transaction during imports and appends.
  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size.max(1);
    self
  }

  pub fn batch_size(&self) -> usize { self.batch_size }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread.
  pub(crate) async fn run<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Wait for exclusive write access to `season`.
  async fn writer(&self, season: SeasonId) -> OwnedMutexGuard<()> {
    let lock = {
      let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
      Arc::clone(writers.entry(season).or_default())
    };
    lock.lock_owned().await
  }

  /// Leave bulk mode and wrap a mid-write failure.
  async fn abandon(&self, season: SeasonId, source: Error) -> Error {
    tracing::warn!(season, error = %source, "season left incomplete");
    if let Err(e) = self.run(|conn| write::set_bulk_mode(conn, false)).await {
      tracing::warn!(error = %e, "failed to restore synchronous mode");
    }
    Error::Persistence { season, source: Box::new(source) }
  }

  async fn write_all(&self, season: SeasonId, data: Season) -> Result<u64> {
    let data = Arc::new(data);
    let mut subsets = enumerate(data.race_count())?;
    let mut written = 0u64;

    loop {
      let batch: Vec<RaceSubset> = subsets.by_ref().take(self.batch_size).collect();
      if batch.is_empty() {
        break;
      }
      let data = Arc::clone(&data);
      written += self
        .run(move |conn| write::write_subsets(conn, season, &data, &batch))
        .await?;
      tracing::debug!(season, written, remaining = subsets.len(), "batch committed");
    }

    Ok(written)
  }

  async fn append_all(
    &self,
    season: SeasonId,
    roster: Arc<Vec<DriverCode>>,
    column: Arc<Vec<u32>>,
    extended: Arc<Season>,
    plan: write::AppendPlan,
  ) -> Result<u64> {
    let new_race = plan.new_race;
    let mut written = 0u64;

    if let Some(until) = plan.last_id {
      let mut after: ChampionshipId = 0;
      loop {
        let (roster, column) = (Arc::clone(&roster), Arc::clone(&column));
        let limit = self.batch_size;
        let (count, last) = self
          .run(move |conn| {
            write::append_page(
              conn,
              season,
              &roster,
              &column,
              new_race,
              after,
              until,
              limit,
            )
          })
          .await?;
        let Some(last) = last else { break };
        written += count;
        after = last;
        tracing::debug!(season, written, "append batch committed");
      }
    }

    written += self
      .run(move |conn| write::append_singleton(conn, season, &extended, new_race))
      .await?;
    Ok(written)
  }
}

// ─── ChampionshipStore impl ──────────────────────────────────────────────────

impl ChampionshipStore for SqliteStore {
  type Error = Error;

  // ── Mutations ─────────────────────────────────────────────────────────────

  async fn import_season(
    &self,
    season: SeasonId,
    data: Season,
    clear_existing: bool,
  ) -> Result<u64> {
    let _writer = self.writer(season).await;
    let started = Instant::now();

    let roster_json = encode_roster(&data)?;
    let points_json = encode_points(&data)?;
    let num_races = data.race_count();
    self
      .run(move |conn| {
        write::begin_import(
          conn,
          season,
          &roster_json,
          &points_json,
          num_races,
          clear_existing,
        )?;
        write::set_bulk_mode(conn, true)
      })
      .await?;

    let written = match self.write_all(season, data).await {
      Ok(written) => written,
      Err(e) => return Err(self.abandon(season, e).await),
    };

    if let Err(e) = self
      .run(move |conn| {
        write::finish(conn, season)?;
        write::set_bulk_mode(conn, false)
      })
      .await
    {
      return Err(self.abandon(season, e).await);
    }

    tracing::debug!(
      season,
      records = written,
      elapsed_ms = started.elapsed().as_millis() as u64,
      "import committed"
    );
    Ok(written)
  }

  async fn add_race(&self, season: SeasonId, race: RaceResult) -> Result<u64> {
    let _writer = self.writer(season).await;

    let current = self.run(move |conn| read::load_season(conn, season)).await?;

    // Validate before any write: unknown drivers and a full season abort here.
    let column = current.race_column(&race)?;
    let extended = current.with_race(&race)?;
    let points_json = encode_points(&extended)?;

    let extended = Arc::new(extended);
    let plan = {
      let extended = Arc::clone(&extended);
      self
        .run(move |conn| write::begin_append(conn, season, &extended, &points_json))
        .await?
    };
    tracing::debug!(season, race = plan.new_race, "appending race");

    let roster = Arc::new(current.roster().to_vec());
    let result = self
      .append_all(season, roster, Arc::new(column), extended, plan)
      .await;
    let written = match result {
      Ok(written) => written,
      Err(e) => return Err(self.abandon(season, e).await),
    };

    if let Err(e) = self.run(move |conn| write::finish(conn, season)).await {
      return Err(self.abandon(season, e).await);
    }
    Ok(written)
  }

  async fn clear_season(&self, season: SeasonId) -> Result<u64> {
    let _writer = self.writer(season).await;
    self.run(move |conn| write::clear(conn, season)).await
  }

  // ── Metadata ──────────────────────────────────────────────────────────────

  async fn season_info(&self, season: SeasonId) -> Result<Option<SeasonInfo>> {
    self.run(move |conn| read::season_info(conn, season)).await
  }

  async fn list_seasons(&self) -> Result<Vec<SeasonInfo>> {
    self.run(|conn| read::list_seasons(conn)).await
  }

  async fn season_digest(&self, season: SeasonId) -> Result<Option<String>> {
    self.run(move |conn| digest::season_digest(conn, season)).await
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn lookup_by_subset(
    &self,
    season: SeasonId,
    subset: RaceSubset,
  ) -> Result<Option<ChampionshipId>> {
    self
      .run(move |conn| read::lookup_by_subset(conn, season, subset))
      .await
  }

  async fn championship(
    &self,
    season: SeasonId,
    id: ChampionshipId,
  ) -> Result<Option<Championship>> {
    self.run(move |conn| read::championship(conn, season, id)).await
  }

  async fn championship_detail(
    &self,
    season: SeasonId,
    id: ChampionshipId,
  ) -> Result<Option<ChampionshipDetail>> {
    self
      .run(move |conn| read::championship_detail(conn, season, id))
      .await
  }

  async fn championships(
    &self,
    season: SeasonId,
    page: u32,
    per_page: u32,
  ) -> Result<Page<Championship>> {
    self
      .run(move |conn| read::championships(conn, season, page, per_page))
      .await
  }

  // ── Analytical queries ────────────────────────────────────────────────────

  async fn best_positions(
    &self,
    season: SeasonId,
    mode: SearchMode,
  ) -> Result<Vec<BestPosition>> {
    self
      .run(move |conn| read::best_positions(conn, season, mode))
      .await
  }

  async fn win_probability(
    &self,
    season: SeasonId,
    driver: DriverCode,
    num_races: u32,
  ) -> Result<WinProbability> {
    self
      .run(move |conn| read::win_probability(conn, season, driver, num_races))
      .await
  }

  async fn win_probability_table(&self, season: SeasonId) -> Result<WinProbabilityTable> {
    self
      .run(move |conn| read::win_probability_table(conn, season))
      .await
  }

  async fn head_to_head(
    &self,
    season: SeasonId,
    driver_a: DriverCode,
    driver_b: DriverCode,
  ) -> Result<HeadToHead> {
    self
      .run(move |conn| read::head_to_head(conn, season, driver_a, driver_b))
      .await
  }

  async fn min_races_to_win(
    &self,
    season: SeasonId,
    driver: DriverCode,
  ) -> Result<Option<u32>> {
    self
      .run(move |conn| read::min_races_to_win(conn, season, driver))
      .await
  }

  async fn all_min_races_to_win(&self, season: SeasonId) -> Result<Vec<MinRacesToWin>> {
    self
      .run(move |conn| read::all_min_races_to_win(conn, season))
      .await
  }

  async fn championship_wins(&self, season: SeasonId) -> Result<Vec<TitleCount>> {
    self
      .run(move |conn| read::championship_wins(conn, season))
      .await
  }

  async fn driver_stats(&self, season: SeasonId, driver: DriverCode) -> Result<DriverStats> {
    self
      .run(move |conn| read::driver_stats(conn, season, driver))
      .await
  }

  async fn position_counts(
    &self,
    season: SeasonId,
    position: u32,
  ) -> Result<Vec<PositionCount>> {
    self
      .run(move |conn| read::position_counts(conn, season, position))
      .await
  }
}
