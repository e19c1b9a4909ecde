//! `podium` binary.
//!
//! Reads `podium.toml` (or the path given with `--config`) layered under
//! `PODIUM_*` environment variables, opens the SQLite store, and either
//! serves the JSON API or runs one maintenance command.
//!
//! ```text
//! podium import --season 2024 [--csv data/championships_2024.csv] [--clear]
//! podium add-race --season 2024 --results "VER:25,NOR:18,LEC:15"
//! podium status --season 2024
//! podium serve
//! ```

use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use podium_core::season::SeasonId;
use podium_server::{ServerConfig, analyzer, open_store, router, season_csv_path};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Podium what-if championship engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "podium.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API.
  Serve,

  /// Create the database schema and exit.
  InitDb,

  /// Generate and store every championship of a season from a CSV file.
  Import {
    #[arg(long)]
    season:     SeasonId,
    /// Defaults to `championships_{season}.csv` in the data folder.
    #[arg(long)]
    csv:        Option<PathBuf>,
    /// Replace the season's existing records.
    #[arg(long)]
    clear:      bool,
    /// Overrides `import.batch_size`.
    #[arg(long)]
    batch_size: Option<usize>,
  },

  /// Append one race and generate only the championships it adds.
  AddRace {
    #[arg(long)]
    season:  SeasonId,
    /// Comma-separated `DRIVER:POINTS` pairs, e.g. `VER:25,NOR:18`.
    #[arg(long)]
    results: String,
  },

  /// Delete every record of a season.
  ClearSeason {
    #[arg(long)]
    season: SeasonId,
    /// Required; the deletion cannot be undone.
    #[arg(long)]
    yes:    bool,
  },

  /// Print a season's metadata and content digest.
  Status {
    #[arg(long)]
    season: SeasonId,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;
  if let Command::Import { batch_size: Some(n), .. } = &cli.command {
    cfg.import.batch_size = *n;
  }

  let store = open_store(&cfg)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.database_path))?;
  let analyzer = analyzer(store, &cfg);

  match cli.command {
    Command::Serve => {
      let app = router(Arc::new(analyzer));
      let address = cfg.address();

      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
    }

    Command::InitDb => {
      tracing::info!(path = ?cfg.database_path, "database ready");
    }

    Command::Import { season, csv, clear, .. } => {
      let path = csv.unwrap_or_else(|| season_csv_path(&cfg.data_folder, season));
      let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {path:?}"))?;
      let data = podium_season::parse_csv(&text)
        .with_context(|| format!("invalid season file {path:?}"))?;

      println!(
        "Importing season {season}: {} drivers, {} races, {} championships",
        data.roster().len(),
        data.race_count(),
        (1u64 << data.race_count()) - 1,
      );
      let started = Instant::now();
      let written = analyzer
        .import_season(season, data, clear)
        .await
        .with_context(|| format!("import of season {season} failed"))?;
      println!(
        "Stored {written} championships in {:.1}s",
        started.elapsed().as_secs_f64()
      );
    }

    Command::AddRace { season, results } => {
      let race = podium_season::parse_race_results(&results)
        .context("invalid race results")?;
      let written = analyzer
        .add_race(season, race)
        .await
        .with_context(|| format!("failed to add race to season {season}"))?;
      println!("Stored {written} new championships for season {season}");
    }

    Command::ClearSeason { season, yes } => {
      if !yes {
        bail!("refusing to delete season {season} without --yes");
      }
      let removed = analyzer.clear_season(season).await?;
      println!("Cleared {removed} championships from season {season}");
    }

    Command::Status { season } => {
      let Some(info) = analyzer.season_info(season).await? else {
        bail!("season {season} not found");
      };
      println!("Season {}", info.season);
      println!("  state:    {:?}", info.state);
      println!("  drivers:  {}", info.roster.join(", "));
      println!("  races:    {}", info.num_races);
      println!("  records:  {}", info.records);
      println!("  imported: {}", info.imported_at.to_rfc3339());
      match analyzer.season_digest(season).await {
        Ok(Some(digest)) => println!("  digest:   {digest}"),
        Ok(None) => {}
        Err(e) => println!("  digest:   unavailable ({e})"),
      }
    }
  }

  Ok(())
}
