//! SQL schema for the Podium SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS seasons (
    season      INTEGER PRIMARY KEY,
    roster      TEXT    NOT NULL,   -- JSON array of driver codes, roster order
    points      TEXT    NOT NULL,   -- JSON point matrix, one row per driver
    num_races   INTEGER NOT NULL,
    state       TEXT    NOT NULL,   -- 'complete' | 'incomplete'
    records     INTEGER NOT NULL DEFAULT 0,
    imported_at TEXT    NOT NULL    -- ISO 8601 UTC
);

-- One row per race subset. rounds, standings and points are parallel
-- comma-joined lists and are always written together.
CREATE TABLE IF NOT EXISTS championships (
    championship_id INTEGER PRIMARY KEY AUTOINCREMENT,
    season          INTEGER NOT NULL,
    num_races       INTEGER NOT NULL,
    rounds          TEXT    NOT NULL,   -- e.g. '1,3,4'
    standings       TEXT    NOT NULL,   -- driver codes by position
    winner          TEXT    NOT NULL,
    points          TEXT    NOT NULL    -- totals, parallel to standings
);

-- One row per (championship, driver).
CREATE TABLE IF NOT EXISTS positions (
    championship_id INTEGER NOT NULL,
    season          INTEGER NOT NULL,
    driver          TEXT    NOT NULL,
    position        INTEGER NOT NULL,
    points          INTEGER NOT NULL,
    PRIMARY KEY (championship_id, driver)
) WITHOUT ROWID;

CREATE UNIQUE INDEX IF NOT EXISTS championships_rounds_idx
    ON championships(season, rounds);
CREATE INDEX IF NOT EXISTS championships_num_races_idx
    ON championships(season, num_races);
CREATE INDEX IF NOT EXISTS championships_winner_idx
    ON championships(season, winner);
CREATE INDEX IF NOT EXISTS championships_winner_num_races_idx
    ON championships(season, winner, num_races);
CREATE INDEX IF NOT EXISTS positions_driver_position_idx
    ON positions(season, driver, position);

PRAGMA user_version = 1;
";
