//! SQLite backend for the Podium championship store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Imports and appends commit in batches
//! on that thread; reads queue between batches and never take a season's
//! writer lock.

mod digest;
mod encode;
mod read;
mod schema;
mod store;
mod write;

pub mod error;

pub use error::{Error, Result};
pub use store::{DEFAULT_BATCH_SIZE, SqliteStore};
