//! Core types and trait definitions for Podium, the "what-if" championship
//! engine.
//!
//! Given a season's per-race points, every non-empty subset of races forms a
//! hypothetical championship. This crate enumerates those subsets, ranks the
//! standings of each, and defines the store abstraction, the query cache and
//! the [`analyzer::Analyzer`] that ties them together. It is free of HTTP and
//! database dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod analyzer;
pub mod cache;
pub mod error;
pub mod search;
pub mod season;
pub mod standings;
pub mod store;
pub mod subset;

pub use error::{Classify, Error, ErrorKind, Result};
