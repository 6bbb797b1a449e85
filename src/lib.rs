//! SQLite Leaderboard Latency Benchmark
//!
//! Measures how long the three latency-critical leaderboard operations take
//! as the dataset grows:
//!
//! - **Score update**: `UPDATE ... SET score = score + ?` (a won game)
//! - **Top-N retrieval**: the ranking every player sees
//! - **Rank-of-user**: counting all strictly-greater scores — the expensive one
//!
//! Datasets are generated synthetically with selectable score distributions
//! (uniform, normal, skewed), trials discard warm-up invocations and time the
//! rest with a monotonic clock, and raw samples are reduced to percentile
//! statistics with a verdict against configurable latency thresholds.
//!
//! Populate: `cargo run --release -- populate --users 100000 --distribution skewed`
//! Benchmark: `cargo run --release -- bench --iterations 100 --save-results`
//! Run tests: `cargo test`

pub mod config;
pub mod distribution;
pub mod error;
pub mod logging;
pub mod populate;
pub mod queries;
pub mod report;
pub mod stats;
pub mod store;
pub mod trial;
