//! Dataset population: materializes synthetic users and leaderboard rows.
//!
//! Inserting one row per round trip would make population time dominate the
//! experiment, so rows go in batched transactions. Usernames and emails embed
//! a counter that continues from the store's current max user id, keeping
//! identities unique across appending runs without any coordination.

use crate::distribution::{self, ScoreDistribution};
use crate::error::{BenchError, BenchResult};
use crate::store::{LeaderboardStore, NewEntry, NewUser};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const USERNAME_PREFIXES: &[&str] = &[
    "Player", "Gamer", "Pro", "Master", "Noob", "Elite", "Super", "Mega", "Ultra", "Alpha",
];

const SECS_PER_DAY: i64 = 86_400;

/// How much data to create and how.
#[derive(Debug, Clone)]
pub struct PopulationParams {
    pub count: usize,
    pub distribution: ScoreDistribution,
    /// Rows per insert transaction.
    pub batch_size: usize,
    /// Delete all existing users and entries first (transactionally).
    pub clear_existing: bool,
    /// Fixed seed for reproducible datasets; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl PopulationParams {
    pub fn new(count: usize, distribution: ScoreDistribution) -> Self {
        Self {
            count,
            distribution,
            batch_size: 1_000,
            clear_existing: false,
            seed: None,
        }
    }
}

/// Outcome of a population run.
#[derive(Debug, Clone)]
pub struct PopulationReport {
    pub inserted: usize,
    pub first_user_id: i64,
    pub elapsed: Duration,
}

impl PopulationReport {
    pub fn rows_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.inserted as f64 / secs
        } else {
            0.0
        }
    }
}

/// Generate and insert `params.count` users with one leaderboard row each.
///
/// With `clear_existing` the prior contents are removed first; without it new
/// rows append after the existing id range. Either way the user count after a
/// clearing run equals exactly the requested count.
pub fn populate(
    store: &mut LeaderboardStore,
    params: &PopulationParams,
) -> BenchResult<PopulationReport> {
    if params.count == 0 {
        return Err(BenchError::InvalidParameter(
            "population count must be at least 1".into(),
        ));
    }
    if params.batch_size == 0 {
        return Err(BenchError::InvalidParameter(
            "batch size must be at least 1".into(),
        ));
    }

    let started = Instant::now();
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if params.clear_existing {
        log::info!("Clearing existing users and leaderboard entries");
        store.clear_all()?;
    }

    let offset = store.max_user_id()?;
    let scores = distribution::generate(params.count, &params.distribution, &mut rng)?;
    log_score_summary(&scores);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    log::info!(
        "Inserting {} users (batches of {}, ids from {})",
        params.count,
        params.batch_size,
        offset + 1
    );

    for (chunk_idx, chunk) in scores.chunks(params.batch_size).enumerate() {
        let base = offset + 1 + (chunk_idx * params.batch_size) as i64;

        let users: Vec<NewUser> = chunk
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let user_id = base + i as i64;
                let prefix = USERNAME_PREFIXES[rng.gen_range(0..USERNAME_PREFIXES.len())];
                let username = format!("{}{}", prefix, user_id);
                let email = format!("{}@bench.local", username.to_lowercase());
                NewUser {
                    user_id,
                    username,
                    email,
                    registration_date: now - rng.gen_range(1..=365) * SECS_PER_DAY,
                    // 95% active, mirroring a realistic player base.
                    is_active: rng.gen_bool(0.95),
                }
            })
            .collect();

        let entries: Vec<NewEntry> = chunk
            .iter()
            .enumerate()
            .map(|(i, &score)| NewEntry {
                user_id: base + i as i64,
                score,
                games_played: rng.gen_range(1..=100),
            })
            .collect();

        store.insert_users(&users)?;
        store.insert_entries(&entries)?;
        log::debug!("Batch {} done ({} rows)", chunk_idx + 1, chunk.len());
    }

    let report = PopulationReport {
        inserted: params.count,
        first_user_id: offset + 1,
        elapsed: started.elapsed(),
    };
    log::info!(
        "Inserted {} users in {:.2}s ({:.0} rows/s)",
        report.inserted,
        report.elapsed.as_secs_f64(),
        report.rows_per_second()
    );
    Ok(report)
}

/// Log min/max/mean/stddev of the generated scores so a run's dataset shape
/// is visible without querying the database.
fn log_score_summary(scores: &[i64]) {
    if scores.is_empty() {
        return;
    }
    let min = scores.iter().min().copied().unwrap_or(0);
    let max = scores.iter().max().copied().unwrap_or(0);
    let mean = scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64;
    let variance = scores
        .iter()
        .map(|&s| {
            let d = s as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / scores.len() as f64;
    log::info!(
        "Generated scores: min={} max={} mean={:.1} stddev={:.1}",
        min,
        max,
        mean,
        variance.sqrt()
    );
}
