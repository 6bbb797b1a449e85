//! Latency thresholds and environment-driven settings.
//!
//! Thresholds are external configuration, not constants: every deployment has
//! its own idea of "fast enough", so the defaults here can be overridden from
//! a JSON file passed on the command line.

use crate::error::{BenchError, BenchResult};
use crate::queries::QueryKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the database file.
pub const DB_PATH_ENV: &str = "LEADERBOARD_DB";

const DEFAULT_DB_PATH: &str = "leaderboard.db";

/// Verdict boundaries (milliseconds, on the mean latency) for one query kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueryThresholds {
    pub excellent_ms: f64,
    pub good_ms: f64,
    pub acceptable_ms: f64,
}

impl QueryThresholds {
    fn validate(&self, kind: &str) -> BenchResult<()> {
        let ordered = self.excellent_ms > 0.0
            && self.excellent_ms <= self.good_ms
            && self.good_ms <= self.acceptable_ms;
        if !ordered {
            return Err(BenchError::InvalidParameter(format!(
                "{} thresholds must satisfy 0 < excellent <= good <= acceptable \
                 (got {} / {} / {})",
                kind, self.excellent_ms, self.good_ms, self.acceptable_ms
            )));
        }
        Ok(())
    }
}

/// Per-query-kind thresholds.
///
/// Defaults: score updates under 1ms are excellent and under 10ms good;
/// top-N under 5ms excellent, under 50ms acceptable; rank lookups under
/// 100ms good, under 1s acceptable — beyond that the schema needs rethinking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub score_update: QueryThresholds,
    pub top_n: QueryThresholds,
    pub rank_of_user: QueryThresholds,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            score_update: QueryThresholds {
                excellent_ms: 1.0,
                good_ms: 10.0,
                acceptable_ms: 50.0,
            },
            top_n: QueryThresholds {
                excellent_ms: 5.0,
                good_ms: 20.0,
                acceptable_ms: 50.0,
            },
            rank_of_user: QueryThresholds {
                excellent_ms: 10.0,
                good_ms: 100.0,
                acceptable_ms: 1_000.0,
            },
        }
    }
}

impl Thresholds {
    pub fn for_kind(&self, kind: QueryKind) -> &QueryThresholds {
        match kind {
            QueryKind::ScoreUpdate => &self.score_update,
            QueryKind::TopN => &self.top_n,
            QueryKind::RankOfUser => &self.rank_of_user,
        }
    }

    /// Load thresholds from a JSON file. Kinds absent from the file keep
    /// their defaults; a present kind must spell out all three boundaries.
    pub fn load(path: &Path) -> BenchResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let thresholds: Thresholds = serde_json::from_str(&text).map_err(|e| {
            BenchError::InvalidParameter(format!("{}: {}", path.display(), e))
        })?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    fn validate(&self) -> BenchResult<()> {
        self.score_update.validate("score_update")?;
        self.top_n.validate("top_n")?;
        self.rank_of_user.validate("rank_of_user")?;
        Ok(())
    }
}

/// Database path resolution: explicit flag, then the `LEADERBOARD_DB`
/// environment variable, then the default file in the working directory.
pub fn resolve_db_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var(DB_PATH_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
}
