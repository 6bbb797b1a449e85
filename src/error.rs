//! Benchmark error taxonomy.
//!
//! Per-iteration failures (`NotFound`) are counted at the trial boundary and
//! never abort the suite; everything else is fatal to the phase that raised it.

pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[derive(Debug)]
pub enum BenchError {
    /// Bad distribution or configuration input. Raised before any storage access.
    InvalidParameter(String),
    /// The storage engine is unreachable or rejected a statement. Not retried:
    /// a retry would bias the timing measurements.
    ConnectionFailure(String),
    /// An operation referenced a user with no (active) leaderboard entry.
    NotFound { user_id: i64 },
    /// The aggregator was given zero samples.
    EmptyInput,
    Io(std::io::Error),
}

impl std::fmt::Display for BenchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchError::InvalidParameter(s) => write!(f, "invalid parameter: {}", s),
            BenchError::ConnectionFailure(s) => write!(f, "storage engine failure: {}", s),
            BenchError::NotFound { user_id } => {
                write!(f, "no active leaderboard entry for user {}", user_id)
            }
            BenchError::EmptyInput => write!(f, "cannot summarize an empty trial"),
            BenchError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for BenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BenchError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BenchError {
    fn from(e: std::io::Error) -> Self {
        BenchError::Io(e)
    }
}

// `QueryReturnedNoRows` is mapped to `NotFound` at the call sites that know
// which user id was being looked up; anything that reaches this blanket
// conversion is a storage-level failure.
impl From<rusqlite::Error> for BenchError {
    fn from(e: rusqlite::Error) -> Self {
        BenchError::ConnectionFailure(e.to_string())
    }
}
