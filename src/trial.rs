//! Trial execution: warm-up, measured iterations, failure accounting.
//!
//! Iterations run sequentially — each call must complete before the next
//! starts, so every sample is an honest per-call latency rather than a
//! contention artifact. The optional concurrent mode spawns one runner per
//! thread, each with its own connection, to characterize contention on top.

use crate::error::{BenchError, BenchResult};
use crate::queries::{self, ArgsGenerator, QueryKind};
use crate::store::LeaderboardStore;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Iteration counts and the failure budget for one trial.
#[derive(Debug, Clone, Copy)]
pub struct TrialSpec {
    /// Invocations whose timings are discarded entirely. Amortizes cold
    /// caches, connection setup, and statement-plan warm-up.
    pub warmup_count: u32,
    pub measured_count: u32,
    /// Failures tolerated before the result is marked degraded.
    pub max_failures: u32,
}

impl TrialSpec {
    pub fn new(warmup_count: u32, measured_count: u32) -> Self {
        Self {
            warmup_count,
            measured_count,
            max_failures: 0,
        }
    }

    /// Per-kind defaults. Score updates and top-N are deterministic given ids
    /// from the populated range, so any failure degrades them; rank lookups
    /// can land on inactive users, so they get a 10% budget.
    pub fn for_kind(kind: QueryKind, warmup_count: u32, measured_count: u32) -> Self {
        let max_failures = match kind {
            QueryKind::ScoreUpdate | QueryKind::TopN => 0,
            QueryKind::RankOfUser => measured_count / 10,
        };
        Self {
            warmup_count,
            measured_count,
            max_failures,
        }
    }
}

/// Raw outcome of one trial: the ordered duration samples plus failure and
/// interruption accounting. Owned by the invocation that produced it until
/// handed to the aggregator.
#[derive(Debug, Clone)]
pub struct TrialResult {
    pub kind: QueryKind,
    pub dataset_size: u64,
    pub samples: Vec<Duration>,
    pub failures: u32,
    /// Failure count exceeded the spec's budget.
    pub degraded: bool,
    /// Cancelled before all measured iterations ran; samples are partial but
    /// still summarizable.
    pub interrupted: bool,
    /// Which concurrent runner produced this result (0 when sequential).
    pub runner: usize,
}

/// Run one trial: `warmup_count` discarded invocations, then
/// `measured_count` timed ones.
///
/// Per-iteration `NotFound` is counted and the iteration's duration dropped;
/// the trial continues. Any other error aborts the trial — connectivity
/// failures must not be retried or they would bias the measurements. The
/// cancel flag is checked before every invocation; once set, no further
/// iterations start and the partial result is returned marked interrupted.
pub fn run_trial(
    store: &LeaderboardStore,
    args: &mut ArgsGenerator,
    spec: &TrialSpec,
    cancel: &AtomicBool,
) -> BenchResult<TrialResult> {
    let kind = args.kind();
    let dataset_size = store.user_count()?;
    let mut result = TrialResult {
        kind,
        dataset_size,
        samples: Vec::with_capacity(spec.measured_count as usize),
        failures: 0,
        degraded: false,
        interrupted: false,
        runner: 0,
    };

    log::debug!(
        "Trial {}: {} warm-up + {} measured iterations over {} users",
        kind,
        spec.warmup_count,
        spec.measured_count,
        dataset_size
    );

    for _ in 0..spec.warmup_count {
        if cancel.load(Ordering::SeqCst) {
            result.interrupted = true;
            return Ok(result);
        }
        match queries::execute(store, &args.next_args()) {
            Ok(()) | Err(BenchError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    for _ in 0..spec.measured_count {
        if cancel.load(Ordering::SeqCst) {
            result.interrupted = true;
            break;
        }
        let iteration_args = args.next_args();
        let start = Instant::now();
        match queries::execute(store, &iteration_args) {
            Ok(()) => result.samples.push(start.elapsed()),
            Err(BenchError::NotFound { user_id }) => {
                result.failures += 1;
                log::debug!("{}: iteration failed, user {} not found", kind, user_id);
            }
            Err(e) => return Err(e),
        }
    }

    result.degraded = result.failures > spec.max_failures;
    if result.degraded {
        log::warn!(
            "Trial {} degraded: {} failures over {} iterations (budget {})",
            kind,
            result.failures,
            spec.measured_count,
            spec.max_failures
        );
    }
    Ok(result)
}

/// Argument-generation settings shared by all runners of a concurrent trial.
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    pub users_sample: Option<u64>,
    pub top_limit: u32,
    pub seed: u64,
}

/// Run the same trial on `runners` threads at once, each with its own
/// connection and its own rng stream.
///
/// Results come back tagged per runner and must be aggregated per runner;
/// this measures contention/throughput, not base latency. Requires a
/// file-backed database — in-memory databases are per-connection.
pub fn run_concurrent_trials(
    db_path: &Path,
    kind: QueryKind,
    spec: &TrialSpec,
    cfg: &RunnerConfig,
    runners: usize,
    cancel: &Arc<AtomicBool>,
) -> BenchResult<Vec<TrialResult>> {
    if runners == 0 {
        return Err(BenchError::InvalidParameter(
            "concurrent mode needs at least one runner".into(),
        ));
    }

    let handles: Vec<_> = (0..runners)
        .map(|runner| {
            let path = db_path.to_path_buf();
            let spec = *spec;
            let cfg = *cfg;
            let cancel = Arc::clone(cancel);
            std::thread::spawn(move || -> BenchResult<TrialResult> {
                let store = LeaderboardStore::open(&path)?;
                // Offset the seed so runners do not replay one another's
                // argument sequence against the same rows.
                let mut args = ArgsGenerator::for_store(
                    kind,
                    &store,
                    cfg.users_sample,
                    cfg.top_limit,
                    cfg.seed.wrapping_add(runner as u64),
                )?;
                let mut result = run_trial(&store, &mut args, &spec, &cancel)?;
                result.runner = runner;
                Ok(result)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(runners);
    for handle in handles {
        let result = handle
            .join()
            .map_err(|_| BenchError::ConnectionFailure("runner thread panicked".into()))??;
        results.push(result);
    }
    Ok(results)
}
