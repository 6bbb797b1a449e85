//! Benchmark CLI: populate a synthetic leaderboard, then measure it.
//!
//! Usage:
//!   leaderboard-bench populate --users 100000 --distribution skewed --clear
//!   leaderboard-bench bench --iterations 100 --warmup 10 --save-results
//!   leaderboard-bench bench --concurrency 4        # contention mode
//!
//! The database path comes from `--db`, the `LEADERBOARD_DB` environment
//! variable, or defaults to `leaderboard.db` in the working directory.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use leaderboard_bench::config::{self, Thresholds};
use leaderboard_bench::distribution::ScoreDistribution;
use leaderboard_bench::error::BenchError;
use leaderboard_bench::logging;
use leaderboard_bench::populate::{populate, PopulationParams};
use leaderboard_bench::queries::{ArgsGenerator, QueryKind};
use leaderboard_bench::report::{self, QueryReport, RunReport};
use leaderboard_bench::stats;
use leaderboard_bench::store::LeaderboardStore;
use leaderboard_bench::trial::{run_concurrent_trials, run_trial, RunnerConfig, TrialSpec};
use log::LevelFilter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "leaderboard-bench",
    about = "SQLite leaderboard latency benchmark",
    version
)]
struct Cli {
    /// Database file (falls back to $LEADERBOARD_DB, then leaderboard.db).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DistributionKind {
    Uniform,
    Normal,
    Skewed,
}

impl DistributionKind {
    fn to_spec(self) -> ScoreDistribution {
        match self {
            DistributionKind::Uniform => ScoreDistribution::uniform_default(),
            DistributionKind::Normal => ScoreDistribution::normal_default(),
            DistributionKind::Skewed => ScoreDistribution::skewed_default(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate synthetic users and leaderboard rows.
    Populate {
        /// Number of users to create.
        #[arg(long, short = 'u')]
        users: usize,

        /// Score distribution shape.
        #[arg(long, value_enum, default_value_t = DistributionKind::Normal)]
        distribution: DistributionKind,

        /// Rows per insert transaction.
        #[arg(long, default_value_t = 1_000)]
        batch_size: usize,

        /// Fixed seed for a reproducible dataset.
        #[arg(long)]
        seed: Option<u64>,

        /// Delete all existing data first.
        #[arg(long)]
        clear: bool,
    },
    /// Run the timed query trials against the populated dataset.
    Bench {
        /// Measured iterations per query kind.
        #[arg(long, short = 'i', default_value_t = 50)]
        iterations: u32,

        /// Discarded warm-up iterations per query kind.
        #[arg(long, default_value_t = 10)]
        warmup: u32,

        /// Only target user ids up to this bound (hot-subset benchmarking).
        #[arg(long)]
        users_sample: Option<u64>,

        /// Row count for top-N retrieval.
        #[arg(long, default_value_t = 10)]
        top_limit: u32,

        /// Parallel runners, each with its own connection. 1 = sequential
        /// base-latency mode; >1 measures contention instead.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,

        /// Fixed seed for the per-iteration argument stream.
        #[arg(long)]
        seed: Option<u64>,

        /// Persist JSON and CSV artifacts.
        #[arg(long)]
        save_results: bool,

        /// Directory for persisted artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// JSON file overriding the default latency thresholds.
        #[arg(long)]
        thresholds: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::initialize_logger(level, cli.log_file.as_deref())?;

    let db_path = config::resolve_db_path(cli.db.clone());
    log::info!("Database: {}", db_path.display());

    match cli.command {
        Command::Populate {
            users,
            distribution,
            batch_size,
            seed,
            clear,
        } => {
            let mut params = PopulationParams::new(users, distribution.to_spec());
            params.batch_size = batch_size;
            params.clear_existing = clear;
            params.seed = seed;
            run_populate(&db_path, &params)
        }
        Command::Bench {
            iterations,
            warmup,
            users_sample,
            top_limit,
            concurrency,
            seed,
            save_results,
            output_dir,
            thresholds,
        } => {
            let opts = BenchOptions {
                iterations,
                warmup,
                users_sample,
                top_limit,
                concurrency,
                seed,
                save_results,
                output_dir,
                thresholds,
            };
            run_bench(&db_path, &opts)
        }
    }
}

fn run_populate(db_path: &std::path::Path, params: &PopulationParams) -> anyhow::Result<()> {
    let mut store = LeaderboardStore::open(db_path)?;
    populate(&mut store, params).context("population failed")?;

    let stats = store.dataset_stats()?;
    println!("\nDataset after population:");
    println!("  Users:          {}", stats.users);
    println!("  Active users:   {}", stats.active_users);
    println!("  Entries:        {}", stats.entries);
    if let (Some(min), Some(max), Some(mean)) =
        (stats.min_score, stats.max_score, stats.mean_score)
    {
        println!("  Score min/max:  {} / {}", min, max);
        println!("  Score mean:     {:.1}", mean);
        if let Some(stddev) = stats.stddev_score {
            println!("  Score stddev:   {:.1}", stddev);
        }
    }
    Ok(())
}

struct BenchOptions {
    iterations: u32,
    warmup: u32,
    users_sample: Option<u64>,
    top_limit: u32,
    concurrency: usize,
    seed: Option<u64>,
    save_results: bool,
    output_dir: PathBuf,
    thresholds: Option<PathBuf>,
}

fn run_bench(db_path: &std::path::Path, opts: &BenchOptions) -> anyhow::Result<()> {
    if opts.iterations == 0 {
        bail!("--iterations must be at least 1");
    }
    if opts.concurrency == 0 {
        bail!("--concurrency must be at least 1");
    }

    let thresholds = match &opts.thresholds {
        Some(path) => Thresholds::load(path)
            .with_context(|| format!("loading thresholds from {}", path.display()))?,
        None => Thresholds::default(),
    };

    let store = LeaderboardStore::open(db_path)?;
    let dataset = store.dataset_stats()?;
    if dataset.users == 0 {
        bail!(
            "dataset at {} is empty — run the populate command first",
            db_path.display()
        );
    }

    // Announce cancellation but keep the current iteration running; the trial
    // loop stops before issuing the next one.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            if cancel.swap(true, Ordering::SeqCst) {
                log::warn!("Still finishing the current iteration...");
            } else {
                log::info!("Interrupt received — no new iterations will start");
            }
        })
        .context("installing interrupt handler")?;
    }

    let seed = opts.seed.unwrap_or_else(rand::random);
    log::info!(
        "Benchmarking {} users: {} measured / {} warm-up, concurrency {}, seed {}",
        dataset.users,
        opts.iterations,
        opts.warmup,
        opts.concurrency,
        seed
    );

    let mut reports: Vec<QueryReport> = Vec::new();
    let mut interrupted = false;

    for kind in QueryKind::ALL {
        if cancel.load(Ordering::SeqCst) {
            log::warn!("Run interrupted — skipping {}", kind);
            interrupted = true;
            break;
        }

        log::info!("Benchmarking {}...", kind);
        let spec = TrialSpec::for_kind(kind, opts.warmup, opts.iterations);

        let results = if opts.concurrency > 1 {
            let cfg = RunnerConfig {
                users_sample: opts.users_sample,
                top_limit: opts.top_limit,
                seed,
            };
            run_concurrent_trials(db_path, kind, &spec, &cfg, opts.concurrency, &cancel)
        } else {
            let mut args =
                ArgsGenerator::for_store(kind, &store, opts.users_sample, opts.top_limit, seed)?;
            run_trial(&store, &mut args, &spec, &cancel).map(|r| vec![r])
        }
        .with_context(|| {
            format!(
                "benchmark aborted during {} at dataset size {}",
                kind, dataset.users
            )
        })?;

        for result in results {
            interrupted |= result.interrupted;
            let agg = match stats::summarize(&result.samples, thresholds.for_kind(kind)) {
                Ok(s) => Some(s),
                Err(BenchError::EmptyInput) => None,
                Err(e) => return Err(e).context("aggregating trial samples"),
            };
            reports.push(QueryReport::from_trial(&result, &spec, agg));
        }
    }

    let run_report = RunReport::new(
        db_path,
        dataset,
        opts.warmup,
        opts.iterations,
        opts.concurrency,
        reports,
    );
    report::print_report(&run_report);

    if opts.save_results {
        let json_path = report::save_json(&run_report, &opts.output_dir)?;
        let csv_path = report::save_csv(&run_report, &opts.output_dir)?;
        log::info!("Results saved to {}", json_path.display());
        log::info!("Summary saved to {}", csv_path.display());
    }

    if interrupted {
        log::warn!("Run ended early on interrupt; reported statistics are partial");
    }
    Ok(())
}
