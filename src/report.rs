//! Report sink: formatted console output plus JSON and CSV artifacts.
//!
//! The persisted artifacts carry the full aggregated statistics per query
//! kind together with dataset size and iteration counts, so runs at
//! increasing scale can be diffed against each other.

use crate::error::BenchResult;
use crate::queries::QueryKind;
use crate::stats::AggregatedStats;
use crate::store::DatasetStats;
use crate::trial::{TrialResult, TrialSpec};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Summary of one trial, ready for rendering and persistence.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub kind: QueryKind,
    pub runner: usize,
    pub dataset_size: u64,
    pub warmup_count: u32,
    pub measured_count: u32,
    pub samples: usize,
    pub failures: u32,
    pub degraded: bool,
    pub interrupted: bool,
    /// `None` when the trial recorded no samples (e.g. cancelled before the
    /// first measured iteration).
    pub stats: Option<AggregatedStats>,
}

impl QueryReport {
    pub fn from_trial(
        result: &TrialResult,
        spec: &TrialSpec,
        stats: Option<AggregatedStats>,
    ) -> Self {
        Self {
            kind: result.kind,
            runner: result.runner,
            dataset_size: result.dataset_size,
            warmup_count: spec.warmup_count,
            measured_count: spec.measured_count,
            samples: result.samples.len(),
            failures: result.failures,
            degraded: result.degraded,
            interrupted: result.interrupted,
            stats,
        }
    }
}

/// One full benchmark invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unix epoch seconds at report creation.
    pub timestamp: u64,
    pub db_path: String,
    pub dataset: DatasetStats,
    pub warmup_count: u32,
    pub measured_count: u32,
    pub concurrency: usize,
    pub queries: Vec<QueryReport>,
}

impl RunReport {
    pub fn new(
        db_path: &Path,
        dataset: DatasetStats,
        warmup_count: u32,
        measured_count: u32,
        concurrency: usize,
        queries: Vec<QueryReport>,
    ) -> Self {
        Self {
            timestamp: epoch_seconds(),
            db_path: db_path.display().to_string(),
            dataset,
            warmup_count,
            measured_count,
            concurrency,
            queries,
        }
    }
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Print a formatted report for the whole run.
pub fn print_report(report: &RunReport) {
    println!("\n{}", "=".repeat(80));
    println!("  Leaderboard Query Benchmark Report");
    println!(
        "  Dataset: {} users ({} active), {} entries",
        report.dataset.users, report.dataset.active_users, report.dataset.entries
    );
    if let (Some(min), Some(max), Some(mean)) = (
        report.dataset.min_score,
        report.dataset.max_score,
        report.dataset.mean_score,
    ) {
        println!("  Scores:  min {}  max {}  mean {:.1}", min, max, mean);
    }
    println!(
        "  Iterations: {} measured / {} warm-up, concurrency {}",
        report.measured_count, report.warmup_count, report.concurrency
    );
    println!("{}", "=".repeat(80));

    for q in &report.queries {
        let runner_tag = if report.concurrency > 1 {
            format!(" | runner {}", q.runner)
        } else {
            String::new()
        };
        println!("\n  Query: {}{}", q.kind, runner_tag);
        println!("  {}", "-".repeat(60));

        match &q.stats {
            Some(s) => {
                println!("  Mean:            {:>10.3}ms", s.mean_ms);
                println!("  Median:          {:>10.3}ms", s.median_ms);
                println!(
                    "  p50/p90/p95/p99: {:.3} / {:.3} / {:.3} / {:.3}ms",
                    s.p50_ms, s.p90_ms, s.p95_ms, s.p99_ms
                );
                println!(
                    "  Min/Max:         {:.3} / {:.3}ms  (stddev {:.3}ms)",
                    s.min_ms, s.max_ms, s.stddev_ms
                );
                println!("  Ops/sec:         {:>10.1}", s.ops_per_second);
                println!("  Samples:         {:>10}", s.count);
                println!("  Verdict:         {}", s.verdict);
            }
            None => println!("  No samples recorded"),
        }
        if q.failures > 0 {
            println!(
                "  Failures:        {:>10}{}",
                q.failures,
                if q.degraded { "  DEGRADED" } else { "" }
            );
        }
        if q.interrupted {
            println!("  INTERRUPTED — partial trial ({} of {} iterations)",
                q.samples + q.failures as usize, q.measured_count);
        }
    }

    println!("\n{}", "=".repeat(80));

    if report.queries.len() >= 2 {
        println!("\n  Comparison Summary:");
        println!(
            "  {:16} {:>6} {:>12} {:>12} {:>12} {:>10} {:>12}",
            "Query", "Run", "Mean (ms)", "p95 (ms)", "p99 (ms)", "Ops/sec", "Verdict"
        );
        println!("  {}", "-".repeat(86));
        for q in &report.queries {
            match &q.stats {
                Some(s) => println!(
                    "  {:16} {:>6} {:>12.3} {:>12.3} {:>12.3} {:>10.1} {:>12}",
                    q.kind.label(),
                    q.runner,
                    s.mean_ms,
                    s.p95_ms,
                    s.p99_ms,
                    s.ops_per_second,
                    s.verdict.to_string()
                ),
                None => println!(
                    "  {:16} {:>6} {:>12} {:>12} {:>12} {:>10} {:>12}",
                    q.kind.label(),
                    q.runner,
                    "-",
                    "-",
                    "-",
                    "-",
                    "n/a"
                ),
            }
        }
    }

    // Combined throughput per kind across concurrent runners.
    if report.concurrency > 1 {
        println!("\n  Combined throughput (all runners):");
        for kind in QueryKind::ALL {
            let total: f64 = report
                .queries
                .iter()
                .filter(|q| q.kind == kind)
                .filter_map(|q| q.stats.as_ref())
                .map(|s| s.ops_per_second)
                .sum();
            if total > 0.0 {
                println!("  {:16} {:>10.1} ops/sec", kind.label(), total);
            }
        }
    }

    println!();
}

/// Write the full report as pretty JSON. Returns the file path.
pub fn save_json(report: &RunReport, output_dir: &Path) -> BenchResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("performance_results_{}.json", report.timestamp));
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Write a one-row-per-trial CSV summary. Returns the file path.
pub fn save_csv(report: &RunReport, output_dir: &Path) -> BenchResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("performance_summary_{}.csv", report.timestamp));
    let mut wtr = csv::Writer::from_path(&path)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    wtr.write_record([
        "timestamp",
        "query",
        "runner",
        "dataset_size",
        "measured_count",
        "samples",
        "failures",
        "degraded",
        "interrupted",
        "mean_ms",
        "median_ms",
        "stddev_ms",
        "min_ms",
        "max_ms",
        "p50_ms",
        "p90_ms",
        "p95_ms",
        "p99_ms",
        "ops_per_second",
        "verdict",
    ])
    .map_err(csv_io)?;

    for q in &report.queries {
        let stat_fields: Vec<String> = match &q.stats {
            Some(s) => vec![
                format!("{:.6}", s.mean_ms),
                format!("{:.6}", s.median_ms),
                format!("{:.6}", s.stddev_ms),
                format!("{:.6}", s.min_ms),
                format!("{:.6}", s.max_ms),
                format!("{:.6}", s.p50_ms),
                format!("{:.6}", s.p90_ms),
                format!("{:.6}", s.p95_ms),
                format!("{:.6}", s.p99_ms),
                format!("{:.2}", s.ops_per_second),
                s.verdict.to_string(),
            ],
            None => std::iter::repeat(String::new()).take(10).chain(["n/a".to_string()]).collect(),
        };
        let mut record = vec![
            report.timestamp.to_string(),
            q.kind.label().to_string(),
            q.runner.to_string(),
            q.dataset_size.to_string(),
            q.measured_count.to_string(),
            q.samples.to_string(),
            q.failures.to_string(),
            q.degraded.to_string(),
            q.interrupted.to_string(),
        ];
        record.extend(stat_fields);
        wtr.write_record(&record).map_err(csv_io)?;
    }

    wtr.flush()?;
    Ok(path)
}

fn csv_io(e: csv::Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e)
}
