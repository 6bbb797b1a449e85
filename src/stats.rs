//! Reduces raw duration samples to descriptive statistics and a verdict.
//!
//! Percentiles use linear interpolation between the two closest ranks of the
//! sorted samples, so results are deterministic and insensitive to input
//! order. Standard deviation is the sample form (n−1 divisor): a trial is a
//! sample of the larger space of possible runs, not the whole population.

use crate::config::QueryThresholds;
use crate::error::{BenchError, BenchResult};
use serde::Serialize;
use std::time::Duration;

/// Qualitative classification of a trial's mean latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Excellent,
    Good,
    Acceptable,
    Problem,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Excellent => "EXCELLENT",
            Verdict::Good => "GOOD",
            Verdict::Acceptable => "ACCEPTABLE",
            Verdict::Problem => "PROBLEM",
        };
        f.write_str(s)
    }
}

/// Read-only summary of one trial. Computed once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedStats {
    pub count: usize,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub stddev_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub ops_per_second: f64,
    pub verdict: Verdict,
}

/// Summarize a trial's samples against the thresholds for its query kind.
///
/// Fails with `EmptyInput` on zero samples — an empty trial has no
/// statistics, and pretending otherwise would poison cross-run comparisons.
pub fn summarize(
    samples: &[Duration],
    thresholds: &QueryThresholds,
) -> BenchResult<AggregatedStats> {
    if samples.is_empty() {
        return Err(BenchError::EmptyInput);
    }

    let mut sorted_ms: Vec<f64> = samples
        .iter()
        .map(|d| d.as_secs_f64() * 1_000.0)
        .collect();
    sorted_ms.sort_by(|a, b| a.total_cmp(b));

    let count = sorted_ms.len();
    let mean_ms = sorted_ms.iter().sum::<f64>() / count as f64;
    let stddev_ms = if count > 1 {
        let sum_sq: f64 = sorted_ms.iter().map(|&v| (v - mean_ms) * (v - mean_ms)).sum();
        (sum_sq / (count - 1) as f64).sqrt()
    } else {
        0.0
    };

    let verdict = if mean_ms < thresholds.excellent_ms {
        Verdict::Excellent
    } else if mean_ms < thresholds.good_ms {
        Verdict::Good
    } else if mean_ms < thresholds.acceptable_ms {
        Verdict::Acceptable
    } else {
        Verdict::Problem
    };

    Ok(AggregatedStats {
        count,
        mean_ms,
        median_ms: percentile(&sorted_ms, 50.0),
        stddev_ms,
        min_ms: sorted_ms[0],
        max_ms: sorted_ms[count - 1],
        p50_ms: percentile(&sorted_ms, 50.0),
        p90_ms: percentile(&sorted_ms, 90.0),
        p95_ms: percentile(&sorted_ms, 95.0),
        p99_ms: percentile(&sorted_ms, 99.0),
        ops_per_second: if mean_ms > 0.0 { 1_000.0 / mean_ms } else { 0.0 },
        verdict,
    })
}

/// Linear interpolation between the closest ranks of an already-sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> QueryThresholds {
        QueryThresholds {
            excellent_ms: 1.0,
            good_ms: 10.0,
            acceptable_ms: 100.0,
        }
    }

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|&v| Duration::from_millis(v)).collect()
    }

    #[test]
    fn empty_input_fails() {
        assert!(matches!(
            summarize(&[], &thresholds()),
            Err(BenchError::EmptyInput)
        ));
    }

    #[test]
    fn known_values() {
        let stats = summarize(&ms(&[1, 2, 3, 4, 5]), &thresholds()).unwrap();
        assert_eq!(stats.count, 5);
        assert!((stats.mean_ms - 3.0).abs() < 1e-9);
        assert!((stats.median_ms - 3.0).abs() < 1e-9);
        assert!((stats.min_ms - 1.0).abs() < 1e-9);
        assert!((stats.max_ms - 5.0).abs() < 1e-9);
        // Sample stddev of 1..5 is sqrt(2.5).
        assert!((stats.stddev_ms - 2.5f64.sqrt()).abs() < 1e-9);
        // p90 by linear interpolation: rank 3.6 between 4 and 5.
        assert!((stats.p90_ms - 4.6).abs() < 1e-9);
        assert_eq!(stats.verdict, Verdict::Good);
    }

    #[test]
    fn single_sample() {
        let stats = summarize(&ms(&[7]), &thresholds()).unwrap();
        assert_eq!(stats.count, 1);
        assert!((stats.p99_ms - 7.0).abs() < 1e-9);
        assert!((stats.stddev_ms - 0.0).abs() < 1e-9);
    }

    #[test]
    fn permutation_invariant() {
        let a = summarize(&ms(&[5, 1, 9, 3, 7, 2, 8]), &thresholds()).unwrap();
        let b = summarize(&ms(&[9, 8, 7, 5, 3, 2, 1]), &thresholds()).unwrap();
        assert_eq!(format!("{:?}", a), format!("{:?}", b));
    }

    #[test]
    fn percentiles_are_monotonic() {
        let samples = ms(&[13, 2, 41, 7, 90, 5, 28, 3, 66, 17, 8, 54]);
        let stats = summarize(&samples, &thresholds()).unwrap();
        assert!(stats.p50_ms <= stats.p90_ms);
        assert!(stats.p90_ms <= stats.p95_ms);
        assert!(stats.p95_ms <= stats.p99_ms);
        assert!(stats.p99_ms <= stats.max_ms);
        assert!(stats.min_ms <= stats.mean_ms);
        assert!(stats.mean_ms <= stats.max_ms);
    }

    #[test]
    fn verdict_boundaries() {
        let t = thresholds();
        let excellent = summarize(&[Duration::from_micros(500)], &t).unwrap();
        assert_eq!(excellent.verdict, Verdict::Excellent);
        let acceptable = summarize(&ms(&[50]), &t).unwrap();
        assert_eq!(acceptable.verdict, Verdict::Acceptable);
        let problem = summarize(&ms(&[500]), &t).unwrap();
        assert_eq!(problem.verdict, Verdict::Problem);
    }

    #[test]
    fn ops_per_second_derived_from_mean() {
        let stats = summarize(&ms(&[4]), &thresholds()).unwrap();
        assert!((stats.ops_per_second - 250.0).abs() < 1e-9);
    }
}
