//! Integration tests: population, query semantics, and full benchmark runs
//! against in-memory SQLite (file-backed only where concurrency demands it).

use leaderboard_bench::config::Thresholds;
use leaderboard_bench::distribution::ScoreDistribution;
use leaderboard_bench::populate::{populate, PopulationParams};
use leaderboard_bench::queries::{ArgsGenerator, QueryKind};
use leaderboard_bench::report::{self, QueryReport, RunReport};
use leaderboard_bench::stats;
use leaderboard_bench::store::{LeaderboardStore, NewEntry, NewUser};
use leaderboard_bench::trial::{run_concurrent_trials, run_trial, RunnerConfig, TrialSpec};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// The fixed 8-user dataset used by the ranking scenarios.
const SEED_SCORES: [i64; 8] = [0, 123, 567, 890, 1_250, 2_340, 3_450, 9_999];

fn seed_store() -> LeaderboardStore {
    let mut store = LeaderboardStore::open_in_memory().expect("open");
    let users: Vec<NewUser> = SEED_SCORES
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let id = i as i64 + 1;
            NewUser {
                user_id: id,
                username: format!("Player{}", id),
                email: format!("player{}@bench.local", id),
                registration_date: 1_700_000_000,
                is_active: true,
            }
        })
        .collect();
    let entries: Vec<NewEntry> = SEED_SCORES
        .iter()
        .enumerate()
        .map(|(i, &score)| NewEntry {
            user_id: i as i64 + 1,
            score,
            games_played: 10,
        })
        .collect();
    store.insert_users(&users).expect("insert users");
    store.insert_entries(&entries).expect("insert entries");
    store
}

// ── End-to-end scenarios ────────────────────────────────────────────

#[test]
fn score_update_trial_records_every_measured_iteration() {
    let mut store = LeaderboardStore::open_in_memory().expect("open");
    let mut params = PopulationParams::new(
        1_000,
        ScoreDistribution::Uniform {
            min: 0,
            max: 10_000,
        },
    );
    params.seed = Some(101);
    populate(&mut store, &params).expect("populate");

    let mut args =
        ArgsGenerator::for_store(QueryKind::ScoreUpdate, &store, None, 10, 101).expect("args");
    let cancel = AtomicBool::new(false);
    let result = run_trial(&store, &mut args, &TrialSpec::new(10, 50), &cancel).expect("trial");

    assert_eq!(result.samples.len(), 50);
    assert_eq!(result.failures, 0);
    assert!(!result.degraded);

    let thresholds = Thresholds::default();
    let agg = stats::summarize(&result.samples, thresholds.for_kind(QueryKind::ScoreUpdate))
        .expect("summarize");
    assert_eq!(agg.count, 50);
    assert!(agg.min_ms >= 0.0);
}

#[test]
fn top_three_returns_highest_scores_in_order() {
    let store = seed_store();
    let top = store.top_n(3).expect("top_n");
    let scores: Vec<i64> = top.iter().map(|r| r.score).collect();
    assert_eq!(scores, [9_999, 3_450, 2_340]);
}

#[test]
fn rank_counts_strictly_greater_scores() {
    let store = seed_store();
    // Score 2340 is user 6; only 3450 and 9999 are strictly greater.
    let ranked = store.rank_of_user(6).expect("rank");
    assert_eq!(ranked.score, 2_340);
    assert_eq!(ranked.rank, 3);
}

#[test]
fn clearing_population_leaves_exactly_the_requested_count() {
    let mut store = LeaderboardStore::open_in_memory().expect("open");
    let mut first = PopulationParams::new(100, ScoreDistribution::normal_default());
    first.seed = Some(7);
    populate(&mut store, &first).expect("first populate");

    let mut second = PopulationParams::new(1_000, ScoreDistribution::skewed_default());
    second.seed = Some(8);
    second.clear_existing = true;
    populate(&mut store, &second).expect("second populate");

    assert_eq!(store.user_count().expect("count"), 1_000);
}

// ── Trial behavior ──────────────────────────────────────────────────

#[test]
fn degraded_trials_still_summarize_their_recorded_samples() {
    // Two users, one without a leaderboard entry: score updates against it
    // fail NotFound while the other's succeed.
    let mut store = LeaderboardStore::open_in_memory().expect("open");
    store
        .insert_users(
            &(1..=2)
                .map(|id| NewUser {
                    user_id: id,
                    username: format!("u{}", id),
                    email: format!("u{}@bench.local", id),
                    registration_date: 1_700_000_000,
                    is_active: true,
                })
                .collect::<Vec<_>>(),
        )
        .expect("users");
    store
        .insert_entries(&[NewEntry {
            user_id: 1,
            score: 100,
            games_played: 1,
        }])
        .expect("entry");

    let mut args =
        ArgsGenerator::for_store(QueryKind::ScoreUpdate, &store, None, 10, 55).expect("args");
    let cancel = AtomicBool::new(false);
    let result = run_trial(&store, &mut args, &TrialSpec::new(0, 40), &cancel).expect("trial");

    assert!(result.failures > 0, "expected some NotFound iterations");
    assert!(!result.samples.is_empty(), "expected some successes too");
    assert_eq!(result.samples.len() + result.failures as usize, 40);
    assert!(result.degraded);

    let thresholds = Thresholds::default();
    let agg = stats::summarize(&result.samples, thresholds.for_kind(QueryKind::ScoreUpdate))
        .expect("partial samples must summarize");
    assert_eq!(agg.count, result.samples.len());
}

#[test]
fn concurrent_runners_each_complete_their_trial() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("bench.db");
    {
        let mut store = LeaderboardStore::open(&db_path).expect("open");
        let mut params = PopulationParams::new(200, ScoreDistribution::uniform_default());
        params.seed = Some(77);
        populate(&mut store, &params).expect("populate");
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let cfg = RunnerConfig {
        users_sample: None,
        top_limit: 5,
        seed: 77,
    };
    let spec = TrialSpec::for_kind(QueryKind::TopN, 2, 15);
    let results =
        run_concurrent_trials(&db_path, QueryKind::TopN, &spec, &cfg, 3, &cancel).expect("trials");

    assert_eq!(results.len(), 3);
    let mut runners: Vec<usize> = results.iter().map(|r| r.runner).collect();
    runners.sort_unstable();
    assert_eq!(runners, [0, 1, 2]);
    for result in &results {
        assert_eq!(result.samples.len(), 15);
        assert!(!result.degraded);
    }
}

// ── Reporting pipeline ──────────────────────────────────────────────

#[test]
fn full_run_produces_a_diffable_json_artifact() {
    let mut store = LeaderboardStore::open_in_memory().expect("open");
    let mut params = PopulationParams::new(300, ScoreDistribution::skewed_default());
    params.seed = Some(9);
    populate(&mut store, &params).expect("populate");

    let thresholds = Thresholds::default();
    let cancel = AtomicBool::new(false);
    let mut reports: Vec<QueryReport> = Vec::new();

    for kind in QueryKind::ALL {
        let spec = TrialSpec::for_kind(kind, 3, 20);
        let mut args = ArgsGenerator::for_store(kind, &store, None, 10, 9).expect("args");
        let result = run_trial(&store, &mut args, &spec, &cancel).expect("trial");
        let agg = stats::summarize(&result.samples, thresholds.for_kind(kind)).expect("summarize");
        reports.push(QueryReport::from_trial(&result, &spec, Some(agg)));
    }

    let run_report = RunReport::new(
        std::path::Path::new(":memory:"),
        store.dataset_stats().expect("stats"),
        3,
        20,
        1,
        reports,
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let json_path = report::save_json(&run_report, dir.path()).expect("save json");
    let csv_path = report::save_csv(&run_report, dir.path()).expect("save csv");

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(json_path).expect("read")).expect("parse");
    assert_eq!(value["dataset"]["users"], 300);
    assert_eq!(value["queries"].as_array().map(Vec::len), Some(3));
    for q in value["queries"].as_array().expect("queries") {
        assert_eq!(q["measured_count"], 20);
        // Every measured iteration is accounted for: recorded or failed.
        let samples = q["samples"].as_u64().expect("samples");
        let failures = q["failures"].as_u64().expect("failures");
        assert_eq!(samples + failures, 20);
        assert_eq!(q["stats"]["count"], samples);
    }

    let csv_text = std::fs::read_to_string(csv_path).expect("read csv");
    assert_eq!(csv_text.lines().count(), 4); // header + one row per kind
}
