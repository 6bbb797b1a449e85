//! The three measured query operations and their per-iteration arguments.
//!
//! Each executor is one parameterized statement against the store — no
//! client-side caching, no internal retries. Connectivity failures surface to
//! the trial runner untouched.

use crate::error::{BenchError, BenchResult};
use crate::store::LeaderboardStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Which operation a trial exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    ScoreUpdate,
    TopN,
    RankOfUser,
}

impl QueryKind {
    pub const ALL: [QueryKind; 3] = [QueryKind::ScoreUpdate, QueryKind::TopN, QueryKind::RankOfUser];

    pub fn label(&self) -> &'static str {
        match self {
            QueryKind::ScoreUpdate => "score_update",
            QueryKind::TopN => "top_n",
            QueryKind::RankOfUser => "rank_of_user",
        }
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Arguments for one invocation.
#[derive(Debug, Clone, Copy)]
pub enum QueryArgs {
    ScoreUpdate { user_id: i64, delta: i64 },
    TopN { limit: u32 },
    RankOfUser { user_id: i64 },
}

/// Supplies fresh, seeded arguments per iteration.
///
/// User ids are drawn uniformly from the populated id range, optionally capped
/// by a sample bound so large datasets can be benchmarked against a hot subset.
/// A fresh id per iteration avoids turning the trial into a single-key
/// hotspot measurement.
pub struct ArgsGenerator {
    kind: QueryKind,
    rng: StdRng,
    min_user_id: i64,
    max_user_id: i64,
    top_limit: u32,
}

impl ArgsGenerator {
    /// Build a generator over the store's current id range.
    ///
    /// Fails with `InvalidParameter` when the dataset is empty — there is
    /// nothing meaningful to measure against.
    pub fn for_store(
        kind: QueryKind,
        store: &LeaderboardStore,
        users_sample: Option<u64>,
        top_limit: u32,
        seed: u64,
    ) -> BenchResult<Self> {
        let (min_user_id, max_user_id) = store.user_id_bounds()?.ok_or_else(|| {
            BenchError::InvalidParameter(
                "dataset is empty — run the populate command first".into(),
            )
        })?;

        // Cap the range by the sample size; a cap below the smallest id
        // falls back to the full range.
        let max_user_id = match users_sample {
            Some(cap) => {
                let capped = max_user_id.min(cap as i64);
                if capped < min_user_id {
                    max_user_id
                } else {
                    capped
                }
            }
            None => max_user_id,
        };

        if top_limit == 0 {
            return Err(BenchError::InvalidParameter(
                "top-N limit must be at least 1".into(),
            ));
        }

        Ok(Self {
            kind,
            rng: StdRng::seed_from_u64(seed),
            min_user_id,
            max_user_id,
            top_limit,
        })
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn next_args(&mut self) -> QueryArgs {
        match self.kind {
            QueryKind::ScoreUpdate => QueryArgs::ScoreUpdate {
                user_id: self.rng.gen_range(self.min_user_id..=self.max_user_id),
                delta: self.rng.gen_range(10..=500),
            },
            QueryKind::TopN => QueryArgs::TopN {
                limit: self.top_limit,
            },
            QueryKind::RankOfUser => QueryArgs::RankOfUser {
                user_id: self.rng.gen_range(self.min_user_id..=self.max_user_id),
            },
        }
    }
}

/// Run one invocation. Results are fetched in full to mirror real usage but
/// discarded — the caller only times the call.
pub fn execute(store: &LeaderboardStore, args: &QueryArgs) -> BenchResult<()> {
    match *args {
        QueryArgs::ScoreUpdate { user_id, delta } => store.update_score(user_id, delta),
        QueryArgs::TopN { limit } => store.top_n(limit).map(|_| ()),
        QueryArgs::RankOfUser { user_id } => store.rank_of_user(user_id).map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::ScoreDistribution;
    use crate::populate::{populate, PopulationParams};

    fn populated_store(count: usize) -> LeaderboardStore {
        let mut store = LeaderboardStore::open_in_memory().unwrap();
        let mut params = PopulationParams::new(count, ScoreDistribution::uniform_default());
        params.seed = Some(21);
        populate(&mut store, &params).unwrap();
        store
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let store = LeaderboardStore::open_in_memory().unwrap();
        assert!(matches!(
            ArgsGenerator::for_store(QueryKind::ScoreUpdate, &store, None, 10, 1),
            Err(BenchError::InvalidParameter(_))
        ));
    }

    #[test]
    fn ids_stay_within_sample_cap() {
        let store = populated_store(200);
        let mut gen =
            ArgsGenerator::for_store(QueryKind::RankOfUser, &store, Some(50), 10, 2).unwrap();
        for _ in 0..100 {
            match gen.next_args() {
                QueryArgs::RankOfUser { user_id } => {
                    assert!((1..=50).contains(&user_id));
                }
                other => panic!("unexpected args {:?}", other),
            }
        }
    }

    #[test]
    fn cap_below_id_range_falls_back_to_full_range() {
        let mut store = populated_store(20);
        // Append a second run so ids span 1..=40.
        let mut params = PopulationParams::new(20, ScoreDistribution::uniform_default());
        params.seed = Some(22);
        populate(&mut store, &params).unwrap();
        let bounds = store.user_id_bounds().unwrap().unwrap();
        assert_eq!(bounds, (1, 40));

        // A cap of 0 can never reach the smallest id; the generator must fall
        // back to the full range rather than fail.
        let mut gen =
            ArgsGenerator::for_store(QueryKind::ScoreUpdate, &store, Some(0), 10, 3).unwrap();
        for _ in 0..50 {
            match gen.next_args() {
                QueryArgs::ScoreUpdate { user_id, .. } => {
                    assert!((1..=40).contains(&user_id));
                }
                other => panic!("unexpected args {:?}", other),
            }
        }
    }

    #[test]
    fn arguments_vary_between_iterations() {
        let store = populated_store(500);
        let mut gen =
            ArgsGenerator::for_store(QueryKind::ScoreUpdate, &store, None, 10, 4).unwrap();
        let ids: Vec<i64> = (0..20)
            .map(|_| match gen.next_args() {
                QueryArgs::ScoreUpdate { user_id, .. } => user_id,
                other => panic!("unexpected args {:?}", other),
            })
            .collect();
        let distinct: std::collections::HashSet<i64> = ids.iter().copied().collect();
        assert!(distinct.len() > 1, "generator produced a single hotspot key");
    }
}
