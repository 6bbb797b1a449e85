//! Storage boundary: schema DDL, bulk insert, and the three measured queries.
//!
//! The store treats SQLite as an opaque timed black box. It owns one
//! connection, creates the schema (including the descending score index the
//! measurements presuppose), and exposes exactly the operations the benchmark
//! times plus a read-only diagnostics query. All statements are parameterized
//! and prepared; nothing here caches results client-side.

use crate::error::{BenchError, BenchResult};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;

/// Row returned by top-N retrieval, joined with identity data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub username: String,
    pub score: i64,
    pub games_played: i64,
}

/// Result of a rank lookup: 1 + the number of active entries with a strictly
/// greater score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedUser {
    pub username: String,
    pub score: i64,
    pub rank: i64,
}

/// A user row staged for bulk insertion.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    /// Unix epoch seconds.
    pub registration_date: i64,
    pub is_active: bool,
}

/// A leaderboard row staged for bulk insertion.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub user_id: i64,
    pub score: i64,
    pub games_played: i64,
}

/// Read-only dataset diagnostics included in report headers.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub users: u64,
    pub active_users: u64,
    pub entries: u64,
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub mean_score: Option<f64>,
    /// Population stddev — diagnostics only, not part of the latency stats.
    pub stddev_score: Option<f64>,
}

/// Handle to the leaderboard database. One per runner; never shared across
/// threads.
pub struct LeaderboardStore {
    conn: Connection,
}

impl LeaderboardStore {
    /// Open (or create) a file-backed database and prepare the schema.
    pub fn open(path: &Path) -> BenchResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            BenchError::ConnectionFailure(format!("open {}: {}", path.display(), e))
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database. Used by tests and single-runner scratch
    /// experiments; concurrent mode needs a file path.
    pub fn open_in_memory() -> BenchResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| BenchError::ConnectionFailure(format!("open :memory:: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> BenchResult<Self> {
        configure_connection(&conn)?;
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    /// Delete all leaderboard entries and users in a single transaction:
    /// either fully cleared or left unchanged.
    pub fn clear_all(&mut self) -> BenchResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM leaderboard", [])?;
        tx.execute("DELETE FROM users", [])?;
        tx.commit()?;
        Ok(())
    }

    /// Highest user id currently present, or 0 on an empty table. The
    /// populator continues its username counter from here so identities stay
    /// unique across appending runs.
    pub fn max_user_id(&self) -> BenchResult<i64> {
        let max: Option<i64> =
            self.conn
                .query_row("SELECT MAX(user_id) FROM users", [], |r| r.get(0))?;
        Ok(max.unwrap_or(0))
    }

    /// Inclusive id range of existing users, `None` when the table is empty.
    pub fn user_id_bounds(&self) -> BenchResult<Option<(i64, i64)>> {
        let (min, max): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(user_id), MAX(user_id) FROM users",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(min.zip(max))
    }

    pub fn user_count(&self) -> BenchResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
        Ok(n as u64)
    }

    /// Bulk-insert users inside one transaction.
    pub fn insert_users(&mut self, users: &[NewUser]) -> BenchResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO users (user_id, username, email, registration_date, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for u in users {
                stmt.execute(params![
                    u.user_id,
                    u.username,
                    u.email,
                    u.registration_date,
                    u.is_active
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Bulk-insert leaderboard rows inside one transaction.
    pub fn insert_entries(&mut self, entries: &[NewEntry]) -> BenchResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO leaderboard (user_id, score, last_update, games_played)
                 VALUES (?1, ?2, strftime('%s','now'), ?3)",
            )?;
            for e in entries {
                stmt.execute(params![e.user_id, e.score, e.games_played])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ── Measured operations ─────────────────────────────────────────

    /// Add `delta` to a user's score and bump the games counter.
    pub fn update_score(&self, user_id: i64, delta: i64) -> BenchResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "UPDATE leaderboard
             SET score = score + ?1,
                 games_played = games_played + 1,
                 last_update = strftime('%s','now')
             WHERE user_id = ?2",
        )?;
        let affected = stmt.execute(params![delta, user_id])?;
        if affected == 0 {
            return Err(BenchError::NotFound { user_id });
        }
        Ok(())
    }

    /// The `limit` highest-scoring active users, ties broken by ascending
    /// user id so results are deterministic.
    pub fn top_n(&self, limit: u32) -> BenchResult<Vec<LeaderboardRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT u.username, l.score, l.games_played
             FROM leaderboard l
             JOIN users u ON u.user_id = l.user_id
             WHERE u.is_active = 1
             ORDER BY l.score DESC, l.user_id ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |r| {
                Ok(LeaderboardRow {
                    username: r.get(0)?,
                    score: r.get(1)?,
                    games_played: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Rank = 1 + COUNT of active entries with a strictly greater score.
    ///
    /// Deliberately the naive scan-and-count form — its cost at scale is the
    /// thing being measured.
    pub fn rank_of_user(&self, user_id: i64) -> BenchResult<RankedUser> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT u.username, l.score,
                    (SELECT COUNT(*) + 1
                     FROM leaderboard l2
                     JOIN users u2 ON u2.user_id = l2.user_id
                     WHERE u2.is_active = 1 AND l2.score > l.score) AS rank
             FROM leaderboard l
             JOIN users u ON u.user_id = l.user_id
             WHERE l.user_id = ?1 AND u.is_active = 1",
        )?;
        let row = stmt.query_row(params![user_id], |r| {
            Ok(RankedUser {
                username: r.get(0)?,
                score: r.get(1)?,
                rank: r.get(2)?,
            })
        });
        match row {
            Ok(ranked) => Ok(ranked),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(BenchError::NotFound { user_id }),
            Err(e) => Err(e.into()),
        }
    }

    // ── Diagnostics ─────────────────────────────────────────────────

    /// Row counts and score aggregates, for report headers and sanity logs.
    pub fn dataset_stats(&self) -> BenchResult<DatasetStats> {
        let users: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
        let active_users: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE is_active = 1",
            [],
            |r| r.get(0),
        )?;
        let (entries, min_score, max_score, mean_score): (
            i64,
            Option<i64>,
            Option<i64>,
            Option<f64>,
        ) = self.conn.query_row(
            "SELECT COUNT(*), MIN(score), MAX(score), AVG(score) FROM leaderboard",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )?;

        // SQLite has no STDDEV aggregate; a second pass over the mean does.
        let stddev_score = match mean_score {
            Some(mean) if entries > 0 => {
                let variance: Option<f64> = self.conn.query_row(
                    "SELECT AVG((score - ?1) * (score - ?1)) FROM leaderboard",
                    params![mean],
                    |r| r.get(0),
                )?;
                variance.map(f64::sqrt)
            }
            _ => None,
        };

        Ok(DatasetStats {
            users: users as u64,
            active_users: active_users as u64,
            entries: entries as u64,
            min_score,
            max_score,
            mean_score,
            stddev_score,
        })
    }
}

/// Tune the connection for benchmarking.
fn configure_connection(conn: &Connection) -> BenchResult<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;
         PRAGMA mmap_size = 268435456;
         PRAGMA temp_store = MEMORY;
         PRAGMA busy_timeout = 5000;
         PRAGMA foreign_keys = ON;",
    )?;
    Ok(())
}

/// Create tables and indexes. The descending score index is a precondition
/// for meaningful top-N measurement, so the store owns it.
fn create_tables(conn: &Connection) -> BenchResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            user_id           INTEGER PRIMARY KEY,
            username          TEXT    NOT NULL UNIQUE,
            email             TEXT    NOT NULL UNIQUE,
            registration_date INTEGER NOT NULL,
            is_active         INTEGER NOT NULL DEFAULT 1
        );
        CREATE TABLE IF NOT EXISTS leaderboard (
            user_id      INTEGER PRIMARY KEY REFERENCES users(user_id),
            score        INTEGER NOT NULL,
            last_update  INTEGER NOT NULL,
            games_played INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_leaderboard_score_desc
            ON leaderboard (score DESC);",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_rows(rows: &[(i64, i64)]) -> LeaderboardStore {
        let mut store = LeaderboardStore::open_in_memory().expect("open");
        let users: Vec<NewUser> = rows
            .iter()
            .map(|&(id, _)| NewUser {
                user_id: id,
                username: format!("user{:04}", id),
                email: format!("user{:04}@bench.local", id),
                registration_date: 1_700_000_000,
                is_active: true,
            })
            .collect();
        let entries: Vec<NewEntry> = rows
            .iter()
            .map(|&(id, score)| NewEntry {
                user_id: id,
                score,
                games_played: 1,
            })
            .collect();
        store.insert_users(&users).expect("insert users");
        store.insert_entries(&entries).expect("insert entries");
        store
    }

    #[test]
    fn update_score_adds_delta() {
        let store = store_with_rows(&[(1, 100)]);
        store.update_score(1, 50).unwrap();
        let top = store.top_n(1).unwrap();
        assert_eq!(top[0].score, 150);
        assert_eq!(top[0].games_played, 2);
    }

    #[test]
    fn update_score_missing_user_is_not_found() {
        let store = store_with_rows(&[(1, 100)]);
        assert!(matches!(
            store.update_score(99, 10),
            Err(BenchError::NotFound { user_id: 99 })
        ));
    }

    #[test]
    fn top_n_breaks_ties_by_user_id() {
        let store = store_with_rows(&[(3, 500), (1, 500), (2, 900)]);
        let top = store.top_n(3).unwrap();
        let names: Vec<&str> = top.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, ["user0002", "user0001", "user0003"]);
    }

    #[test]
    fn rank_counts_strictly_greater_scores() {
        let store = store_with_rows(&[(1, 100), (2, 200), (3, 200), (4, 300)]);
        // Both 200-scorers rank 2: only 300 is strictly greater.
        assert_eq!(store.rank_of_user(2).unwrap().rank, 2);
        assert_eq!(store.rank_of_user(3).unwrap().rank, 2);
        assert_eq!(store.rank_of_user(1).unwrap().rank, 4);
        assert_eq!(store.rank_of_user(4).unwrap().rank, 1);
    }

    #[test]
    fn rank_of_missing_user_is_not_found() {
        let store = store_with_rows(&[(1, 100)]);
        assert!(matches!(
            store.rank_of_user(7),
            Err(BenchError::NotFound { user_id: 7 })
        ));
    }

    #[test]
    fn inactive_users_are_excluded() {
        let mut store = store_with_rows(&[(1, 100), (2, 900)]);
        store
            .insert_users(&[NewUser {
                user_id: 3,
                username: "ghost".into(),
                email: "ghost@bench.local".into(),
                registration_date: 1_700_000_000,
                is_active: false,
            }])
            .unwrap();
        store
            .insert_entries(&[NewEntry {
                user_id: 3,
                score: 9_999,
                games_played: 1,
            }])
            .unwrap();

        let top = store.top_n(10).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].score, 900);
        // An inactive user's own rank is a NotFound, and their score does not
        // push others down.
        assert!(store.rank_of_user(3).is_err());
        assert_eq!(store.rank_of_user(1).unwrap().rank, 2);
    }

    #[test]
    fn clear_all_empties_both_tables() {
        let mut store = store_with_rows(&[(1, 100), (2, 200)]);
        store.clear_all().unwrap();
        assert_eq!(store.user_count().unwrap(), 0);
        assert_eq!(store.user_id_bounds().unwrap(), None);
        assert_eq!(store.max_user_id().unwrap(), 0);
    }

    #[test]
    fn dataset_stats_aggregates() {
        let store = store_with_rows(&[(1, 0), (2, 100), (3, 200)]);
        let stats = store.dataset_stats().unwrap();
        assert_eq!(stats.users, 3);
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.min_score, Some(0));
        assert_eq!(stats.max_score, Some(200));
        assert!((stats.mean_score.unwrap() - 100.0).abs() < 1e-9);
    }
}
