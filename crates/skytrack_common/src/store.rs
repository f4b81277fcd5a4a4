//! SQLite-backed snapshot store.
//!
//! Append-only: rows are write-once (`INSERT OR IGNORE` on the natural key)
//! and one ingestion batch commits in a single transaction. WAL mode keeps
//! dashboard reads live while a collection run is writing.
//!
//! The time-series tables a progress or history query may touch form the
//! closed [`SeriesTable`] enum; table and column names never come from
//! runtime input.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::Result;
use crate::ingest::SnapshotBatch;

/// Time-series tables exposed to history and progress queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesTable {
    Skills,
    Collections,
    Bestiary,
}

impl SeriesTable {
    fn table(&self) -> &'static str {
        match self {
            SeriesTable::Skills => "skill_snapshots",
            SeriesTable::Collections => "collection_snapshots",
            SeriesTable::Bestiary => "bestiary_snapshots",
        }
    }

    fn id_column(&self) -> &'static str {
        match self {
            SeriesTable::Skills => "skill_name",
            SeriesTable::Collections => "collection_name",
            SeriesTable::Bestiary => "mob_id",
        }
    }

    fn value_column(&self) -> &'static str {
        match self {
            SeriesTable::Skills => "total_xp",
            SeriesTable::Collections => "amount",
            SeriesTable::Bestiary => "kills",
        }
    }
}

/// One (id, value, timestamp) observation for charting.
#[derive(Debug, Clone)]
pub struct SeriesRow {
    pub id: String,
    pub value: SqlValue,
    pub timestamp: i64,
}

/// Member-level counters at one snapshot instant.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileStats {
    pub purse: f64,
    pub death_count: i64,
    pub kills: i64,
    pub bank_balance: f64,
}

/// One row of the profile-stat time series.
#[derive(Debug, Clone)]
pub struct ProfileStatsRow {
    pub timestamp: i64,
    pub stats: ProfileStats,
}

/// Append-only store of timestamped metric observations.
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    /// Open or create the store at a path.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profile_snapshots (
                profile_id TEXT NOT NULL,
                member_uuid TEXT NOT NULL,
                snapshot_timestamp INTEGER NOT NULL,
                cute_name TEXT,
                purse REAL,
                death_count INTEGER,
                kills INTEGER,
                bank_balance REAL,
                PRIMARY KEY (profile_id, member_uuid, snapshot_timestamp)
            );

            CREATE TABLE IF NOT EXISTS skill_snapshots (
                snapshot_id INTEGER PRIMARY KEY,
                member_uuid TEXT NOT NULL,
                profile_id TEXT NOT NULL,
                snapshot_timestamp INTEGER NOT NULL,
                skill_name TEXT NOT NULL,
                total_xp REAL NOT NULL,
                level INTEGER NOT NULL,
                UNIQUE (profile_id, member_uuid, snapshot_timestamp, skill_name)
            );

            CREATE TABLE IF NOT EXISTS collection_snapshots (
                snapshot_id INTEGER PRIMARY KEY,
                member_uuid TEXT NOT NULL,
                profile_id TEXT NOT NULL,
                snapshot_timestamp INTEGER NOT NULL,
                collection_name TEXT NOT NULL,
                amount INTEGER NOT NULL,
                tier INTEGER NOT NULL,
                UNIQUE (profile_id, member_uuid, snapshot_timestamp, collection_name)
            );

            CREATE TABLE IF NOT EXISTS slayer_snapshots (
                snapshot_id INTEGER PRIMARY KEY,
                member_uuid TEXT NOT NULL,
                profile_id TEXT NOT NULL,
                snapshot_timestamp INTEGER NOT NULL,
                slayer_name TEXT NOT NULL,
                total_xp INTEGER NOT NULL,
                tier1_kills INTEGER NOT NULL,
                tier2_kills INTEGER NOT NULL,
                tier3_kills INTEGER NOT NULL,
                tier4_kills INTEGER NOT NULL,
                tier5_kills INTEGER NOT NULL,
                UNIQUE (profile_id, member_uuid, snapshot_timestamp, slayer_name)
            );

            CREATE TABLE IF NOT EXISTS bestiary_snapshots (
                snapshot_id INTEGER PRIMARY KEY,
                member_uuid TEXT NOT NULL,
                profile_id TEXT NOT NULL,
                snapshot_timestamp INTEGER NOT NULL,
                mob_id TEXT NOT NULL,
                kills INTEGER NOT NULL,
                UNIQUE (profile_id, member_uuid, snapshot_timestamp, mob_id)
            );

            CREATE TABLE IF NOT EXISTS bank_transactions (
                transaction_id INTEGER PRIMARY KEY,
                profile_id TEXT,
                timestamp INTEGER UNIQUE,
                action TEXT,
                amount REAL,
                initiator_name TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_skill_ts ON skill_snapshots(snapshot_timestamp);
            CREATE INDEX IF NOT EXISTS idx_collection_ts ON collection_snapshots(snapshot_timestamp);
            CREATE INDEX IF NOT EXISTS idx_bestiary_ts ON bestiary_snapshots(snapshot_timestamp);
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Append one ingestion batch. All rows commit atomically; rows that
    /// already exist under the same natural key are ignored, so replaying a
    /// batch is a no-op.
    pub fn insert_batch(&self, batch: &SnapshotBatch) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        if let Some(summary) = &batch.summary {
            tx.execute(
                "INSERT OR IGNORE INTO profile_snapshots
                 (profile_id, member_uuid, snapshot_timestamp, cute_name, purse, death_count, kills, bank_balance)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    batch.profile_id,
                    batch.member_uuid,
                    batch.timestamp,
                    summary.cute_name,
                    summary.purse,
                    summary.death_count,
                    summary.kills,
                    summary.bank_balance,
                ],
            )?;
        }

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO skill_snapshots
                 (member_uuid, profile_id, snapshot_timestamp, skill_name, total_xp, level)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for skill in &batch.skills {
                stmt.execute(params![
                    batch.member_uuid,
                    batch.profile_id,
                    batch.timestamp,
                    skill.name,
                    skill.total_xp,
                    skill.level,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO collection_snapshots
                 (member_uuid, profile_id, snapshot_timestamp, collection_name, amount, tier)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for collection in &batch.collections {
                stmt.execute(params![
                    batch.member_uuid,
                    batch.profile_id,
                    batch.timestamp,
                    collection.name,
                    collection.amount,
                    collection.tier,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO slayer_snapshots
                 (member_uuid, profile_id, snapshot_timestamp, slayer_name, total_xp,
                  tier1_kills, tier2_kills, tier3_kills, tier4_kills, tier5_kills)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for slayer in &batch.slayers {
                stmt.execute(params![
                    batch.member_uuid,
                    batch.profile_id,
                    batch.timestamp,
                    slayer.name,
                    slayer.total_xp,
                    slayer.tier_kills[0],
                    slayer.tier_kills[1],
                    slayer.tier_kills[2],
                    slayer.tier_kills[3],
                    slayer.tier_kills[4],
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO bestiary_snapshots
                 (member_uuid, profile_id, snapshot_timestamp, mob_id, kills)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in &batch.bestiary {
                stmt.execute(params![
                    batch.member_uuid,
                    batch.profile_id,
                    batch.timestamp,
                    row.mob_id,
                    row.kills,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO bank_transactions
                 (profile_id, timestamp, action, amount, initiator_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for tx_row in &batch.transactions {
                stmt.execute(params![
                    batch.profile_id,
                    tx_row.timestamp,
                    tx_row.action,
                    tx_row.amount,
                    tx_row.initiator_name,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Latest snapshot timestamp in a series table, if any.
    pub fn latest_timestamp(&self, table: SeriesTable) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT MAX(snapshot_timestamp) FROM {}",
            table.table()
        );
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Latest snapshot timestamp strictly before a boundary.
    pub fn max_timestamp_before(&self, table: SeriesTable, boundary: i64) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT MAX(snapshot_timestamp) FROM {} WHERE snapshot_timestamp < ?1",
            table.table()
        );
        Ok(self.conn.query_row(&sql, params![boundary], |row| row.get(0))?)
    }

    /// All (id, value) pairs recorded at one exact timestamp.
    ///
    /// Values come back untyped; progress computation owns the integer
    /// coercion rules.
    pub fn rows_at(&self, table: SeriesTable, timestamp: i64) -> Result<Vec<(String, SqlValue)>> {
        let sql = format!(
            "SELECT {}, {} FROM {} WHERE snapshot_timestamp = ?1",
            table.id_column(),
            table.value_column(),
            table.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![timestamp], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, SqlValue>(1)?))
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// All observations at or after a boundary, ascending by timestamp.
    pub fn rows_since(&self, table: SeriesTable, since: i64) -> Result<Vec<SeriesRow>> {
        let sql = format!(
            "SELECT {}, {}, snapshot_timestamp FROM {}
             WHERE snapshot_timestamp >= ?1
             ORDER BY snapshot_timestamp ASC",
            table.id_column(),
            table.value_column(),
            table.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![since], |row| {
            Ok(SeriesRow {
                id: row.get(0)?,
                value: row.get(1)?,
                timestamp: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Kill counters at one timestamp, keyed by mob id.
    pub fn kills_at(&self, timestamp: i64) -> Result<HashMap<String, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT mob_id, kills FROM bestiary_snapshots WHERE snapshot_timestamp = ?1",
        )?;
        let rows = stmt.query_map(params![timestamp], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut results = HashMap::new();
        for row in rows {
            let (mob_id, kills) = row?;
            results.insert(mob_id, kills.max(0) as u64);
        }
        Ok(results)
    }

    /// Latest profile snapshot timestamp, the "is there newer data" poll.
    pub fn latest_profile_timestamp(&self) -> Result<Option<i64>> {
        Ok(self.conn.query_row(
            "SELECT MAX(snapshot_timestamp) FROM profile_snapshots",
            [],
            |row| row.get(0),
        )?)
    }

    /// Member counters at one exact snapshot timestamp.
    pub fn profile_stats_at(&self, timestamp: i64) -> Result<Option<ProfileStats>> {
        let result = self.conn.query_row(
            "SELECT purse, death_count, kills, bank_balance
             FROM profile_snapshots WHERE snapshot_timestamp = ?1",
            params![timestamp],
            |row| {
                Ok(ProfileStats {
                    purse: row.get::<_, Option<f64>>(0)?.unwrap_or(0.0),
                    death_count: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    kills: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    bank_balance: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                })
            },
        );
        match result {
            Ok(stats) => Ok(Some(stats)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Profile counters at or after a boundary, ascending by timestamp.
    pub fn profile_rows_since(&self, since: i64) -> Result<Vec<ProfileStatsRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT snapshot_timestamp, purse, death_count, kills, bank_balance
             FROM profile_snapshots
             WHERE snapshot_timestamp >= ?1
             ORDER BY snapshot_timestamp ASC",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            Ok(ProfileStatsRow {
                timestamp: row.get(0)?,
                stats: ProfileStats {
                    purse: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                    death_count: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    kills: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    bank_balance: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
                },
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{
        BankTransaction, BestiaryRow, CollectionRow, ProfileSummary, SkillRow, SlayerRow,
        SnapshotBatch,
    };

    fn batch_at(timestamp: i64) -> SnapshotBatch {
        SnapshotBatch {
            profile_id: "profile-1".to_string(),
            member_uuid: "member-1".to_string(),
            timestamp,
            summary: Some(ProfileSummary {
                cute_name: Some("Papaya".to_string()),
                purse: 100.5,
                death_count: 3,
                kills: 50,
                bank_balance: 2000.0,
            }),
            skills: vec![SkillRow {
                name: "farming".to_string(),
                total_xp: 175.0,
                level: 2,
            }],
            collections: vec![CollectionRow {
                name: "WHEAT".to_string(),
                amount: 250,
                tier: 3,
            }],
            slayers: vec![SlayerRow {
                name: "zombie".to_string(),
                total_xp: 1500,
                tier_kills: [20, 7, 0, 0, 0],
            }],
            bestiary: vec![BestiaryRow {
                mob_id: "zealot".to_string(),
                kills: 120,
            }],
            transactions: vec![BankTransaction {
                timestamp: 1700000000,
                action: "DEPOSIT".to_string(),
                amount: 50000.0,
                initiator_name: "Player1".to_string(),
            }],
        }
    }

    fn count(store: &SnapshotStore, table: &str) -> i64 {
        store
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    #[test]
    fn replaying_a_batch_is_idempotent() {
        let store = SnapshotStore::open_in_memory().unwrap();
        let batch = batch_at(1700003600);

        store.insert_batch(&batch).unwrap();
        store.insert_batch(&batch).unwrap();

        for table in [
            "profile_snapshots",
            "skill_snapshots",
            "collection_snapshots",
            "slayer_snapshots",
            "bestiary_snapshots",
            "bank_transactions",
        ] {
            assert_eq!(count(&store, table), 1, "duplicated rows in {}", table);
        }
    }

    #[test]
    fn timestamp_queries() {
        let store = SnapshotStore::open_in_memory().unwrap();
        assert_eq!(store.latest_timestamp(SeriesTable::Skills).unwrap(), None);

        store.insert_batch(&batch_at(100)).unwrap();
        store.insert_batch(&batch_at(200)).unwrap();
        store.insert_batch(&batch_at(300)).unwrap();

        assert_eq!(
            store.latest_timestamp(SeriesTable::Skills).unwrap(),
            Some(300)
        );
        assert_eq!(
            store
                .max_timestamp_before(SeriesTable::Skills, 300)
                .unwrap(),
            Some(200)
        );
        assert_eq!(
            store.max_timestamp_before(SeriesTable::Skills, 100).unwrap(),
            None
        );
        assert_eq!(store.latest_profile_timestamp().unwrap(), Some(300));
    }

    #[test]
    fn rows_at_and_since() {
        let store = SnapshotStore::open_in_memory().unwrap();
        store.insert_batch(&batch_at(100)).unwrap();
        store.insert_batch(&batch_at(200)).unwrap();

        let rows = store.rows_at(SeriesTable::Collections, 200).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "WHEAT");

        let series = store.rows_since(SeriesTable::Skills, 0).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series[0].timestamp <= series[1].timestamp);

        let kills = store.kills_at(200).unwrap();
        assert_eq!(kills.get("zealot"), Some(&120));
    }

    #[test]
    fn reopening_a_store_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.db");

        {
            let store = SnapshotStore::open_at(&path).unwrap();
            store.insert_batch(&batch_at(100)).unwrap();
        }

        let store = SnapshotStore::open_at(&path).unwrap();
        assert_eq!(
            store.latest_timestamp(SeriesTable::Skills).unwrap(),
            Some(100)
        );
    }

    #[test]
    fn profile_stats_round_trip() {
        let store = SnapshotStore::open_in_memory().unwrap();
        store.insert_batch(&batch_at(100)).unwrap();

        let stats = store.profile_stats_at(100).unwrap().unwrap();
        assert_eq!(stats.kills, 50);
        assert!((stats.purse - 100.5).abs() < 1e-9);
        assert!(store.profile_stats_at(999).unwrap().is_none());

        let rows = store.profile_rows_since(0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, 100);
    }
}
