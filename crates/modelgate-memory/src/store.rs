// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed memory store with an FTS5 mirror for full-text retrieval.
//!
//! The store is the sole writer; readers receive owned copies. Sync
//! triggers keep the FTS5 virtual table aligned with the `memories` table.

use modelgate_core::GatewayError;
use tokio_rusqlite::Connection;

use crate::types::{MemoryRecord, MemoryType};

/// Helper to convert tokio_rusqlite errors into GatewayError::Storage.
fn storage_err(e: tokio_rusqlite::Error) -> GatewayError {
    GatewayError::Storage {
        source: Box::new(e),
    }
}

/// Filters applied during retrieval.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    pub memory_type: Option<MemoryType>,
    pub category: Option<String>,
    pub session_id: Option<String>,
    pub min_importance: f64,
}

/// Aggregate statistics, used by the ready-check.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    pub total: i64,
    pub average_importance: f64,
}

/// Persistent store for memories in SQLite.
pub struct MemoryStore {
    conn: Connection,
}

impl MemoryStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub async fn open(path: &str) -> Result<Self, GatewayError> {
        let conn = Connection::open(path).await.map_err(storage_err)?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory database (tests).
    pub async fn open_in_memory() -> Result<Self, GatewayError> {
        let conn = Connection::open_in_memory().await.map_err(storage_err)?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), GatewayError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS memories (
                        id TEXT PRIMARY KEY NOT NULL,
                        session_id TEXT,
                        content TEXT NOT NULL,
                        type TEXT NOT NULL,
                        category TEXT NOT NULL DEFAULT 'general',
                        importance REAL NOT NULL DEFAULT 0.5,
                        surprise_score REAL NOT NULL DEFAULT 0.0,
                        access_count INTEGER NOT NULL DEFAULT 0,
                        decay_factor REAL NOT NULL DEFAULT 1.0,
                        source_turn_id TEXT,
                        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                        last_accessed_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                        metadata TEXT
                    );

                    CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
                        content,
                        content='memories',
                        content_rowid='rowid'
                    );

                    CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
                        INSERT INTO memories_fts(rowid, content) VALUES (new.rowid, new.content);
                    END;

                    CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
                        INSERT INTO memories_fts(memories_fts, rowid, content)
                            VALUES('delete', old.rowid, old.content);
                    END;

                    CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE ON memories BEGIN
                        INSERT INTO memories_fts(memories_fts, rowid, content)
                            VALUES('delete', old.rowid, old.content);
                        INSERT INTO memories_fts(rowid, content) VALUES (new.rowid, new.content);
                    END;

                    CREATE INDEX IF NOT EXISTS idx_memories_session ON memories(session_id);
                    CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(type);
                    CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);",
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    /// Save a memory record.
    pub async fn save(&self, record: &MemoryRecord) -> Result<(), GatewayError> {
        let r = record.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO memories (id, session_id, content, type, category, importance, surprise_score, access_count, decay_factor, source_turn_id, created_at, updated_at, last_accessed_at, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                    rusqlite::params![
                        r.id,
                        r.session_id,
                        r.content,
                        r.memory_type.as_str(),
                        r.category,
                        r.importance,
                        r.surprise_score,
                        r.access_count,
                        r.decay_factor,
                        r.source_turn_id,
                        r.created_at,
                        r.updated_at,
                        r.last_accessed_at,
                        r.metadata
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    /// Most recent memories for a session, newest first.
    ///
    /// `memory_type` restricts to one type (surprise scoring); `None`
    /// returns all types (dedup lookback).
    pub async fn recent_for_session(
        &self,
        session_id: Option<&str>,
        memory_type: Option<MemoryType>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, GatewayError> {
        let session_id = session_id.map(str::to_string);
        let type_str = memory_type.map(|t| t.as_str().to_string());
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, session_id, content, type, category, importance, surprise_score, access_count, decay_factor, source_turn_id, created_at, updated_at, last_accessed_at, metadata
                     FROM memories
                     WHERE (?1 IS NULL OR session_id = ?1)
                       AND (?2 IS NULL OR type = ?2)
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?3",
                )?;
                let records = stmt
                    .query_map(
                        rusqlite::params![session_id, type_str, limit as i64],
                        |row| Ok(row_to_record(row)),
                    )?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(storage_err)
    }

    /// Full-text search over content with filters.
    ///
    /// `match_query` must already be sanitized (see the retriever). Results
    /// are ordered by FTS rank, then importance. Every returned record has
    /// its access_count bumped and last_accessed_at refreshed.
    pub async fn search(
        &self,
        match_query: &str,
        filter: &MemoryFilter,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, GatewayError> {
        if match_query.is_empty() {
            return Ok(vec![]);
        }

        let match_query = match_query.to_string();
        let type_str = filter.memory_type.map(|t| t.as_str().to_string());
        let category = filter.category.clone();
        let session_id = filter.session_id.clone();
        let min_importance = filter.min_importance;

        let records = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT m.id, m.session_id, m.content, m.type, m.category, m.importance, m.surprise_score, m.access_count, m.decay_factor, m.source_turn_id, m.created_at, m.updated_at, m.last_accessed_at, m.metadata
                     FROM memories_fts
                     JOIN memories m ON m.rowid = memories_fts.rowid
                     WHERE memories_fts MATCH ?1
                       AND (?2 IS NULL OR m.type = ?2)
                       AND (?3 IS NULL OR m.category = ?3)
                       AND (?4 IS NULL OR m.session_id = ?4)
                       AND m.importance >= ?5
                     ORDER BY rank, m.importance DESC
                     LIMIT ?6",
                )?;
                let records = stmt
                    .query_map(
                        rusqlite::params![
                            match_query,
                            type_str,
                            category,
                            session_id,
                            min_importance,
                            limit as i64
                        ],
                        |row| Ok(row_to_record(row)),
                    )?
                    .collect::<Result<Vec<_>, _>>()?;

                // Retrieval bumps access accounting for ranking decay.
                for record in &records {
                    conn.execute(
                        "UPDATE memories SET access_count = access_count + 1,
                                last_accessed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        rusqlite::params![record.id],
                    )?;
                }
                Ok(records)
            })
            .await
            .map_err(storage_err)?;

        Ok(records)
    }

    /// All records with their timestamps, for decay maintenance.
    pub async fn all_for_maintenance(&self) -> Result<Vec<MemoryRecord>, GatewayError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, session_id, content, type, category, importance, surprise_score, access_count, decay_factor, source_turn_id, created_at, updated_at, last_accessed_at, metadata
                     FROM memories",
                )?;
                let records = stmt
                    .query_map([], |row| Ok(row_to_record(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(storage_err)
    }

    /// Persist a recomputed decay factor.
    pub async fn update_decay(&self, id: &str, decay: f64) -> Result<(), GatewayError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE memories SET decay_factor = ?1,
                            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    rusqlite::params![decay, id],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    /// Delete records by id.
    pub async fn delete(&self, ids: &[String]) -> Result<(), GatewayError> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids = ids.to_vec();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for id in &ids {
                    tx.execute("DELETE FROM memories WHERE id = ?1", rusqlite::params![id])?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    /// Aggregate stats for the ready-check.
    pub async fn stats(&self) -> Result<MemoryStats, GatewayError> {
        self.conn
            .call(|conn| {
                let (total, average_importance) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(AVG(importance), 0.0) FROM memories",
                    [],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
                )?;
                Ok(MemoryStats {
                    total,
                    average_importance,
                })
            })
            .await
            .map_err(storage_err)
    }
}

/// Convert a rusqlite Row to a MemoryRecord.
fn row_to_record(row: &rusqlite::Row) -> MemoryRecord {
    let type_str: String = row.get(3).unwrap_or_default();
    MemoryRecord {
        id: row.get(0).unwrap_or_default(),
        session_id: row.get(1).unwrap_or(None),
        content: row.get(2).unwrap_or_default(),
        memory_type: MemoryType::from_str_value(&type_str),
        category: row.get(4).unwrap_or_default(),
        importance: row.get(5).unwrap_or(0.5),
        surprise_score: row.get(6).unwrap_or(0.0),
        access_count: row.get(7).unwrap_or(0),
        decay_factor: row.get(8).unwrap_or(1.0),
        source_turn_id: row.get(9).unwrap_or(None),
        created_at: row.get(10).unwrap_or_default(),
        updated_at: row.get(11).unwrap_or_default(),
        last_accessed_at: row.get(12).unwrap_or_default(),
        metadata: row.get(13).unwrap_or(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(id: &str, content: &str, memory_type: MemoryType) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            session_id: Some("session-1".to_string()),
            content: content.to_string(),
            memory_type,
            category: "general".to_string(),
            importance: 0.8,
            surprise_score: 0.5,
            access_count: 0,
            decay_factor: 1.0,
            source_turn_id: None,
            created_at: "2026-07-01T00:00:00.000Z".to_string(),
            updated_at: "2026-07-01T00:00:00.000Z".to_string(),
            last_accessed_at: "2026-07-01T00:00:00.000Z".to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn save_and_search() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        store
            .save(&make_record(
                "mem-1",
                "Use TypeScript for the API layer",
                MemoryType::Decision,
            ))
            .await
            .unwrap();

        let results = store
            .search("\"TypeScript\"", &MemoryFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "mem-1");
        assert_eq!(results[0].memory_type, MemoryType::Decision);
    }

    #[tokio::test]
    async fn search_no_results() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        store
            .save(&make_record("mem-1", "The user likes pizza", MemoryType::Preference))
            .await
            .unwrap();

        let results = store
            .search("\"quantum physics\"", &MemoryFilter::default(), 10)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn empty_query_short_circuits() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let results = store.search("", &MemoryFilter::default(), 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn retrieval_bumps_access_count() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        store
            .save(&make_record("mem-1", "database uses postgres", MemoryType::Fact))
            .await
            .unwrap();

        store
            .search("\"postgres\"", &MemoryFilter::default(), 10)
            .await
            .unwrap();
        let results = store
            .search("\"postgres\"", &MemoryFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(results[0].access_count, 1, "first search bumped the count");
    }

    #[tokio::test]
    async fn type_filter_applies() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        store
            .save(&make_record("mem-1", "prefers tabs", MemoryType::Preference))
            .await
            .unwrap();
        store
            .save(&make_record("mem-2", "prefers spaces", MemoryType::Decision))
            .await
            .unwrap();

        let filter = MemoryFilter {
            memory_type: Some(MemoryType::Decision),
            ..Default::default()
        };
        let results = store.search("\"prefers\"", &filter, 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "mem-2");
    }

    #[tokio::test]
    async fn min_importance_filter_applies() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let mut low = make_record("mem-low", "minor note about builds", MemoryType::Fact);
        low.importance = 0.2;
        store.save(&low).await.unwrap();
        store
            .save(&make_record("mem-high", "major note about builds", MemoryType::Fact))
            .await
            .unwrap();

        let filter = MemoryFilter {
            min_importance: 0.5,
            ..Default::default()
        };
        let results = store.search("\"builds\"", &filter, 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "mem-high");
    }

    #[tokio::test]
    async fn recent_for_session_respects_type_and_limit() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        for i in 0..5 {
            let mut r = make_record(
                &format!("mem-{i}"),
                &format!("decision number {i}"),
                MemoryType::Decision,
            );
            r.created_at = format!("2026-07-01T00:00:0{i}.000Z");
            store.save(&r).await.unwrap();
        }
        store
            .save(&make_record("mem-fact", "a fact", MemoryType::Fact))
            .await
            .unwrap();

        let recent = store
            .recent_for_session(Some("session-1"), Some(MemoryType::Decision), 3)
            .await
            .unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, "mem-4", "newest first");

        let other_session = store
            .recent_for_session(Some("session-2"), None, 10)
            .await
            .unwrap();
        assert!(other_session.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_from_fts_too() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        store
            .save(&make_record("mem-1", "ephemeral note", MemoryType::Fact))
            .await
            .unwrap();
        store.delete(&["mem-1".to_string()]).await.unwrap();

        let results = store
            .search("\"ephemeral\"", &MemoryFilter::default(), 10)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn stats_counts_and_averages() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let empty = store.stats().await.unwrap();
        assert_eq!(empty.total, 0);

        store
            .save(&make_record("mem-1", "one", MemoryType::Fact))
            .await
            .unwrap();
        let mut second = make_record("mem-2", "two", MemoryType::Fact);
        second.importance = 0.4;
        store.save(&second).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert!((stats.average_importance - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn update_decay_persists() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        store
            .save(&make_record("mem-1", "decaying fact", MemoryType::Fact))
            .await
            .unwrap();
        store.update_decay("mem-1", 0.25).await.unwrap();

        let records = store.all_for_maintenance().await.unwrap();
        assert!((records[0].decay_factor - 0.25).abs() < 1e-9);
    }
}
