//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Records are stored as JSON alongside a few indexed columns used by reports.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{DocumentRecord, NewRun, PageRecord, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

const RUN_COLUMNS: &str = "id, seed_url, bound_url, forbidden_prefixes, max_to_index, config_hash, \
     started_at, finished_at, status, pages_indexed, documents_indexed";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<(RunRecord, String)> {
    let forbidden: String = row.get(3)?;
    let max_to_index: Option<i64> = row.get(4)?;
    let record = RunRecord {
        id: row.get(0)?,
        seed_url: row.get(1)?,
        bound_url: row.get(2)?,
        forbidden_prefixes: Vec::new(),
        max_to_index: max_to_index.map(|n| n as u64),
        config_hash: row.get(5)?,
        started_at: row.get(6)?,
        finished_at: row.get(7)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(8)?)
            .unwrap_or(RunStatus::Running),
        pages_indexed: row.get::<_, i64>(9)? as u64,
        documents_indexed: row.get::<_, i64>(10)? as u64,
    };
    Ok((record, forbidden))
}

fn finish_run(parts: (RunRecord, String)) -> StorageResult<RunRecord> {
    let (mut record, forbidden) = parts;
    record.forbidden_prefixes = serde_json::from_str(&forbidden)?;
    Ok(record)
}

/// Maps a uniqueness failure to a typed violation
fn append_error(e: rusqlite::Error, what: &str) -> StorageError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            StorageError::ConstraintViolation(format!("{} already stored", what))
        }
        _ => StorageError::Sqlite(e),
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, run: &NewRun) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let forbidden = serde_json::to_string(&run.forbidden_prefixes)?;
        self.conn.execute(
            "INSERT INTO runs (seed_url, bound_url, forbidden_prefixes, max_to_index, config_hash, started_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.seed_url,
                run.bound_url,
                forbidden,
                run.max_to_index.map(|n| n as i64),
                run.config_hash,
                now,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        let parts = self
            .conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;
        finish_run(parts)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, [], run_from_row)
            .optional()?
            .map(finish_run)
            .transpose()
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        pages_indexed: u64,
        documents_indexed: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_indexed = ?3, documents_indexed = ?4
             WHERE id = ?5",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                pages_indexed as i64,
                documents_indexed as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Page Records =====

    fn put_page(&mut self, record: &PageRecord) -> StorageResult<()> {
        let json = serde_json::to_string(record)?;
        self.conn
            .execute(
                "INSERT INTO pages (id, url, state, status_code, content_type, content_hash, visited_at, record)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id as i64,
                    record.url.as_str(),
                    record.state.to_db_string(),
                    record.status_code,
                    record.content_type,
                    record.content_hash.as_ref().map(|h| h.as_str()),
                    record.visited_at,
                    json
                ],
            )
            .map_err(|e| append_error(e, &format!("page {} ({})", record.id, record.url)))?;
        Ok(())
    }

    fn get_page(&self, id: u64) -> StorageResult<Option<PageRecord>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM pages WHERE id = ?1",
                params![id as i64],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn all_pages(&self) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare("SELECT record FROM pages ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut pages = Vec::new();
        for json in rows {
            pages.push(serde_json::from_str(&json?)?);
        }
        Ok(pages)
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Document Records =====

    fn put_document(&mut self, record: &DocumentRecord) -> StorageResult<()> {
        let json = serde_json::to_string(record)?;
        self.conn
            .execute(
                "INSERT INTO documents (id, content_hash, term_count, record) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id as i64,
                    record.content_hash.as_str(),
                    record.term_frequencies.len() as i64,
                    json
                ],
            )
            .map_err(|e| append_error(e, &format!("document {}", record.id)))?;
        Ok(())
    }

    fn get_document(&self, id: u64) -> StorageResult<Option<DocumentRecord>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM documents WHERE id = ?1",
                params![id as i64],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn all_documents(&self) -> StorageResult<Vec<DocumentRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT record FROM documents ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut documents = Vec::new();
        for json in rows {
            documents.push(serde_json::from_str(&json?)?);
        }
        Ok(documents)
    }

    fn count_documents(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Checkpoints =====

    fn put_checkpoint(&mut self, name: &str, value: &serde_json::Value) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO checkpoints (name, value, updated_at) VALUES (?1, ?2, ?3)",
            params![name, serde_json::to_string(value)?, now],
        )?;
        Ok(())
    }

    fn put_checkpoints(&mut self, entries: &[(&str, serde_json::Value)]) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO checkpoints (name, value, updated_at) VALUES (?1, ?2, ?3)",
            )?;
            for (name, value) in entries {
                stmt.execute(params![name, serde_json::to_string(value)?, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_checkpoint(&self, name: &str) -> StorageResult<Option<serde_json::Value>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM checkpoints WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ContentHash;
    use crate::state::PageState;
    use crate::url::canonicalize;
    use std::collections::BTreeMap;

    fn new_run() -> NewRun {
        NewRun {
            seed_url: "http://ex.com/a/".to_string(),
            bound_url: "http://ex.com/a".to_string(),
            forbidden_prefixes: vec!["http://ex.com/a/private".to_string()],
            max_to_index: Some(10),
            config_hash: "test_hash".to_string(),
        }
    }

    fn page(id: u64, url: &str) -> PageRecord {
        PageRecord {
            id,
            url: canonicalize(url).unwrap(),
            requested_url: url.to_string(),
            state: PageState::Processed,
            status_code: Some(200),
            redirect_history: Vec::new(),
            content_type: Some("text/html".to_string()),
            content_hash: Some(ContentHash::of(url.as_bytes())),
            a_hrefs: vec![canonicalize("http://ex.com/a/next").unwrap()],
            img_srcs: Vec::new(),
            error_message: None,
            visited_at: Utc::now().to_rfc3339(),
        }
    }

    fn document(id: u64, body: &[u8]) -> DocumentRecord {
        let mut term_frequencies = BTreeMap::new();
        term_frequencies.insert("word".to_string(), 2);
        DocumentRecord {
            id,
            content_hash: ContentHash::of(body),
            term_frequencies,
        }
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_create_and_complete_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run(&new_run()).unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.forbidden_prefixes, vec!["http://ex.com/a/private"]);
        assert_eq!(run.max_to_index, Some(10));
        assert!(run.finished_at.is_none());

        storage.complete_run(run_id, 4, 3).unwrap();
        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.pages_indexed, 4);
        assert_eq!(run.documents_indexed, 3);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_missing_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_latest_run().unwrap().is_none());
        assert!(matches!(
            storage.get_run(42),
            Err(StorageError::RunNotFound(42))
        ));
        assert!(matches!(
            storage.update_run_status(42, RunStatus::Failed),
            Err(StorageError::RunNotFound(42))
        ));
    }

    #[test]
    fn test_put_and_get_page() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let record = page(0, "http://ex.com/a");
        storage.put_page(&record).unwrap();

        assert_eq!(storage.get_page(0).unwrap(), Some(record));
        assert_eq!(storage.get_page(1).unwrap(), None);
        assert_eq!(storage.count_pages().unwrap(), 1);
    }

    #[test]
    fn test_pages_are_append_only() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.put_page(&page(0, "http://ex.com/a")).unwrap();

        let same_id = storage.put_page(&page(0, "http://ex.com/b"));
        assert!(matches!(same_id, Err(StorageError::ConstraintViolation(_))));

        let same_url = storage.put_page(&page(1, "http://ex.com/a"));
        assert!(matches!(same_url, Err(StorageError::ConstraintViolation(_))));

        assert_eq!(storage.count_pages().unwrap(), 1);
    }

    #[test]
    fn test_all_pages_in_id_order() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.put_page(&page(1, "http://ex.com/b")).unwrap();
        storage.put_page(&page(0, "http://ex.com/a")).unwrap();

        let ids: Vec<_> = storage.all_pages().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_documents_unique_by_hash() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.put_document(&document(0, b"body")).unwrap();

        let duplicate = storage.put_document(&document(1, b"body"));
        assert!(matches!(duplicate, Err(StorageError::ConstraintViolation(_))));

        storage.put_document(&document(1, b"other")).unwrap();
        assert_eq!(storage.count_documents().unwrap(), 2);
        assert_eq!(
            storage.get_document(1).unwrap().unwrap().content_hash,
            ContentHash::of(b"other")
        );
    }

    #[test]
    fn test_checkpoints_replace() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert_eq!(storage.get_checkpoint("resolver").unwrap(), None);

        storage
            .put_checkpoint("resolver", &serde_json::json!({"a": "b"}))
            .unwrap();
        storage
            .put_checkpoints(&[
                ("resolver", serde_json::json!({"c": "d"})),
                ("url_registry", serde_json::json!({"http://ex.com/": 0})),
            ])
            .unwrap();

        assert_eq!(
            storage.get_checkpoint("resolver").unwrap(),
            Some(serde_json::json!({"c": "d"}))
        );
        assert_eq!(
            storage.get_checkpoint("url_registry").unwrap(),
            Some(serde_json::json!({"http://ex.com/": 0}))
        );
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.put_page(&page(0, "http://ex.com/a")).unwrap();
            storage
                .put_checkpoint("url_registry", &serde_json::json!({"http://ex.com/a": 0}))
                .unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.count_pages().unwrap(), 1);
        assert!(storage.get_checkpoint("url_registry").unwrap().is_some());
    }
}
