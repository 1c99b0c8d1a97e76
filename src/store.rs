use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{DublineError, Result};

const REQUEST_SCHEMA: &str = include_str!("../sql/translation_requests.sql");

/// Audit row written for every accepted translation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestRecord {
    pub job_id: Uuid,
    pub url: String,
    pub language: String,
    pub voice: String,
    pub email: Option<String>,
    pub school: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub requested_at: DateTime<Utc>,
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;\n\
         PRAGMA synchronous = NORMAL;\n\
         PRAGMA busy_timeout = 5000;\n",
    )
}

#[derive(Debug, Clone)]
pub struct SqliteRequestStoreBuilder {
    path: Option<PathBuf>,
    create_if_missing: bool,
}

impl Default for SqliteRequestStoreBuilder {
    fn default() -> Self {
        Self {
            path: None,
            create_if_missing: true,
        }
    }
}

impl SqliteRequestStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    pub fn build(self) -> Result<SqliteRequestStore> {
        let path = self
            .path
            .ok_or_else(|| DublineError::Database("request store path is not set".to_string()))?;
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE;
        if self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        Ok(SqliteRequestStore { path, flags })
    }
}

/// Request records in SQLite; one connection per call
#[derive(Debug, Clone)]
pub struct SqliteRequestStore {
    path: PathBuf,
    flags: OpenFlags,
}

impl SqliteRequestStore {
    pub fn builder() -> SqliteRequestStoreBuilder {
        SqliteRequestStoreBuilder::new()
    }

    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        SqliteRequestStoreBuilder::new().path(path).build()
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(&self.path, self.flags).map_err(|e| {
            DublineError::Database(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        configure_connection(&conn).map_err(database_error)?;
        Ok(conn)
    }

    pub fn initialize(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = self.open()?;
        conn.execute_batch(REQUEST_SCHEMA).map_err(database_error)?;
        Ok(())
    }

    pub fn insert(&self, record: &RequestRecord) -> Result<i64> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO translation_requests (
                job_id, url, language, voice, email, school, district, state, requested_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.job_id.to_string(),
                record.url,
                record.language,
                record.voice,
                record.email,
                record.school,
                record.district,
                record.state,
                record.requested_at.to_rfc3339(),
            ],
        )
        .map_err(database_error)?;
        Ok(conn.last_insert_rowid())
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.open()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM translation_requests", [], |row| row.get(0))
            .map_err(database_error)?;
        Ok(count as u64)
    }

    /// Run `insert` off the async runtime.
    pub async fn insert_async(&self, record: RequestRecord) -> Result<i64> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.insert(&record))
            .await
            .map_err(|e| DublineError::Database(format!("store task failed: {}", e)))?
    }
}

fn database_error(e: rusqlite::Error) -> DublineError {
    DublineError::Database(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> RequestRecord {
        RequestRecord {
            job_id: Uuid::new_v4(),
            url: url.to_string(),
            language: "hi".to_string(),
            voice: "female".to_string(),
            email: Some("teacher@school.in".to_string()),
            school: Some("ZP School".to_string()),
            district: None,
            state: Some("Maharashtra".to_string()),
            requested_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRequestStore::new(dir.path().join("db/requests.sqlite")).unwrap();
        store.initialize().unwrap();
        assert_eq!(store.count().unwrap(), 0);

        store.insert(&record("https://youtu.be/a")).unwrap();
        store.insert(&record("https://youtu.be/b")).unwrap();
        assert_eq!(store.count().unwrap(), 2);

        // schema creation is idempotent
        store.initialize().unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_duplicate_job_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRequestStore::new(dir.path().join("requests.sqlite")).unwrap();
        store.initialize().unwrap();

        let first = record("https://youtu.be/a");
        store.insert(&first).unwrap();
        let err = store.insert(&first).unwrap_err();
        assert!(matches!(err, DublineError::Database(_)));
    }

    #[test]
    fn test_builder_requires_path() {
        assert!(SqliteRequestStore::builder().build().is_err());
    }

    #[test]
    fn test_missing_file_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRequestStore::builder()
            .path(dir.path().join("absent.sqlite"))
            .create_if_missing(false)
            .build()
            .unwrap();
        assert!(store.count().is_err());
    }

    #[tokio::test]
    async fn test_insert_async() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRequestStore::new(dir.path().join("requests.sqlite")).unwrap();
        store.initialize().unwrap();
        store.insert_async(record("https://youtu.be/c")).await.unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
