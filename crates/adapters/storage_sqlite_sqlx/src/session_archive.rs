//! `SQLite` implementation of [`SessionBackend`]: an archive of finished sessions.

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarttrack_app::ports::SessionBackend;
use smarttrack_domain::error::TrackerError;
use smarttrack_domain::id::SessionId;
use smarttrack_domain::session::Session;
use smarttrack_domain::time::Timestamp;

use crate::error::StorageError;

struct Wrapper(Session);

// fixed-width so that lexical order is chronological order
fn format_time(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn parse_time(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.to_utc())
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let start_time: String = row.try_get("start_time")?;
        let end_time: Option<String> = row.try_get("end_time")?;
        let serialized_data: Option<String> = row.try_get("serialized_data")?;

        let id = id
            .parse::<SessionId>()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Session {
            id,
            start_time: parse_time(&start_time)?,
            end_time: end_time.as_deref().map(parse_time).transpose()?,
            serialized_data,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO sessions (id, start_time, end_time, serialized_data)
    VALUES (?, ?, ?, ?)
";
const SELECT_BY_ID: &str = "SELECT * FROM sessions WHERE id = ?";
const SELECT_RECENT: &str = "SELECT * FROM sessions ORDER BY start_time DESC LIMIT ?";

/// `SQLite`-backed session archive.
#[derive(Clone)]
pub struct SqliteSessionArchive {
    pool: SqlitePool,
}

impl SqliteSessionArchive {
    /// Create a new archive using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch one archived session.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Storage`] if the query fails.
    pub async fn get(&self, id: SessionId) -> Result<Option<Session>, TrackerError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|w| w.0))
    }

    /// The `limit` most recently started sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Storage`] if the query fails.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Session>, TrackerError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

impl SessionBackend for SqliteSessionArchive {
    fn add_session(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send {
        let pool = self.pool.clone();
        let session = session.clone();
        async move {
            sqlx::query(INSERT)
                .bind(session.id.to_string())
                .bind(format_time(session.start_time))
                .bind(session.end_time.map(format_time))
                .bind(&session.serialized_data)
                .execute(&pool)
                .await
                .map_err(|err| TrackerError::Backend(Box::new(StorageError::from(err))))?;

            tracing::debug!(session_id = %session.id, "session archived");
            Ok(())
        }
    }
}
