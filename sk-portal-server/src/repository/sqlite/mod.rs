//! SQLite implementation of `PortalRepository`.
//!
//! This provides persistent storage that survives service restarts.
//!
//! # Schema Versioning
//!
//! The database has a `schema_version` table that tracks the schema version.
//! When the schema needs to change, increment `CURRENT_SCHEMA_VERSION` and add
//! a migration in `run_migrations()`. Migrations run sequentially from the
//! current version to the target version.

mod rows;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use tracing::warn;

use super::{PortalRepository, Profile, RepositoryError, RequestListing, RequestUpdate};
use rows::{
    custom_title_from_raw, opt_timestamp, profile_from_raw, timestamp, version_to_i64,
    RawHistory, RawListing, RawOfficer, RawProfile, RawRequest, HISTORY_COLUMNS,
    OFFICER_COLUMNS, REQUEST_COLUMNS,
};
use sk_portal_core::{
    CustomTitle, HistoryEntry, Officer, ProfileId, RequestId, RequestStatus, SkRequest,
};

/// Current schema version. Increment this when making schema changes and add
/// corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 2;

/// SQLite-backed portal repository.
///
/// Uses `tokio::task::spawn_blocking` to run synchronous rusqlite operations
/// without blocking the async runtime.
pub struct SqliteRepository {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// True when `err` is a constraint failure whose message names `target`
/// (a `table.column` or an index name).
fn violates(err: &rusqlite::Error, target: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(message)) => {
            e.code == ErrorCode::ConstraintViolation && message.contains(target)
        }
        _ => false,
    }
}

impl SqliteRepository {
    /// Create a new SQLite repository at the given path.
    ///
    /// Creates the database file and schema if they don't exist and runs any
    /// pending migrations. The database is configured with
    /// `journal_mode = WAL`, `synchronous = FULL`, `busy_timeout = 5000ms`
    /// and foreign keys enabled.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();
        let is_in_memory = path_str == ":memory:";

        if !is_in_memory && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;

        // Restrictive permissions: the database holds personal data of officers.
        #[cfg(unix)]
        if !is_in_memory && !path_str.is_empty() {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(path_ref, permissions) {
                warn!(
                    "Failed to set restrictive permissions on database file: {}",
                    e
                );
            }
        }

        // In-memory databases report "memory" instead of "wal".
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| RepositoryError::storage("set journal_mode", e.to_string()))?;
        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));
        if !journal_mode_ok {
            return Err(RepositoryError::storage(
                "configure journal_mode",
                format!(
                    "Failed to enable WAL mode: SQLite returned '{}' instead of 'wal'",
                    journal_mode
                ),
            ));
        }

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            PRAGMA foreign_keys = ON;
            "#,
        )
        .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| RepositoryError::storage("create schema_version table", e.to_string()))?;

        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepositoryError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run migrations from `from_version` to `CURRENT_SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), RepositoryError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "Database schema version {} is newer than supported version {}. \
                     Please upgrade the application.",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS profiles (
                    id TEXT PRIMARY KEY,
                    full_name TEXT NOT NULL,
                    role TEXT NOT NULL,
                    region TEXT
                );

                CREATE TABLE IF NOT EXISTS requests (
                    id TEXT PRIMARY KEY,
                    chapter_id TEXT NOT NULL,
                    meeting_date TEXT NOT NULL,
                    meeting_location TEXT NOT NULL,
                    meeting_report TEXT,
                    status TEXT NOT NULL,
                    verified_by TEXT,
                    verified_at TEXT,
                    tier1_approved_by TEXT,
                    tier1_approved_at TEXT,
                    tier2_approved_by TEXT,
                    tier2_approved_at TEXT,
                    decree_issued_at TEXT,
                    revision_note TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    version INTEGER NOT NULL
                );

                CREATE UNIQUE INDEX IF NOT EXISTS idx_requests_one_active
                    ON requests(chapter_id) WHERE status <> 'decree_issued';
                CREATE INDEX IF NOT EXISTS idx_requests_chapter
                    ON requests(chapter_id, created_at DESC);

                CREATE TABLE IF NOT EXISTS officers (
                    request_id TEXT NOT NULL REFERENCES requests(id),
                    position INTEGER NOT NULL,
                    structure TEXT NOT NULL,
                    bureau TEXT,
                    title TEXT NOT NULL,
                    full_name TEXT NOT NULL,
                    gender TEXT NOT NULL,
                    id_document TEXT NOT NULL,
                    PRIMARY KEY (request_id, position)
                );

                CREATE TABLE IF NOT EXISTS custom_titles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    chapter_id TEXT NOT NULL,
                    structure TEXT NOT NULL,
                    title TEXT NOT NULL
                );

                CREATE UNIQUE INDEX IF NOT EXISTS idx_custom_titles_unique
                    ON custom_titles(chapter_id, structure, title COLLATE NOCASE);
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v1", e.to_string()))?;
        }

        // Migration from version 1 to version 2: request_history table for the
        // per-request timeline.
        if from_version < 2 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS request_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    request_id TEXT NOT NULL REFERENCES requests(id),
                    actor_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    decision TEXT NOT NULL,
                    from_status TEXT NOT NULL,
                    to_status TEXT NOT NULL,
                    note TEXT,
                    recorded_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_request_history_lookup
                    ON request_history(request_id, id);
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v2", e.to_string()))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| RepositoryError::storage("update schema version", e.to_string()))?;

        Ok(())
    }

    /// Create a new in-memory SQLite repository (for testing).
    pub fn new_in_memory() -> Result<Self, RepositoryError> {
        Self::new(":memory:")
    }

    /// Open an existing database for inspection only.
    ///
    /// Nothing is created or migrated and the file's permissions are left
    /// alone. The schema must already be at `CURRENT_SCHEMA_VERSION`.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;
        conn.busy_timeout(Duration::from_millis(5000))
            .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        let version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .map_err(|e| RepositoryError::storage("get schema version", e.to_string()))?;
        if version != CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "Database schema version {} does not match supported version {}",
                    version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, RepositoryError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| RepositoryError::storage(operation, "connection lock poisoned"))?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?
    }
}

fn query_request(
    conn: &Connection,
    filter: &str,
    value: String,
    operation: &'static str,
) -> Result<Option<SkRequest>, RepositoryError> {
    let sql = format!(
        "SELECT {} FROM requests r WHERE {} ORDER BY r.created_at DESC, r.rowid DESC LIMIT 1",
        REQUEST_COLUMNS, filter
    );
    conn.query_row(&sql, params![value], RawRequest::from_row)
        .optional()
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?
        .map(RawRequest::into_request)
        .transpose()
}

fn insert_officer(
    tx: &rusqlite::Transaction<'_>,
    officer: &Officer,
) -> Result<(), RepositoryError> {
    tx.execute(
        &format!(
            "INSERT INTO officers ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            OFFICER_COLUMNS
        ),
        params![
            officer.request_id.to_string(),
            i64::from(officer.position),
            officer.details.structure.as_str(),
            officer.details.bureau.map(|b| b.as_str()),
            officer.details.title,
            officer.details.full_name,
            officer.details.gender.as_str(),
            officer.id_document,
        ],
    )
    .map_err(|e| RepositoryError::storage("insert officer", e.to_string()))?;
    Ok(())
}

fn insert_history(
    tx: &rusqlite::Transaction<'_>,
    entry: &HistoryEntry,
) -> Result<(), RepositoryError> {
    tx.execute(
        &format!(
            "INSERT INTO request_history ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            HISTORY_COLUMNS
        ),
        params![
            entry.request_id.to_string(),
            entry.actor_id.to_string(),
            entry.role.as_str(),
            entry.decision.as_str(),
            entry.from_status.as_str(),
            entry.to_status.as_str(),
            entry.note,
            timestamp(&entry.recorded_at),
        ],
    )
    .map_err(|e| RepositoryError::storage("insert history", e.to_string()))?;
    Ok(())
}

// =============================================================================
// PortalRepository trait implementation
// =============================================================================

#[async_trait]
impl PortalRepository for SqliteRepository {
    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        self.with_conn("get profile", move |conn| {
            let raw: Option<RawProfile> = conn
                .query_row(
                    "SELECT id, full_name, role, region FROM profiles WHERE id = ?1",
                    params![id.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()
                .map_err(|e| RepositoryError::storage("get profile", e.to_string()))?;
            raw.map(profile_from_raw).transpose()
        })
        .await
    }

    async fn put_profile(&self, profile: Profile) -> Result<(), RepositoryError> {
        self.with_conn("put profile", move |conn| {
            conn.execute(
                "INSERT INTO profiles (id, full_name, role, region) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     full_name = excluded.full_name,
                     role = excluded.role,
                     region = excluded.region",
                params![
                    profile.id.to_string(),
                    profile.full_name,
                    profile.role.as_str(),
                    profile.region,
                ],
            )
            .map_err(|e| RepositoryError::storage("put profile", e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<SkRequest>, RepositoryError> {
        self.with_conn("get request", move |conn| {
            query_request(conn, "r.id = ?1", id.to_string(), "get request")
        })
        .await
    }

    async fn active_request(
        &self,
        chapter: ProfileId,
    ) -> Result<Option<SkRequest>, RepositoryError> {
        self.with_conn("active request", move |conn| {
            query_request(
                conn,
                "r.chapter_id = ?1 AND r.status <> 'decree_issued'",
                chapter.to_string(),
                "active request",
            )
        })
        .await
    }

    async fn latest_request(
        &self,
        chapter: ProfileId,
    ) -> Result<Option<SkRequest>, RepositoryError> {
        self.with_conn("latest request", move |conn| {
            query_request(
                conn,
                "r.chapter_id = ?1",
                chapter.to_string(),
                "latest request",
            )
        })
        .await
    }

    async fn create_request(&self, mut request: SkRequest) -> Result<SkRequest, RepositoryError> {
        request.version = 1;
        self.with_conn("create request", move |conn| {
            let result = conn.execute(
                "INSERT INTO requests (id, chapter_id, meeting_date, meeting_location,
                     meeting_report, status, verified_by, verified_at, tier1_approved_by,
                     tier1_approved_at, tier2_approved_by, tier2_approved_at, decree_issued_at,
                     revision_note, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    request.id.to_string(),
                    request.chapter_id.to_string(),
                    request.meeting_date.format("%Y-%m-%d").to_string(),
                    request.meeting_location,
                    request.meeting_report,
                    request.status.as_str(),
                    request.verified_by.map(|p| p.to_string()),
                    opt_timestamp(&request.verified_at),
                    request.tier1_approved_by.map(|p| p.to_string()),
                    opt_timestamp(&request.tier1_approved_at),
                    request.tier2_approved_by.map(|p| p.to_string()),
                    opt_timestamp(&request.tier2_approved_at),
                    opt_timestamp(&request.decree_issued_at),
                    request.revision_note,
                    timestamp(&request.created_at),
                    timestamp(&request.updated_at),
                    version_to_i64(request.version)?,
                ],
            );
            match result {
                Ok(_) => Ok(request),
                Err(e)
                    if violates(&e, "requests.chapter_id")
                        || violates(&e, "idx_requests_one_active") =>
                {
                    Err(RepositoryError::ActiveRequestExists {
                        chapter: request.chapter_id,
                    })
                }
                Err(e) if violates(&e, "requests.id") => {
                    Err(RepositoryError::RequestExists { id: request.id })
                }
                Err(e) => Err(RepositoryError::storage("create request", e.to_string())),
            }
        })
        .await
    }

    async fn apply_update(&self, update: RequestUpdate) -> Result<SkRequest, RepositoryError> {
        self.with_conn("apply update", move |conn| {
            let RequestUpdate {
                mut request,
                expected_version,
                roster,
                history,
            } = update;
            let next_version = expected_version + 1;

            let tx = conn
                .transaction()
                .map_err(|e| RepositoryError::storage("begin transaction", e.to_string()))?;

            let changed = tx
                .execute(
                    "UPDATE requests SET
                         meeting_date = ?1, meeting_location = ?2, meeting_report = ?3,
                         status = ?4, verified_by = ?5, verified_at = ?6,
                         tier1_approved_by = ?7, tier1_approved_at = ?8,
                         tier2_approved_by = ?9, tier2_approved_at = ?10,
                         decree_issued_at = ?11, revision_note = ?12, updated_at = ?13,
                         version = ?14
                     WHERE id = ?15 AND version = ?16",
                    params![
                        request.meeting_date.format("%Y-%m-%d").to_string(),
                        request.meeting_location,
                        request.meeting_report,
                        request.status.as_str(),
                        request.verified_by.map(|p| p.to_string()),
                        opt_timestamp(&request.verified_at),
                        request.tier1_approved_by.map(|p| p.to_string()),
                        opt_timestamp(&request.tier1_approved_at),
                        request.tier2_approved_by.map(|p| p.to_string()),
                        opt_timestamp(&request.tier2_approved_at),
                        opt_timestamp(&request.decree_issued_at),
                        request.revision_note,
                        timestamp(&request.updated_at),
                        version_to_i64(next_version)?,
                        request.id.to_string(),
                        version_to_i64(expected_version)?,
                    ],
                )
                .map_err(|e| RepositoryError::storage("update request", e.to_string()))?;

            if changed == 0 {
                let exists = tx
                    .query_row(
                        "SELECT 1 FROM requests WHERE id = ?1",
                        params![request.id.to_string()],
                        |_| Ok(()),
                    )
                    .optional()
                    .map_err(|e| RepositoryError::storage("update request", e.to_string()))?
                    .is_some();
                return Err(if exists {
                    RepositoryError::VersionConflict {
                        id: request.id,
                        expected: expected_version,
                    }
                } else {
                    RepositoryError::RequestNotFound { id: request.id }
                });
            }

            if let Some(roster) = roster {
                tx.execute(
                    "DELETE FROM officers WHERE request_id = ?1",
                    params![request.id.to_string()],
                )
                .map_err(|e| RepositoryError::storage("replace roster", e.to_string()))?;
                for officer in &roster {
                    insert_officer(&tx, officer)?;
                }
            }

            for entry in &history {
                insert_history(&tx, entry)?;
            }

            tx.commit()
                .map_err(|e| RepositoryError::storage("commit update", e.to_string()))?;

            request.version = next_version;
            Ok(request)
        })
        .await
    }

    async fn list_requests(&self) -> Result<Vec<RequestListing>, RepositoryError> {
        self.with_conn("list requests", |conn| {
            let sql = format!(
                "SELECT {}, p.full_name, p.region
                 FROM requests r LEFT JOIN profiles p ON p.id = r.chapter_id
                 ORDER BY r.updated_at DESC",
                REQUEST_COLUMNS
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| RepositoryError::storage("list requests", e.to_string()))?;
            let raws = stmt
                .query_map([], RawListing::from_row)
                .map_err(|e| RepositoryError::storage("list requests", e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| RepositoryError::storage("list requests", e.to_string()))?;
            raws.into_iter().map(RawListing::into_listing).collect()
        })
        .await
    }

    async fn officers(&self, request: RequestId) -> Result<Vec<Officer>, RepositoryError> {
        self.with_conn("get officers", move |conn| {
            let sql = format!(
                "SELECT {} FROM officers WHERE request_id = ?1 ORDER BY position",
                OFFICER_COLUMNS
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| RepositoryError::storage("get officers", e.to_string()))?;
            let raws = stmt
                .query_map(params![request.to_string()], RawOfficer::from_row)
                .map_err(|e| RepositoryError::storage("get officers", e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| RepositoryError::storage("get officers", e.to_string()))?;
            raws.into_iter().map(RawOfficer::into_officer).collect()
        })
        .await
    }

    async fn history(&self, request: RequestId) -> Result<Vec<HistoryEntry>, RepositoryError> {
        self.with_conn("get history", move |conn| {
            let sql = format!(
                "SELECT {} FROM request_history WHERE request_id = ?1 ORDER BY id",
                HISTORY_COLUMNS
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| RepositoryError::storage("get history", e.to_string()))?;
            let raws = stmt
                .query_map(params![request.to_string()], RawHistory::from_row)
                .map_err(|e| RepositoryError::storage("get history", e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| RepositoryError::storage("get history", e.to_string()))?;
            raws.into_iter().map(RawHistory::into_entry).collect()
        })
        .await
    }

    async fn custom_titles(&self, chapter: ProfileId) -> Result<Vec<CustomTitle>, RepositoryError> {
        self.with_conn("get custom titles", move |conn| {
            let mut stmt = conn
                .prepare("SELECT structure, title FROM custom_titles WHERE chapter_id = ?1 ORDER BY id")
                .map_err(|e| RepositoryError::storage("get custom titles", e.to_string()))?;
            let raws = stmt
                .query_map(params![chapter.to_string()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|e| RepositoryError::storage("get custom titles", e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| RepositoryError::storage("get custom titles", e.to_string()))?;
            raws.into_iter()
                .map(|(structure, title)| custom_title_from_raw(structure, title))
                .collect()
        })
        .await
    }

    async fn add_custom_title(
        &self,
        chapter: ProfileId,
        title: CustomTitle,
    ) -> Result<(), RepositoryError> {
        self.with_conn("add custom title", move |conn| {
            let result = conn.execute(
                "INSERT INTO custom_titles (chapter_id, structure, title) VALUES (?1, ?2, ?3)",
                params![chapter.to_string(), title.structure.as_str(), title.title],
            );
            match result {
                Ok(_) => Ok(()),
                Err(e) if is_constraint_violation(&e) => {
                    Err(RepositoryError::DuplicateTitle { title: title.title })
                }
                Err(e) => Err(RepositoryError::storage("add custom title", e.to_string())),
            }
        })
        .await
    }
}

impl SqliteRepository {
    /// Number of requests in each status, for the operator CLI.
    pub async fn status_counts(&self) -> Result<Vec<(RequestStatus, u64)>, RepositoryError> {
        self.with_conn("status counts", |conn| {
            let mut stmt = conn
                .prepare("SELECT status, COUNT(*) FROM requests GROUP BY status ORDER BY status")
                .map_err(|e| RepositoryError::storage("status counts", e.to_string()))?;
            let raws = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .map_err(|e| RepositoryError::storage("status counts", e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| RepositoryError::storage("status counts", e.to_string()))?;
            raws.into_iter()
                .map(|(status, count)| {
                    let status = status
                        .parse::<RequestStatus>()
                        .map_err(|_| RepositoryError::corruption(format!("status {:?}", status)))?;
                    let count = u64::try_from(count)
                        .map_err(|_| RepositoryError::corruption("negative count"))?;
                    Ok((status, count))
                })
                .collect()
        })
        .await
    }
}
