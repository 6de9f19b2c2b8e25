//! SQLite persistence for sessions and session events (spec §4.C, §6).
//!
//! Single-writer store, WAL journaling, and a busy-timeout so overlapping
//! short-lived CLI invocations serialize on the database lock rather than
//! failing outright. One connection is held open for the lifetime of the
//! store; [`EventStore::with_transaction`] is the sole entry point for any
//! operation that reads the latest session and then decides whether to
//! append, so that sequence runs as one `IMMEDIATE` transaction instead of
//! several independent auto-committing statements (spec §5).

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction, TransactionBehavior};

use pomodoro_protocol::{EventKind, Session, SessionEvent, SessionKind};

use crate::error::PomodoroError;

pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    /// Opens (creating if needed) the database at `path`, running schema
    /// setup on every open since the DDL is idempotent (`CREATE TABLE IF NOT
    /// EXISTS`). A single connection is kept for the store's lifetime.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PomodoroError> {
        let conn = Self::open_connection(path.as_ref())?;
        let store = EventStore {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Runs `op` inside one held `IMMEDIATE` transaction: begin, run `op`,
    /// commit on `Ok`, roll back (via `Drop`) on `Err`. Callers that read the
    /// latest session, reduce it, and decide whether to append must do the
    /// whole sequence inside this single transaction — that is what keeps
    /// two racing `start` invocations from both observing "no non-terminal
    /// session" and both creating one (invariant 6, spec §5).
    pub fn with_transaction<T>(
        &self,
        op: impl FnOnce(&Transaction) -> Result<T, PomodoroError>,
    ) -> Result<T, PomodoroError> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = op(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// The session with the greatest id, within a held transaction.
    pub fn latest_session_tx(tx: &Transaction) -> Result<Option<Session>, PomodoroError> {
        let raw = tx
            .query_row(
                "SELECT session_id, session_kind, planned_secs, created_at \
                 FROM session ORDER BY session_id DESC LIMIT 1",
                [],
                row_to_raw_session,
            )
            .optional()?;
        raw.map(session_from_raw).transpose()
    }

    /// A session's events in ascending id order, within a held transaction:
    /// the shape the reducer consumes.
    pub fn events_for_session_asc_tx(
        tx: &Transaction,
        session_id: &str,
    ) -> Result<Vec<SessionEvent>, PomodoroError> {
        let mut stmt = tx.prepare(
            "SELECT session_event_id, session_event_kind, session_id, created_at \
             FROM session_event WHERE session_id = ?1 ORDER BY session_event_id ASC",
        )?;
        let rows = stmt.query_map(params![session_id], row_to_raw_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(event_from_raw(row?)?);
        }
        Ok(events)
    }

    /// Inserts a brand-new session together with its first `started` event,
    /// within a held transaction.
    pub fn insert_session_tx(
        tx: &Transaction,
        session: &Session,
        first_event: &SessionEvent,
    ) -> Result<(), PomodoroError> {
        tx.execute(
            "INSERT INTO session (session_id, session_kind, planned_secs, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id,
                session.kind.as_str(),
                session.planned_secs,
                session.created_at.timestamp(),
            ],
        )?;
        insert_event_stmt(tx, first_event)?;
        Ok(())
    }

    /// Appends a single event, within a held transaction.
    pub fn insert_event_tx(tx: &Transaction, event: &SessionEvent) -> Result<(), PomodoroError> {
        insert_event_stmt(tx, event)
    }

    // -- Standalone one-shot reads, used by tests and the CLI's reporting
    // surfaces outside the start/stop/status critical section. Each locks
    // the shared connection only for the duration of its own statement(s).

    pub fn insert_session(
        &self,
        session: &Session,
        first_event: &SessionEvent,
    ) -> Result<(), PomodoroError> {
        self.with_transaction(|tx| Self::insert_session_tx(tx, session, first_event))
    }

    pub fn get_session(&self, id: &str) -> Result<Session, PomodoroError> {
        let conn = self.lock();
        let raw = conn
            .query_row(
                "SELECT session_id, session_kind, planned_secs, created_at \
                 FROM session WHERE session_id = ?1",
                params![id],
                row_to_raw_session,
            )
            .optional()?;
        match raw {
            Some(raw) => session_from_raw(raw),
            None => Err(PomodoroError::NotFound),
        }
    }

    pub fn latest_session(&self) -> Result<Option<Session>, PomodoroError> {
        let conn = self.lock();
        let raw = conn
            .query_row(
                "SELECT session_id, session_kind, planned_secs, created_at \
                 FROM session ORDER BY session_id DESC LIMIT 1",
                [],
                row_to_raw_session,
            )
            .optional()?;
        raw.map(session_from_raw).transpose()
    }

    pub fn list_sessions(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Session>, PomodoroError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT session_id, session_kind, planned_secs, created_at \
             FROM session ORDER BY session_id DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(
            params![limit.unwrap_or(i64::MAX), offset.unwrap_or(0)],
            row_to_raw_session,
        )?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(session_from_raw(row?)?);
        }
        Ok(sessions)
    }

    pub fn insert_event(&self, event: &SessionEvent) -> Result<(), PomodoroError> {
        let conn = self.lock();
        insert_event_stmt(&conn, event)
    }

    pub fn list_events(
        &self,
        session_id: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<SessionEvent>, PomodoroError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT session_event_id, session_event_kind, session_id, created_at \
             FROM session_event \
             WHERE ?1 IS NULL OR session_id = ?1 \
             ORDER BY session_event_id DESC LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(
            params![session_id, limit.unwrap_or(i64::MAX), offset.unwrap_or(0)],
            row_to_raw_event,
        )?;
        let mut events = Vec::new();
        for row in rows {
            events.push(event_from_raw(row?)?);
        }
        Ok(events)
    }

    /// A session's events in ascending id order: the shape the reducer
    /// consumes.
    pub fn events_for_session_asc(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionEvent>, PomodoroError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT session_event_id, session_event_kind, session_id, created_at \
             FROM session_event WHERE session_id = ?1 ORDER BY session_event_id ASC",
        )?;
        let rows = stmt.query_map(params![session_id], row_to_raw_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(event_from_raw(row?)?);
        }
        Ok(events)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_schema(&self) -> Result<(), PomodoroError> {
        let conn = self.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS session (
                session_id   TEXT PRIMARY KEY,
                session_kind TEXT NOT NULL,
                planned_secs INTEGER NOT NULL CHECK (planned_secs > 0),
                created_at   INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS session_event (
                session_event_id   TEXT PRIMARY KEY,
                session_event_kind TEXT NOT NULL,
                session_id         TEXT NOT NULL REFERENCES session(session_id) ON DELETE CASCADE,
                created_at         INTEGER NOT NULL
             );",
        )?;
        Ok(())
    }

    fn open_connection(path: &Path) -> Result<Connection, PomodoroError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent).map_err(|err| {
                    PomodoroError::StoreMessage(format!(
                        "failed to create data directory {}: {}",
                        parent.display(),
                        err
                    ))
                })?;
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

        let conn = Connection::open_with_flags(path, flags)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(conn)
    }
}

fn insert_event_stmt(conn: &Connection, event: &SessionEvent) -> Result<(), PomodoroError> {
    conn.execute(
        "INSERT INTO session_event (session_event_id, session_event_kind, session_id, created_at) \
         VALUES (?1, ?2, ?3, ?4)",
        params![
            event.id,
            event.kind.as_str(),
            event.session_id,
            event.created_at.timestamp(),
        ],
    )?;
    Ok(())
}

/// The on-disk columns of a `session` row, before the `session_kind` text is
/// validated against the enum it is supposed to encode.
struct RawSession {
    id: String,
    kind: String,
    planned_secs: i64,
    created_at: i64,
}

/// The on-disk columns of a `session_event` row, before `session_event_kind`
/// is validated.
struct RawEvent {
    id: String,
    kind: String,
    session_id: String,
    created_at: i64,
}

fn row_to_raw_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSession> {
    Ok(RawSession {
        id: row.get(0)?,
        kind: row.get(1)?,
        planned_secs: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_raw_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        id: row.get(0)?,
        kind: row.get(1)?,
        session_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Validates `raw.kind` against [`SessionKind`]; an unrecognized value means
/// the on-disk row was written by something other than this code's own
/// `as_str()` encoder, which is store corruption, not a guessable default.
fn session_from_raw(raw: RawSession) -> Result<Session, PomodoroError> {
    let kind = SessionKind::from_str(&raw.kind).ok_or_else(|| {
        PomodoroError::StoreMessage(format!(
            "session {} has unrecognized session_kind {:?}",
            raw.id, raw.kind
        ))
    })?;
    Ok(Session {
        id: raw.id,
        kind,
        planned_secs: raw.planned_secs,
        created_at: epoch_secs_to_utc(raw.created_at),
    })
}

fn event_from_raw(raw: RawEvent) -> Result<SessionEvent, PomodoroError> {
    let kind = EventKind::from_str(&raw.kind).ok_or_else(|| {
        PomodoroError::StoreMessage(format!(
            "event {} has unrecognized session_event_kind {:?}",
            raw.id, raw.kind
        ))
    })?;
    Ok(SessionEvent {
        id: raw.id,
        kind,
        session_id: raw.session_id,
        created_at: epoch_secs_to_utc(raw.created_at),
    })
}

fn epoch_secs_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use tempfile::tempdir;

    fn session(id: &str, kind: SessionKind, planned_secs: i64, created_at: DateTime<Utc>) -> Session {
        Session {
            id: id.to_string(),
            kind,
            planned_secs,
            created_at,
        }
    }

    fn event(id: &str, kind: EventKind, session_id: &str, created_at: DateTime<Utc>) -> SessionEvent {
        SessionEvent {
            id: id.to_string(),
            kind,
            session_id: session_id.to_string(),
            created_at,
        }
    }

    #[test]
    fn insert_and_fetch_latest_session() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path().join("pomodoro.db")).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let s = session("01A", SessionKind::Focus, 1500, at);
        let e = event("01A0", EventKind::Started, "01A", at);
        store.insert_session(&s, &e).unwrap();

        let latest = store.latest_session().unwrap().unwrap();
        assert_eq!(latest.id, "01A");
        assert_eq!(latest.kind, SessionKind::Focus);
        assert_eq!(latest.planned_secs, 1500);
    }

    #[test]
    fn events_for_session_asc_returns_in_order() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path().join("pomodoro.db")).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let s = session("01A", SessionKind::Focus, 1500, at);
        let started = event("01A0", EventKind::Started, "01A", at);
        store.insert_session(&s, &started).unwrap();
        store
            .insert_event(&event("01A1", EventKind::Paused, "01A", at))
            .unwrap();
        store
            .insert_event(&event("01A2", EventKind::Resumed, "01A", at))
            .unwrap();

        let events = store.events_for_session_asc("01A").unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Started, EventKind::Paused, EventKind::Resumed]);
    }

    #[test]
    fn foreign_key_violation_is_a_store_error() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path().join("pomodoro.db")).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let result = store.insert_event(&event("01Z", EventKind::Paused, "missing", at));
        assert!(result.is_err());
    }

    #[test]
    fn get_session_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path().join("pomodoro.db")).unwrap();
        let result = store.get_session("nope");
        assert!(matches!(result, Err(PomodoroError::NotFound)));
    }

    #[test]
    fn list_sessions_descending_by_id() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path().join("pomodoro.db")).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        store
            .insert_session(
                &session("01A", SessionKind::Focus, 1500, at),
                &event("01A0", EventKind::Started, "01A", at),
            )
            .unwrap();
        store
            .insert_session(
                &session("01B", SessionKind::Break, 300, at),
                &event("01B0", EventKind::Started, "01B", at),
            )
            .unwrap();

        let sessions = store.list_sessions(None, None).unwrap();
        assert_eq!(sessions[0].id, "01B");
        assert_eq!(sessions[1].id, "01A");
    }

    #[test]
    fn corrupt_session_kind_is_a_store_error_not_a_guessed_default() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path().join("pomodoro.db")).unwrap();
        {
            let conn = store.lock();
            conn.execute(
                "INSERT INTO session (session_id, session_kind, planned_secs, created_at) \
                 VALUES ('01A', 'not-a-real-kind', 1500, 0)",
                [],
            )
            .unwrap();
        }

        let result = store.get_session("01A");
        assert!(matches!(result, Err(PomodoroError::StoreMessage(_))));

        let result = store.latest_session();
        assert!(matches!(result, Err(PomodoroError::StoreMessage(_))));
    }

    #[test]
    fn with_transaction_rolls_back_on_error() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path().join("pomodoro.db")).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let result: Result<(), PomodoroError> = store.with_transaction(|tx| {
            EventStore::insert_session_tx(
                tx,
                &session("01A", SessionKind::Focus, 1500, at),
                &event("01A0", EventKind::Started, "01A", at),
            )?;
            Err(PomodoroError::NotFound)
        });
        assert!(result.is_err());

        assert_eq!(store.list_sessions(None, None).unwrap().len(), 0);
    }

    #[test]
    fn with_transaction_commits_read_decide_append_as_one_unit() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path().join("pomodoro.db")).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        store
            .with_transaction(|tx| {
                let latest = EventStore::latest_session_tx(tx)?;
                assert!(latest.is_none());
                EventStore::insert_session_tx(
                    tx,
                    &session("01A", SessionKind::Focus, 1500, at),
                    &event("01A0", EventKind::Started, "01A", at),
                )
            })
            .unwrap();

        assert!(store.latest_session().unwrap().is_some());
    }
}
