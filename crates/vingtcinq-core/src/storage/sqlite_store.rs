//! SQLite-backed [`SessionStore`].
//!
//! Mirrors the hosted `sessions` table: one row per (user, session number).
//! Every successful write is pushed to the subscribers of the affected user,
//! which is how a second handle on the same file learns about sessions
//! completed elsewhere.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::debug;

use super::data_dir;
use super::database::DB_FILE;
use super::session_store::{NewSession, RemoteChange, SessionStore, StoredSession, Subscription};
use crate::error::{CoreError, DatabaseError, StoreError};

const SELECT_COLUMNS: &str = "id, user_id, session_number, session_name, active_time, pause_time,
     extra_time, total_time, completed_at, created_at, updated_at";

pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
    subscribers: Mutex<Vec<(String, UnboundedSender<RemoteChange>)>>,
}

impl SqliteSessionStore {
    /// Open the store inside the local database file, next to the kv table.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join(DB_FILE);
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the store at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id             TEXT PRIMARY KEY,
                user_id        TEXT NOT NULL,
                session_number INTEGER NOT NULL,
                session_name   TEXT,
                active_time    INTEGER NOT NULL DEFAULT 0,
                pause_time     INTEGER NOT NULL DEFAULT 0,
                extra_time     INTEGER NOT NULL DEFAULT 0,
                total_time     INTEGER NOT NULL DEFAULT 0,
                completed_at   TEXT,
                created_at     TEXT NOT NULL,
                updated_at     TEXT NOT NULL,
                UNIQUE (user_id, session_number)
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn fetch(conn: &Connection, session_id: &str) -> Result<Option<StoredSession>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM sessions WHERE id = ?1");
        Ok(conn
            .query_row(&sql, params![session_id], row_to_session)
            .optional()?)
    }

    fn notify(&self, user_id: &str, change: RemoteChange) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        // A failed send means the receiver was dropped: that is the unsubscribe.
        subscribers.retain(|(uid, tx)| uid != user_id || tx.send(change.clone()).is_ok());
    }
}

impl SessionStore for SqliteSessionStore {
    fn list_sessions(&self, user_id: &str) -> Result<Vec<StoredSession>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM sessions WHERE user_id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], row_to_session)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    fn insert_session(
        &self,
        user_id: &str,
        session: &NewSession,
    ) -> Result<StoredSession, StoreError> {
        let now = Utc::now();
        let stored = StoredSession {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            session_number: session.session_number,
            session_name: session.session_name.clone(),
            active_time: session.active_time,
            pause_time: session.pause_time,
            extra_time: session.extra_time,
            total_time: session.total_time,
            completed_at: Some(session.completed_at),
            created_at: now,
            updated_at: now,
        };
        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO sessions (id, user_id, session_number, session_name, active_time,
                     pause_time, extra_time, total_time, completed_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    stored.id,
                    stored.user_id,
                    stored.session_number as i64,
                    stored.session_name,
                    stored.active_time,
                    stored.pause_time,
                    stored.extra_time,
                    stored.total_time,
                    stored.completed_at.map(|t| t.to_rfc3339()),
                    stored.created_at.to_rfc3339(),
                    stored.updated_at.to_rfc3339(),
                ],
            )?;
        }
        debug!(id = %stored.id, number = stored.session_number, "session row inserted");
        self.notify(user_id, RemoteChange::Insert(stored.clone()));
        Ok(stored)
    }

    fn rename_session(&self, session_id: &str, new_name: &str) -> Result<(), StoreError> {
        let updated = {
            let conn = self.conn()?;
            let changed = conn.execute(
                "UPDATE sessions SET session_name = ?1, updated_at = ?2 WHERE id = ?3",
                params![new_name, Utc::now().to_rfc3339(), session_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(session_id.to_string()));
            }
            Self::fetch(&conn, session_id)?
        };
        if let Some(row) = updated {
            let user_id = row.user_id.clone();
            self.notify(&user_id, RemoteChange::Update(row));
        }
        Ok(())
    }

    fn delete_session(&self, session_id: &str) -> Result<(), StoreError> {
        let user_id = {
            let conn = self.conn()?;
            let Some(row) = Self::fetch(&conn, session_id)? else {
                return Err(StoreError::NotFound(session_id.to_string()));
            };
            conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
            row.user_id
        };
        self.notify(
            &user_id,
            RemoteChange::Delete {
                id: session_id.to_string(),
            },
        );
        Ok(())
    }

    fn subscribe(&self, user_id: &str) -> Result<Subscription, StoreError> {
        let (tx, rx) = unbounded_channel();
        self.subscribers
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .push((user_id.to_string(), tx));
        Ok(Subscription::new(rx))
    }
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<StoredSession> {
    Ok(StoredSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        session_number: row.get::<_, i64>(2)?.max(0) as u64,
        session_name: row.get(3)?,
        active_time: row.get(4)?,
        pause_time: row.get(5)?,
        extra_time: row.get(6)?,
        total_time: row.get(7)?,
        completed_at: row
            .get::<_, Option<String>>(8)?
            .as_deref()
            .and_then(parse_timestamp),
        created_at: parse_timestamp(&row.get::<_, String>(9)?).unwrap_or_default(),
        updated_at: parse_timestamp(&row.get::<_, String>(10)?).unwrap_or_default(),
    })
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(number: u64) -> NewSession {
        NewSession {
            session_number: number,
            session_name: None,
            active_time: 1500,
            pause_time: 60,
            extra_time: 0,
            total_time: 1500,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_list_per_user() {
        let store = SqliteSessionStore::open_memory().unwrap();
        store.insert_session("alice", &insert(1)).unwrap();
        store.insert_session("alice", &insert(2)).unwrap();
        store.insert_session("bob", &insert(1)).unwrap();

        let mut alice = store.list_sessions("alice").unwrap();
        alice.sort_by_key(|s| s.session_number);
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[1].session_number, 2);
        assert_eq!(alice[0].active_time, 1500);
        assert_eq!(store.list_sessions("bob").unwrap().len(), 1);
    }

    #[test]
    fn duplicate_number_is_rejected() {
        let store = SqliteSessionStore::open_memory().unwrap();
        store.insert_session("alice", &insert(1)).unwrap();
        let err = store.insert_session("alice", &insert(1)).unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[test]
    fn rename_and_delete_missing_rows() {
        let store = SqliteSessionStore::open_memory().unwrap();
        assert!(matches!(
            store.rename_session("nope", "x"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_session("nope"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn subscribers_receive_their_users_changes() {
        let store = SqliteSessionStore::open_memory().unwrap();
        let mut alice = store.subscribe("alice").unwrap();
        let mut bob = store.subscribe("bob").unwrap();

        let row = store.insert_session("alice", &insert(1)).unwrap();
        store.rename_session(&row.id, "Deep work").unwrap();
        store.delete_session(&row.id).unwrap();

        let changes = alice.drain();
        assert_eq!(changes.len(), 3);
        assert!(matches!(&changes[0], RemoteChange::Insert(s) if s.id == row.id));
        assert!(matches!(
            &changes[1],
            RemoteChange::Update(s) if s.session_name.as_deref() == Some("Deep work")
        ));
        assert_eq!(changes[2], RemoteChange::Delete { id: row.id.clone() });
        assert!(bob.drain().is_empty());
    }

    #[test]
    fn dropped_subscription_is_pruned() {
        let store = SqliteSessionStore::open_memory().unwrap();
        let sub = store.subscribe("alice").unwrap();
        drop(sub);
        store.insert_session("alice", &insert(1)).unwrap();
        assert!(store.subscribers.lock().unwrap().is_empty());
    }
}
