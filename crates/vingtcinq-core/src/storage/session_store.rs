//! Contract for the remote session store.
//!
//! The history manager only talks to a [`SessionStore`]; whether it is
//! backed by a hosted database or the local SQLite file is invisible to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};

use crate::error::StoreError;
use crate::session::SessionData;

/// A session row as the store knows it. Times are whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub id: String,
    pub user_id: String,
    pub session_number: u64,
    pub session_name: Option<String>,
    pub active_time: i64,
    pub pause_time: i64,
    pub extra_time: i64,
    pub total_time: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn data(&self) -> SessionData {
        SessionData {
            active_secs: self.active_time as f64,
            pause_secs: self.pause_time as f64,
            extra_secs: self.extra_time as f64,
            total_secs: self.total_time as f64,
        }
    }
}

/// Payload of `insert_session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub session_number: u64,
    pub session_name: Option<String>,
    pub active_time: i64,
    pub pause_time: i64,
    pub extra_time: i64,
    pub total_time: i64,
    pub completed_at: DateTime<Utc>,
}

impl NewSession {
    /// Build an insert from a snapshot, rounding every bucket to whole seconds.
    pub fn from_data(
        session_number: u64,
        session_name: Option<String>,
        data: &SessionData,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let rounded = data.rounded();
        Self {
            session_number,
            session_name,
            active_time: rounded.active_secs as i64,
            pause_time: rounded.pause_secs as i64,
            extra_time: rounded.extra_secs as i64,
            total_time: rounded.total_secs as i64,
            completed_at,
        }
    }
}

/// A change pushed by the store, possibly originating on another device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum RemoteChange {
    Insert(StoredSession),
    Update(StoredSession),
    Delete { id: String },
}

/// Push channel handle. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: UnboundedReceiver<RemoteChange>,
}

impl Subscription {
    pub fn new(rx: UnboundedReceiver<RemoteChange>) -> Self {
        Self { rx }
    }

    /// Next pending change without waiting.
    pub fn try_next(&mut self) -> Option<RemoteChange> {
        match self.rx.try_recv() {
            Ok(change) => Some(change),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Every change delivered so far, in arrival order.
    pub fn drain(&mut self) -> Vec<RemoteChange> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Wait for the next change; `None` once the store has gone away.
    pub async fn recv(&mut self) -> Option<RemoteChange> {
        self.rx.recv().await
    }
}

/// Persistence collaborator used by the session history.
pub trait SessionStore: Send + Sync {
    /// Every session of `user_id`, in no particular order.
    fn list_sessions(&self, user_id: &str) -> Result<Vec<StoredSession>, StoreError>;

    fn insert_session(
        &self,
        user_id: &str,
        session: &NewSession,
    ) -> Result<StoredSession, StoreError>;

    fn rename_session(&self, session_id: &str, new_name: &str) -> Result<(), StoreError>;

    fn delete_session(&self, session_id: &str) -> Result<(), StoreError>;

    /// Push channel for inserts, updates and deletes of `user_id`'s sessions.
    fn subscribe(&self, user_id: &str) -> Result<Subscription, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn new_session_rounds_buckets() {
        let data = SessionData::new(1499.6, 30.2, 60.0);
        let insert = NewSession::from_data(3, None, &data, Utc::now());
        assert_eq!(insert.active_time, 1500);
        assert_eq!(insert.pause_time, 30);
        assert_eq!(insert.total_time, 1560);
    }

    #[test]
    fn subscription_drains_in_order() {
        let (tx, rx) = unbounded_channel();
        let mut sub = Subscription::new(rx);
        tx.send(RemoteChange::Delete { id: "a".into() }).unwrap();
        tx.send(RemoteChange::Delete { id: "b".into() }).unwrap();
        let changes = sub.drain();
        assert_eq!(
            changes,
            vec![
                RemoteChange::Delete { id: "a".into() },
                RemoteChange::Delete { id: "b".into() },
            ]
        );
        drop(tx);
        assert!(sub.try_next().is_none());
    }
}
