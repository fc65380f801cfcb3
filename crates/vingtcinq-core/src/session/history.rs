//! Session history: numbering, naming and the merged local/remote view.
//!
//! Sessions are keyed by their number. A local optimistic insert, the
//! store's confirmation of the same row and the store's push notification
//! all land on the same key, so they collapse into one entry. Whenever the
//! store has a row for a number, the store's version replaces the local one.
//!
//! Persistence is best effort. A failed store call is logged and reported
//! as [`SyncOutcome::Failed`]; the local history is never rolled back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::accumulator::SessionData;
use crate::auth::{Identity, User};
use crate::error::StoreError;
use crate::storage::{
    NewSession, RemoteChange, SessionCounter, SessionStore, StoredSession, Subscription,
};

/// Longest name a session may carry, in characters.
pub const MAX_NAME_CHARS: usize = 16;

/// A finished, numbered session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSession {
    pub session_number: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub data: SessionData,
    /// Row id in the session store, once confirmed there.
    #[serde(default)]
    pub remote_id: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl CompletedSession {
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => default_name(self.session_number),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }

    fn from_stored(row: StoredSession, fallback_completed_at: DateTime<Utc>) -> Self {
        Self {
            session_number: row.session_number,
            data: row.data(),
            name: row.session_name.clone(),
            completed_at: row.completed_at.unwrap_or(fallback_completed_at),
            remote_id: Some(row.id),
        }
    }
}

/// What happened to the remote side of a history operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Nothing needed writing.
    Unchanged,
    /// Applied locally; no user is signed in or the session is not in the store yet.
    LocalOnly,
    /// Applied locally and in the store.
    Persisted,
    /// Applied locally; the store call failed (see `last_error`).
    Failed,
}

/// Result of recording a finished session.
#[derive(Debug, Clone)]
pub struct Finalized {
    pub session: CompletedSession,
    pub sync: SyncOutcome,
}

pub fn default_name(session_number: u64) -> String {
    format!("Session {session_number}")
}

/// Trim and clamp a user-supplied name. Empty input falls back to the default.
pub fn effective_name(session_number: u64, raw: &str) -> String {
    let clamped: String = raw.trim().chars().take(MAX_NAME_CHARS).collect();
    let clamped = clamped.trim_end();
    if clamped.is_empty() {
        default_name(session_number)
    } else {
        clamped.to_string()
    }
}

pub struct SessionHistory {
    sessions: BTreeMap<u64, CompletedSession>,
    /// Names given to numbers that have not been recorded yet.
    pending_names: BTreeMap<u64, String>,
    highest_remote: u64,
    store: Arc<dyn SessionStore>,
    identity: Arc<dyn Identity>,
    counter: Box<dyn SessionCounter>,
    subscription: Option<(String, Subscription)>,
    last_completed: Option<CompletedSession>,
    last_error: Option<String>,
}

impl SessionHistory {
    pub fn new(
        store: Arc<dyn SessionStore>,
        identity: Arc<dyn Identity>,
        counter: Box<dyn SessionCounter>,
    ) -> Self {
        Self {
            sessions: BTreeMap::new(),
            pending_names: BTreeMap::new(),
            highest_remote: 0,
            store,
            identity,
            counter,
            subscription: None,
            last_completed: None,
            last_error: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Completed sessions, ascending by number, one entry per number.
    pub fn sessions(&self) -> impl Iterator<Item = &CompletedSession> {
        self.sessions.values()
    }

    pub fn to_vec(&self) -> Vec<CompletedSession> {
        self.sessions.values().cloned().collect()
    }

    pub fn get(&self, session_number: u64) -> Option<&CompletedSession> {
        self.sessions.get(&session_number)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn last_completed(&self) -> Option<&CompletedSession> {
        self.last_completed.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn highest_remote_number(&self) -> u64 {
        self.highest_remote
    }

    pub fn current_user(&self) -> Option<User> {
        self.identity.current_user()
    }

    /// Name that will be used for `session_number`, recorded or not.
    pub fn display_name(&self, session_number: u64) -> String {
        match self.sessions.get(&session_number) {
            Some(session) => session.display_name(),
            None => self
                .pending_names
                .get(&session_number)
                .cloned()
                .unwrap_or_else(|| default_name(session_number)),
        }
    }

    /// The number the next finalized session will receive.
    ///
    /// Never below the local counter, never reusing a number the store
    /// already holds, never reusing a number present locally.
    pub fn next_session_number(&self) -> u64 {
        let local_counter = self.counter.load().unwrap_or(1).max(1);
        let local_max = self.sessions.keys().next_back().copied().unwrap_or(0);
        local_counter
            .max(self.highest_remote + 1)
            .max(local_max + 1)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Record a frozen accumulator as the next numbered session.
    pub fn finalize(&mut self, data: SessionData, completed_at: DateTime<Utc>) -> Finalized {
        let session_number = self.next_session_number();
        let session = CompletedSession {
            session_number,
            name: self.pending_names.remove(&session_number),
            data,
            remote_id: None,
            completed_at,
        };
        self.pending_names.retain(|&n, _| n > session_number);
        self.sessions.insert(session_number, session.clone());
        if let Err(e) = self.counter.store(session_number + 1) {
            warn!(error = %e, "failed to persist next session number");
        }
        info!(
            number = session_number,
            total_secs = data.total_secs,
            "session completed"
        );

        let sync = match self.identity.current_user() {
            None => SyncOutcome::LocalOnly,
            Some(user) => self.push_insert(&user, &session),
        };
        let session = self.sessions.get(&session_number).cloned().unwrap_or(session);
        self.last_completed = Some(session.clone());
        Finalized { session, sync }
    }

    /// Rename a recorded session, or name the one in progress. Renaming to
    /// the current effective name writes nothing; other unrecorded numbers
    /// are ignored.
    pub fn rename(&mut self, session_number: u64, new_name: &str) -> SyncOutcome {
        let name = effective_name(session_number, new_name);

        let Some(session) = self.sessions.get_mut(&session_number) else {
            if session_number != self.next_session_number() {
                warn!(number = session_number, "ignoring rename of unknown session");
                return SyncOutcome::Unchanged;
            }
            if self.display_name(session_number) == name {
                return SyncOutcome::Unchanged;
            }
            self.pending_names.insert(session_number, name);
            return SyncOutcome::LocalOnly;
        };

        if session.display_name() == name {
            return SyncOutcome::Unchanged;
        }
        session.name = Some(name.clone());
        let remote_id = session.remote_id.clone();
        debug!(number = session_number, name = %name, "session renamed");

        match (remote_id, self.identity.current_user()) {
            (Some(id), Some(_)) => {
                let result = self.store.rename_session(&id, &name);
                self.settle(result, "rename")
            }
            _ => SyncOutcome::LocalOnly,
        }
    }

    /// Remove a session locally and from the store.
    pub fn delete(&mut self, session_number: u64) -> SyncOutcome {
        let Some(session) = self.sessions.remove(&session_number) else {
            return SyncOutcome::Unchanged;
        };
        match (session.remote_id, self.identity.current_user()) {
            (Some(id), Some(_)) => {
                let result = self.store.delete_session(&id);
                self.settle(result, "delete")
            }
            _ => SyncOutcome::LocalOnly,
        }
    }

    /// Subscribe to push updates for the current user and load the store's rows.
    pub fn connect(&mut self) -> SyncOutcome {
        let Some(user) = self.identity.current_user() else {
            self.subscription = None;
            return SyncOutcome::LocalOnly;
        };
        let subscribed = matches!(&self.subscription, Some((uid, _)) if *uid == user.id);
        if !subscribed {
            match self.store.subscribe(&user.id) {
                Ok(sub) => self.subscription = Some((user.id.clone(), sub)),
                Err(e) => {
                    self.record_error("subscribe", &e);
                    return SyncOutcome::Failed;
                }
            }
        }
        self.refresh()
    }

    /// Reload every row of the current user from the store and merge it.
    /// Store rows replace local entries; local-only entries are kept.
    pub fn refresh(&mut self) -> SyncOutcome {
        let Some(user) = self.identity.current_user() else {
            return SyncOutcome::LocalOnly;
        };
        let rows = match self.store.list_sessions(&user.id) {
            Ok(rows) => rows,
            Err(e) => {
                self.record_error("list", &e);
                return SyncOutcome::Failed;
            }
        };
        let listed: std::collections::HashSet<String> =
            rows.iter().map(|row| row.id.clone()).collect();
        // Rows that vanished from the store were deleted elsewhere.
        self.sessions
            .retain(|_, s| s.remote_id.as_ref().map_or(true, |id| listed.contains(id)));
        for row in rows {
            self.merge_remote(row);
        }
        self.last_error = None;
        SyncOutcome::Persisted
    }

    /// Apply every push update received since the last call.
    pub fn poll_remote(&mut self) -> usize {
        let changes = match self.subscription.as_mut() {
            Some((_, sub)) => sub.drain(),
            None => return 0,
        };
        let count = changes.len();
        for change in changes {
            self.apply_remote(change);
        }
        count
    }

    /// Merge one pushed change: unknown number inserts, known number
    /// replaces, delete removes. Applying the same change twice is harmless.
    pub fn apply_remote(&mut self, change: RemoteChange) {
        match change {
            RemoteChange::Insert(row) | RemoteChange::Update(row) => {
                if let Some(user) = self.identity.current_user() {
                    if row.user_id != user.id {
                        warn!(id = %row.id, "ignoring change for another user");
                        return;
                    }
                }
                self.merge_remote(row);
            }
            RemoteChange::Delete { id } => {
                self.sessions
                    .retain(|_, s| s.remote_id.as_deref() != Some(id.as_str()));
            }
        }
    }

    /// Push every local-only session to the store. Returns how many were written.
    pub fn sync_pending(&mut self) -> usize {
        let Some(user) = self.identity.current_user() else {
            return 0;
        };
        let pending: Vec<CompletedSession> = self
            .sessions
            .values()
            .filter(|s| !s.is_synced())
            .cloned()
            .collect();
        pending
            .iter()
            .filter(|s| self.push_insert(&user, s) == SyncOutcome::Persisted)
            .count()
    }

    /// Local-only sessions, for hosts that persist them between runs.
    pub fn unsynced(&self) -> Vec<CompletedSession> {
        self.sessions
            .values()
            .filter(|s| !s.is_synced())
            .cloned()
            .collect()
    }

    /// Re-admit sessions saved by a previous run. Existing numbers win.
    pub fn restore<I: IntoIterator<Item = CompletedSession>>(&mut self, sessions: I) {
        for session in sessions {
            self.sessions
                .entry(session.session_number)
                .or_insert(session);
        }
    }

    /// Names given to the session in progress, for hosts that persist them.
    pub fn pending_names(&self) -> &BTreeMap<u64, String> {
        &self.pending_names
    }

    /// Re-admit pending names saved by a previous run. Names for numbers that
    /// were recorded since are dropped.
    pub fn restore_pending_names<I: IntoIterator<Item = (u64, String)>>(&mut self, names: I) {
        let next = self.next_session_number();
        for (number, name) in names {
            if number >= next {
                self.pending_names.entry(number).or_insert(name);
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn push_insert(&mut self, user: &User, session: &CompletedSession) -> SyncOutcome {
        let insert = NewSession::from_data(
            session.session_number,
            session.name.clone(),
            &session.data,
            session.completed_at,
        );
        match self.store.insert_session(&user.id, &insert) {
            Ok(row) => {
                self.merge_remote(row);
                self.last_error = None;
                SyncOutcome::Persisted
            }
            Err(e) => {
                self.record_error("insert", &e);
                SyncOutcome::Failed
            }
        }
    }

    fn merge_remote(&mut self, row: StoredSession) {
        self.highest_remote = self.highest_remote.max(row.session_number);
        let fallback = self
            .sessions
            .get(&row.session_number)
            .map(|s| s.completed_at)
            .unwrap_or(row.created_at);
        self.pending_names.remove(&row.session_number);
        self.sessions
            .insert(row.session_number, CompletedSession::from_stored(row, fallback));
    }

    fn settle(&mut self, result: Result<(), StoreError>, op: &str) -> SyncOutcome {
        match result {
            Ok(()) => {
                self.last_error = None;
                SyncOutcome::Persisted
            }
            Err(e) => {
                self.record_error(op, &e);
                SyncOutcome::Failed
            }
        }
    }

    fn record_error(&mut self, op: &str, err: &StoreError) {
        warn!(op, error = %err, "session store call failed");
        self.last_error = Some(err.to_string());
    }
}
