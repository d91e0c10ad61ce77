use std::collections::BTreeSet;

use chrono::{DateTime, Local};

use crate::types::{Session, SessionId};

/// In-memory session history. This is the source of truth for display; the
/// store only ever receives copies of the sessions marked dirty here.
#[derive(Debug, Default)]
pub struct SessionLedger {
    sessions: Vec<Session>,
    dirty: BTreeSet<SessionId>,
}

impl SessionLedger {
    pub fn new(mut sessions: Vec<Session>) -> Self {
        sessions.sort_by(|a, b| a.id.cmp(&b.id));
        sessions.dedup_by(|a, b| a.id == b.id);
        Self {
            sessions,
            dirty: BTreeSet::new(),
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.position(id).ok().map(|index| &self.sessions[index])
    }

    /// Mutable access; the session is marked dirty.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        let index = self.position(id).ok()?;
        self.dirty.insert(id.to_string());
        Some(&mut self.sessions[index])
    }

    /// Returns the session with `id`, creating it on first use.
    pub fn ensure(&mut self, id: &str, now: DateTime<Local>) -> &mut Session {
        let index = match self.position(id) {
            Ok(index) => index,
            Err(index) => {
                tracing::info!(session = id, "creating session");
                self.sessions.insert(index, Session::new(id, now));
                index
            }
        };
        self.dirty.insert(id.to_string());
        &mut self.sessions[index]
    }

    /// Sessions whose id starts with `prefix`, in id order.
    pub fn by_prefix(&self, prefix: &str) -> Vec<&Session> {
        self.sessions
            .iter()
            .filter(|session| session.id.starts_with(prefix))
            .collect()
    }

    /// Swaps in a merged collection. Sessions that differ from what was held
    /// before are marked dirty.
    pub fn replace_all(&mut self, sessions: Vec<Session>) {
        let incoming = SessionLedger::new(sessions);
        for session in &incoming.sessions {
            if self.get(&session.id) != Some(session) {
                self.dirty.insert(session.id.clone());
            }
        }
        self.sessions = incoming.sessions;
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn mark_dirty(&mut self, id: &str) {
        if self.position(id).is_ok() {
            self.dirty.insert(id.to_string());
        }
    }

    pub fn take_dirty(&mut self) -> Vec<SessionId> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    fn position(&self, id: &str) -> Result<usize, usize> {
        self.sessions
            .binary_search_by(|session| session.id.as_str().cmp(id))
    }
}
