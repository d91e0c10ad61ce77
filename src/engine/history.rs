/// Editing of arbitrary sessions (past days and supplementary sessions).
use chrono::{DateTime, Local, NaiveDate};
use tracing::info;

use super::ledger::SessionLedger;
use super::timer::TimerEngine;
use crate::clock::day_id;
use crate::error::InputError;
use crate::types::{SessionId, SessionResult, StudentId};

impl TimerEngine {
    /// Creates an extra session for `day` with id `{day}_{unix millis}`.
    pub fn create_supplementary_session(
        &mut self,
        day: NaiveDate,
        now: DateTime<Local>,
        ledger: &mut SessionLedger,
    ) -> SessionId {
        let mut suffix = now.timestamp_millis();
        let mut id = format!("{}_{suffix}", day_id(day));
        while ledger.get(&id).is_some() {
            suffix += 1;
            id = format!("{}_{suffix}", day_id(day));
        }
        ledger.ensure(&id, now);
        info!(session = %id, "supplementary session created");
        id
    }

    /// Overwrites a student's total in `session_id`; the result becomes a
    /// single passage of that length.
    pub fn set_total(
        &mut self,
        session_id: &str,
        student_id: &str,
        seconds: u64,
        now: DateTime<Local>,
        ledger: &mut SessionLedger,
    ) -> Result<(), InputError> {
        if ledger.get(session_id).is_none() {
            return Err(InputError::UnknownSession(session_id.to_string()));
        }
        if session_id == self.current_session_id() && self.is_running(student_id) {
            self.tick(student_id, now, ledger);
        }
        let mut result = SessionResult::with_total(seconds);
        if self.is_running(student_id) && session_id == self.current_session_id() {
            result.open_passage();
        }
        if let Some(session) = ledger.get_mut(session_id) {
            session.results.insert(student_id, result);
        }
        Ok(())
    }

    /// Drops a student from a session, stopping their timer first when it is
    /// running in that session.
    pub fn remove_from_session(
        &mut self,
        session_id: &str,
        student_id: &str,
        now: DateTime<Local>,
        ledger: &mut SessionLedger,
    ) -> Result<Option<SessionResult>, InputError> {
        if ledger.get(session_id).is_none() {
            return Err(InputError::UnknownSession(session_id.to_string()));
        }
        if session_id == self.current_session_id() {
            self.stop(student_id, now, ledger);
        }
        Ok(ledger
            .get_mut(session_id)
            .and_then(|session| session.results.remove(student_id)))
    }

    /// Adds empty results for students not yet in the session. Returns how many
    /// were added.
    pub fn add_to_session(
        &mut self,
        session_id: &str,
        students: &[StudentId],
        ledger: &mut SessionLedger,
    ) -> Result<usize, InputError> {
        let session = ledger
            .get_mut(session_id)
            .ok_or_else(|| InputError::UnknownSession(session_id.to_string()))?;
        let mut added = 0;
        for student_id in students {
            if !session.results.contains(student_id) {
                session.results.insert(student_id, SessionResult::default());
                added += 1;
            }
        }
        Ok(added)
    }
}
