use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local};
use tracing::debug;

use super::ledger::SessionLedger;
use crate::clock::{start_of_day, today_id};
use crate::types::{SessionId, SessionResult, StudentId};

/// Tracks running timers and accrues elapsed time into the current session.
///
/// Each running student maps to the instant up to which its time has been
/// accounted. Accrual only ever advances that instant by the whole seconds it
/// consumed, so the sub-second remainder carries over to the next tick and
/// repeated or batched ticks neither lose nor double-count time.
///
/// Day rollover policy: whole seconds completed before local midnight are
/// credited to the old day's session; the partial second straddling midnight,
/// and everything after it, goes to the new day's session.
#[derive(Debug)]
pub struct TimerEngine {
    running: BTreeMap<StudentId, DateTime<Local>>,
    current: SessionId,
}

impl TimerEngine {
    /// Creates the engine pointing at today's session, creating that session
    /// if needed.
    pub fn new(now: DateTime<Local>, ledger: &mut SessionLedger) -> Self {
        let current = today_id(&now);
        if ledger.get(&current).is_none() {
            ledger.ensure(&current, now);
        }
        Self {
            running: BTreeMap::new(),
            current,
        }
    }

    pub fn current_session_id(&self) -> &str {
        &self.current
    }

    pub fn is_running(&self, student_id: &str) -> bool {
        self.running.contains_key(student_id)
    }

    pub fn running(&self) -> impl Iterator<Item = &StudentId> {
        self.running.keys()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Starts the student's timer. No-op when it is already running.
    pub fn start(&mut self, student_id: &str, now: DateTime<Local>, ledger: &mut SessionLedger) -> bool {
        self.roll_over(now, ledger);
        if self.is_running(student_id) {
            return false;
        }
        ledger
            .ensure(&self.current, now)
            .results
            .get_or_insert_with(student_id, SessionResult::started)
            .open_passage();
        self.running.insert(student_id.to_string(), now);
        debug!(student = student_id, session = %self.current, "timer started");
        true
    }

    /// Flushes elapsed time and stops the timer. No-op when not running.
    pub fn stop(&mut self, student_id: &str, now: DateTime<Local>, ledger: &mut SessionLedger) -> bool {
        self.roll_over(now, ledger);
        if !self.is_running(student_id) {
            return false;
        }
        self.tick(student_id, now, ledger);
        self.running.remove(student_id);
        debug!(student = student_id, session = %self.current, "timer stopped");
        true
    }

    /// Starts a stopped timer or stops a running one. Returns the new running state.
    pub fn toggle(&mut self, student_id: &str, now: DateTime<Local>, ledger: &mut SessionLedger) -> bool {
        if self.is_running(student_id) {
            self.stop(student_id, now, ledger);
            false
        } else {
            self.start(student_id, now, ledger);
            true
        }
    }

    /// Credits the whole seconds elapsed since the last accounted instant.
    /// Returns the number of seconds credited.
    pub fn tick(&mut self, student_id: &str, now: DateTime<Local>, ledger: &mut SessionLedger) -> u64 {
        let session_id = self.current.clone();
        self.accrue_until(student_id, now, &session_id, ledger)
    }

    /// Scheduler entry point: handles day rollover, then ticks every running timer.
    pub fn tick_all(&mut self, now: DateTime<Local>, ledger: &mut SessionLedger) {
        self.roll_over(now, ledger);
        let students: Vec<StudentId> = self.running.keys().cloned().collect();
        for student_id in students {
            self.tick(&student_id, now, ledger);
        }
    }

    /// Closes the current passage and opens a new empty one. The running state
    /// and the total are left untouched.
    pub fn step_passage(&mut self, student_id: &str, now: DateTime<Local>, ledger: &mut SessionLedger) {
        self.roll_over(now, ledger);
        if self.is_running(student_id) {
            self.tick(student_id, now, ledger);
        }
        ledger
            .ensure(&self.current, now)
            .results
            .get_or_insert_with(student_id, SessionResult::default)
            .step();
    }

    /// Adds a signed number of seconds to the total and the current passage,
    /// each clamped at zero separately.
    pub fn add_manual_adjustment(
        &mut self,
        student_id: &str,
        delta_seconds: i64,
        now: DateTime<Local>,
        ledger: &mut SessionLedger,
    ) {
        self.roll_over(now, ledger);
        if self.is_running(student_id) {
            self.tick(student_id, now, ledger);
        }
        ledger
            .ensure(&self.current, now)
            .results
            .get_or_insert_with(student_id, SessionResult::default)
            .adjust(delta_seconds);
        debug!(student = student_id, delta_seconds, "manual adjustment");
    }

    /// Stops the timer and wipes the student's result for the current session.
    pub fn reset_student(&mut self, student_id: &str, now: DateTime<Local>, ledger: &mut SessionLedger) {
        self.stop(student_id, now, ledger);
        ledger
            .ensure(&self.current, now)
            .results
            .insert(student_id, SessionResult::default());
    }

    /// Deletes one passage of the current session and subtracts it from the total.
    pub fn remove_passage(
        &mut self,
        student_id: &str,
        index: usize,
        now: DateTime<Local>,
        ledger: &mut SessionLedger,
    ) -> Option<u64> {
        self.roll_over(now, ledger);
        let running = self.is_running(student_id);
        if running {
            self.tick(student_id, now, ledger);
        }
        let result = ledger.get_mut(&self.current)?.results.get_mut(student_id)?;
        let removed = result.remove_passage(index)?;
        // A running timer always accrues into an open passage of its own.
        if running && index == result.passages.len() {
            result.passages.push(0);
        }
        Some(removed)
    }

    pub fn stop_all(&mut self, now: DateTime<Local>, ledger: &mut SessionLedger) {
        let students: Vec<StudentId> = self.running.keys().cloned().collect();
        for student_id in students {
            self.stop(&student_id, now, ledger);
        }
    }

    /// Moves the current-session pointer to today's session when the local day
    /// has changed, first flushing running timers into the old session up to
    /// midnight. Timers keep running across the boundary.
    pub fn roll_over(&mut self, now: DateTime<Local>, ledger: &mut SessionLedger) -> bool {
        let today = today_id(&now);
        if today == self.current {
            return false;
        }
        let old = std::mem::replace(&mut self.current, today.clone());
        let cutoff = start_of_day(now.date_naive()).filter(|midnight| *midnight <= now).unwrap_or(now);
        let students: Vec<StudentId> = self.running.keys().cloned().collect();
        for student_id in &students {
            self.accrue_until(student_id, cutoff, &old, ledger);
        }
        let session = ledger.ensure(&today, now);
        for student_id in &students {
            session
                .results
                .get_or_insert_with(student_id, SessionResult::started)
                .open_passage();
        }
        tracing::info!(from = %old, to = %today, running = students.len(), "day rolled over");
        true
    }

    fn accrue_until(
        &mut self,
        student_id: &str,
        until: DateTime<Local>,
        session_id: &str,
        ledger: &mut SessionLedger,
    ) -> u64 {
        let Some(last) = self.running.get(student_id).copied() else {
            return 0;
        };
        let elapsed_ms = (until - last).num_milliseconds();
        if elapsed_ms < 1000 {
            return 0;
        }
        let whole = (elapsed_ms / 1000) as u64;
        ledger
            .ensure(session_id, until)
            .results
            .get_or_insert_with(student_id, SessionResult::started)
            .accrue(whole);
        self.running
            .insert(student_id.to_string(), last + Duration::seconds(whole as i64));
        whole
    }
}
