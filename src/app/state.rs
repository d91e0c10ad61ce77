use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::engine::{Command, SessionLedger, TimerEngine};
use crate::error::InputError;
use crate::stats::{PeriodCursor, PeriodKind, PeriodReport, build_report};
use crate::store::{RosterStore, SessionStore, Store};
use crate::sync::{
    ChangeEvent, ChangeObserver, Remote, RemoteSink, SyncStatus, dedupe_roster, merge_roster,
    merge_sessions,
};
use crate::types::{Session, SessionResult, Student, StudentId, sort_roster};

use super::{AppEvent, AppView, FocusMode, Popup};

const DEFAULT_AUTOSAVE_SECS: i64 = 5;

/// The top-level application state. Every mutation goes through
/// [`App::update`] or [`App::dispatch`], one at a time.
pub struct App {
    pub running: bool,
    store: Box<dyn Store>,
    remote: Option<Box<dyn Remote>>,
    clock: Box<dyn Clock>,
    pub ledger: SessionLedger,
    pub engine: TimerEngine,
    pub students: Vec<Student>,
    roster_dirty: bool,
    /// Students removed in memory whose store deletion has not succeeded yet.
    pending_deletes: BTreeSet<StudentId>,
    store_degraded: bool,
    pub sync_status: SyncStatus,
    autosave_every: Duration,
    last_save: DateTime<Local>,
    pub view: AppView,
    pub(super) view_history: Vec<AppView>,
    pub focus_mode: FocusMode,
    pub selected_tab_index: usize,
    pub selected_student_index: usize,
    /// Month shown in the history view, as `YYYY-MM`.
    pub history_month: String,
    pub selected_session_index: usize,
    pub selected_result_index: usize,
    pub period: PeriodCursor,
    pub status: Option<String>,
    pub popup: Option<Popup>,
}

/// Headline numbers of the current session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiveSummary {
    pub total: u64,
    /// Floor of total over participating students.
    pub average: u64,
    pub participating: usize,
    pub roster_size: usize,
}

impl App {
    pub fn new(
        store: Box<dyn Store>,
        remote: Option<Box<dyn Remote>>,
        clock: Box<dyn Clock>,
        autosave_secs: u64,
    ) -> Self {
        let now = clock.now();
        let mut status = None;
        let students = match store.students() {
            Ok(students) => {
                let mut students = dedupe_roster(students);
                sort_roster(&mut students);
                students
            }
            Err(err) => {
                warn!(error = %err, "failed to load students");
                status = Some(format!("Failed to load students: {err}"));
                Vec::new()
            }
        };
        let sessions = match store.all_sessions() {
            Ok(sessions) => sessions,
            Err(err) => {
                warn!(error = %err, "failed to load sessions");
                status = Some(format!("Failed to load sessions: {err}"));
                Vec::new()
            }
        };
        let mut ledger = SessionLedger::new(sessions);
        let engine = TimerEngine::new(now, &mut ledger);
        let sync_status = if remote.is_some() {
            SyncStatus::Online
        } else {
            SyncStatus::Local
        };
        info!(
            students = students.len(),
            sessions = ledger.sessions().len(),
            "state loaded"
        );

        let today = now.date_naive();
        Self {
            running: true,
            store,
            remote,
            clock,
            ledger,
            engine,
            students,
            roster_dirty: false,
            pending_deletes: BTreeSet::new(),
            store_degraded: false,
            sync_status,
            autosave_every: autosave_interval(autosave_secs),
            last_save: now,
            view: AppView::Live,
            view_history: Vec::new(),
            focus_mode: FocusMode::Content,
            selected_tab_index: 0,
            selected_student_index: 0,
            history_month: today.format("%Y-%m").to_string(),
            selected_session_index: 0,
            selected_result_index: 0,
            period: PeriodCursor::new(PeriodKind::Week, today),
            status,
            popup: None,
        }
    }

    /// Marks the app as running on a fallback store; the status stays unsynced.
    pub fn mark_degraded(&mut self) {
        self.store_degraded = true;
        self.sync_status = SyncStatus::Unsynced;
    }

    /// Today's day id, `YYYY-MM-DD`.
    pub fn today_id(&self) -> String {
        self.clock.today()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Central update function - process an event and mutate state.
    pub fn update(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tick => self.on_tick(),
            AppEvent::KeyPress(key) => self.handle_key(key),
            AppEvent::Command(command) => {
                if let Err(err) = self.dispatch(command) {
                    self.status = Some(err.to_string());
                }
            }
        }
    }

    fn on_tick(&mut self) {
        let now = self.clock.now();
        self.engine.tick_all(now, &mut self.ledger);
        if now - self.last_save >= self.autosave_every {
            self.poll_remote();
            if self.ledger.is_dirty() || self.roster_dirty || !self.pending_deletes.is_empty() {
                self.persist();
            }
            self.last_save = now;
        }
    }

    /// Applies one command against the current time.
    pub fn dispatch(&mut self, command: Command) -> Result<()> {
        let now = self.clock.now();
        let ledger = &mut self.ledger;
        match command {
            Command::Toggle(id) => {
                self.engine.toggle(&id, now, ledger);
            }
            Command::StopAll => self.engine.stop_all(now, ledger),
            Command::StepPassage(id) => self.engine.step_passage(&id, now, ledger),
            Command::Adjust(id, delta) => self.engine.add_manual_adjustment(&id, delta, now, ledger),
            Command::Reset(id) => self.engine.reset_student(&id, now, ledger),
            Command::RemovePassage(id, index) => {
                self.engine.remove_passage(&id, index, now, ledger);
            }
            Command::AddStudent(name) => {
                self.add_student(&name, now)?;
            }
            Command::DeleteStudent(id) => self.delete_student(&id, now),
            Command::NewSession(day) => {
                let id = self.engine.create_supplementary_session(day, now, ledger);
                self.status = Some(format!("Session {id} created."));
            }
            Command::SetTotal {
                session_id,
                student_id,
                seconds,
            } => self
                .engine
                .set_total(&session_id, &student_id, seconds, now, ledger)?,
            Command::RemoveFromSession {
                session_id,
                student_id,
            } => {
                self.engine
                    .remove_from_session(&session_id, &student_id, now, ledger)?;
            }
            Command::AddRosterToSession(session_id) => {
                let ids: Vec<StudentId> = self.students.iter().map(|s| s.id.clone()).collect();
                let added = self.engine.add_to_session(&session_id, &ids, ledger)?;
                self.status = Some(format!("{added} students added."));
            }
        }
        Ok(())
    }

    fn add_student(&mut self, name: &str, now: DateTime<Local>) -> Result<Student> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InputError::EmptyName.into());
        }
        let student = match self.store.add_student(name, now) {
            Ok(student) => student,
            Err(err) => {
                self.write_failed("add student", &err);
                self.roster_dirty = true;
                Student::new(name, now)
            }
        };
        self.students.push(student.clone());
        sort_roster(&mut self.students);
        Ok(student)
    }

    /// Removes a student from the roster. Their recorded results stay.
    fn delete_student(&mut self, id: &str, now: DateTime<Local>) {
        self.engine.stop(id, now, &mut self.ledger);
        self.students.retain(|student| student.id != id);
        if let Err(err) = self.store.delete_student(id) {
            self.write_failed("delete student", &err);
            self.pending_deletes.insert(id.to_string());
        }
        if self.selected_student_index >= self.students.len() {
            self.selected_student_index = self.students.len().saturating_sub(1);
        }
    }

    /// Writes dirty sessions to the store and publishes to the remote.
    /// Failures keep the in-memory state and flag the status as unsynced.
    pub fn persist(&mut self) {
        let mut failed = false;
        if self.roster_dirty {
            match self.store.import_students(&self.students) {
                Ok(()) => self.roster_dirty = false,
                Err(err) => {
                    self.write_failed("save students", &err);
                    failed = true;
                }
            }
        }
        let pending: Vec<StudentId> = self.pending_deletes.iter().cloned().collect();
        for id in pending {
            match self.store.delete_student(&id) {
                Ok(()) => {
                    self.pending_deletes.remove(&id);
                }
                Err(err) => {
                    warn!(student = %id, error = %err, "failed to delete student");
                    failed = true;
                }
            }
        }
        for id in self.ledger.take_dirty() {
            let Some(session) = self.ledger.get(&id) else {
                continue;
            };
            if let Err(err) = self.store.save_session(session) {
                warn!(session = %id, error = %err, "failed to save session");
                self.ledger.mark_dirty(&id);
                failed = true;
            }
        }
        if let Some(remote) = self.remote.as_mut() {
            if let Err(err) = remote.publish(&self.students, self.ledger.sessions()) {
                warn!(error = %err, "failed to publish snapshot");
                failed = true;
            }
        }
        self.sync_status = if failed || self.store_degraded {
            SyncStatus::Unsynced
        } else if self.remote.is_some() {
            SyncStatus::Online
        } else {
            SyncStatus::Local
        };
        if failed {
            self.status = Some("Changes not saved, will retry.".to_string());
        }
    }

    fn write_failed(&mut self, action: &str, err: &anyhow::Error) {
        warn!(error = %err, "failed to {action}");
        self.sync_status = SyncStatus::Unsynced;
    }

    /// Pulls changes made elsewhere and merges them in.
    pub fn poll_remote(&mut self) {
        let Some(remote) = self.remote.as_mut() else {
            return;
        };
        let events = match remote.poll_changes() {
            Ok(events) => events,
            Err(err) => {
                warn!(error = %err, "failed to read remote snapshot");
                self.sync_status = SyncStatus::Unsynced;
                return;
            }
        };
        for event in events {
            self.apply_change(event);
        }
    }

    pub fn apply_change(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Students(remote) => {
                if let Some(roster) = merge_roster(&self.students, remote) {
                    info!(students = roster.len(), "remote roster adopted");
                    self.students = roster;
                    self.roster_dirty = true;
                }
            }
            ChangeEvent::Sessions(remote) => {
                let today = self.engine.current_session_id().to_string();
                let merged = merge_sessions(self.ledger.sessions(), remote, &today);
                self.ledger.replace_all(merged);
            }
        }
    }

    /// Stops every timer and saves. Called before exiting.
    pub fn shutdown(&mut self) {
        let now = self.clock.now();
        self.engine.stop_all(now, &mut self.ledger);
        self.persist();
        self.running = false;
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.ledger.get(self.engine.current_session_id())
    }

    pub fn current_result(&self, student_id: &str) -> Option<&SessionResult> {
        self.current_session()?.results.get(student_id)
    }

    pub fn live_summary(&self) -> LiveSummary {
        let mut summary = LiveSummary {
            roster_size: self.students.len(),
            ..LiveSummary::default()
        };
        if let Some(session) = self.current_session() {
            for (_, result) in session.results.iter() {
                summary.total += result.total;
                if result.is_active() {
                    summary.participating += 1;
                }
            }
        }
        if summary.participating > 0 {
            summary.average = summary.total / summary.participating as u64;
        }
        summary
    }

    pub fn student_name<'a>(&'a self, student_id: &'a str) -> &'a str {
        self.students
            .iter()
            .find(|student| student.id == student_id)
            .map(|student| student.name.as_str())
            .unwrap_or(student_id)
    }

    /// Looks a student up by exact name, then case-insensitively.
    pub fn find_student(&self, name: &str) -> Result<&Student, InputError> {
        self.students
            .iter()
            .find(|student| student.name == name)
            .or_else(|| {
                self.students
                    .iter()
                    .find(|student| student.name.eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| InputError::UnknownStudent(name.to_string()))
    }

    pub fn selected_student(&self) -> Option<&Student> {
        self.students.get(self.selected_student_index)
    }

    pub fn report(&self) -> PeriodReport {
        build_report(
            self.period.kind,
            self.period.range(),
            self.ledger.sessions(),
            &self.students,
        )
    }

    pub fn history_sessions(&self) -> Vec<&Session> {
        self.ledger.by_prefix(&self.history_month)
    }

    pub fn selected_session(&self) -> Option<&Session> {
        self.history_sessions()
            .get(self.selected_session_index)
            .copied()
    }

    pub(super) fn shift_history_month(&mut self, delta: i32) {
        let current = NaiveDate::parse_from_str(&format!("{}-01", self.history_month), "%Y-%m-%d")
            .unwrap_or_else(|_| self.today());
        let index = current.year() * 12 + current.month0() as i32 + delta;
        let (year, month) = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);
        self.history_month = format!("{year:04}-{month:02}");
        self.selected_session_index = 0;
    }
}

/// Autosave period; values chrono cannot represent fall back to the default.
fn autosave_interval(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or_else(|| Duration::seconds(DEFAULT_AUTOSAVE_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;
    use crate::sync::SnapshotFile;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn clock() -> Rc<FixedClock> {
        Rc::new(FixedClock::at(
            Local.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
        ))
    }

    fn app_with(store: MemoryStore, clock: &Rc<FixedClock>) -> App {
        App::new(Box::new(store), None, Box::new(Rc::clone(clock)), 5)
    }

    fn seeded_store(names: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for name in names {
            store.add_student(name, Local::now()).unwrap();
        }
        store
    }

    #[test]
    fn ticks_accrue_and_autosave() {
        let clock = clock();
        let mut app = app_with(seeded_store(&["Ada"]), &clock);
        let ada = app.find_student("Ada").unwrap().id.clone();
        app.update(AppEvent::Command(Command::Toggle(ada.clone())));
        for _ in 0..24 {
            clock.advance_millis(250);
            app.update(AppEvent::Tick);
        }
        assert_eq!(app.current_result(&ada).map(|r| r.total), Some(6));
        let saved = app.store().get_session("2024-03-04").unwrap().unwrap();
        assert_eq!(saved.results.get(&ada).map(|r| r.total), Some(5));
        assert_eq!(app.sync_status, SyncStatus::Local);
    }

    #[test]
    fn failing_store_keeps_memory_and_flags_unsynced() {
        let clock = clock();
        let mut store = seeded_store(&["Ada"]);
        store.set_fail_writes(true);
        let mut app = app_with(store, &clock);
        let ada = app.find_student("Ada").unwrap().id.clone();
        app.dispatch(Command::Adjust(ada.clone(), 30)).unwrap();
        app.persist();
        assert_eq!(app.sync_status, SyncStatus::Unsynced);
        assert_eq!(app.current_result(&ada).map(|r| r.total), Some(30));
        assert!(app.ledger.is_dirty());
    }

    #[test]
    fn add_student_rejects_blank_names() {
        let clock = clock();
        let mut app = app_with(MemoryStore::new(), &clock);
        let err = app.dispatch(Command::AddStudent("  ".into())).unwrap_err();
        assert_matches!(err.downcast_ref::<InputError>(), Some(InputError::EmptyName));
        app.dispatch(Command::AddStudent("bea".into())).unwrap();
        app.dispatch(Command::AddStudent("Al".into())).unwrap();
        let names: Vec<_> = app.students.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Al", "bea"]);
    }

    #[test]
    fn deleting_student_keeps_results_and_falls_back_to_id() {
        let clock = clock();
        let mut app = app_with(seeded_store(&["Ada"]), &clock);
        let ada = app.find_student("Ada").unwrap().id.clone();
        app.dispatch(Command::Toggle(ada.clone())).unwrap();
        clock.advance_millis(4000);
        app.dispatch(Command::DeleteStudent(ada.clone())).unwrap();
        assert!(!app.engine.is_running(&ada));
        assert_eq!(app.current_result(&ada).map(|r| r.total), Some(4));
        assert_eq!(app.student_name(&ada), ada);
        assert!(app.store().students().unwrap().is_empty());
        let report = app.report();
        assert_eq!(report.ranking[0].label, ada);
    }

    #[test]
    fn failed_delete_is_retried_until_the_store_accepts_it() {
        let clock = clock();
        let mut store = seeded_store(&["Ada"]);
        store.fail_next_deletes(2);
        let mut app = app_with(store, &clock);
        let ada = app.find_student("Ada").unwrap().id.clone();

        app.dispatch(Command::DeleteStudent(ada)).unwrap();
        assert_eq!(app.sync_status, SyncStatus::Unsynced);
        app.persist();
        assert_eq!(app.sync_status, SyncStatus::Unsynced);
        assert_eq!(app.store().students().unwrap().len(), 1);

        app.persist();
        assert_eq!(app.sync_status, SyncStatus::Local);
        assert!(app.store().students().unwrap().is_empty());
    }

    #[test]
    fn oversized_autosave_falls_back_to_default() {
        assert_eq!(autosave_interval(u64::MAX), Duration::seconds(5));
        assert_eq!(autosave_interval(i64::MAX as u64), Duration::seconds(5));
        assert_eq!(autosave_interval(30), Duration::seconds(30));
    }

    #[test]
    fn live_summary_counts_participants() {
        let clock = clock();
        let mut app = app_with(seeded_store(&["Ada", "Bo", "Cy"]), &clock);
        let ada = app.find_student("ada").unwrap().id.clone();
        let bo = app.find_student("Bo").unwrap().id.clone();
        let cy = app.find_student("Cy").unwrap().id.clone();
        app.dispatch(Command::Adjust(ada, 61)).unwrap();
        app.dispatch(Command::Adjust(bo, 30)).unwrap();
        app.dispatch(Command::Toggle(cy)).unwrap();
        let summary = app.live_summary();
        assert_eq!(
            summary,
            LiveSummary {
                total: 91,
                average: 45,
                participating: 2,
                roster_size: 3,
            }
        );
    }

    #[test]
    fn history_commands_edit_past_sessions() {
        let clock = clock();
        let mut store = seeded_store(&["Ada", "Bo"]);
        store
            .save_session(&Session::new(
                "2024-03-01",
                Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            ))
            .unwrap();
        let mut app = app_with(store, &clock);
        let ada = app.find_student("Ada").unwrap().id.clone();
        app.dispatch(Command::AddRosterToSession("2024-03-01".into()))
            .unwrap();
        app.dispatch(Command::SetTotal {
            session_id: "2024-03-01".into(),
            student_id: ada.clone(),
            seconds: 95,
        })
        .unwrap();
        let session = app.ledger.get("2024-03-01").unwrap();
        assert_eq!(session.results.len(), 2);
        assert_eq!(session.results.get(&ada), Some(&SessionResult::with_total(95)));

        let missing = app.dispatch(Command::RemoveFromSession {
            session_id: "1999-01-01".into(),
            student_id: ada,
        });
        assert_matches!(
            missing.unwrap_err().downcast_ref::<InputError>(),
            Some(InputError::UnknownSession(_))
        );
    }

    #[test]
    fn shutdown_stops_timers_and_saves() {
        let clock = clock();
        let mut app = app_with(seeded_store(&["Ada"]), &clock);
        let ada = app.find_student("Ada").unwrap().id.clone();
        app.dispatch(Command::Toggle(ada.clone())).unwrap();
        clock.advance_millis(2500);
        app.shutdown();
        assert!(!app.running);
        assert_eq!(app.engine.running_count(), 0);
        let saved = app.store().get_session("2024-03-04").unwrap().unwrap();
        assert_eq!(saved.results.get(&ada).map(|r| r.total), Some(2));
    }

    #[test]
    fn remote_changes_merge_into_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let clock = clock();

        let mut other = App::new(
            Box::new(seeded_store(&["Ada", "Bo"])),
            Some(Box::new(SnapshotFile::new(&path))),
            Box::new(Rc::clone(&clock)),
            5,
        );
        let bo = other.find_student("Bo").unwrap().id.clone();
        other.dispatch(Command::Adjust(bo.clone(), 40)).unwrap();
        other.persist();
        assert_eq!(other.sync_status, SyncStatus::Online);

        let mut app = App::new(
            Box::new(seeded_store(&["Ada"])),
            Some(Box::new(SnapshotFile::new(&path))),
            Box::new(Rc::clone(&clock)),
            5,
        );
        app.poll_remote();
        assert_eq!(app.students.len(), 2);
        assert_eq!(app.current_result(&bo).map(|r| r.total), Some(40));
    }
}
