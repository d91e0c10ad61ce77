/// In-process store, used when the database cannot be opened and in tests.
use std::collections::BTreeMap;

use anyhow::{Result, bail};
use chrono::{DateTime, Local};

use super::{RosterStore, SessionStore};
use crate::error::InputError;
use crate::types::{SessionId, Session, Student, sort_roster};

#[derive(Debug, Default)]
pub struct MemoryStore {
    students: Vec<Student>,
    sessions: BTreeMap<SessionId, Session>,
    fail_writes: bool,
    failing_deletes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, simulating an unreachable backend.
    #[cfg(test)]
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Makes the next `count` student deletions fail.
    #[cfg(test)]
    pub fn fail_next_deletes(&mut self, count: usize) {
        self.failing_deletes = count;
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            bail!("store is not writable");
        }
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn get_session(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).cloned())
    }

    fn sessions_by_prefix(&self, prefix: &str) -> Result<Vec<Session>> {
        Ok(self
            .sessions
            .values()
            .filter(|session| session.id.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn all_sessions(&self) -> Result<Vec<Session>> {
        Ok(self.sessions.values().cloned().collect())
    }

    fn save_session(&mut self, session: &Session) -> Result<()> {
        self.check_writable()?;
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }
}

impl RosterStore for MemoryStore {
    fn students(&self) -> Result<Vec<Student>> {
        let mut students = self.students.clone();
        sort_roster(&mut students);
        Ok(students)
    }

    fn add_student(&mut self, name: &str, now: DateTime<Local>) -> Result<Student> {
        if name.trim().is_empty() {
            return Err(InputError::EmptyName.into());
        }
        self.check_writable()?;
        let student = Student::new(name, now);
        self.students.push(student.clone());
        Ok(student)
    }

    fn delete_student(&mut self, id: &str) -> Result<()> {
        self.check_writable()?;
        if self.failing_deletes > 0 {
            self.failing_deletes -= 1;
            bail!("student deletion rejected");
        }
        self.students.retain(|student| student.id != id);
        Ok(())
    }

    fn import_students(&mut self, students: &[Student]) -> Result<()> {
        self.check_writable()?;
        for student in students {
            match self.students.iter_mut().find(|s| s.id == student.id) {
                Some(existing) => existing.name = student.name.clone(),
                None => self.students.push(student.clone()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_writes_leave_contents_untouched() {
        let mut store = MemoryStore::new();
        let session = Session::new("2024-03-04", Local::now());
        store.save_session(&session).unwrap();
        store.set_fail_writes(true);
        assert!(store.save_session(&Session::new("2024-03-05", Local::now())).is_err());
        assert!(store.add_student("Ada", Local::now()).is_err());
        assert_eq!(store.all_sessions().unwrap(), vec![session]);
    }

    #[test]
    fn prefix_lookup_matches_supplements() {
        let mut store = MemoryStore::new();
        for id in ["2024-03-04_2", "2024-03-04", "2024-03-05"] {
            store.save_session(&Session::new(id, Local::now())).unwrap();
        }
        let ids: Vec<_> = store
            .sessions_by_prefix("2024-03-04")
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["2024-03-04", "2024-03-04_2"]);
    }
}
