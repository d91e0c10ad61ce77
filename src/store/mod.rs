/// Persistence of the roster and of sessions: SQLite on disk, or in memory.
mod memory;
mod migrations;
mod sessions;
mod students;

use anyhow::Result;
use chrono::{DateTime, Local};
use rusqlite::Connection;

pub use memory::MemoryStore;

use crate::types::{Session, Student};

/// Session persistence. Saves are independent; nothing assumes atomicity
/// across several of them.
pub trait SessionStore {
    fn get_session(&self, id: &str) -> Result<Option<Session>>;
    /// Sessions whose id starts with `prefix`, ordered by id.
    fn sessions_by_prefix(&self, prefix: &str) -> Result<Vec<Session>>;
    fn all_sessions(&self) -> Result<Vec<Session>>;
    fn save_session(&mut self, session: &Session) -> Result<()>;
}

pub trait RosterStore {
    fn students(&self) -> Result<Vec<Student>>;
    fn add_student(&mut self, name: &str, now: DateTime<Local>) -> Result<Student>;
    fn delete_student(&mut self, id: &str) -> Result<()>;
    /// Inserts or overwrites students by id, used when a remote roster wins.
    fn import_students(&mut self, students: &[Student]) -> Result<()>;
}

pub trait Store: SessionStore + RosterStore {}

impl<T: SessionStore + RosterStore> Store for T {}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the SQLite database and runs migrations.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }
}

impl SessionStore for SqliteStore {
    fn get_session(&self, id: &str) -> Result<Option<Session>> {
        sessions::query_session_by_id(id, &self.conn)
    }

    fn sessions_by_prefix(&self, prefix: &str) -> Result<Vec<Session>> {
        sessions::query_sessions_by_prefix(prefix, &self.conn)
    }

    fn all_sessions(&self) -> Result<Vec<Session>> {
        sessions::query_sessions(&self.conn)
    }

    fn save_session(&mut self, session: &Session) -> Result<()> {
        sessions::save_session(session, &mut self.conn)
    }
}

impl RosterStore for SqliteStore {
    fn students(&self) -> Result<Vec<Student>> {
        students::query_students(&self.conn)
    }

    fn add_student(&mut self, name: &str, now: DateTime<Local>) -> Result<Student> {
        students::create_student(name, now, &self.conn)
    }

    fn delete_student(&mut self, id: &str) -> Result<()> {
        students::delete_student(id, &self.conn)
    }

    fn import_students(&mut self, students: &[Student]) -> Result<()> {
        students::upsert_students(students, &mut self.conn)
    }
}

/// Returns the default database path inside the user's data directory.
/// Falls back to `./speakr.db` when no data dir is found.
pub fn default_db_path() -> String {
    if let Some(data_dir) = dirs::data_local_dir() {
        let speakr_dir = data_dir.join("speakr");
        std::fs::create_dir_all(&speakr_dir).ok();
        speakr_dir.join("speakr.db").to_string_lossy().into_owned()
    } else {
        "speakr.db".to_string()
    }
}
