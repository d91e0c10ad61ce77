/// Timer engine: running timers, passages, day rollover and session edits.
mod history;
mod ledger;
mod timer;

use chrono::NaiveDate;

pub use ledger::SessionLedger;
pub use timer::TimerEngine;

use crate::types::{SessionId, StudentId};

/// A requested mutation. All state changes are funneled through these so a
/// single owner applies them in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Toggle(StudentId),
    StopAll,
    StepPassage(StudentId),
    Adjust(StudentId, i64),
    Reset(StudentId),
    RemovePassage(StudentId, usize),
    AddStudent(String),
    DeleteStudent(StudentId),
    NewSession(NaiveDate),
    SetTotal {
        session_id: SessionId,
        student_id: StudentId,
        seconds: u64,
    },
    RemoveFromSession {
        session_id: SessionId,
        student_id: StudentId,
    },
    AddRosterToSession(SessionId),
}
