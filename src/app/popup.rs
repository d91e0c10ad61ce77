use crate::types::{SessionId, StudentId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PopupKind {
    NewStudent,
    /// Signed adjustment of the current session's result.
    Adjust { student_id: StudentId },
    SetTotal {
        session_id: SessionId,
        student_id: StudentId,
    },
    /// Day of a new supplementary session.
    NewSession,
    ConfirmDelete { student_id: StudentId },
}

/// A modal prompt with a single line of text input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Popup {
    pub kind: PopupKind,
    pub title: String,
    pub input: String,
}

impl Popup {
    pub fn new(kind: PopupKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            input: String::new(),
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    pub fn hint(&self) -> &'static str {
        match self.kind {
            PopupKind::NewStudent => "Name",
            PopupKind::Adjust { .. } => "+/-seconds or +/-mm:ss",
            PopupKind::SetTotal { .. } => "Total as mm:ss or seconds",
            PopupKind::NewSession => "Day as YYYY-MM-DD",
            PopupKind::ConfirmDelete { .. } => "y to delete, Esc to cancel",
        }
    }
}
