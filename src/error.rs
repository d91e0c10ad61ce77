use thiserror::Error;

/// Rejected user input. Raised before any state is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("'{0}' is not a duration, expected seconds or mm:ss")]
    InvalidDuration(String),
    #[error("'{0}' is not an adjustment, expected +/-seconds or +/-mm:ss")]
    InvalidAdjustment(String),
    #[error("'{0}' is not a date, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("'{0}' is not a month, expected YYYY-MM")]
    InvalidMonth(String),
    #[error("student name must not be empty")]
    EmptyName,
    #[error("no student named '{0}'")]
    UnknownStudent(String),
    #[error("no session '{0}'")]
    UnknownSession(String),
}
