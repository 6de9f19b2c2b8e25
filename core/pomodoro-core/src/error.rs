//! Error taxonomy for pomodoro-core operations (spec §7).
//!
//! Keep the variant set matching the spec's four surfaced error domains
//! exactly: `StateConflict`, `NotFound`, `Store`, `Parse`. `Hook` failures are
//! swallowed by design (§4.G) and never become a `PomodoroError`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PomodoroError {
    #[error("{0}")]
    StateConflict(String),

    #[error("no active session")]
    NotFound,

    #[error("store error: {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("store error: {0}")]
    StoreMessage(String),

    #[error("config error: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("invalid template: {0}")]
    InvalidTemplate(String),
}

pub type Result<T> = std::result::Result<T, PomodoroError>;

impl PomodoroError {
    /// Whether this is a Parse-class error per spec §7 (exit code 2).
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            PomodoroError::InvalidDuration { .. } | PomodoroError::InvalidTemplate(_)
        )
    }

    /// Whether this is the NotFound no-op per spec §7 (exit code 0).
    pub fn is_not_found(&self) -> bool {
        matches!(self, PomodoroError::NotFound)
    }
}

impl From<rusqlite::Error> for PomodoroError {
    fn from(source: rusqlite::Error) -> Self {
        PomodoroError::Store {
            context: "sqlite operation failed".to_string(),
            source,
        }
    }
}
