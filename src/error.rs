//! Driver errors

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DriverError {
    /// The tool could not be started or its main window never matched.
    #[error("failed to launch INM: {0}")]
    Launch(String),

    #[error("INM is not running (call launch first)")]
    NotLaunched,

    #[error("window not found: {0}")]
    WindowNotFound(String),

    #[error("control not found: {role} {label:?} in {window}")]
    ControlNotFound {
        window: String,
        role: String,
        label: String,
    },

    /// The backend found several candidates or none close enough to the requested label.
    #[error("best match failed: {0}")]
    MatchFailed(String),

    #[error("{item:?} not found in list (items: {listing:?})")]
    ItemNotFound { item: String, listing: Vec<String> },

    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: Box<DriverError>,
    },

    #[error("automation host protocol error: {0}")]
    Protocol(String),

    #[error("automation host error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Lookup failures that closing all windows and retrying can recover from.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DriverError::WindowNotFound(_)
                | DriverError::ControlNotFound { .. }
                | DriverError::MatchFailed(_)
        )
    }

    /// Errors that leave no known-good state to return to; a batch must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Launch(_) | DriverError::NotLaunched)
    }

    /// Short name of the variant, printed alongside the message in retry diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            DriverError::Launch(_) => "Launch",
            DriverError::NotLaunched => "NotLaunched",
            DriverError::WindowNotFound(_) => "WindowNotFound",
            DriverError::ControlNotFound { .. } => "ControlNotFound",
            DriverError::MatchFailed(_) => "MatchFailed",
            DriverError::ItemNotFound { .. } => "ItemNotFound",
            DriverError::Timeout { .. } => "Timeout",
            DriverError::InvalidOptions(_) => "InvalidOptions",
            DriverError::RetriesExhausted { .. } => "RetriesExhausted",
            DriverError::Protocol(_) => "Protocol",
            DriverError::Backend(_) => "Backend",
            DriverError::Io(_) => "Io",
        }
    }
}
