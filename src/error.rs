//! Error types for the SoulCast core
//!
//! Every failure in this crate degrades to a user-visible message and a safe
//! default state; nothing here is fatal to the process.

use thiserror::Error;

use crate::location::LocationError;

/// SoulCast core errors
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Capture device denied or absent
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// No position fix (permission denied, no fix, or timeout)
    #[error("Location unavailable: {0}")]
    LocationUnavailable(#[from] LocationError),

    /// Stored JSON under a key could not be decoded
    #[error("Stored data under '{key}' is unreadable: {reason}")]
    PersistenceCorrupt { key: String, reason: String },

    /// Lookup of an identifier that does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Already friends with {0}")]
    AlreadyFriends(String),

    #[error("Invalid friend code: {0:?}")]
    InvalidFriendCode(String),

    #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Invalid emotion selection: {0}")]
    InvalidEmotions(String),

    #[error("Response content is empty")]
    EmptyResponse,

    #[error("Unknown notification category: {0}")]
    UnknownNotificationCategory(String),

    /// File system I/O error
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Check if the user can recover by retrying or correcting input
    ///
    /// I/O failures on the data directory usually need intervention outside
    /// the application; everything else is retried by repeating the action.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Io(_))
    }

    /// Get a user-friendly description of the error
    pub fn user_message(&self) -> String {
        match self {
            Error::DeviceUnavailable(_) => {
                "Failed to access microphone. Please check your permissions.".to_string()
            }
            Error::LocationUnavailable(e) => e.user_message().to_string(),
            Error::PersistenceCorrupt { .. } => {
                "Saved data could not be read and was reset.".to_string()
            }
            Error::NotFound { kind, .. } => format!("{} not found.", kind),
            Error::AlreadyFriends(_) => "Already friends with this user".to_string(),
            Error::InvalidFriendCode(_) => "That friend code is not valid.".to_string(),
            Error::InvalidCoordinate { .. } => {
                "Cannot share story. Please try again.".to_string()
            }
            Error::InvalidEmotions(reason) => format!("Please adjust your emotions: {}", reason),
            Error::EmptyResponse => "Please write a response first.".to_string(),
            Error::UnknownNotificationCategory(_) => "Unknown notification type.".to_string(),
            Error::Io(_) => "File system error occurred.".to_string(),
            Error::Serialization(_) => "Failed to save your data.".to_string(),
        }
    }
}

/// Result type alias for SoulCast operations
pub type Result<T> = std::result::Result<T, Error>;
