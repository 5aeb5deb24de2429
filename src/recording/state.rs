use serde::{Deserialize, Serialize};

/// Where a recording session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// Initial and terminal state; an artifact may be waiting to be read
    Inactive,
    Recording,
    Paused,
}

impl RecordingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingState::Inactive => "inactive",
            RecordingState::Recording => "recording",
            RecordingState::Paused => "paused",
        }
    }

    /// Whether the capture device is held in this state
    pub fn holds_device(&self) -> bool {
        !matches!(self, RecordingState::Inactive)
    }
}

/// Outcome of a requested transition
///
/// Requests made from the wrong state are ignored rather than treated as
/// errors; the session is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// Format elapsed seconds as `m:ss`
pub fn format_elapsed(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
