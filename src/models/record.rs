use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::emotion::Emotion;
use crate::geo::{Coordinate, Located};

/// Author id used for everything created locally
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// Display name shown when an author has none
pub const ANONYMOUS_NAME: &str = "Anonymous Soul";

/// A geotagged audio memo
///
/// Immutable once created, except that responses are appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: Uuid,

    /// Locator of the stored audio artifact
    pub audio_url: String,

    pub location: Coordinate,

    #[serde(default)]
    pub emotions: Vec<Emotion>,

    /// When the record was created, at the millisecond precision it is stored with
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Recording length in seconds
    pub duration: u64,

    pub user_id: String,

    #[serde(default)]
    pub anonymous_name: Option<String>,

    #[serde(default)]
    pub responses: Vec<Response>,
}

impl Record {
    pub fn new(
        audio_url: String,
        location: Coordinate,
        emotions: Vec<Emotion>,
        duration: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            audio_url,
            location,
            emotions,
            timestamp: Utc::now().trunc_subsecs(3),
            duration,
            user_id: ANONYMOUS_USER_ID.to_string(),
            anonymous_name: Some(ANONYMOUS_NAME.to_string()),
            responses: Vec::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.anonymous_name.as_deref().unwrap_or(ANONYMOUS_NAME)
    }
}

impl Located for Record {
    fn location(&self) -> Coordinate {
        self.location
    }
}

/// A reply attached to exactly one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: Uuid,

    /// The record this responds to
    #[serde(rename = "storyId")]
    pub record_id: Uuid,

    pub content: String,

    /// Whether `content` refers to an audio reply rather than text
    #[serde(default)]
    pub is_audio: bool,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    pub user_id: String,

    #[serde(default)]
    pub anonymous_name: Option<String>,
}

impl Response {
    pub fn new(record_id: Uuid, content: String, is_audio: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_id,
            content,
            is_audio,
            timestamp: Utc::now().trunc_subsecs(3),
            user_id: ANONYMOUS_USER_ID.to_string(),
            anonymous_name: Some(ANONYMOUS_NAME.to_string()),
        }
    }

    pub fn display_name(&self) -> &str {
        self.anonymous_name.as_deref().unwrap_or(ANONYMOUS_NAME)
    }
}
