use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

pub const WELCOME_MESSAGE: &str = "Welcome to SoulCast! Your anonymous stories await.";

const FRIEND_CODE_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Notification categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    NewStory,
    NewResponse,
    FriendRequest,
    FriendAccepted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewStory => "new-story",
            NotificationKind::NewResponse => "new-response",
            NotificationKind::FriendRequest => "friend-request",
            NotificationKind::FriendAccepted => "friend-accepted",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new-story" => Ok(NotificationKind::NewStory),
            "new-response" => Ok(NotificationKind::NewResponse),
            "friend-request" => Ok(NotificationKind::FriendRequest),
            "friend-accepted" => Ok(NotificationKind::FriendAccepted),
            other => Err(Error::UnknownNotificationCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub kind: NotificationKind,

    pub message: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    pub read: bool,

    /// Record or viewer the notification points at, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<Uuid>,
}

impl Notification {
    /// A new, unread notification
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            timestamp: Utc::now().trunc_subsecs(3),
            read: false,
            related_id: None,
        }
    }
}

/// The anonymous identity of this installation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub id: Uuid,

    /// Generated display name, e.g. `Soul4821`
    pub username: String,

    /// Shareable code others use to add this viewer, e.g. `k3x9-a0qz`
    pub friend_code: String,

    /// Friend codes, in the order they were added
    #[serde(default)]
    pub friends: Vec<String>,

    #[serde(default)]
    pub notifications: Vec<Notification>,
}

impl Viewer {
    /// Create a fresh viewer with a generated name, a friend code and an
    /// unread welcome notification
    pub fn generate() -> Self {
        let id = Uuid::new_v4();
        let seed = *Uuid::new_v4().as_bytes();

        Self {
            id,
            username: generate_username(&seed),
            friend_code: generate_friend_code(&seed),
            friends: Vec::new(),
            notifications: vec![Notification::new(NotificationKind::NewStory, WELCOME_MESSAGE)],
        }
    }

    pub fn is_friend(&self, code: &str) -> bool {
        self.friends.iter().any(|friend| friend == code)
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }
}

// bytes 6 and 8 of a v4 uuid carry version/variant bits, so only the
// remaining bytes are used as randomness
fn generate_username(seed: &[u8; 16]) -> String {
    let n = u16::from_le_bytes([seed[0], seed[1]]) % 10_000;
    format!("Soul{}", n)
}

fn generate_friend_code(seed: &[u8; 16]) -> String {
    let code: String = [2, 3, 4, 5, 9, 10, 11, 12]
        .iter()
        .map(|&i| FRIEND_CODE_ALPHABET[(seed[i] % 36) as usize] as char)
        .collect();

    format!("{}-{}", &code[..4], &code[4..])
}
