//! Persisted data model
//!
//! JSON field names are camelCase and timestamps are epoch milliseconds so
//! stored collections stay readable by earlier versions of the app.

mod emotion;
mod record;
mod viewer;

pub use emotion::{Emotion, MAX_EMOTIONS};
pub use record::{Record, Response, ANONYMOUS_NAME, ANONYMOUS_USER_ID};
pub use viewer::{Notification, NotificationKind, Viewer, WELCOME_MESSAGE};
