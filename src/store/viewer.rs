use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::backend::StorageBackend;
use super::load_json;
use crate::error::{Error, Result};
use crate::models::{Notification, NotificationKind, Viewer};

const FRIEND_ADDED_MESSAGE: &str = "New friend added!";

/// The local viewer, created on first use
pub struct ViewerStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
    viewer: Viewer,
    load_error: Option<Error>,
}

impl ViewerStore {
    /// Load the stored viewer, or create and save a new one if there is none
    /// or it is malformed
    ///
    /// A backend read failure is returned without creating anything.
    pub fn load_or_create(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let (viewer, load_error) = load_json::<Viewer>(backend.as_ref(), &key)?;

        match viewer {
            Some(viewer) => {
                info!("Loaded viewer {} from '{}'", viewer.username, key);
                Ok(Self {
                    backend,
                    key,
                    viewer,
                    load_error,
                })
            }
            None => {
                let viewer = Viewer::generate();
                info!(
                    "Created anonymous viewer {} (friend code {})",
                    viewer.username, viewer.friend_code
                );

                let store = Self {
                    backend,
                    key,
                    viewer,
                    load_error,
                };
                store.save()?;
                Ok(store)
            }
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Why the stored viewer could not be read, if it couldn't
    pub fn load_error(&self) -> Option<&Error> {
        self.load_error.as_ref()
    }

    pub fn unread_count(&self) -> usize {
        self.viewer.unread_count()
    }

    /// Add a friend by their code
    ///
    /// Codes are not checked against any directory. Re-adding an existing
    /// friend is rejected and changes nothing.
    pub fn add_friend(&mut self, code: &str) -> Result<()> {
        let code = code.trim();

        if code.is_empty() || code == self.viewer.friend_code {
            return Err(Error::InvalidFriendCode(code.to_string()));
        }

        if self.viewer.is_friend(code) {
            warn!("Already friends with {}", code);
            return Err(Error::AlreadyFriends(code.to_string()));
        }

        self.viewer.friends.push(code.to_string());
        self.viewer
            .notifications
            .push(Notification::new(NotificationKind::FriendAccepted, FRIEND_ADDED_MESSAGE));

        if let Err(e) = self.save() {
            self.viewer.friends.pop();
            self.viewer.notifications.pop();
            return Err(e);
        }

        info!("Friend {} added ({} total)", code, self.viewer.friends.len());

        Ok(())
    }

    pub fn mark_notification_read(&mut self, id: Uuid) -> Result<()> {
        let index = self
            .viewer
            .notifications
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| Error::not_found("Notification", id))?;

        if self.viewer.notifications[index].read {
            return Ok(());
        }

        self.viewer.notifications[index].read = true;

        if let Err(e) = self.save() {
            self.viewer.notifications[index].read = false;
            return Err(e);
        }

        Ok(())
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string(&self.viewer)?;
        self.backend.set(&self.key, &json)
    }
}
