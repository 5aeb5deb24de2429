//! Persisted collections
//!
//! Two independent JSON values live in a `StorageBackend`: the record
//! collection and the local viewer. Each store loads its value once when it
//! is created and writes it back after every mutation.
//!
//! A missing value loads as empty/default. Malformed content is recovered to
//! empty/default as well; the failure is logged and kept as a soft error the
//! caller can surface. A backend that fails to read fails the load.

mod backend;
mod records;
mod viewer;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use records::RecordStore;
pub use viewer::ViewerStore;

use serde::de::DeserializeOwned;
use tracing::error;

use crate::error::{Error, Result};

pub const DEFAULT_RECORDS_KEY: &str = "soulcast-stories";
pub const DEFAULT_VIEWER_KEY: &str = "soulcast-user";

/// Read and decode the value under `key`
///
/// Content that cannot be decoded comes back as the second element alongside
/// `None`. A backend that cannot be read at all is a hard error, so nothing
/// gets written over a value that may still be intact.
fn load_json<T: DeserializeOwned>(
    backend: &dyn StorageBackend,
    key: &str,
) -> Result<(Option<T>, Option<Error>)> {
    let raw = match backend.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Ok((None, None)),
        Err(e @ Error::PersistenceCorrupt { .. }) => {
            error!("Stored data under '{}' is unreadable, starting fresh: {}", key, e);
            return Ok((None, Some(e)));
        }
        Err(e) => {
            error!("Failed to read '{}': {}", key, e);
            return Err(e);
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok((Some(value), None)),
        Err(e) => {
            error!("Stored data under '{}' is unreadable, starting fresh: {}", key, e);
            Ok((
                None,
                Some(Error::PersistenceCorrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            ))
        }
    }
}
