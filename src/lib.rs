pub mod audio;
pub mod config;
pub mod error;
pub mod geo;
pub mod location;
pub mod models;
pub mod recording;
pub mod store;

pub use audio::{CaptureConfig, CaptureDevice, CaptureStream, WavFileDevice};
pub use config::Config;
pub use error::{Error, Result};
pub use geo::{haversine_km, Coordinate, Nearby, ProximityIndex};
pub use location::{locate, FixedLocation, LocationError, LocationProvider};
pub use models::{Emotion, Notification, NotificationKind, Record, Response, Viewer};
pub use recording::{format_elapsed, AudioArtifact, RecordingSession, RecordingState, Transition};
pub use store::{FileBackend, MemoryBackend, RecordStore, StorageBackend, ViewerStore};
