//! Capture device boundary
//!
//! A device is acquired once per recording attempt and hands back a stream
//! plus an event channel of encoded chunks. The owner pauses, resumes and
//! stops the stream, and releases the device exactly once.

pub mod backend;
pub mod file;

pub use backend::{Capture, CaptureConfig, CaptureDevice, CaptureEvent, CaptureStream};
pub use file::{WavFileDevice, WAV_MIME_TYPE};
