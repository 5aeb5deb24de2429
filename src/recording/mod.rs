//! Recording session management
//!
//! This module provides the `RecordingSession` state machine that manages:
//! - Acquiring and releasing the capture device
//! - Accumulating encoded chunks while recording or paused
//! - Elapsed-time bookkeeping that excludes paused time
//! - Assembling the finished `AudioArtifact`

mod artifact;
mod session;
mod state;

pub use artifact::AudioArtifact;
pub use session::RecordingSession;
pub use state::{format_elapsed, RecordingState, Transition};
