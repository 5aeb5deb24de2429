use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// Something a capture stream reports to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A block of encoded audio, in arrival order
    Chunk(Vec<u8>),
    /// The stream has finished; no further chunks follow
    Ended,
}

/// Configuration passed to a capture device on acquisition
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// How often the device pulls audio from its source, in milliseconds
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            buffer_duration_ms: 100, // 100ms buffers
        }
    }
}

/// An acquired capture stream together with its event channel
pub struct Capture {
    pub stream: Box<dyn CaptureStream>,
    pub events: mpsc::UnboundedReceiver<CaptureEvent>,
}

/// Audio capture device
///
/// Implementations:
/// - `WavFileDevice`: plays a WAV file back as if it were a microphone
/// - test doubles that script chunks, denials and early termination
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request exclusive access to the device
    ///
    /// Fails with `Error::DeviceUnavailable` if access is denied or the
    /// device is absent. On success the device stays reserved until the
    /// returned stream is released.
    async fn acquire(&self, config: &CaptureConfig) -> Result<Capture>;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// A running capture on an acquired device
#[async_trait]
pub trait CaptureStream: Send {
    /// Container format of the emitted chunks
    fn mime_type(&self) -> &str;

    /// Stop pulling audio without releasing the device
    fn pause(&mut self);

    /// Continue pulling audio after `pause`
    fn resume(&mut self);

    /// Finish capturing
    ///
    /// Every chunk not yet emitted is flushed to the event channel, followed
    /// by `CaptureEvent::Ended`, before this returns.
    async fn stop(&mut self) -> Result<()>;

    /// Give the device back. Owners call this exactly once per acquisition.
    fn release(&mut self);
}
