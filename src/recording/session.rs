use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::artifact::AudioArtifact;
use super::state::{RecordingState, Transition};
use crate::audio::{Capture, CaptureConfig, CaptureDevice, CaptureEvent};
use crate::error::{Error, Result};

/// Recording time accumulated across segments, excluding pauses
#[derive(Debug, Default)]
struct ElapsedClock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl ElapsedClock {
    fn run(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn freeze(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn elapsed(&self) -> Duration {
        self.accumulated + self.running_since.map(|since| since.elapsed()).unwrap_or_default()
    }
}

/// Capture state machine for one recording attempt
///
/// `Inactive → Recording ⇄ Paused → Inactive (with artifact)`. Requests from
/// the wrong state return `Transition::Ignored` and change nothing.
///
/// The session must be driven from within a Tokio runtime: the elapsed-time
/// ticker is a spawned task. Exactly one device acquisition per
/// `start`/`stop` cycle is paired with exactly one release, including when
/// the device ends the stream itself or the session is dropped mid-capture.
pub struct RecordingSession {
    device: Arc<dyn CaptureDevice>,
    config: CaptureConfig,
    state: RecordingState,
    capture: Option<Capture>,
    chunks: Vec<Vec<u8>>,
    clock: ElapsedClock,
    ticker: Option<JoinHandle<()>>,
    elapsed_tx: Arc<watch::Sender<u64>>,
    artifact: Option<AudioArtifact>,
}

impl RecordingSession {
    pub fn new(device: Arc<dyn CaptureDevice>, config: CaptureConfig) -> Self {
        let (elapsed_tx, _) = watch::channel(0);

        Self {
            device,
            config,
            state: RecordingState::Inactive,
            capture: None,
            chunks: Vec::new(),
            clock: ElapsedClock::default(),
            ticker: None,
            elapsed_tx: Arc::new(elapsed_tx),
            artifact: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Whole seconds spent in `Recording`, excluding pauses
    pub fn elapsed_secs(&self) -> u64 {
        self.clock.elapsed().as_secs()
    }

    /// The finished recording, available once stopped and until cleared
    pub fn artifact(&self) -> Option<&AudioArtifact> {
        self.artifact.as_ref()
    }

    /// Elapsed seconds, updated once per second while recording and on
    /// every transition
    pub fn subscribe_elapsed(&self) -> watch::Receiver<u64> {
        self.elapsed_tx.subscribe()
    }

    /// Acquire the capture device and begin recording
    ///
    /// Only valid from `Inactive` with no pending artifact. A denied or
    /// absent device yields `Error::DeviceUnavailable` and leaves the session
    /// untouched. Dropping the returned future before the device answers
    /// leaves the session `Inactive`.
    pub async fn start(&mut self) -> Result<Transition> {
        self.poll_device();

        if self.state != RecordingState::Inactive || self.artifact.is_some() {
            warn!(
                "Ignoring start: session is {}{}",
                self.state.as_str(),
                if self.artifact.is_some() { " with a pending recording" } else { "" }
            );
            return Ok(Transition::Ignored);
        }

        info!("Requesting capture device: {}", self.device.name());

        let capture = self.device.acquire(&self.config).await.map_err(|e| {
            error!("Failed to acquire capture device {}: {}", self.device.name(), e);
            match e {
                Error::DeviceUnavailable(_) => e,
                other => Error::DeviceUnavailable(other.to_string()),
            }
        })?;

        self.chunks.clear();
        self.clock.reset();
        self.capture = Some(capture);
        self.state = RecordingState::Recording;
        self.clock.run();
        self.start_ticker();
        self.publish_elapsed();

        info!("Recording started on {}", self.device.name());

        Ok(Transition::Applied)
    }

    /// Freeze the elapsed counter; the device stays reserved
    pub fn pause(&mut self) -> Transition {
        self.poll_device();

        if self.state != RecordingState::Recording {
            warn!("Ignoring pause: session is {}", self.state.as_str());
            return Transition::Ignored;
        }

        if let Some(capture) = self.capture.as_mut() {
            capture.stream.pause();
        }

        self.stop_ticker();
        self.clock.freeze();
        self.state = RecordingState::Paused;
        self.publish_elapsed();

        info!("Recording paused at {}s", self.elapsed_secs());

        Transition::Applied
    }

    /// Continue recording; the elapsed counter carries on from where it froze
    pub fn resume(&mut self) -> Transition {
        self.poll_device();

        if self.state != RecordingState::Paused {
            warn!("Ignoring resume: session is {}", self.state.as_str());
            return Transition::Ignored;
        }

        if let Some(capture) = self.capture.as_mut() {
            capture.stream.resume();
        }

        self.state = RecordingState::Recording;
        self.clock.run();
        self.start_ticker();

        info!("Recording resumed at {}s", self.elapsed_secs());

        Transition::Applied
    }

    /// Finish recording and assemble the artifact
    ///
    /// Valid from `Recording` or `Paused`. The elapsed value is kept.
    pub async fn stop(&mut self) -> Transition {
        if !self.state.holds_device() {
            warn!("Ignoring stop: session is {}", self.state.as_str());
            return Transition::Ignored;
        }

        // the device may have ended the stream on its own already
        if self.poll_device().holds_device() {
            // time spent flushing the device is not recording time
            self.stop_ticker();
            self.clock.freeze();

            if let Some(capture) = self.capture.as_mut() {
                if let Err(e) = capture.stream.stop().await {
                    error!("Capture stream did not stop cleanly: {}", e);
                }
            }
            self.finalize();
        }

        Transition::Applied
    }

    /// Discard the artifact and reset the elapsed counter
    ///
    /// Only valid from `Inactive`; repeated calls are harmless.
    pub fn clear(&mut self) -> Transition {
        self.poll_device();

        if self.state != RecordingState::Inactive {
            warn!("Ignoring clear: session is {}", self.state.as_str());
            return Transition::Ignored;
        }

        if let Some(artifact) = self.artifact.take() {
            debug!(
                "Discarding recording {} ({} bytes)",
                artifact.id(),
                artifact.len()
            );
        }

        self.chunks.clear();
        self.clock.reset();
        self.publish_elapsed();

        Transition::Applied
    }

    /// Move the artifact out of the session, leaving it cleared
    pub fn take_artifact(&mut self) -> Option<AudioArtifact> {
        self.poll_device();

        if self.state != RecordingState::Inactive {
            return None;
        }

        let artifact = self.artifact.take()?;
        self.clock.reset();
        self.publish_elapsed();

        Some(artifact)
    }

    /// Collect chunks the device has emitted so far
    ///
    /// If the device ended the stream by itself the session is finalized here,
    /// exactly as `stop` would.
    pub fn poll_device(&mut self) -> RecordingState {
        let ended = match self.capture.as_mut() {
            Some(capture) => drain_events(&mut capture.events, &mut self.chunks),
            None => return self.state,
        };

        if ended {
            warn!(
                "Capture device {} ended the stream while {}",
                self.device.name(),
                self.state.as_str()
            );
            self.finalize();
        }

        self.state
    }

    fn finalize(&mut self) {
        self.stop_ticker();
        self.clock.freeze();

        if let Some(mut capture) = self.capture.take() {
            drain_events(&mut capture.events, &mut self.chunks);

            let mime_type = capture.stream.mime_type().to_string();
            capture.stream.release();

            let chunks = std::mem::take(&mut self.chunks);
            let artifact = AudioArtifact::from_chunks(chunks, mime_type, self.elapsed_secs());

            info!(
                "Recording stopped: {}s, {} bytes ({})",
                artifact.duration_secs(),
                artifact.len(),
                artifact.mime_type()
            );

            self.artifact = Some(artifact);
        }

        self.state = RecordingState::Inactive;
        self.publish_elapsed();
    }

    fn start_ticker(&mut self) {
        self.stop_ticker();

        let Some(since) = self.clock.running_since else {
            return;
        };
        let base = self.clock.accumulated;
        let tx = Arc::clone(&self.elapsed_tx);

        // tick on whole-second boundaries of the total, not of this segment
        let one_second = Duration::from_secs(1);
        let first = since + (one_second - Duration::from_nanos(base.subsec_nanos() as u64));

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(first, one_second);
            loop {
                interval.tick().await;
                tx.send_replace((base + since.elapsed()).as_secs());
            }
        }));
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn publish_elapsed(&self) {
        self.elapsed_tx.send_replace(self.elapsed_secs());
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.stop_ticker();

        if let Some(mut capture) = self.capture.take() {
            warn!(
                "Recording session dropped while {}; releasing device",
                self.state.as_str()
            );
            capture.stream.release();
        }
    }
}

/// Move pending chunks into `chunks`; returns true once the stream has ended
fn drain_events(events: &mut UnboundedReceiver<CaptureEvent>, chunks: &mut Vec<Vec<u8>>) -> bool {
    loop {
        match events.try_recv() {
            Ok(CaptureEvent::Chunk(bytes)) => {
                if !bytes.is_empty() {
                    chunks.push(bytes);
                }
            }
            Ok(CaptureEvent::Ended) | Err(TryRecvError::Disconnected) => return true,
            Err(TryRecvError::Empty) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::CaptureStream;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc::{self, UnboundedSender};
    use tokio::time::sleep;

    #[derive(Default)]
    struct Counters {
        acquired: AtomicUsize,
        released: AtomicUsize,
        paused: AtomicUsize,
        resumed: AtomicUsize,
    }

    impl Counters {
        fn get(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    /// Device that emits a fixed set of chunks when stopped
    struct ScriptedDevice {
        deny: bool,
        chunks_on_stop: Vec<Vec<u8>>,
        stop_delay: Duration,
        counters: Arc<Counters>,
        live: Arc<Mutex<Option<UnboundedSender<CaptureEvent>>>>,
    }

    impl ScriptedDevice {
        fn new(chunks_on_stop: Vec<Vec<u8>>) -> Self {
            Self {
                deny: false,
                chunks_on_stop,
                stop_delay: Duration::ZERO,
                counters: Arc::new(Counters::default()),
                live: Arc::new(Mutex::new(None)),
            }
        }

        fn denied() -> Self {
            Self {
                deny: true,
                ..Self::new(Vec::new())
            }
        }

        /// Device that takes `delay` to flush when stopped
        fn slow_to_stop(chunks_on_stop: Vec<Vec<u8>>, delay: Duration) -> Self {
            Self {
                stop_delay: delay,
                ..Self::new(chunks_on_stop)
            }
        }

        /// Push an event as if the device produced it
        fn emit(&self, event: CaptureEvent) {
            let live = self.live.lock().unwrap();
            live.as_ref().unwrap().send(event).unwrap();
        }
    }

    struct ScriptedStream {
        tx: UnboundedSender<CaptureEvent>,
        chunks_on_stop: Vec<Vec<u8>>,
        stop_delay: Duration,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl CaptureDevice for ScriptedDevice {
        async fn acquire(&self, _config: &CaptureConfig) -> Result<Capture> {
            if self.deny {
                return Err(Error::DeviceUnavailable("permission denied".to_string()));
            }

            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            let (tx, events) = mpsc::unbounded_channel();
            *self.live.lock().unwrap() = Some(tx.clone());

            Ok(Capture {
                stream: Box::new(ScriptedStream {
                    tx,
                    chunks_on_stop: self.chunks_on_stop.clone(),
                    stop_delay: self.stop_delay,
                    counters: Arc::clone(&self.counters),
                }),
                events,
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[async_trait]
    impl CaptureStream for ScriptedStream {
        fn mime_type(&self) -> &str {
            "audio/webm"
        }

        fn pause(&mut self) {
            self.counters.paused.fetch_add(1, Ordering::SeqCst);
        }

        fn resume(&mut self) {
            self.counters.resumed.fetch_add(1, Ordering::SeqCst);
        }

        async fn stop(&mut self) -> Result<()> {
            sleep(self.stop_delay).await;
            for chunk in self.chunks_on_stop.drain(..) {
                let _ = self.tx.send(CaptureEvent::Chunk(chunk));
            }
            let _ = self.tx.send(CaptureEvent::Ended);
            Ok(())
        }

        fn release(&mut self) {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn session_with(device: &Arc<ScriptedDevice>) -> RecordingSession {
        let device: Arc<dyn CaptureDevice> = device.clone();
        RecordingSession::new(device, CaptureConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_produces_artifact() {
        let device = Arc::new(ScriptedDevice::new(vec![vec![3, 4], vec![5]]));
        let mut session = session_with(&device);

        assert_eq!(session.start().await.unwrap(), Transition::Applied);
        assert_eq!(session.state(), RecordingState::Recording);

        device.emit(CaptureEvent::Chunk(vec![1, 2]));
        sleep(Duration::from_millis(2200)).await;

        assert_eq!(session.stop().await, Transition::Applied);
        assert_eq!(session.state(), RecordingState::Inactive);

        let artifact = session.artifact().expect("artifact after stop");
        assert_eq!(artifact.bytes(), &[1, 2, 3, 4, 5]);
        assert_eq!(artifact.duration_secs(), 2);
        assert_eq!(artifact.mime_type(), "audio/webm");
        assert_eq!(session.elapsed_secs(), 2, "elapsed is retained after stop");

        assert_eq!(Counters::get(&device.counters.acquired), 1);
        assert_eq!(Counters::get(&device.counters.released), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_flush_is_not_recorded_time() {
        let device = Arc::new(ScriptedDevice::slow_to_stop(vec![vec![7]], Duration::from_secs(3)));
        let mut session = session_with(&device);
        let elapsed = session.subscribe_elapsed();

        session.start().await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        session.stop().await;

        assert_eq!(session.elapsed_secs(), 1);
        assert_eq!(*elapsed.borrow(), 1);
        assert_eq!(session.artifact().unwrap().duration_secs(), 1);
        assert_eq!(session.artifact().unwrap().bytes(), &[7]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_excludes_paused_time() {
        let device = Arc::new(ScriptedDevice::new(Vec::new()));
        let mut session = session_with(&device);

        session.start().await.unwrap();
        sleep(Duration::from_millis(2500)).await;

        assert_eq!(session.pause(), Transition::Applied);
        assert_eq!(session.elapsed_secs(), 2);
        sleep(Duration::from_secs(10)).await;
        assert_eq!(session.elapsed_secs(), 2, "paused time is not counted");

        assert_eq!(session.resume(), Transition::Applied);
        sleep(Duration::from_millis(1700)).await;

        session.stop().await;
        assert_eq!(session.elapsed_secs(), 4);
        assert_eq!(session.artifact().unwrap().duration_secs(), 4);

        assert_eq!(Counters::get(&device.counters.paused), 1);
        assert_eq!(Counters::get(&device.counters.resumed), 1);
        assert_eq!(Counters::get(&device.counters.released), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_ticker_publishes_seconds() {
        let device = Arc::new(ScriptedDevice::new(Vec::new()));
        let mut session = session_with(&device);
        let elapsed = session.subscribe_elapsed();

        session.start().await.unwrap();
        sleep(Duration::from_millis(3500)).await;
        assert_eq!(*elapsed.borrow(), 3);

        session.pause();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(*elapsed.borrow(), 3);

        session.resume();
        sleep(Duration::from_millis(600)).await;
        assert_eq!(*elapsed.borrow(), 4, "ticks on whole seconds of the total");
    }

    #[tokio::test]
    async fn test_second_stop_is_ignored() {
        let device = Arc::new(ScriptedDevice::new(vec![vec![9]]));
        let mut session = session_with(&device);

        session.start().await.unwrap();
        assert_eq!(session.stop().await, Transition::Applied);
        assert_eq!(session.stop().await, Transition::Ignored);

        assert_eq!(Counters::get(&device.counters.released), 1);
        assert_eq!(session.artifact().unwrap().bytes(), &[9]);
    }

    #[tokio::test]
    async fn test_denied_device_leaves_session_inactive() {
        let device = Arc::new(ScriptedDevice::denied());
        let mut session = session_with(&device);

        let err = session.start().await.unwrap_err();
        assert!(matches!(err, Error::DeviceUnavailable(_)));
        assert_eq!(session.state(), RecordingState::Inactive);
        assert!(session.artifact().is_none());
        assert_eq!(session.elapsed_secs(), 0);
        assert_eq!(Counters::get(&device.counters.acquired), 0);
        assert_eq!(Counters::get(&device.counters.released), 0);
    }

    #[tokio::test]
    async fn test_invalid_transitions_are_ignored() {
        let device = Arc::new(ScriptedDevice::new(Vec::new()));
        let mut session = session_with(&device);

        assert_eq!(session.pause(), Transition::Ignored);
        assert_eq!(session.resume(), Transition::Ignored);
        assert_eq!(session.stop().await, Transition::Ignored);
        assert_eq!(session.state(), RecordingState::Inactive);

        session.start().await.unwrap();
        assert_eq!(session.start().await.unwrap(), Transition::Ignored);
        assert_eq!(session.resume(), Transition::Ignored);
        assert_eq!(session.clear(), Transition::Ignored);
        assert_eq!(session.state(), RecordingState::Recording);

        session.pause();
        assert_eq!(session.pause(), Transition::Ignored);
        assert_eq!(session.clear(), Transition::Ignored);
        assert_eq!(session.state(), RecordingState::Paused);

        assert_eq!(Counters::get(&device.counters.acquired), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_discards_artifact_and_allows_restart() {
        let device = Arc::new(ScriptedDevice::new(vec![vec![0u8; 4096]]));
        let mut session = session_with(&device);

        session.start().await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        session.stop().await;

        assert_eq!(
            session.start().await.unwrap(),
            Transition::Ignored,
            "a pending artifact blocks a new start"
        );

        assert_eq!(session.clear(), Transition::Applied);
        assert_eq!(session.state(), RecordingState::Inactive);
        assert!(session.artifact().is_none());
        assert_eq!(session.elapsed_secs(), 0);
        assert_eq!(session.clear(), Transition::Applied, "clear is idempotent");

        assert_eq!(session.start().await.unwrap(), Transition::Applied);
        assert_eq!(Counters::get(&device.counters.acquired), 2);
    }

    #[tokio::test]
    async fn test_take_artifact_leaves_session_cleared() {
        let device = Arc::new(ScriptedDevice::new(vec![vec![7, 7]]));
        let mut session = session_with(&device);

        session.start().await.unwrap();
        assert!(session.take_artifact().is_none(), "nothing to take while recording");
        session.stop().await;

        let artifact = session.take_artifact().unwrap();
        assert_eq!(artifact.bytes(), &[7, 7]);
        assert!(session.artifact().is_none());
        assert_eq!(session.start().await.unwrap(), Transition::Applied);
    }

    #[tokio::test]
    async fn test_device_ending_stream_finalizes_session() {
        let device = Arc::new(ScriptedDevice::new(Vec::new()));
        let mut session = session_with(&device);

        session.start().await.unwrap();
        device.emit(CaptureEvent::Chunk(vec![1]));
        device.emit(CaptureEvent::Chunk(vec![2]));
        device.emit(CaptureEvent::Ended);

        assert_eq!(session.poll_device(), RecordingState::Inactive);
        assert_eq!(session.artifact().unwrap().bytes(), &[1, 2]);
        assert_eq!(Counters::get(&device.counters.released), 1);

        assert_eq!(session.stop().await, Transition::Ignored);
        assert_eq!(Counters::get(&device.counters.released), 1);
    }

    #[tokio::test]
    async fn test_device_ending_while_paused_is_noticed_on_resume() {
        let device = Arc::new(ScriptedDevice::new(Vec::new()));
        let mut session = session_with(&device);

        session.start().await.unwrap();
        session.pause();
        device.emit(CaptureEvent::Ended);

        assert_eq!(session.resume(), Transition::Ignored);
        assert_eq!(session.state(), RecordingState::Inactive);
        assert!(session.artifact().is_some());
        assert_eq!(Counters::get(&device.counters.released), 1);
    }

    #[tokio::test]
    async fn test_dropping_active_session_releases_device() {
        let device = Arc::new(ScriptedDevice::new(Vec::new()));

        {
            let mut session = session_with(&device);
            session.start().await.unwrap();
            session.pause();
        }

        assert_eq!(Counters::get(&device.counters.acquired), 1);
        assert_eq!(Counters::get(&device.counters.released), 1);
    }

    #[tokio::test]
    async fn test_empty_chunks_are_skipped() {
        let device = Arc::new(ScriptedDevice::new(vec![vec![], vec![1], vec![]]));
        let mut session = session_with(&device);

        session.start().await.unwrap();
        session.stop().await;

        assert_eq!(session.artifact().unwrap().bytes(), &[1]);
    }
}
