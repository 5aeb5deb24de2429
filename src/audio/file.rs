use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use hound::{WavReader, WavSpec, WavWriter};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backend::{Capture, CaptureConfig, CaptureDevice, CaptureEvent, CaptureStream};
use crate::error::{Error, Result};

pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Capture device that plays a WAV file back in real time
///
/// Audio is pulled from the file every `buffer_duration_ms` while the stream
/// is running. Like a browser recorder started without a timeslice, the
/// captured audio is emitted as one WAV chunk when the stream stops or the
/// file runs out.
pub struct WavFileDevice {
    path: PathBuf,
    name: String,
}

impl WavFileDevice {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("wav:{}", path.display());
        Self { path, name }
    }
}

#[async_trait]
impl CaptureDevice for WavFileDevice {
    async fn acquire(&self, config: &CaptureConfig) -> Result<Capture> {
        info!("Opening audio file: {}", self.path.display());

        let (spec, samples) = read_samples(&self.path)
            .map_err(|e| Error::DeviceUnavailable(format!("{}: {}", self.path.display(), e)))?;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64),
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        let (event_tx, events) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = watch::channel(Control::Run);

        let frame_len = (spec.sample_rate as u64 * spec.channels as u64 * config.buffer_duration_ms
            / 1000)
            .max(1) as usize;
        let period = Duration::from_millis(config.buffer_duration_ms.max(1));

        let task = tokio::spawn(pump(spec, samples, frame_len, period, control_rx, event_tx));

        Ok(Capture {
            stream: Box::new(WavStream {
                name: self.name.clone(),
                control: control_tx,
                task: Some(task),
                released: false,
            }),
            events,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn read_samples(path: &Path) -> std::result::Result<(WavSpec, Vec<i16>), hound::Error> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = reader.into_samples::<i16>().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((spec, samples))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Pause,
    Stop,
}

/// Pull frames from the decoded file until stopped or exhausted, then emit
/// everything captured as a single WAV chunk
async fn pump(
    spec: WavSpec,
    samples: Vec<i16>,
    frame_len: usize,
    period: Duration,
    mut control: watch::Receiver<Control>,
    events: mpsc::UnboundedSender<CaptureEvent>,
) {
    let mut ticker = tokio::time::interval(period);
    let mut captured: Vec<i16> = Vec::with_capacity(samples.len());
    let mut cursor = 0;
    let mut paused = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if paused {
                    continue;
                }

                let end = (cursor + frame_len).min(samples.len());
                captured.extend_from_slice(&samples[cursor..end]);
                cursor = end;

                if cursor >= samples.len() {
                    info!("Audio file exhausted after {} samples", cursor);
                    break;
                }
            }
            changed = control.changed() => {
                if changed.is_err() {
                    debug!("Capture control dropped");
                    break;
                }

                let next = *control.borrow_and_update();
                match next {
                    Control::Stop => break,
                    Control::Pause => paused = true,
                    Control::Run => paused = false,
                }
            }
        }
    }

    if !captured.is_empty() {
        match encode_wav(spec, &captured) {
            Ok(bytes) => {
                let _ = events.send(CaptureEvent::Chunk(bytes));
            }
            Err(e) => error!("Failed to encode captured audio: {}", e),
        }
    }

    let _ = events.send(CaptureEvent::Ended);
}

fn encode_wav(spec: WavSpec, samples: &[i16]) -> std::result::Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
        ..spec
    };

    let mut buffer = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buffer), spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(buffer)
}

struct WavStream {
    name: String,
    control: watch::Sender<Control>,
    task: Option<JoinHandle<()>>,
    released: bool,
}

#[async_trait]
impl CaptureStream for WavStream {
    fn mime_type(&self) -> &str {
        WAV_MIME_TYPE
    }

    fn pause(&mut self) {
        let _ = self.control.send(Control::Pause);
    }

    fn resume(&mut self) {
        let _ = self.control.send(Control::Run);
    }

    async fn stop(&mut self) -> Result<()> {
        // the pump may already have finished on its own
        let _ = self.control.send(Control::Stop);

        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| Error::DeviceUnavailable(format!("capture task failed: {}", e)))?;
        }

        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            warn!("Capture device {} already released", self.name);
            return;
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.released = true;
        info!("Released capture device {}", self.name);
    }
}

impl Drop for WavStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
