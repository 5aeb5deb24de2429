use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use soulcast::{
    format_elapsed, locate, Config, Coordinate, Emotion, FileBackend, FixedLocation, RecordStore,
    RecordingSession, RecordingState, StorageBackend, ViewerStore, WavFileDevice,
};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "soulcast")]
#[command(about = "Record anonymous voice stories and discover the ones nearby")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config/soulcast")]
    config: String,

    /// Data directory (overrides storage.data_dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a story from a WAV file and share it at a location
    Record {
        /// Audio source
        #[arg(long)]
        wav: PathBuf,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Up to three emotion tags
        #[arg(short, long = "emotion")]
        emotions: Vec<Emotion>,

        /// Stop after this many seconds
        #[arg(long)]
        max_secs: Option<u64>,
    },

    /// List stories near a location, nearest first
    Nearby {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Search radius in km (defaults to discovery.default_radius_km)
        #[arg(short, long)]
        radius: Option<f64>,

        /// Use the wider map radius (discovery.map_radius_km)
        #[arg(long, conflicts_with = "radius")]
        map: bool,
    },

    /// Show one story and its responses
    Show { id: Uuid },

    /// Respond to a story
    Respond { id: Uuid, text: String },

    /// Show the local profile and notifications
    Profile,

    /// Add a friend by code
    AddFriend { code: String },

    /// Mark a notification as read
    Read { notification_id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soulcast=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let cfg = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| PathBuf::from(&cfg.storage.data_dir));
    let files = FileBackend::new(&data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;

    info!("{} using data in {}", cfg.service.name, files.data_dir().display());

    let backend: Arc<dyn StorageBackend> = Arc::new(files);

    match cli.command {
        Command::Record {
            wav,
            lat,
            lon,
            emotions,
            max_secs,
        } => record(&cfg, backend, wav, Coordinate::new(lat, lon)?, emotions, max_secs).await,
        Command::Nearby {
            lat,
            lon,
            radius,
            map,
        } => {
            let radius = match (radius, map) {
                (Some(radius), _) => radius,
                (None, true) => cfg.discovery.map_radius_km,
                (None, false) => cfg.discovery.default_radius_km,
            };
            nearby(&cfg, backend, Coordinate::new(lat, lon)?, radius)
        }
        Command::Show { id } => show(&cfg, backend, id),
        Command::Respond { id, text } => {
            let mut store = open_records(&cfg, backend)?;
            let response = store.add_response(id, &text, false).map_err(friendly)?;
            println!("Response {} added", response.id);
            Ok(())
        }
        Command::Profile => profile(&cfg, backend),
        Command::AddFriend { code } => {
            let mut store = open_viewer(&cfg, backend)?;
            store.add_friend(&code).map_err(friendly)?;
            println!("Added {} ({} friends)", code.trim(), store.viewer().friends.len());
            Ok(())
        }
        Command::Read { notification_id } => {
            let mut store = open_viewer(&cfg, backend)?;
            store
                .mark_notification_read(notification_id)
                .map_err(friendly)?;
            println!("{} unread", store.unread_count());
            Ok(())
        }
    }
}

async fn record(
    cfg: &Config,
    backend: Arc<dyn StorageBackend>,
    wav: PathBuf,
    position: Coordinate,
    emotions: Vec<Emotion>,
    max_secs: Option<u64>,
) -> Result<()> {
    // reject bad tags before any audio is captured
    Emotion::validate_selection(&emotions).map_err(friendly)?;

    let device = Arc::new(WavFileDevice::new(&wav));
    let mut session = RecordingSession::new(device, cfg.recording.capture_config());

    if !session.start().await.map_err(friendly)?.is_applied() {
        bail!("Recording could not be started");
    }
    let mut elapsed = session.subscribe_elapsed();

    info!("Recording from {}, press Ctrl+C to stop", wav.display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping recording");
                break;
            }
            changed = elapsed.changed() => {
                if changed.is_err() {
                    break;
                }
                let secs = *elapsed.borrow_and_update();
                info!("Recording {}", format_elapsed(secs));
                if max_secs.is_some_and(|max| secs >= max) {
                    break;
                }
            }
            _ = sleep(Duration::from_millis(250)) => {
                if session.poll_device() == RecordingState::Inactive {
                    info!("Audio source ended");
                    break;
                }
            }
        }
    }

    session.stop().await;

    let artifact = match session.take_artifact() {
        Some(artifact) if !artifact.is_empty() => artifact,
        _ => bail!("Nothing was recorded"),
    };

    let provider = FixedLocation::new(position);
    let fix = locate(&provider, cfg.location.timeout())
        .await
        .map_err(friendly)?;

    let mut store = open_records(cfg, backend)?;
    let record = store
        .add_record(&artifact, fix.coordinate, emotions)
        .map_err(friendly)?;

    println!(
        "Shared story {} ({}, {})",
        record.id,
        format_elapsed(record.duration),
        record.audio_url
    );

    Ok(())
}

fn nearby(cfg: &Config, backend: Arc<dyn StorageBackend>, observer: Coordinate, radius_km: f64) -> Result<()> {
    let store = open_records(cfg, backend)?;
    let results = store.nearby(observer, radius_km);

    if results.is_empty() {
        println!("No stories within {} km", radius_km);
        return Ok(());
    }

    for hit in &results {
        let record = hit.record;
        let tags: Vec<&str> = record.emotions.iter().map(|e| e.display_name()).collect();
        println!(
            "{}  {:>7.3} km  {}  {}  {}  [{}]  {} responses",
            record.id,
            hit.distance_km,
            record.timestamp.format("%Y-%m-%d %H:%M"),
            format_elapsed(record.duration),
            record.display_name(),
            tags.join(", "),
            record.responses.len()
        );
    }

    Ok(())
}

fn show(cfg: &Config, backend: Arc<dyn StorageBackend>, id: Uuid) -> Result<()> {
    let store = open_records(cfg, backend)?;
    let record = store.get(id).map_err(friendly)?;

    println!("{} by {}", record.id, record.display_name());
    println!(
        "  at {:.5}, {:.5} on {}",
        record.location.latitude,
        record.location.longitude,
        record.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    println!("  {} ({})", format_elapsed(record.duration), record.audio_url);
    for emotion in &record.emotions {
        println!("  #{}", emotion.display_name());
    }
    for response in &record.responses {
        println!(
            "  > {} ({}): {}",
            response.display_name(),
            response.timestamp.format("%Y-%m-%d %H:%M"),
            response.content
        );
    }

    Ok(())
}

fn profile(cfg: &Config, backend: Arc<dyn StorageBackend>) -> Result<()> {
    let store = open_viewer(cfg, backend)?;
    let viewer = store.viewer();

    println!("{} (friend code {})", viewer.username, viewer.friend_code);
    println!("{} friends, {} unread", viewer.friends.len(), store.unread_count());
    for notification in viewer.notifications.iter().rev() {
        println!(
            "  {} {} [{}] {}",
            if notification.read { " " } else { "*" },
            notification.id,
            notification.kind,
            notification.message
        );
    }

    Ok(())
}

fn open_records(cfg: &Config, backend: Arc<dyn StorageBackend>) -> Result<RecordStore> {
    let store = RecordStore::load(backend, cfg.storage.records_key.clone()).map_err(friendly)?;
    if let Some(e) = store.load_error() {
        warn!("Starting with no stories: {}", e);
    }
    Ok(store)
}

fn open_viewer(cfg: &Config, backend: Arc<dyn StorageBackend>) -> Result<ViewerStore> {
    let store = ViewerStore::load_or_create(backend, cfg.storage.viewer_key.clone())
        .map_err(friendly)
        .context("Failed to load profile")?;
    if let Some(e) = store.load_error() {
        warn!("Profile was unreadable and has been recreated: {}", e);
    }
    Ok(store)
}

fn friendly(e: soulcast::Error) -> anyhow::Error {
    let message = if e.is_recoverable() {
        e.user_message()
    } else {
        format!("{} Check that the data directory is writable.", e.user_message())
    };
    anyhow::Error::new(e).context(message)
}
