//! gametrack - Session recorder command-line tool
//!
//! Runs simulated sessions end-to-end, inspects persisted session files and
//! retries uploads that failed during a game.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gametrack_rs::{
    config::{app_data_dir, AppConfig},
    export::{FsStorage, SessionExporter, SessionStorage},
    sensors::simulated::{straight_walk, sweeping_compass},
    session::{Payload, Session, SessionRecorder},
    types::{HostDeviceInfo, LngLat, LngLatBounds, ViewportSnapshot},
    viewport::SimulatedMap,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "gametrack", version, about = "Gameplay session telemetry recorder")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to a daily file in the app data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record a scripted walk and export it
    Simulate {
        /// Game name used for the session file
        #[arg(long, default_value = "Simulated Walk")]
        name: String,

        /// Number of waypoints to record
        #[arg(long, default_value_t = 5)]
        waypoints: usize,

        /// Milliseconds between sensor readings
        #[arg(long, default_value_t = 50)]
        interval_ms: u64,

        /// Persist locally but skip the upload
        #[arg(long)]
        offline: bool,
    },

    /// Upload a persisted session file again
    Upload {
        /// Session file written by a previous export
        file: PathBuf,
    },

    /// Print statistics for a persisted session file
    Summary {
        /// Session file written by a previous export
        file: PathBuf,
    },
}

fn init_logging(log_file: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let (file_layer, guard) = match app_data_dir().filter(|_| log_file) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join("logs"), "gametrack.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gametrack_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            config.apply_env_override(std::env::var(gametrack_rs::config::API_URL_ENV).ok());
            Ok(config)
        }
        None => Ok(AppConfig::load_or_default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Simulate {
            name,
            waypoints,
            interval_ms,
            offline,
        } => run_simulate(&config, &name, waypoints, Duration::from_millis(interval_ms), offline),
        Command::Upload { file } => run_upload(&config, &file),
        Command::Summary { file } => run_summary(&file),
    }
}

fn run_simulate(
    config: &AppConfig,
    name: &str,
    waypoints: usize,
    interval: Duration,
    offline: bool,
) -> Result<()> {
    let start = LngLat::new(7.6261, 51.9607);
    let positions = Arc::new(straight_walk(start.lat, start.lng, 45.0, 5.0, usize::MAX, interval));
    let compass = Arc::new(sweeping_compass(45.0, 40.0, 16, interval));
    let map = Arc::new(SimulatedMap::loaded(ViewportSnapshot {
        bounds: LngLatBounds::new(
            LngLat::new(start.lng - 0.01, start.lat - 0.005),
            LngLat::new(start.lng + 0.01, start.lat + 0.005),
        ),
        center: start,
        zoom: 16.0,
        bearing: 0.0,
        pitch: 0.0,
    }));

    let mut recorder = SessionRecorder::with_config(
        positions,
        compass,
        Arc::new(HostDeviceInfo),
        &config.tracking,
    );

    recorder.init("simulated", name, map.clone(), vec!["player-1".to_string()])?;
    recorder.set_task(json!({"id": "task-1", "type": "navigation"}))?;
    record(&mut recorder, "START", 0)?;

    for index in 0..waypoints {
        for _ in 0..4 {
            std::thread::sleep(interval);
            recorder.pump();
        }
        // Camera follows the player without counting as a gesture
        if let Some(fix) = recorder.latest_position() {
            map.set_center(fix.lng_lat());
        }
        map.user_pan();
        if index % 2 == 1 {
            map.user_zoom();
        }
        if index % 3 == 2 {
            map.user_rotate();
        }

        let mut payload = Payload::new();
        payload.insert("index".to_string(), json!(index));
        if let Err(e) = recorder.add_waypoint(payload) {
            tracing::warn!("Waypoint {} skipped: {}", index, e);
        }
    }

    record(&mut recorder, "TASK_COMPLETE", waypoints)?;
    let session = recorder.finish()?;
    println!("{}", session.summary());

    if offline {
        let root = config.storage.resolved_data_dir()?;
        let path = FsStorage::new(root)
            .write(&SessionExporter::relative_path(&session), &serde_json::to_vec_pretty(&session)?)?;
        println!("Saved to {}", path.display());
        return Ok(());
    }

    let exporter = SessionExporter::from_config(config)?;
    let result = exporter.export(&session)?;
    if let Some(path) = &result.persisted_path {
        println!("Saved to {}", path.display());
    }
    if let Some(warning) = &result.persistence_warning {
        eprintln!("Warning: {}", warning);
    }
    match result.upload {
        Ok(receipt) => println!("Uploaded (HTTP {})", receipt.status),
        Err(e) => {
            eprintln!("Upload failed: {}", e);
            if result.persisted_path.is_some() {
                eprintln!("Retry later with `gametrack upload <file>`");
            }
        }
    }
    Ok(())
}

fn record(recorder: &mut SessionRecorder, kind: &str, step: usize) -> Result<()> {
    let mut payload = Payload::new();
    payload.insert("type".to_string(), json!(kind));
    payload.insert("step".to_string(), json!(step));
    recorder
        .add_event(payload)
        .with_context(|| format!("recording {} event", kind))
}

fn run_upload(config: &AppConfig, file: &Path) -> Result<()> {
    let exporter = SessionExporter::from_config(config)?;
    let receipt = exporter
        .retry_upload(file)
        .with_context(|| format!("uploading {}", file.display()))?;
    println!("Uploaded (HTTP {})", receipt.status);
    if !receipt.body.is_empty() {
        println!("{}", receipt.body);
    }
    Ok(())
}

fn run_summary(file: &Path) -> Result<()> {
    let content = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let session: Session = serde_json::from_slice(&content)
        .with_context(|| format!("parsing {}", file.display()))?;

    println!("{} ({})", session.game_name(), session.game_id());
    println!("Started:    {}", session.start_time());
    if let Some(end) = session.end_time() {
        println!("Ended:      {}", end);
    }
    println!("{}", session.summary());
    Ok(())
}
