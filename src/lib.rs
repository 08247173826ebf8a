//! Gaze Recorder - record, buffer, persist and export gaze-tracking sessions.
//!
//! The recorder drives an external tracking provider through calibration and
//! tracking, buffers the samples it reports, stores each completed session and
//! exports the live buffer as CSV.

pub mod capture;
pub mod config;
pub mod export;
pub mod provider;
pub mod recorder;
pub mod replay;
pub mod storage;

use anyhow::Context;
use config::RecorderConfig;
use std::io::BufReader;
use std::sync::Arc;
use storage::JsonFileBackend;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the tracing subscriber (`RUST_LOG` overrides the default filter)
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gaze_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Replay a script (first argument, or stdin) and print the stored sessions
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting Gaze Recorder v{}", env!("CARGO_PKG_VERSION"));

    let config = RecorderConfig::from_env().context("Failed to load configuration")?;

    let steps = match std::env::args_os().nth(1) {
        Some(path) => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("Failed to open script {:?}", path))?;
            replay::parse_script(BufReader::new(file))?
        }
        None => replay::parse_script(std::io::stdin().lock())?,
    };

    tracing::info!(
        "Replaying {} steps (store={:?}, db={} v{})",
        steps.len(),
        config.storage_dir,
        config.db_name,
        config.db_version
    );

    let backend = Arc::new(JsonFileBackend::new(config.storage_dir.clone()));
    let sessions = replay::replay(config, backend, steps).await?;

    println!("{} stored session(s)", sessions.len());
    for session in sessions {
        println!(
            "{}  {}  {:>6.1}s  {:>6} samples  avg confidence {:.2}",
            session.id,
            session.timestamp.to_rfc3339(),
            session.duration,
            session.data_points,
            session.average_confidence
        );
    }
    Ok(())
}
