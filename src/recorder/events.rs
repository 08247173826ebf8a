//! Notifications published to the presentation layer

use crate::capture::types::GazeSample;
use crate::recorder::state::TrackingState;
use crate::storage::session::SessionSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One user-visible log line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum RecorderEvent {
    StateChanged { from: TrackingState, to: TrackingState },
    /// A sample passed the throttle and was buffered
    SampleAccepted(GazeSample),
    BufferTrimmed { evicted: usize },
    SessionSaved(SessionSummary),
    Exported { path: PathBuf, rows: usize },
    Log(LogLine),
}

/// Mirror a message to tracing and publish it as a log line
pub fn publish_log(events: &broadcast::Sender<RecorderEvent>, level: LogLevel, message: impl Into<String>) {
    let message = message.into();
    match level {
        LogLevel::Info | LogLevel::Success => tracing::info!("{}", message),
        LogLevel::Warning => tracing::warn!("{}", message),
        LogLevel::Error => tracing::error!("{}", message),
    }

    // No subscribers is fine
    let _ = events.send(RecorderEvent::Log(LogLine {
        level,
        message,
        at: Utc::now(),
    }));
}
