//! Persisted session records

use crate::capture::types::GazeSample;
use crate::storage::error::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Store-assigned session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A session ready to be inserted; the backend assigns its id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub timestamp: DateTime<Utc>,
    /// Seconds between the first and last sample
    pub duration: f64,
    pub data_points: usize,
    pub average_confidence: f64,
    pub data: Vec<GazeSample>,
}

impl SessionRecord {
    /// Build a record from an ordered, non-empty sample sequence
    pub fn from_samples(samples: Vec<GazeSample>, timestamp: DateTime<Utc>) -> StorageResult<Self> {
        let (first, last) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (first.timestamp_ms, last.timestamp_ms),
            _ => return Err(StorageError::EmptySession),
        };

        let duration = (last - first) / 1000.0;
        let average_confidence =
            samples.iter().map(GazeSample::confidence_or_zero).sum::<f64>() / samples.len() as f64;

        Ok(Self {
            timestamp,
            duration,
            data_points: samples.len(),
            average_confidence,
            data: samples,
        })
    }
}

/// A stored session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(flatten)]
    pub record: SessionRecord,
}

impl Session {
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            timestamp: self.record.timestamp,
            duration: self.record.duration,
            data_points: self.record.data_points,
            average_confidence: self.record.average_confidence,
        }
    }
}

/// Session metadata without the sample list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub duration: f64,
    pub data_points: usize,
    pub average_confidence: f64,
}

/// Secondary (non-unique) indexes on the sessions collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionIndex {
    Timestamp,
    Duration,
}

impl SessionIndex {
    pub const ALL: [SessionIndex; 2] = [SessionIndex::Timestamp, SessionIndex::Duration];

    /// Key path of the indexed field
    pub fn key_path(&self) -> &'static str {
        match self {
            SessionIndex::Timestamp => "timestamp",
            SessionIndex::Duration => "duration",
        }
    }

    /// Order two sessions by this index key
    pub fn compare(&self, a: &Session, b: &Session) -> Ordering {
        match self {
            SessionIndex::Timestamp => a.record.timestamp.cmp(&b.record.timestamp),
            SessionIndex::Duration => a.record.duration.total_cmp(&b.record.duration),
        }
    }
}
