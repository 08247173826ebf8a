//! Session store
//!
//! Front door to persistence. The backend connection is opened on first use
//! and then shared for the lifetime of the store.

use crate::capture::types::GazeSample;
use crate::storage::backend::{SessionCollection, StorageBackend};
use crate::storage::error::StorageResult;
use crate::storage::session::{Session, SessionIndex, SessionRecord};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Default database name
pub const DEFAULT_DB_NAME: &str = "eyeTrackingDB";

/// Default database schema version
pub const DEFAULT_DB_VERSION: u32 = 1;

pub struct SessionStore {
    backend: Arc<dyn StorageBackend>,
    name: String,
    version: u32,
    connection: OnceCell<Arc<dyn SessionCollection>>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn StorageBackend>, name: impl Into<String>, version: u32) -> Self {
        Self {
            backend,
            name: name.into(),
            version,
            connection: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared connection, opened on first call. A failed open is retried on
    /// the next call.
    async fn connection(&self) -> StorageResult<&Arc<dyn SessionCollection>> {
        self.connection
            .get_or_try_init(|| async {
                tracing::debug!("Opening session store {} v{}", self.name, self.version);
                self.backend.open(&self.name, self.version).await
            })
            .await
    }

    /// Persist a completed session built from `samples`
    pub async fn save_session(&self, samples: Vec<GazeSample>) -> StorageResult<Session> {
        let record = SessionRecord::from_samples(samples, Utc::now())?;
        let session = self.connection().await?.add(record).await?;

        tracing::info!(
            "Saved session {} ({} samples, {:.1}s, avg confidence {:.2})",
            session.id,
            session.record.data_points,
            session.record.duration,
            session.record.average_confidence
        );
        Ok(session)
    }

    /// All stored sessions in backend order
    pub async fn list_sessions(&self) -> StorageResult<Vec<Session>> {
        self.connection().await?.get_all().await
    }

    /// All stored sessions ordered by an index
    pub async fn list_sessions_by(&self, index: SessionIndex) -> StorageResult<Vec<Session>> {
        self.connection().await?.get_all_by_index(index).await
    }
}
