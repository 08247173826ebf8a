//! Storage backend traits
//!
//! A backend opens a named, versioned database holding a single `sessions`
//! collection. The collection supports inserts and full reads only.

use crate::storage::error::StorageResult;
use crate::storage::session::{Session, SessionIndex, SessionRecord};
use async_trait::async_trait;
use std::sync::Arc;

/// Name of the only collection in the database
pub const SESSIONS_COLLECTION: &str = "sessions";

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Open (creating or upgrading if needed) the database `name` at `version`
    async fn open(&self, name: &str, version: u32) -> StorageResult<Arc<dyn SessionCollection>>;
}

/// Append-only `sessions` collection
#[async_trait]
pub trait SessionCollection: Send + Sync {
    /// Insert a record, assigning it a fresh unique id
    async fn add(&self, record: SessionRecord) -> StorageResult<Session>;

    /// All records in backend order
    async fn get_all(&self) -> StorageResult<Vec<Session>>;

    /// All records ordered by an index key; ties keep backend order
    async fn get_all_by_index(&self, index: SessionIndex) -> StorageResult<Vec<Session>> {
        let mut sessions = self.get_all().await?;
        sessions.sort_by(|a, b| index.compare(a, b));
        Ok(sessions)
    }
}
