//! In-memory storage backend with failure injection

use crate::storage::backend::{SessionCollection, StorageBackend};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::session::{Session, SessionId, SessionRecord};
use async_trait::async_trait;
use parking_lot::Mutex as ParkingMutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct MemoryBackend {
    databases: ParkingMutex<HashMap<String, Arc<MemoryCollection>>>,
    open_count: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `open` fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    /// Collection of an already opened database
    pub fn collection(&self, name: &str) -> Option<Arc<MemoryCollection>> {
        self.databases.lock().get(name).cloned()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn open(&self, name: &str, _version: u32) -> StorageResult<Arc<dyn SessionCollection>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("database {} cannot be opened", name)));
        }

        self.open_count.fetch_add(1, Ordering::SeqCst);
        let collection: Arc<dyn SessionCollection> = self
            .databases
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        Ok(collection)
    }
}

#[derive(Default)]
pub struct MemoryCollection {
    records: ParkingMutex<Vec<Session>>,
    reject_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryCollection {
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl SessionCollection for MemoryCollection {
    async fn add(&self, record: SessionRecord) -> StorageResult<Session> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected("quota exceeded".to_string()));
        }

        let session = Session {
            id: SessionId::new(),
            record,
        };
        self.records.lock().push(session.clone());
        Ok(session)
    }

    async fn get_all(&self) -> StorageResult<Vec<Session>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::ReadFailed("cursor aborted".to_string()));
        }
        Ok(self.records.lock().clone())
    }
}
