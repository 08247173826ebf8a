//! JSON file storage backend
//!
//! Each database lives in `<root>/<name>/sessions.json` as a newline-delimited
//! log. The first line is the store header (schema version and index
//! definitions), every following line is one session record. Records are only
//! ever appended; nothing is held in memory between calls.

use crate::storage::backend::{SessionCollection, StorageBackend, SESSIONS_COLLECTION};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::session::{Session, SessionId, SessionIndex, SessionRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexSpec {
    name: String,
    key_path: String,
    unique: bool,
}

/// First line of the log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreHeader {
    version: u32,
    collection: String,
    indexes: Vec<IndexSpec>,
}

impl StoreHeader {
    fn new(version: u32) -> Self {
        Self {
            version,
            collection: SESSIONS_COLLECTION.to_string(),
            indexes: SessionIndex::ALL
                .iter()
                .map(|index| IndexSpec {
                    name: index.key_path().to_string(),
                    key_path: index.key_path().to_string(),
                    unique: false,
                })
                .collect(),
        }
    }
}

/// Backend storing each database as a JSON log on disk
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    root: PathBuf,
}

impl JsonFileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn database_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(format!("{}.json", SESSIONS_COLLECTION))
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    async fn open(&self, name: &str, version: u32) -> StorageResult<Arc<dyn SessionCollection>> {
        let path = self.database_path(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Unavailable(format!("{}: {}", parent.display(), e)))?;
        }

        let header = {
            let path = path.clone();
            let name = name.to_string();
            blocking(move || open_log(&path, &name, version)).await?
        };

        tracing::debug!("Opened session store {} v{} at {:?}", name, header.version, path);

        Ok(Arc::new(JsonFileCollection {
            path,
            write_lock: Mutex::new(()),
        }))
    }
}

/// Open `sessions` collection backed by one log file
pub struct JsonFileCollection {
    path: PathBuf,
    // Serializes appends against each other and against reads
    write_lock: Mutex<()>,
}

#[async_trait]
impl SessionCollection for JsonFileCollection {
    async fn add(&self, record: SessionRecord) -> StorageResult<Session> {
        let session = Session {
            id: SessionId::new(),
            record,
        };
        let mut line = serde_json::to_vec(&session)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        blocking(move || append_record(&path, &line))
            .await
            .map_err(|e| StorageError::WriteRejected(e.to_string()))?;
        Ok(session)
    }

    async fn get_all(&self) -> StorageResult<Vec<Session>> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        blocking(move || read_records(&path)).await
    }
}

async fn blocking<T, F>(task: F) -> StorageResult<T>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| StorageError::Unavailable(format!("storage task failed: {}", e)))?
}

/// Read (creating or upgrading if needed) the header of the log at `path`
fn open_log(path: &Path, name: &str, version: u32) -> StorageResult<StoreHeader> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let header = StoreHeader::new(version);
            rewrite_log(path, &header, None)?;
            tracing::info!("Created session store at {:?}", path);
            return Ok(header);
        }
        Err(e) => return Err(StorageError::Unavailable(format!("{}: {}", path.display(), e))),
    };

    let mut reader = BufReader::new(file);
    let mut first = String::new();
    reader.read_line(&mut first)?;
    if first.trim().is_empty() {
        return Err(StorageError::ReadFailed(format!("{}: missing store header", path.display())));
    }

    let header: StoreHeader = serde_json::from_str(first.trim_end())?;
    if header.version > version {
        return Err(StorageError::VersionMismatch {
            found: header.version,
            requested: version,
        });
    }
    if header.version < version {
        tracing::info!("Upgrading session store {} from v{} to v{}", name, header.version, version);
        let upgraded = StoreHeader::new(version);
        rewrite_log(path, &upgraded, Some(reader))?;
        return Ok(upgraded);
    }
    Ok(header)
}

/// Atomically replace the log with `header` followed by the remaining lines
/// of `records`
fn rewrite_log(path: &Path, header: &StoreHeader, records: Option<BufReader<File>>) -> StorageResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut tmp, header)?;
    tmp.write_all(b"\n")?;
    if let Some(mut records) = records {
        std::io::copy(&mut records, &mut tmp)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::IoError(e.error))?;
    Ok(())
}

/// Append one record line; on failure the log is cut back to its old length
fn append_record(path: &Path, line: &[u8]) -> StorageResult<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    let len = file.metadata()?.len();

    if let Err(e) = file.write_all(line).and_then(|()| file.sync_data()) {
        if let Err(truncate) = file.set_len(len) {
            tracing::error!("Failed to roll back partial append to {:?}: {}", path, truncate);
        }
        return Err(e.into());
    }
    Ok(())
}

fn read_records(path: &Path) -> StorageResult<Vec<Session>> {
    let file = File::open(path).map_err(|e| StorageError::ReadFailed(format!("{}: {}", path.display(), e)))?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate().skip(1) {
        let line = line.map_err(|e| StorageError::ReadFailed(format!("{}: {}", path.display(), e)))?;
        if line.trim().is_empty() {
            continue;
        }
        let session: Session = serde_json::from_str(&line)
            .map_err(|e| StorageError::ReadFailed(format!("{} line {}: {}", path.display(), index + 1, e)))?;
        records.push(session);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::GazeSample;
    use chrono::{Duration, Utc};

    fn record(duration_ms: f64) -> SessionRecord {
        SessionRecord::from_samples(
            vec![GazeSample::new(0.0, 1.0, 1.0), GazeSample::new(duration_ms, 2.0, 2.0)],
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path());

        let first = {
            let sessions = backend.open("eyeTrackingDB", 1).await.unwrap();
            let first = sessions.add(record(1000.0)).await.unwrap();
            sessions.add(record(2000.0)).await.unwrap();
            first
        };

        let reopened = backend.open("eyeTrackingDB", 1).await.unwrap();
        let all = reopened.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);
        assert_ne!(all[0].id, all[1].id);
    }

    #[tokio::test]
    async fn test_newer_version_on_disk_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path());
        backend.open("db", 3).await.unwrap();

        match backend.open("db", 2).await {
            Err(StorageError::VersionMismatch { found: 3, requested: 2 }) => {}
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("older version must not open a newer store"),
        }
    }

    #[tokio::test]
    async fn test_upgrade_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path());
        backend.open("db", 1).await.unwrap().add(record(500.0)).await.unwrap();

        let upgraded = backend.open("db", 2).await.unwrap();
        assert_eq!(upgraded.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_index_ordering() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = JsonFileBackend::new(dir.path()).open("db", 1).await.unwrap();

        let mut older = record(3000.0);
        older.timestamp = Utc::now() - Duration::hours(1);
        sessions.add(record(1000.0)).await.unwrap();
        sessions.add(older).await.unwrap();
        sessions.add(record(2000.0)).await.unwrap();

        let by_duration: Vec<f64> = sessions
            .get_all_by_index(SessionIndex::Duration)
            .await
            .unwrap()
            .iter()
            .map(|s| s.record.duration)
            .collect();
        assert_eq!(by_duration, vec![1.0, 2.0, 3.0]);

        let by_time = sessions.get_all_by_index(SessionIndex::Timestamp).await.unwrap();
        assert_eq!(by_time[0].record.duration, 3.0);
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let db_dir = dir.path().join("db");
        std::fs::create_dir_all(&db_dir).unwrap();
        std::fs::write(db_dir.join("sessions.json"), b"not json").unwrap();

        let result = JsonFileBackend::new(dir.path()).open("db", 1).await;
        assert!(matches!(result, Err(StorageError::SerializationError(_))));
    }

    #[tokio::test]
    async fn test_reopen_keeps_insertion_order_and_ids() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path());

        let mut saved = Vec::new();
        {
            let sessions = backend.open("eyeTrackingDB", 1).await.unwrap();
            for ms in [4000.0, 1000.0, 3000.0, 2000.0] {
                saved.push(sessions.add(record(ms)).await.unwrap());
            }
        }

        let reopened = JsonFileBackend::new(dir.path()).open("eyeTrackingDB", 1).await.unwrap();
        let all = reopened.get_all().await.unwrap();
        assert_eq!(all, saved);

        let ids: Vec<SessionId> = all.iter().map(|s| s.id).collect();
        let expected: Vec<SessionId> = saved.iter().map(|s| s.id).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_add_appends_one_line_without_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = JsonFileBackend::new(dir.path()).open("db", 1).await.unwrap();
        let path = dir.path().join("db").join("sessions.json");

        sessions.add(record(1000.0)).await.unwrap();
        let before = std::fs::read(&path).unwrap();
        sessions.add(record(2000.0)).await.unwrap();
        let after = std::fs::read(&path).unwrap();

        assert!(after.starts_with(&before));
        let text = String::from_utf8(after).unwrap();
        assert_eq!(text.lines().count(), 3);

        let header: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(header["version"], 1);
        assert_eq!(header["collection"], "sessions");
        assert_eq!(header["indexes"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_damaged_record_line_fails_read() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = JsonFileBackend::new(dir.path()).open("db", 1).await.unwrap();
        sessions.add(record(1000.0)).await.unwrap();

        let path = dir.path().join("db").join("sessions.json");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"truncated\n").unwrap();

        assert!(matches!(sessions.get_all().await, Err(StorageError::ReadFailed(_))));
    }

    #[tokio::test]
    async fn test_empty_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let db_dir = dir.path().join("db");
        std::fs::create_dir_all(&db_dir).unwrap();
        std::fs::write(db_dir.join("sessions.json"), b"").unwrap();

        let result = JsonFileBackend::new(dir.path()).open("db", 1).await;
        assert!(matches!(result, Err(StorageError::ReadFailed(_))));
    }
}
