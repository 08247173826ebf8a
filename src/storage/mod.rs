//! Session persistence
//!
//! Completed sessions are written once and never modified. Backends are
//! pluggable: a JSON file store for real use, an in-memory store for tests.

pub mod backend;
pub mod error;
pub mod json_file;
pub mod memory;
pub mod session;
pub mod store;

pub use backend::{SessionCollection, StorageBackend, SESSIONS_COLLECTION};
pub use error::{StorageError, StorageResult};
pub use json_file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use session::{Session, SessionId, SessionIndex, SessionRecord, SessionSummary};
pub use store::{SessionStore, DEFAULT_DB_NAME, DEFAULT_DB_VERSION};
