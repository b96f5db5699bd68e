//! # smarttrack-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement [`KeyValueStore`](smarttrack_app::ports::KeyValueStore) so the
//!   device registry survives restarts
//! - Implement [`SessionBackend`](smarttrack_app::ports::SessionBackend) as a
//!   local archive of finished sessions
//! - Manage `SQLite` connection pool lifecycle and embedded migrations
//!
//! ## Dependency rule
//! Depends on `smarttrack-app` (for port traits) and `smarttrack-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod error;
mod key_value_store;
mod pool;
mod session_archive;

pub use error::StorageError;
pub use key_value_store::SqliteKeyValueStore;
pub use pool::{Config, Database};
pub use session_archive::SqliteSessionArchive;
