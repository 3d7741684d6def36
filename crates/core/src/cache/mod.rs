//! Versioned, SQLite-backed response cache.
//!
//! This module provides the generation store the worker caches into:
//!
//! - A storage substrate trait with a SQLite implementation (tokio-rusqlite)
//! - Request-identity keys using SHA-256 hashing
//! - Automatic schema migrations
//! - Version-tagged generation names and handles

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod snapshots;
pub mod storage;
pub mod versioned;

pub use crate::Error;

pub use connection::CacheDb;
pub use snapshots::Snapshot;
pub use storage::Storage;
pub use versioned::{CacheNames, Generation, Role, VersionedStore};
