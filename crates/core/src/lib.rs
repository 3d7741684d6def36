//! Core of the offgrid offline worker.
//!
//! This crate provides:
//! - Versioned cache generations over a SQLite storage backend
//! - Request classification and the caching strategies
//! - The install/activate lifecycle
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod network;
pub mod request;
pub mod strategy;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod worker;

pub use cache::{CacheDb, Snapshot};
pub use classify::{Strategy, classify};
pub use config::AppConfig;
pub use error::Error;
pub use lifecycle::{ClientControl, ClientTracker, WorkerState};
pub use network::Network;
pub use request::{Destination, Method, Request};
pub use strategy::{Served, Source};
pub use worker::Worker;
