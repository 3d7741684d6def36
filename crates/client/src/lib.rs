//! Network substrate for offgrid.
//!
//! This crate provides the reqwest-backed HTTP client the worker fetches
//! through, shared by the server binary.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};
