//! Request classification.
//!
//! Maps an intercepted request to exactly one caching strategy. Rules are
//! checked in order and the first match wins:
//!
//! 1. `font` destination → cache-first
//! 2. `image` destination → cache-first
//! 3. `Accept` contains `text/html` → network-first
//! 4. anything else → stale-while-revalidate
//!
//! The destination checks run before the `Accept` heuristic so an image
//! request that happens to accept HTML still goes cache-first.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::request::{Destination, Request};

/// A caching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache_first",
            Strategy::NetworkFirst => "network_first",
            Strategy::StaleWhileRevalidate => "stale_while_revalidate",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the strategy for `request`.
pub fn classify(request: &Request) -> Strategy {
    match request.destination() {
        Destination::Font | Destination::Image => Strategy::CacheFirst,
        _ if accepts_html(request) => Strategy::NetworkFirst,
        _ => Strategy::StaleWhileRevalidate,
    }
}

fn accepts_html(request: &Request) -> bool {
    request.accept().is_some_and(|accept| accept.contains("text/html"))
}
