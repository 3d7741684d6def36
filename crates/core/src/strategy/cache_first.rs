//! Cache-first: serve the stored copy if there is one, otherwise fetch and
//! keep a copy. A stored entry is never refreshed; it lives until its
//! generation is purged. Network failures on a miss propagate.

use super::{Served, Source, capture};
use crate::Error;
use crate::cache::Generation;
use crate::classify::Strategy;
use crate::network::Network;
use crate::request::Request;

pub async fn cache_first(dynamic: &Generation, network: &dyn Network, request: &Request) -> Result<Served, Error> {
    if let Some(cached) = dynamic.match_request(request).await? {
        tracing::debug!(url = %request.url(), "cache hit");
        return Ok(Served::new(Strategy::CacheFirst, Source::Cache, cached));
    }

    tracing::debug!(url = %request.url(), "cache miss, fetching");
    let fresh = network.fetch(request).await?;
    capture(dynamic, request, &fresh).await;

    Ok(Served::new(Strategy::CacheFirst, Source::Network, fresh))
}
