//! Stale-while-revalidate: answer from the cache immediately and refresh it
//! in the background for the next request.
//!
//! The refresh is a detached task. It may outlive the request that started
//! it and it writes whenever it completes. If it fails on a cache hit,
//! nobody is told and the stored copy simply stays as it was. On a cache
//! miss the caller awaits the same task, so its failure propagates.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

use super::{Served, Source, capture};
use crate::Error;
use crate::cache::{Generation, Snapshot};
use crate::classify::Strategy;
use crate::network::Network;
use crate::request::Request;

type Refresh = JoinHandle<Result<Snapshot, Error>>;

/// Background refreshes that nobody is waiting on.
#[derive(Clone, Default)]
pub struct Revalidations {
    tasks: Arc<Mutex<Vec<Refresh>>>,
}

impl Revalidations {
    fn track(&self, task: Refresh) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    /// Refreshes still running.
    pub fn pending(&self) -> usize {
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Await every tracked refresh. Their outcomes are discarded.
    pub async fn settle(&self) -> usize {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        let count = tasks.len();
        for task in tasks {
            let _ = task.await;
        }
        count
    }
}

pub async fn stale_while_revalidate(
    dynamic: &Generation, network: Arc<dyn Network>, request: &Request, revalidations: &Revalidations,
) -> Result<Served, Error> {
    // The lookup must complete before the refresh exists, or the refresh
    // can overwrite the entry we are about to serve.
    let cached = dynamic.match_request(request).await?;

    let refresh: Refresh = {
        let dynamic = dynamic.clone();
        let request = request.clone();
        tokio::spawn(async move {
            match network.fetch(&request).await {
                Ok(fresh) => {
                    capture(&dynamic, &request, &fresh).await;
                    Ok(fresh)
                }
                Err(e) => {
                    tracing::debug!(url = %request.url(), error = %e, "background refresh failed");
                    Err(e)
                }
            }
        })
    };

    if let Some(cached) = cached {
        tracing::debug!(url = %request.url(), "serving cached copy, refreshing in background");
        revalidations.track(refresh);
        return Ok(Served::new(Strategy::StaleWhileRevalidate, Source::Cache, cached));
    }

    let fresh = refresh.await.map_err(|e| Error::TaskFailed(e.to_string()))??;
    Ok(Served::new(Strategy::StaleWhileRevalidate, Source::Network, fresh))
}
