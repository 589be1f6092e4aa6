//! The site / endpoint data model.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::sync::RwLock;

use crate::models::error::ForwardError;
use crate::services::selection::EndpointSelector;

/// The mutable half of a [`Site`]: the current set of endpoints the health
/// prober has most recently classified as reachable.
///
/// Readers (the forwarder, on every request) and the single writer (the
/// site's prober, once per probe cycle) share this behind a `tokio::sync::RwLock`.
/// Writers replace the list wholesale rather than mutating it in place: it
/// removes a whole class of iterator-invalidation bugs and keeps the
/// reader's critical section to a single clone.
#[derive(Debug, Default)]
pub struct HealthyEndpoints {
    endpoints: RwLock<Vec<Url>>,
}

impl HealthyEndpoints {
    /// Atomically replaces the healthy list. Never mutates the previous
    /// list in place — the old `Vec` is simply dropped once the new one is
    /// published, so a concurrent reader holding a clone never observes a
    /// half-updated sequence.
    pub async fn replace(&self, endpoints: Vec<Url>) {
        *self.endpoints.write().await = endpoints;
    }

    pub async fn snapshot(&self) -> Vec<Url> {
        self.endpoints.read().await.clone()
    }
}

/// A named virtual destination, immutable after `Init` returns.
///
/// `endpoints` is the full configured set; `healthy` is the subset the most
/// recent probe cycle classified as up. `healthy` is always a subset of
/// `endpoints`, at every instant after the first probe cycle completes.
pub struct Site {
    pub name: String,
    pub endpoints: Vec<Url>,
    pub refresh_period: Duration,
    pub domain: String,
    pub path: String,
    pub port: u16,
    pub healthy: HealthyEndpoints,
    selector: Arc<dyn EndpointSelector>,
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("name", &self.name)
            .field("endpoints", &self.endpoints)
            .field("refresh_period", &self.refresh_period)
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("port", &self.port)
            .field("healthy", &self.healthy)
            .finish_non_exhaustive()
    }
}

impl Site {
    pub fn new(
        name: String,
        endpoints: Vec<Url>,
        refresh_period: Duration,
        domain: String,
        path: String,
        port: u16,
    ) -> Self {
        Self::with_selector(
            name,
            endpoints,
            refresh_period,
            domain,
            path,
            port,
            Arc::new(crate::services::selection::UniformRandomSelector),
        )
    }

    /// Extension point for a future selection policy (round-robin,
    /// weighted, least-recent) to plug in without touching the prober or
    /// the forwarder.
    pub fn with_selector(
        name: String,
        endpoints: Vec<Url>,
        refresh_period: Duration,
        domain: String,
        path: String,
        port: u16,
        selector: Arc<dyn EndpointSelector>,
    ) -> Self {
        Self {
            name,
            endpoints,
            refresh_period,
            domain,
            path,
            port,
            healthy: HealthyEndpoints::default(),
            selector,
        }
    }

    /// Selects one healthy endpoint. Holds the read lock only long enough to
    /// clone the current list; the actual selection happens outside the lock.
    pub async fn select_endpoint(&self) -> Result<Url, ForwardError> {
        let candidates = self.healthy.snapshot().await;
        self.selector
            .select(&candidates)
            .ok_or_else(|| ForwardError::NoHealthyEndpoints {
                site: self.name.clone(),
            })
    }
}
