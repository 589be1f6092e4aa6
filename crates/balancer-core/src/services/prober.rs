//! Health prober: one long-running task per site, periodically probing
//! each configured endpoint and atomically replacing the healthy list.
//! Pairs a `tokio::time::interval` with a cancellation channel inside a
//! spawned task.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, Url};
use tokio::sync::watch;
use tokio::time::{interval, timeout};

use crate::models::site::Site;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the probe loop for one site until `shutdown` reports `true`.
/// Never returns an error and never panics out past this call — a failed
/// probe only ever affects classification, never the process.
pub async fn run(site: Arc<Site>, client: Client, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(site.refresh_period);
    ticker.tick().await; // interval's first tick always resolves immediately; consume it upfront
    loop {
        run_cycle(&site, &client).await;

        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    debug!("prober for site '{}' shutting down", site.name);
                    return;
                }
            }
        }
    }
}

async fn run_cycle(site: &Site, client: &Client) {
    let mut candidates = Vec::with_capacity(site.endpoints.len());

    for endpoint in &site.endpoints {
        if probe_one(client, endpoint).await {
            candidates.push(endpoint.clone());
        }
    }

    debug!(
        "site '{}': {}/{} endpoints healthy",
        site.name,
        candidates.len(),
        site.endpoints.len()
    );
    site.healthy.replace(candidates).await;
}

/// Classifies a single endpoint: healthy iff the HEAD request completes
/// without a transport error and returns a status below 500.
async fn probe_one(client: &Client, endpoint: &Url) -> bool {
    match timeout(PROBE_TIMEOUT, client.head(endpoint.clone()).send()).await {
        Ok(Ok(response)) => response.status().as_u16() < 500,
        Ok(Err(err)) => {
            warn!("probe failed for {endpoint}: {err}");
            false
        }
        Err(_) => {
            warn!("probe timed out for {endpoint}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{web, App, HttpServer};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn unreachable_endpoint_is_never_marked_healthy() {
        let site = Arc::new(Site::new(
            "test".into(),
            vec![Url::parse("http://127.0.0.1:1").unwrap()],
            Duration::from_secs(1),
            String::new(),
            "/".into(),
            1,
        ));
        run_cycle(&site, &Client::new()).await;
        assert!(site.healthy.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn healthy_endpoint_is_classified_as_up() {
        static HITS: AtomicUsize = AtomicUsize::new(0);

        let server = HttpServer::new(|| {
            App::new().route(
                "/",
                web::head().to(|| async {
                    HITS.fetch_add(1, Ordering::SeqCst);
                    actix_web::HttpResponse::Ok()
                }),
            )
        })
        .bind("127.0.0.1:0")
        .unwrap();
        let addr = server.addrs()[0];
        let running = server.run();
        let handle = running.handle();
        tokio::spawn(running);

        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let site = Arc::new(Site::new(
            "test".into(),
            vec![url],
            Duration::from_secs(1),
            String::new(),
            "/".into(),
            addr.port(),
        ));

        run_cycle(&site, &Client::new()).await;
        assert_eq!(site.healthy.snapshot().await.len(), 1);
        assert!(HITS.load(Ordering::SeqCst) >= 1);

        handle.stop(true).await;
    }
}
