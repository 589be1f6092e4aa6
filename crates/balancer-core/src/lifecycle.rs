//! Process lifecycle: builds the running state from a [`Config`] and tears
//! it down again. A previous iteration wired listeners directly in `main`;
//! this balancer needs a re-enterable Init/Stop pair for signal-driven
//! shutdown and tests, so the wiring lives in a library-level singleton
//! guarded by `OnceCell`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpServer};
use log::{error, info};
use once_cell::sync::OnceCell;
use reqwest::{Client, Url};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::models::error::InitError;
use crate::models::site::Site;
use crate::routing;
use crate::services::http::route_request;
use crate::services::prober;

const MIN_REFRESH_PERIOD: Duration = Duration::from_secs(1);

struct Running {
    shutdown_tx: watch::Sender<bool>,
    prober_handles: Vec<JoinHandle<()>>,
    listener_handles: Vec<JoinHandle<std::io::Result<()>>>,
    server_handles: Vec<ServerHandle>,
}

static STATE: OnceCell<Mutex<Option<Running>>> = OnceCell::new();

fn state() -> &'static Mutex<Option<Running>> {
    STATE.get_or_init(|| Mutex::new(None))
}

/// Builds every site, validates the configuration, starts one health
/// prober per site, and binds one HTTP listener per distinct port.
///
/// If already running, this first performs a full [`stop`] and then
/// re-initializes from `config`.
pub async fn init(config: Config) -> Result<(), InitError> {
    let already_running = state().lock().expect("balancer state mutex poisoned").is_some();
    if already_running {
        stop().await;
    }

    let sites = build_sites(&config)?;
    let port_index = routing::build_port_index(&sites)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let client = Client::new();

    let mut prober_handles = Vec::with_capacity(sites.len());
    for site in sites.values() {
        let site = site.clone();
        let client = client.clone();
        let rx = shutdown_rx.clone();
        prober_handles.push(tokio::spawn(prober::run(site, client, rx)));
    }

    let mut listener_handles = Vec::with_capacity(port_index.len());
    let mut server_handles = Vec::with_capacity(port_index.len());
    for (port, table) in port_index {
        let table = Arc::new(table);
        let client = client.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(table.clone()))
                .app_data(web::Data::new(client.clone()))
                .default_service(web::to(route_request))
        })
        .bind(("0.0.0.0", port))
        .map_err(|source| InitError::BindFailure { port, source })?
        .run();

        server_handles.push(server.handle());
        listener_handles.push(tokio::spawn(server));
        info!("listening on port {port}");
    }

    *state().lock().expect("balancer state mutex poisoned") = Some(Running {
        shutdown_tx,
        prober_handles,
        listener_handles,
        server_handles,
    });

    Ok(())
}

/// Gracefully tears down every listener and prober started by [`init`].
/// Idempotent: calling this when nothing is running is a no-op.
pub async fn stop() {
    let running = state().lock().expect("balancer state mutex poisoned").take();
    let Some(running) = running else {
        return;
    };

    let _ = running.shutdown_tx.send(true);

    for handle in running.server_handles {
        handle.stop(true).await;
    }
    for handle in running.listener_handles {
        if let Err(err) = handle.await {
            error!("listener task panicked during shutdown: {err}");
        }
    }
    for handle in running.prober_handles {
        if let Err(err) = handle.await {
            error!("prober task panicked during shutdown: {err}");
        }
    }
}

/// Waits for Ctrl-C (or SIGTERM on unix) and then runs exactly one [`stop`].
/// Returns once shutdown has completed.
pub async fn run_until_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
    stop().await;
}

fn build_sites(config: &Config) -> Result<HashMap<String, Arc<Site>>, InitError> {
    if config.sites.is_empty() {
        return Err(InitError::EmptySiteSet);
    }

    let mut sites = HashMap::with_capacity(config.sites.len());
    for (name, site_config) in &config.sites {
        if site_config.refresh_period < MIN_REFRESH_PERIOD {
            return Err(InitError::RefreshPeriodTooShort {
                site: name.clone(),
                duration: site_config.refresh_period,
            });
        }
        if site_config.port == 0 {
            return Err(InitError::PortOutOfRange {
                site: name.clone(),
                port: site_config.port as u32,
            });
        }

        if site_config.endpoints.is_empty() {
            return Err(InitError::InvalidEndpoint {
                site: name.clone(),
                url: String::new(),
                reason: "endpoint list is empty".to_string(),
            });
        }

        let mut endpoints = Vec::with_capacity(site_config.endpoints.len());
        for raw in &site_config.endpoints {
            let url = Url::parse(raw).map_err(|err| InitError::InvalidEndpoint {
                site: name.clone(),
                url: raw.clone(),
                reason: err.to_string(),
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(InitError::InvalidEndpoint {
                    site: name.clone(),
                    url: raw.clone(),
                    reason: format!("scheme '{}' is not http or https", url.scheme()),
                });
            }
            match url.host_str() {
                Some(host) if !host.is_empty() => {}
                _ => {
                    return Err(InitError::InvalidEndpoint {
                        site: name.clone(),
                        url: raw.clone(),
                        reason: "missing host".to_string(),
                    });
                }
            }
            endpoints.push(url);
        }

        sites.insert(
            name.clone(),
            Arc::new(Site::new(
                name.clone(),
                endpoints,
                site_config.refresh_period,
                site_config.domain.clone(),
                site_config.path.clone(),
                site_config.port,
            )),
        );
    }

    Ok(sites)
}
