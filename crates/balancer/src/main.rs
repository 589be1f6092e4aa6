//! Balancer server entry point.
//!
//! Loads the YAML configuration, starts the background health probers and
//! the per-port listeners, then waits for a shutdown signal.

use balancer_core::config::load_settings;
use balancer_core::logs::configure_logger;
use log::{error, info};

#[actix_web::main]
async fn main() {
    let config = match load_settings() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    configure_logger(config.global.log_level);

    info!(
        "starting balancer with {} configured site(s)",
        config.sites.len()
    );

    if let Err(err) = balancer_core::init(config).await {
        error!("failed to initialize balancer: {err}");
        std::process::exit(1);
    }

    balancer_core::run_until_shutdown().await;
    info!("balancer stopped");
}
