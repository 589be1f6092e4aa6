//! Runtime subsystem for a configuration-driven HTTP reverse proxy and load
//! balancer: loads a YAML configuration describing virtual sites and their
//! upstream endpoints, health-checks those endpoints in the background,
//! and forwards incoming requests on a per-port listener to a healthy
//! endpoint chosen by a pluggable selection policy.

pub mod config;
pub mod lifecycle;
pub mod logs;
pub mod models;
pub mod routing;
pub mod services;

pub use lifecycle::{init, run_until_shutdown, stop};
pub use models::error::{ForwardError, InitError};
