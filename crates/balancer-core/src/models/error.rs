//! Error taxonomy for the balancer's configuration, startup, and per-request paths.
//!
//! Two families are kept separate on purpose: [`InitError`] is always fatal and
//! is only ever produced while building the process-wide state in `Init`;
//! [`ForwardError`] is recovered locally by the forwarder and converted into an
//! HTTP response, never propagated out of a request handler.

use actix_web::{http::StatusCode, HttpResponse};

/// Fatal configuration or startup errors, detected at `Init` and never
/// recovered from — the process terminates.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("configuration is invalid: {0}")]
    ConfigInvalid(String),

    #[error("site '{site}' has invalid endpoint '{url}': {reason}")]
    InvalidEndpoint {
        site: String,
        url: String,
        reason: String,
    },

    #[error("site '{site}' has refresh period {duration:?}, which is below the 1 second minimum")]
    RefreshPeriodTooShort {
        site: String,
        duration: std::time::Duration,
    },

    #[error("site '{site}' has port {port} outside the valid range 1-65535")]
    PortOutOfRange { site: String, port: u32 },

    #[error("no sites configured")]
    EmptySiteSet,

    #[error("path '{path}' on port {port} is claimed by both '{first_site}' and '{second_site}'")]
    PortConflict {
        port: u16,
        path: String,
        first_site: String,
        second_site: String,
    },

    #[error("failed to bind listener on port {port}: {source}")]
    BindFailure {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Per-request errors. Always converted to an HTTP response by the forwarder
/// or the port router; never bubbles out of a handler.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("no healthy endpoints for site '{site}'")]
    NoHealthyEndpoints { site: String },

    #[error("upstream request failed: {0}")]
    UpstreamUnreachable(#[from] reqwest::Error),

    #[error("no route matches path '{path}'")]
    NoRouteMatch { path: String },
}

impl ForwardError {
    /// Maps this error to the status code the forwarder must answer with:
    /// 404 for routing misses, 503 for everything else short of a
    /// body-copy failure (those are handled inline, not via this type).
    pub fn status_code(&self) -> StatusCode {
        match self {
            ForwardError::NoHealthyEndpoints { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ForwardError::UpstreamUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ForwardError::NoRouteMatch { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn to_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}
