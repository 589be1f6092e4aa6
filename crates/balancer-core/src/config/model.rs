//! Configuration model: the wire schema and its normalized, in-memory form.
//! `Init` only ever sees the normalized [`Config`]; it treats it as
//! read-only input and never touches the filesystem.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Name reserved for the implicit default site: its `domain`, `path`, and
/// `port` are forced regardless of what the file supplies.
pub const DEFAULT_SITE_NAME: &str = "default";

/// Raw `global` section, as it appears in the YAML file.
#[derive(Debug, Deserialize)]
pub struct GlobalRaw {
    pub listening_port: u16,
    pub log_level: u8,
}

/// Raw per-site section, as it appears in the YAML file under `sites.<name>`.
#[derive(Debug, Deserialize)]
pub struct SiteRaw {
    pub endpoints: Vec<String>,

    #[serde(default, with = "humantime_serde::option")]
    pub check_period: Option<Duration>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

/// Top-level raw document.
#[derive(Debug, Deserialize)]
pub struct ConfigRaw {
    pub global: GlobalRaw,

    #[serde(default)]
    pub sites: HashMap<String, SiteRaw>,
}

/// Normalized global settings.
#[derive(Debug, Clone)]
pub struct Global {
    pub listening_port: u16,
    pub log_level: u8,
}

/// Normalized per-site configuration — still strings/durations, not yet
/// validated (that happens in `Init`, see `models::error::InitError`) and
/// not yet turned into a [`crate::models::site::Site`].
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub endpoints: Vec<String>,
    pub refresh_period: Duration,
    pub domain: String,
    pub path: String,
    pub port: u16,
}

/// The configuration `Init` consumes. Produced by [`crate::config::loader`]
/// from a YAML file, or built directly (e.g. in tests) without ever reading
/// a file.
#[derive(Debug, Clone)]
pub struct Config {
    pub global: Global,
    pub sites: HashMap<String, SiteConfig>,
}

/// Default refresh period when a site's `check_period` is omitted.
pub const DEFAULT_CHECK_PERIOD: Duration = Duration::from_secs(10);

impl Config {
    /// Normalizes a raw, just-deserialized document: applies defaults,
    /// forces the reserved `default` site's domain/path/port, and ensures
    /// every path begins with `/`.
    pub fn from_raw(raw: ConfigRaw) -> Self {
        let listening_port = raw.global.listening_port;
        let mut sites = HashMap::with_capacity(raw.sites.len());

        for (name, site) in raw.sites {
            let mut path = site.path.unwrap_or_else(|| "/".to_string());
            if !path.starts_with('/') {
                path = format!("/{path}");
            }
            let mut domain = site.domain.unwrap_or_default();
            let mut port = site.port.unwrap_or(listening_port);

            if name == DEFAULT_SITE_NAME {
                domain = String::new();
                path = "/".to_string();
                port = listening_port;
            }

            sites.insert(
                name,
                SiteConfig {
                    endpoints: site.endpoints,
                    refresh_period: site.check_period.unwrap_or(DEFAULT_CHECK_PERIOD),
                    domain,
                    path,
                    port,
                },
            );
        }

        Config {
            global: Global {
                listening_port,
                log_level: raw.global.log_level,
            },
            sites,
        }
    }
}
