//! Reads the YAML configuration file from disk. File loading lives in the
//! core library rather than the binary so it stays unit-testable without a
//! running process.

use std::path::Path;

use log::debug;

use super::model::{Config, ConfigRaw};

/// Environment variable naming the config file path, checked before the
/// `./config.yaml` default.
pub const CONFIG_PATH_ENV: &str = "BALANCER_CONFIG_PATH";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Loads and normalizes the configuration from the path named by
/// `BALANCER_CONFIG_PATH`, defaulting to `./config.yaml`.
pub fn load_settings() -> Result<Config, LoadError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "./config.yaml".to_string());
    load_from_path(Path::new(&path))
}

/// Loads and normalizes the configuration from an explicit path. Split out
/// from [`load_settings`] so tests can point at a fixture without touching
/// the environment.
pub fn load_from_path(path: &Path) -> Result<Config, LoadError> {
    debug!("loading configuration from {}", path.display());
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&raw).map_err(|source| LoadError::Yaml {
        path: path.display().to_string(),
        source,
    })
}

/// Parses and normalizes configuration from an in-memory YAML document.
/// Kept separate from file I/O so the normalization rules are
/// unit-testable without a filesystem fixture.
pub fn parse(yaml: &str) -> Result<Config, serde_yaml::Error> {
    let raw: ConfigRaw = serde_yaml::from_str(yaml)?;
    Ok(Config::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_site_is_forced_to_root_path_and_global_port() {
        let yaml = r#"
global:
  listening_port: 8080
  log_level: 1
sites:
  default:
    endpoints:
      - "http://127.0.0.1:5678"
    path: "/custom"
    port: 9999
    domain: "example.com"
"#;
        let config = parse(yaml).expect("valid config");
        let default_site = &config.sites["default"];
        assert_eq!(default_site.path, "/");
        assert_eq!(default_site.port, 8080);
        assert_eq!(default_site.domain, "");
    }

    #[test]
    fn non_default_site_path_is_normalized_to_start_with_slash() {
        let yaml = r#"
global:
  listening_port: 8080
  log_level: 1
sites:
  api:
    endpoints:
      - "http://127.0.0.1:5678"
    path: "examplepath"
"#;
        let config = parse(yaml).expect("valid config");
        assert_eq!(config.sites["api"].path, "/examplepath");
    }

    #[test]
    fn missing_check_period_defaults_to_ten_seconds() {
        let yaml = r#"
global:
  listening_port: 8080
  log_level: 1
sites:
  api:
    endpoints:
      - "http://127.0.0.1:5678"
"#;
        let config = parse(yaml).expect("valid config");
        assert_eq!(
            config.sites["api"].refresh_period,
            std::time::Duration::from_secs(10)
        );
    }

    #[test]
    fn explicit_check_period_is_parsed() {
        let yaml = r#"
global:
  listening_port: 8080
  log_level: 1
sites:
  api:
    endpoints:
      - "http://127.0.0.1:5678"
    check_period: "1s"
"#;
        let config = parse(yaml).expect("valid config");
        assert_eq!(
            config.sites["api"].refresh_period,
            std::time::Duration::from_secs(1)
        );
    }

    #[test]
    fn load_from_path_reads_and_normalizes_a_real_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
global:
  listening_port: 8080
  log_level: 1
sites:
  default:
    endpoints:
      - "http://127.0.0.1:5678"
"#,
        )
        .expect("write fixture");

        let config = load_from_path(&path).expect("valid config file");
        assert_eq!(config.sites["default"].port, 8080);
    }

    #[test]
    fn load_from_path_reports_io_error_for_missing_file() {
        let err = load_from_path(Path::new("/nonexistent/path/config.yaml")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn load_from_path_reports_yaml_error_for_malformed_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "not: [valid, yaml: structure").expect("write fixture");

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, LoadError::Yaml { .. }));
    }
}
