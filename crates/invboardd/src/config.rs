//! invboardd.toml configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Directory served under `static_prefix`.
    pub static_dir: PathBuf,
    pub static_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            static_dir: PathBuf::from("static"),
            static_prefix: "/static".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    /// `"20s"`, `"500ms"`, `"1m"`, or a bare number of seconds.
    pub timeout: String,
    pub page_size: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            timeout: "20s".to_string(),
            page_size: invboard_dashboard::DEFAULT_PAGE_SIZE,
        }
    }
}

impl BackendConfig {
    /// Parsed `timeout`. The unit suffix is `ms`, `s` or `m`; a bare number
    /// counts seconds.
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        let raw = self.timeout.trim();
        let (amount, unit_ms) = if let Some(n) = raw.strip_suffix("ms") {
            (n, 1)
        } else if let Some(n) = raw.strip_suffix('s') {
            (n, 1_000)
        } else if let Some(n) = raw.strip_suffix('m') {
            (n, 60_000)
        } else {
            (raw, 1_000)
        };
        let millis = amount
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(unit_ms))
            .with_context(|| format!("invalid backend timeout {:?}", self.timeout))?;
        Ok(Duration::from_millis(millis))
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind.port(), 5000);
        assert_eq!(config.server.static_prefix, "/static");
        assert_eq!(config.backend.url, "http://localhost:8080");
        assert_eq!(config.backend.timeout().unwrap(), Duration::from_secs(20));
        assert_eq!(config.backend.page_size, invboard_dashboard::DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[server]
bind = "0.0.0.0:8000"

[backend]
url = "https://puppetdb.example:8081"
timeout = "1m"
"#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.server.static_dir, PathBuf::from("static"));
        assert_eq!(config.backend.url, "https://puppetdb.example:8081");
        assert_eq!(config.backend.timeout().unwrap(), Duration::from_secs(60));
        assert_eq!(config.backend.page_size, 100);
    }

    #[test]
    fn bad_timeout_is_an_error() {
        let backend = BackendConfig {
            timeout: "soon".to_string(),
            ..BackendConfig::default()
        };
        assert!(backend.timeout().is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::from_file(Path::new("/nonexistent/invboardd.toml")).is_err());
    }

    fn timeout(raw: &str) -> anyhow::Result<Duration> {
        BackendConfig {
            timeout: raw.to_string(),
            ..BackendConfig::default()
        }
        .timeout()
    }

    #[test]
    fn timeout_units() {
        assert_eq!(timeout("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(timeout("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(timeout("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(timeout(" 10 ").unwrap(), Duration::from_secs(10));
        assert!(timeout("x").is_err());
        assert!(timeout("-1s").is_err());
    }

    #[test]
    fn huge_timeout_is_an_error() {
        assert!(timeout(&format!("{}m", u64::MAX)).is_err());
        assert!(timeout(&format!("{}s", u64::MAX / 10)).is_err());
        assert_eq!(
            timeout(&format!("{}ms", u64::MAX)).unwrap(),
            Duration::from_millis(u64::MAX)
        );
    }
}
