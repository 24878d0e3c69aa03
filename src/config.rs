//! Run configuration, loaded from YAML.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;

/// Configuration for an HTTP traffic run.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Target URLs, in rank order. Alternative to `targets_file`.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Path to a targets file: one URL per line, or the two-column
    /// `Index,URL` CSV produced by the companion URL-list tooling.
    #[serde(default)]
    pub targets_file: Option<PathBuf>,

    /// Use only the first this-many targets of the list.
    #[serde(default)]
    pub url_count: Option<usize>,

    /// Total number of requests to submit.
    pub num_requests: u64,

    /// Target submission rate in requests per second.
    pub requests_per_second: f64,

    /// Zipf-Mandelbrot parameters for target selection.
    pub zipf: ZipfParams,

    /// Local source addresses to bind outgoing connections to, one client
    /// per address. Empty means a single client on the default route.
    #[serde(default)]
    pub source_addrs: Vec<IpAddr>,

    /// Per-call network timeout.
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Maximum number of measurements executing at once.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Maximum concurrent sub-resource fetches within one measurement.
    #[serde(default = "default_subfetch_concurrency")]
    pub subfetch_concurrency: usize,

    /// Where to write the tab-separated request log.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

/// The two real-valued parameters of the Zipf-Mandelbrot model.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ZipfParams {
    /// Rank offset; must be greater than -1.
    pub q: f64,
    /// Skew exponent; 0 yields a uniform distribution.
    pub s: f64,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_in_flight() -> usize {
    100
}

fn default_subfetch_concurrency() -> usize {
    10
}

fn default_log_file() -> PathBuf {
    PathBuf::from("request_log_http.log")
}

impl Config {
    /// Resolves the target URL list from the inline list or the targets
    /// file, truncated to `url_count` if set.
    pub fn resolve_targets(&self) -> Result<Vec<Url>> {
        let mut raw = match &self.targets_file {
            Some(path) => load_targets_file(path)
                .with_context(|| format!("failed to read targets file {}", path.display()))?,
            None => self.targets.clone(),
        };

        if let Some(count) = self.url_count {
            raw.truncate(count);
        }
        if raw.is_empty() {
            bail!("no target URLs configured");
        }

        raw.iter()
            .map(|t| Url::parse(t).with_context(|| format!("invalid target URL `{t}`")))
            .collect()
    }
}

/// Parses a targets file.
///
/// Accepts one URL per line, or CSV lines of the form `index,url` with an
/// optional `Index,URL` header (the format the URL-list generator emits).
fn load_targets_file(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;

    let mut targets = Vec::new();
    for line in contents.lines() {
        let field = match line.rsplit_once(',') {
            Some((_, url)) => url.trim(),
            None => line.trim(),
        };
        if field.is_empty() || field.eq_ignore_ascii_case("url") {
            continue;
        }
        targets.push(field.to_string());
    }

    Ok(targets)
}

/// Configuration for the fixed-count UDP packet blaster.
#[derive(Debug, Deserialize)]
pub struct UdpConfig {
    /// Destination address and port.
    pub target: SocketAddr,

    /// Size of each packet's payload in bytes.
    #[serde(default = "default_packet_size")]
    pub packet_size: usize,

    /// Number of packets to send.
    #[serde(default = "default_packet_count")]
    pub packet_count: u64,

    /// Delay between packets; zero sends back to back.
    #[serde(with = "humantime_serde", default)]
    pub delay: Duration,

    /// Local source address to bind the socket to.
    #[serde(default)]
    pub source_addr: Option<IpAddr>,
}

fn default_packet_size() -> usize {
    512
}

fn default_packet_count() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn full_config_parses() {
        let yaml = r#"
targets:
  - http://10.0.0.1/index1.html
  - http://10.0.0.1/index2.html
url_count: 2
num_requests: 500
requests_per_second: 25.0
zipf:
  q: 0.5
  s: 1.2
source_addrs:
  - 10.60.0.3
  - 10.60.0.4
request_timeout: 2s
max_in_flight: 50
subfetch_concurrency: 5
log_file: /tmp/run.log
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.num_requests, 500);
        assert_eq!(config.requests_per_second, 25.0);
        assert_eq!(config.zipf.q, 0.5);
        assert_eq!(config.source_addrs.len(), 2);
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.max_in_flight, 50);
        assert_eq!(config.resolve_targets().unwrap().len(), 2);
    }

    #[test]
    fn defaults_apply() {
        let yaml = r#"
targets: [http://x/]
num_requests: 1
requests_per_second: 1.0
zipf: { q: 0.0, s: 1.0 }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_in_flight, 100);
        assert_eq!(config.subfetch_concurrency, 10);
        assert_eq!(config.log_file, PathBuf::from("request_log_http.log"));
        assert!(config.source_addrs.is_empty());
    }

    #[test]
    fn url_count_truncates() {
        let yaml = r#"
targets: [http://x/1, http://x/2, http://x/3]
url_count: 2
num_requests: 1
requests_per_second: 1.0
zipf: { q: 0.0, s: 1.0 }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let targets = config.resolve_targets().unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].as_str(), "http://x/2");
    }

    #[test]
    fn empty_targets_are_rejected() {
        let yaml = r#"
num_requests: 1
requests_per_second: 1.0
zipf: { q: 0.0, s: 1.0 }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.resolve_targets().is_err());
    }

    #[test]
    fn targets_file_accepts_csv_and_plain_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Index,URL").unwrap();
        writeln!(file, "0,http://10.0.0.1/index1.html").unwrap();
        writeln!(file, "1,http://10.0.0.1/index2.html").unwrap();
        writeln!(file, "http://10.0.0.1/index3.html").unwrap();
        writeln!(file).unwrap();

        let targets = load_targets_file(file.path()).unwrap();
        assert_eq!(
            targets,
            vec![
                "http://10.0.0.1/index1.html",
                "http://10.0.0.1/index2.html",
                "http://10.0.0.1/index3.html",
            ]
        );
    }

    #[test]
    fn udp_config_parses_with_defaults() {
        let yaml = "target: 192.168.1.100:9999";
        let config: UdpConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.packet_size, 512);
        assert_eq!(config.packet_count, 1000);
        assert_eq!(config.delay, Duration::ZERO);
        assert!(config.source_addr.is_none());
    }
}
