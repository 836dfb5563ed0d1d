//! Layered application settings.
//!
//! Defaults, then an optional TOML file, then `FLEET_*` environment
//! variables; CLI flags are applied on top by `main`.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::HEARTBEAT_TTL_SECS;

/// Default period of the liveness re-evaluation ticker, in seconds.
const DEFAULT_REFRESH_SECS: u64 = 70;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// REST backend base URL.
    pub api_url: String,
    /// MQTT broker URL (`mqtt://host:port`, `tcp://host:port`, or `host:port`).
    pub broker_url: String,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub api_username: Option<String>,
    pub api_password: Option<String>,
    /// Heartbeat TTL in seconds, for devices and the monitor alike.
    pub heartbeat_ttl_secs: u64,
    /// Period of the liveness re-evaluation ticker, in seconds.
    pub refresh_secs: u64,
}

impl Settings {
    /// Load settings from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("api_url", "http://localhost:8000")?
            .set_default("broker_url", "mqtt://localhost:1883")?
            .set_default("heartbeat_ttl_secs", HEARTBEAT_TTL_SECS as i64)?
            .set_default("refresh_secs", DEFAULT_REFRESH_SECS as i64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(Environment::with_prefix("FLEET"))
            .build()
            .context("loading configuration")?;

        config.try_deserialize().context("invalid configuration")
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.heartbeat_ttl_secs)
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    /// Host and port of the broker, parsed from `broker_url`.
    pub fn broker_host_port(&self) -> Result<(String, u16)> {
        parse_broker_url(&self.broker_url)
    }
}

/// Parse `mqtt://host:port` (scheme and port optional) into host and port.
pub fn parse_broker_url(url: &str) -> Result<(String, u16)> {
    let rest = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    if rest.is_empty() {
        bail!("empty broker URL");
    }

    match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("invalid broker port in {url:?}"))?;
            if host.is_empty() {
                bail!("missing broker host in {url:?}");
            }
            Ok((host.to_string(), port))
        }
        None => Ok((rest.to_string(), 1883)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.heartbeat_ttl_secs, 60);
        assert_eq!(settings.refresh_secs, 70);
        assert_eq!(settings.ttl(), Duration::from_secs(60));
        assert!(settings.api_username.is_none());
    }

    #[test]
    fn test_parse_broker_url() {
        assert_eq!(
            parse_broker_url("mqtt://broker.local:1883").unwrap(),
            ("broker.local".to_string(), 1883)
        );
        assert_eq!(
            parse_broker_url("tcp://10.0.0.5:8883").unwrap(),
            ("10.0.0.5".to_string(), 8883)
        );
        assert_eq!(
            parse_broker_url("broker.local").unwrap(),
            ("broker.local".to_string(), 1883)
        );
    }

    #[test]
    fn test_parse_broker_url_rejects_garbage() {
        assert!(parse_broker_url("mqtt://").is_err());
        assert!(parse_broker_url("mqtt://host:notaport").is_err());
        assert!(parse_broker_url("mqtt://:1883").is_err());
    }
}
