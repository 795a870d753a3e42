//! Station configuration.
//!
//! Serial line parameters, query timing, the HTTP bind address, and link
//! retry behavior all live in an explicit configuration struct, loadable
//! from a YAML file with
//! per-field defaults. A missing file means all defaults.

use crate::light;
use crate::link::RetryPolicy;
use crate::sync_client::QueryTiming;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cannot open config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Serial line and query timing parameters for the soil probe.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SerialConfig {
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Length of the response collection window.
    #[serde(default = "default_response_timeout", with = "humantime_serde")]
    pub response_timeout: Duration,
    /// Bus-settling guard before each transmission.
    #[serde(default = "default_pre_send_delay", with = "humantime_serde")]
    pub pre_send_delay: Duration,
    /// Minimum interval between consecutive queries (probe duty cycle).
    #[serde(default = "default_inter_query_interval", with = "humantime_serde")]
    pub inter_query_interval: Duration,
}

fn default_device() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

fn default_baud_rate() -> u32 {
    crate::transport::BAUD_RATE
}

fn default_response_timeout() -> Duration {
    Duration::from_millis(100)
}

fn default_pre_send_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_inter_query_interval() -> Duration {
    Duration::from_millis(100)
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud_rate: default_baud_rate(),
            response_timeout: default_response_timeout(),
            pre_send_delay: default_pre_send_delay(),
            inter_query_interval: default_inter_query_interval(),
        }
    }
}

impl SerialConfig {
    pub fn query_timing(&self) -> QueryTiming {
        QueryTiming {
            pre_send_delay: self.pre_send_delay,
            response_timeout: self.response_timeout,
            inter_query_interval: self.inter_query_interval,
        }
    }
}

/// HTTP endpoint parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    String::from("0.0.0.0:8080")
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Link supervision parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    /// Maximum connect attempts; omit for indefinite retry.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: Option<u32>,
    #[serde(default = "default_initial_backoff", with = "humantime_serde")]
    pub initial_backoff: Duration,
    #[serde(default = "default_max_backoff", with = "humantime_serde")]
    pub max_backoff: Duration,
    /// Consecutive I/O failures before the serial link is reopened.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Cadence of the periodic link health check in serve mode.
    #[serde(default = "default_check_interval", with = "humantime_serde")]
    pub check_interval: Duration,
}

fn default_max_attempts() -> Option<u32> {
    Some(10)
}

fn default_initial_backoff() -> Duration {
    Duration::from_secs(1)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(30)
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_check_interval() -> Duration {
    Duration::from_secs(5)
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            failure_threshold: default_failure_threshold(),
            check_interval: default_check_interval(),
        }
    }
}

impl LinkConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: self.initial_backoff,
            max_backoff: self.max_backoff,
        }
    }
}

/// Light sensor parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LightConfig {
    #[serde(default)]
    pub gain: light::Gain,
    #[serde(default)]
    pub integration_time: light::IntegrationTime,
}

/// Complete station configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StationConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub light: LightConfig,
}

impl StationConfig {
    /// Loads the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Loads `path` when it exists, otherwise returns all defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, Error> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_probe_duty_cycle() {
        let config = StationConfig::default();
        assert_eq!(config.serial.baud_rate, 4800);
        assert_eq!(config.serial.response_timeout, Duration::from_millis(100));
        assert_eq!(config.serial.pre_send_delay, Duration::from_millis(100));
        assert_eq!(
            config.serial.inter_query_interval,
            Duration::from_millis(100)
        );
        assert_eq!(config.http.bind, "0.0.0.0:8080");
        assert_eq!(config.link.max_attempts, Some(10));
        assert_eq!(config.link.check_interval, Duration::from_secs(5));
    }

    #[test]
    fn link_check_interval_parses_as_duration() {
        let config: StationConfig =
            serde_yaml::from_str("link:\n  check_interval: 500ms\n").unwrap();
        assert_eq!(config.link.check_interval, Duration::from_millis(500));
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: StationConfig = serde_yaml::from_str(
            "serial:\n  device: /dev/ttyS5\n  response_timeout: 250ms\nhttp:\n  bind: 127.0.0.1:9000\n",
        )
        .unwrap();
        assert_eq!(config.serial.device, "/dev/ttyS5");
        assert_eq!(config.serial.response_timeout, Duration::from_millis(250));
        assert_eq!(config.serial.baud_rate, 4800);
        assert_eq!(config.http.bind, "127.0.0.1:9000");
        assert_eq!(config.link.failure_threshold, 3);
    }

    #[test]
    fn unbounded_retry_is_expressible() {
        let config: StationConfig =
            serde_yaml::from_str("link:\n  max_attempts: null\n").unwrap();
        assert_eq!(config.link.max_attempts, None);
        assert_eq!(config.link.retry_policy().max_attempts, None);
    }

    #[test]
    fn light_settings_parse_by_name() {
        let config: StationConfig =
            serde_yaml::from_str("light:\n  gain: high\n  integration_time: 101ms\n").unwrap();
        assert_eq!(config.light.gain, light::Gain::High);
        assert_eq!(
            config.light.integration_time,
            light::IntegrationTime::Ms101
        );
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = StationConfig::default();
        let serialized = serde_yaml::to_string(&config).unwrap();
        let parsed: StationConfig = serde_yaml::from_str(&serialized).unwrap();
        assert_eq!(parsed.serial.device, config.serial.device);
        assert_eq!(parsed.link.max_attempts, config.link.max_attempts);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_yaml::from_str::<StationConfig>("wifi:\n  ssid: x\n").is_err());
    }
}
