//! Configuration management for usage reporting

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::privacy::SendValues;
use crate::proto::ReportHeader;

/// Prefix of environment variables overriding configuration values
pub const ENV_PREFIX: &str = "USAGE_REPORTING";

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Report accumulation and flushing
    pub reporting: ReportingConfig,

    /// What request data may leave the process
    pub privacy: PrivacyConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from an optional file, overridden by
    /// `USAGE_REPORTING__<SECTION>__<KEY>` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let config = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

/// Report accumulation and flushing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Flush interval in milliseconds
    pub report_interval_ms: u64,
    /// Estimated report size that forces an early flush
    pub max_uncompressed_report_size: usize,
    /// Flush after every trace
    pub send_reports_immediately: bool,
    /// Send sampled traces verbatim; when off everything is aggregated
    pub send_traces: bool,
    /// Byte budget of the trace sampling cache
    pub trace_cache_max_bytes: usize,
    /// Capacity of the trace submission channel
    pub channel_capacity: usize,
    /// Graph reference stamped on every report
    pub graph_ref: String,
    /// Hostname stamped on every report; empty means detect
    pub hostname: String,
    /// Agent version stamped on every report
    pub agent_version: String,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: 10_000,
            max_uncompressed_report_size: 4 * 1024 * 1024,
            send_reports_immediately: false,
            send_traces: true,
            trace_cache_max_bytes: 1024 * 1024,
            channel_capacity: 1024,
            graph_ref: String::new(),
            hostname: String::new(),
            agent_version: concat!("usage-reporting ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ReportingConfig {
    /// Flush interval as a `Duration`
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    /// Header attached to every outbound report
    pub fn report_header(&self) -> ReportHeader {
        let hostname = if self.hostname.is_empty() {
            std::env::var("HOSTNAME").unwrap_or_default()
        } else {
            self.hostname.clone()
        };

        ReportHeader {
            hostname,
            agent_version: self.agent_version.clone(),
            runtime_version: "rust".to_string(),
            uname: format!("{}, {}", std::env::consts::OS, std::env::consts::ARCH),
            graph_ref: self.graph_ref.clone(),
        }
    }
}

/// What request data may leave the process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Policy for operation variable values
    pub send_variable_values: SendValues,
    /// Policy for HTTP request headers
    pub send_headers: SendValues,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directives
    pub level: String,
    /// Log format (json or pretty)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
