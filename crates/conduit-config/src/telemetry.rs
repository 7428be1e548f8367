use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Service name for telemetry metadata
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Additional resource attributes
    #[serde(default)]
    pub resource_attributes: HashMap<String, String>,
    /// Log line format
    #[serde(default)]
    pub log_format: LogFormat,
    /// OTLP exporter for traces and metrics
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
    /// Fraction of traces sampled (0.0 to 1.0)
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    /// How often metrics are exported
    #[serde(default = "default_metrics_interval", deserialize_with = "crate::duration::deserialize")]
    pub metrics_interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            resource_attributes: HashMap::new(),
            log_format: LogFormat::default(),
            exporter: None,
            sampling_rate: default_sampling_rate(),
            metrics_interval: default_metrics_interval(),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// OTLP exporter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    /// OTLP endpoint URL
    pub endpoint: Url,
    /// Export protocol
    #[serde(default)]
    pub protocol: ExportProtocol,
}

/// OTLP export protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportProtocol {
    /// gRPC (default)
    #[default]
    Grpc,
    /// HTTP/protobuf
    HttpProto,
}

fn default_service_name() -> String {
    "conduit".to_owned()
}

const fn default_sampling_rate() -> f64 {
    1.0
}

const fn default_metrics_interval() -> Duration {
    Duration::from_secs(30)
}
