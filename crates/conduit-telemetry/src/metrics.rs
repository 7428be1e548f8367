//! Metric name constants and recording helpers

use std::time::Instant;

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram};

/// Resolutions that produced a candidate, by tier
pub const RESOLUTION_COUNT: &str = "conduit.resolution.count";
/// Backend dispatch attempts, by backend and outcome
pub const DISPATCH_COUNT: &str = "conduit.dispatch.count";
/// Backend dispatch latency in seconds
pub const DISPATCH_DURATION: &str = "conduit.dispatch.duration";
/// Logical requests that ran out of failover attempts
pub const FAILOVER_EXHAUSTED_COUNT: &str = "conduit.failover.exhausted.count";

/// Record a duration measurement on a histogram
pub fn record_duration(histogram: &Histogram<f64>, start: Instant, attributes: &[KeyValue]) {
    histogram.record(start.elapsed().as_secs_f64(), attributes);
}

/// Instruments for the routing and failover core
///
/// Built from the global meter, so recording is a no-op until an OTLP
/// metrics pipeline is installed.
#[derive(Clone)]
pub struct GatewayMetrics {
    resolutions: Counter<u64>,
    dispatches: Counter<u64>,
    dispatch_duration: Histogram<f64>,
    exhausted: Counter<u64>,
}

impl GatewayMetrics {
    /// Create the instruments on the global `conduit` meter
    pub fn new() -> Self {
        let meter = opentelemetry::global::meter("conduit");

        Self {
            resolutions: meter
                .u64_counter(RESOLUTION_COUNT)
                .with_description("Backend resolutions by routing tier")
                .build(),
            dispatches: meter
                .u64_counter(DISPATCH_COUNT)
                .with_description("Backend dispatch attempts")
                .build(),
            dispatch_duration: meter
                .f64_histogram(DISPATCH_DURATION)
                .with_description("Backend dispatch latency")
                .with_unit("s")
                .build(),
            exhausted: meter
                .u64_counter(FAILOVER_EXHAUSTED_COUNT)
                .with_description("Requests that exhausted every failover attempt")
                .build(),
        }
    }

    /// Count a successful resolution
    pub fn record_resolution(&self, tier: &str) {
        self.resolutions.add(1, &[KeyValue::new("tier", tier.to_owned())]);
    }

    /// Count one dispatch attempt and its latency
    pub fn record_dispatch(&self, backend: &str, outcome: &'static str, start: Instant) {
        let attributes = [
            KeyValue::new("backend", backend.to_owned()),
            KeyValue::new("outcome", outcome),
        ];
        self.dispatches.add(1, &attributes);
        record_duration(&self.dispatch_duration, start, &attributes);
    }

    /// Count a request that ran out of attempts
    pub fn record_exhausted(&self, attempts: usize) {
        self.exhausted.add(
            1,
            &[KeyValue::new("attempts", i64::try_from(attempts).unwrap_or(i64::MAX))],
        );
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_a_provider_is_a_noop() {
        let metrics = GatewayMetrics::new();
        metrics.record_resolution("free");
        metrics.record_dispatch("groq", "success", Instant::now());
        metrics.record_exhausted(3);
    }
}
