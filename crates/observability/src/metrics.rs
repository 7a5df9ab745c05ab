//! Prometheus metrics for the GEX refresh pipeline
//!
//! All recording goes through the `metrics` facade; without an installed
//! exporter every call is a no-op, which keeps tests and one-shot CLI runs
//! free of global setup.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP listener on `0.0.0.0:<port>` exposing `/metrics`.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Metric handles for GEX refresh cycles, labelled by asset.
///
/// # Metrics
///
/// * `gex_refresh_total` - completed refresh cycles
/// * `gex_refresh_failures_total` - cycles that failed upstream (label `reason`)
/// * `gex_instruments_skipped_total` - instruments excluded for missing data
/// * `gex_instruments_processed_total` - instruments that contributed exposure
/// * `gex_refresh_duration_seconds` - wall time per cycle
/// * `gex_net_oi_gex` - latest open-interest net exposure
/// * `gex_cache_hits_total` - refreshes served from the memoizing cache
#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    service: String,
}

impl PipelineMetrics {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Record a successful cycle.
    pub fn record_refresh(&self, asset: &str, processed: usize, skipped: usize, net_oi_gex: Option<f64>) {
        let asset = asset.to_string();
        counter!("gex_refresh_total", "service" => self.service.clone(), "asset" => asset.clone())
            .increment(1);
        counter!("gex_instruments_processed_total", "service" => self.service.clone(), "asset" => asset.clone())
            .increment(processed as u64);
        counter!("gex_instruments_skipped_total", "service" => self.service.clone(), "asset" => asset.clone())
            .increment(skipped as u64);
        if let Some(net) = net_oi_gex {
            gauge!("gex_net_oi_gex", "service" => self.service.clone(), "asset" => asset).set(net);
        }
    }

    /// Record a cycle that failed before producing a result.
    pub fn record_failure(&self, asset: &str, reason: &'static str) {
        counter!(
            "gex_refresh_failures_total",
            "service" => self.service.clone(),
            "asset" => asset.to_string(),
            "reason" => reason
        )
        .increment(1);
    }

    pub fn record_cache_hit(&self, asset: &str) {
        counter!("gex_cache_hits_total", "service" => self.service.clone(), "asset" => asset.to_string())
            .increment(1);
    }

    pub fn record_duration(&self, asset: &str, duration: Duration) {
        histogram!(
            "gex_refresh_duration_seconds",
            "service" => self.service.clone(),
            "asset" => asset.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Start a timer that records `gex_refresh_duration_seconds` on drop.
    pub fn start_timer<'a>(&'a self, asset: &'a str) -> RefreshTimer<'a> {
        RefreshTimer {
            metrics: self,
            asset,
            start: Instant::now(),
        }
    }
}

/// Drop guard recording the elapsed cycle time
///
/// ```ignore
/// let metrics = PipelineMetrics::new("gexd");
/// {
///     let _timer = metrics.start_timer("BTC");
///     // ... run the cycle ...
/// } // duration recorded here
/// ```
pub struct RefreshTimer<'a> {
    metrics: &'a PipelineMetrics,
    asset: &'a str,
    start: Instant,
}

impl RefreshTimer<'_> {
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for RefreshTimer<'_> {
    fn drop(&mut self) {
        self.metrics.record_duration(self.asset, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter_is_noop() {
        let metrics = PipelineMetrics::new("test");
        metrics.record_refresh("BTC", 10, 2, Some(1.5));
        metrics.record_refresh("ETH", 0, 0, None);
        metrics.record_failure("BTC", "upstream");
        metrics.record_cache_hit("BTC");
        assert_eq!(metrics.service(), "test");
    }

    #[test]
    fn test_timer_measures_elapsed() {
        let metrics = PipelineMetrics::new("test");
        let timer = metrics.start_timer("BTC");
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.elapsed() >= Duration::from_millis(2));
    }
}
