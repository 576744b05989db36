//! # Metrics
//!
//! Prometheus export for the cache and gateway layers, served at `GET /metrics`.
//!
//! ## Metrics Tracked
//!
//! **Counters:**
//! - `salespulse_cache_reads_total{outcome}` - `get_data` calls by tier decision
//!   (`fresh`, `stale`, `miss`, `range_change`, `forced`)
//! - `salespulse_cache_fetch_cycles_total{result}` - Completed fetch cycles
//! - `salespulse_gateway_pages_total{collection}` - Pages fetched
//! - `salespulse_gateway_records_total{collection}` - Raw records received
//! - `salespulse_gateway_errors_total{collection, kind}` - Failed page requests
//!
//! **Histograms:**
//! - `salespulse_cache_cycle_seconds` - Fetch cycle duration
//!
//! **Gauges** (refreshed on every scrape):
//! - `salespulse_snapshot_records{collection}` - Records in the current snapshot
//! - `salespulse_snapshot_age_seconds` - Age of the current snapshot
//! - `salespulse_cache_subscribers` - Registered cache subscribers

pub mod handler;

pub use metrics_exporter_prometheus::PrometheusBuilder;

use crate::cache::CacheCoordinator;
use metrics_exporter_prometheus::{Matcher, PrometheusHandle};
use std::time::Instant;

/// Derives gauges from the cache and renders the Prometheus text output.
pub struct MetricsCollector {
    cache: CacheCoordinator,
    start_time: Instant,
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(
        cache: CacheCoordinator,
        start_time: Instant,
        prometheus_handle: PrometheusHandle,
    ) -> Self {
        Self {
            cache,
            start_time,
            prometheus_handle,
        }
    }

    /// Set the snapshot gauges from the current cache state.
    pub fn update_cache_gauges(&self) {
        let state = self.cache.get_cache_state();
        metrics::gauge!("salespulse_cache_subscribers").set(self.cache.subscriber_count() as f64);

        let Some(snapshot) = state.data else {
            return;
        };
        let counts = snapshot.counts();
        for (collection, count) in [
            ("sellers", counts.sellers),
            ("contacts", counts.contacts),
            ("all_contacts", counts.all_contacts),
            ("interactions", counts.interactions),
            ("sales", counts.sales),
            ("attempts", counts.attempts),
        ] {
            metrics::gauge!("salespulse_snapshot_records", "collection" => collection)
                .set(count as f64);
        }

        let age = (self.cache.now() - snapshot.fetched_at).num_milliseconds().max(0);
        metrics::gauge!("salespulse_snapshot_age_seconds").set(age as f64 / 1000.0);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn render_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}

/// Install the global Prometheus recorder.
///
/// Cycle durations use buckets from 50ms to 2 minutes.
pub fn setup_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    let cycle_buckets = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("salespulse_cache_cycle_seconds".to_string()),
            cycle_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Global recorder when possible, otherwise a detached handle.
///
/// Installing twice fails (tests build many servers in one process); the
/// detached handle then renders only what it records itself.
pub fn handle_or_detached() -> PrometheusHandle {
    setup_metrics().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Metrics recorder already installed, using detached handle");
        PrometheusBuilder::new().build_recorder().handle()
    })
}

/// Process-wide recorder shared by all unit tests.
#[cfg(test)]
pub(crate) fn test_handle() -> PrometheusHandle {
    use std::sync::{Mutex, Once};

    static INIT: Once = Once::new();
    static TEST_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

    INIT.call_once(|| {
        // build_recorder needs no runtime
        let recorder = PrometheusBuilder::new().build_recorder();
        *TEST_HANDLE.lock().unwrap() = Some(recorder.handle());
        metrics::set_global_recorder(Box::new(recorder)).ok();
    });
    TEST_HANDLE.lock().unwrap().as_ref().unwrap().clone()
}
