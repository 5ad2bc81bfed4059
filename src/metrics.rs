//! Metrics collection and export module

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub transactions_built: IntCounterVec,
    pub transaction_build_failures: IntCounterVec,
    pub dry_run_steps: IntCounterVec,
    pub verifications: IntCounterVec,
    pub endpoint_failovers: IntCounter,
    pub boundary_rejections: IntCounterVec,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let transactions_built = IntCounterVec::new(
            Opts::new("teleburn_transactions_built_total", "Unsigned transactions built"),
            &["kind"],
        )?;

        let transaction_build_failures = IntCounterVec::new(
            Opts::new(
                "teleburn_transaction_build_failures_total",
                "Transaction builds rejected, by error kind",
            ),
            &["kind"],
        )?;

        let dry_run_steps = IntCounterVec::new(
            Opts::new("teleburn_dry_run_steps_total", "Dry-run steps by outcome"),
            &["step", "outcome"],
        )?;

        let verifications = IntCounterVec::new(
            Opts::new("teleburn_verifications_total", "Verification results by status"),
            &["status", "confidence"],
        )?;

        let endpoint_failovers = IntCounter::with_opts(Opts::new(
            "teleburn_endpoint_failovers_total",
            "Ledger reads retried on the next endpoint",
        ))?;

        let boundary_rejections = IntCounterVec::new(
            Opts::new(
                "teleburn_boundary_rejections_total",
                "Requests rejected before core logic",
            ),
            &["reason"],
        )?;

        registry.register(Box::new(transactions_built.clone()))?;
        registry.register(Box::new(transaction_build_failures.clone()))?;
        registry.register(Box::new(dry_run_steps.clone()))?;
        registry.register(Box::new(verifications.clone()))?;
        registry.register(Box::new(endpoint_failovers.clone()))?;
        registry.register(Box::new(boundary_rejections.clone()))?;

        Ok(Self {
            registry,
            transactions_built,
            transaction_build_failures,
            dry_run_steps,
            verifications,
            endpoint_failovers,
            boundary_rejections,
        })
    }

    /// Prometheus text exposition of every registered metric
    pub fn export(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

static METRICS: Lazy<Metrics> =
    Lazy::new(|| Metrics::new().expect("metric definitions are static and valid"));

/// Get global metrics instance
pub fn metrics() -> &'static Metrics {
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let m = Metrics::new().unwrap();
        m.transactions_built.with_label_values(&["seal"]).inc();
        m.endpoint_failovers.inc();
        assert_eq!(m.transactions_built.with_label_values(&["seal"]).get(), 1);
        assert_eq!(m.endpoint_failovers.get(), 1);
    }

    #[test]
    fn test_export_contains_counters() {
        let m = Metrics::new().unwrap();
        m.verifications
            .with_label_values(&["burned", "low"])
            .inc();
        let text = m.export();
        assert!(text.contains("teleburn_verifications_total"));
    }

    #[test]
    fn test_global_metrics_available() {
        let before = metrics().endpoint_failovers.get();
        metrics().endpoint_failovers.inc();
        assert!(metrics().endpoint_failovers.get() > before);
    }
}
