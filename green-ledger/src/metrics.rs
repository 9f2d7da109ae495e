//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `ledger_logins_total` - Identity resolutions served
//! - `ledger_mints_total` - Credits minted
//! - `ledger_transfers_total` - Ownership transfers recorded
//! - `ledger_retires_total` - Credits retired
//! - `ledger_mutation_duration_seconds` - Histogram of mutation latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Identity resolutions served
    pub logins_total: IntCounter,

    /// Credits minted
    pub mints_total: IntCounter,

    /// Ownership transfers recorded
    pub transfers_total: IntCounter,

    /// Credits retired
    pub retires_total: IntCounter,

    /// Mutation latency histogram
    pub mutation_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let logins_total =
            IntCounter::new("ledger_logins_total", "Identity resolutions served")?;
        registry.register(Box::new(logins_total.clone()))?;

        let mints_total = IntCounter::new("ledger_mints_total", "Credits minted")?;
        registry.register(Box::new(mints_total.clone()))?;

        let transfers_total =
            IntCounter::new("ledger_transfers_total", "Ownership transfers recorded")?;
        registry.register(Box::new(transfers_total.clone()))?;

        let retires_total = IntCounter::new("ledger_retires_total", "Credits retired")?;
        registry.register(Box::new(retires_total.clone()))?;

        let mutation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_mutation_duration_seconds",
                "Histogram of mutation latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(mutation_duration.clone()))?;

        Ok(Self {
            logins_total,
            mints_total,
            transfers_total,
            retires_total,
            mutation_duration,
            registry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();

        metrics.mints_total.inc();
        metrics.transfers_total.inc();
        metrics.mutation_duration.observe(0.002);

        assert_eq!(metrics.mints_total.get(), 1);
        assert_eq!(metrics.transfers_total.get(), 1);
        assert_eq!(metrics.registry.gather().len(), 5);
    }
}
