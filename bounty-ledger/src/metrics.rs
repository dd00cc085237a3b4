//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `ledger_intents_total` - Intents processed
//! - `ledger_intent_failures_total` - Intents that ended in an error reply
//! - `ledger_log_entries_total` - Audit log entries appended
//! - `ledger_active_bounties` - Currently active bounties

use prometheus::{IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Intents processed
    pub intents_total: IntCounter,

    /// Intents that ended in an error reply
    pub intent_failures: IntCounter,

    /// Audit log entries appended
    pub log_entries_total: IntCounter,

    /// Currently active bounties
    pub active_bounties: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let intents_total =
            IntCounter::new("ledger_intents_total", "Intents processed")?;
        registry.register(Box::new(intents_total.clone()))?;

        let intent_failures = IntCounter::new(
            "ledger_intent_failures_total",
            "Intents that ended in an error reply",
        )?;
        registry.register(Box::new(intent_failures.clone()))?;

        let log_entries_total =
            IntCounter::new("ledger_log_entries_total", "Audit log entries appended")?;
        registry.register(Box::new(log_entries_total.clone()))?;

        let active_bounties =
            IntGauge::new("ledger_active_bounties", "Currently active bounties")?;
        registry.register(Box::new(active_bounties.clone()))?;

        Ok(Self {
            intents_total,
            intent_failures,
            log_entries_total,
            active_bounties,
            registry,
        })
    }

    /// Record a processed intent and whether it failed
    pub fn record_intent(&self, failed: bool) {
        self.intents_total.inc();
        if failed {
            self.intent_failures.inc();
        }
    }

    /// Record an appended audit entry
    pub fn record_log_entry(&self) {
        self.log_entries_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
