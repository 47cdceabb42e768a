//! Pipeline metrics
//!
//! Counters and gauges are independent atomics with no cross-field
//! transaction: a snapshot taken during a feed may show a new total with
//! an old average. Floating-point gauges are stored as `f64` bits.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live pipeline counters, shared between the feeding and consuming threads
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Batches accepted by the queue
    total_processed: AtomicU64,
    /// Feeds rejected because the queue was full
    queue_full_count: AtomicU64,
    /// Rejected feeds that found the queue saturated and waited
    backpressure_events: AtomicU64,
    /// Running mean feed latency in ns (f64 bits)
    average_latency_ns: AtomicU64,
    /// Largest feed latency in ns
    max_latency_ns: AtomicU64,
    /// Events fed into the entropy window
    entropy_updates: AtomicU64,
    /// Last published entropy (f64 bits)
    current_entropy: AtomicU64,
    /// Last published change rate (f64 bits)
    entropy_change_rate: AtomicU64,
}

impl PipelineMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted feed and its latency
    pub fn record_feed(&self, latency: Duration) {
        let latency_ns = latency.as_nanos().min(u64::MAX as u128) as u64;

        // The count goes first: the running mean divides by it.
        let count = self.total_processed.fetch_add(1, Ordering::SeqCst) + 1;

        self.max_latency_ns.fetch_max(latency_ns, Ordering::Relaxed);

        let _ = self
            .average_latency_ns
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                let avg = f64::from_bits(bits);
                let next = avg + (latency_ns as f64 - avg) / count as f64;
                Some(next.to_bits())
            });
    }

    /// Record a feed rejected by a full queue
    pub fn record_queue_full(&self) {
        self.queue_full_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected feed that waited for backpressure relief
    pub fn record_backpressure(&self) {
        self.backpressure_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Record events admitted to the entropy window
    pub fn record_entropy_updates(&self, events: u64) {
        self.entropy_updates.fetch_add(events, Ordering::Relaxed);
    }

    /// Publish the latest entropy gauges
    pub fn set_entropy(&self, entropy: f64, change_rate: f64) {
        self.current_entropy.store(entropy.to_bits(), Ordering::Relaxed);
        self.entropy_change_rate.store(change_rate.to_bits(), Ordering::Relaxed);
    }

    /// Copy every counter and gauge
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_processed: self.total_processed.load(Ordering::SeqCst),
            queue_full_count: self.queue_full_count.load(Ordering::Relaxed),
            backpressure_events: self.backpressure_events.load(Ordering::Relaxed),
            average_latency_ns: f64::from_bits(self.average_latency_ns.load(Ordering::Relaxed)),
            max_latency_ns: self.max_latency_ns.load(Ordering::Relaxed),
            entropy_updates: self.entropy_updates.load(Ordering::Relaxed),
            current_entropy: f64::from_bits(self.current_entropy.load(Ordering::Relaxed)),
            entropy_change_rate: f64::from_bits(
                self.entropy_change_rate.load(Ordering::Relaxed),
            ),
        }
    }
}

/// Point-in-time copy of [`PipelineMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_processed: u64,
    pub queue_full_count: u64,
    pub backpressure_events: u64,
    pub average_latency_ns: f64,
    pub max_latency_ns: u64,
    pub entropy_updates: u64,
    pub current_entropy: f64,
    pub entropy_change_rate: f64,
}

impl MetricsSnapshot {
    /// Share of feeds rejected by a full queue (0.0 - 1.0)
    pub fn rejection_rate(&self) -> f64 {
        let attempts = self.total_processed + self.queue_full_count;
        if attempts == 0 {
            return 0.0;
        }
        self.queue_full_count as f64 / attempts as f64
    }

    /// Generate a human-readable report
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Tradeflow Pipeline Metrics ===\n\n");

        report.push_str(&format!("Batches processed: {}\n", self.total_processed));
        report.push_str(&format!("Queue full: {}\n", self.queue_full_count));
        report.push_str(&format!(
            "Backpressure events: {}\n",
            self.backpressure_events
        ));
        report.push_str(&format!(
            "Rejection rate: {:.1}%\n\n",
            self.rejection_rate() * 100.0
        ));

        report.push_str(&format!(
            "Average latency: {:.0} ns\n",
            self.average_latency_ns
        ));
        report.push_str(&format!("Max latency: {} ns\n\n", self.max_latency_ns));

        report.push_str(&format!("Entropy updates: {}\n", self.entropy_updates));
        report.push_str(&format!(
            "Current entropy: {:.4} bits\n",
            self.current_entropy
        ));
        report.push_str(&format!(
            "Entropy change rate: {:.4} bits/s\n",
            self.entropy_change_rate
        ));

        report
    }
}
