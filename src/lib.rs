//! # Tradeflow - Adaptive entropy pipeline for trader actions
//!
//! Measures how predictable a stream of trader decisions is, in real time.
//!
//! ## Key Features
//!
//! - **Bounded two-lock queue**: pushes and pops never contend, batch pops,
//!   cooperative backpressure
//! - **Sliding-window entropy**: O(1) per event, window size adapts to
//!   regime changes
//! - **Concurrent pipeline**: producer and consumer threads with atomic
//!   metrics and an entropy observer
//!
//! ## Quick Start
//!
//! ```rust
//! use tradeflow::{MarketData, SlidingEntropy, TraderAction};
//!
//! let window = SlidingEntropy::new(100, 50, 500);
//! for i in 0..30 {
//!     window.add_action(TraderAction::ALL[i % 3]);
//! }
//! assert!(window.is_high_entropy());
//!
//! let mut batch = MarketData::new();
//! batch.add_action(TraderAction::Buy);
//! assert_eq!(batch.len(), 1);
//! ```
//!
//! Running a pipeline:
//!
//! ```rust,no_run
//! use tradeflow::{Pipeline, RandomWalkSource};
//!
//! let mut pipeline = Pipeline::new(10_000, 100, 100)
//!     .with_source(RandomWalkSource::factory(50, 42));
//! pipeline.set_entropy_callback(|entropy, rate| {
//!     println!("entropy {:.3} bits ({:+.3}/s)", entropy, rate);
//! });
//!
//! pipeline.start(2, 2);
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! pipeline.stop();
//!
//! println!("{}", pipeline.metrics().report());
//! ```
//!
//! ## Modules
//!
//! - [`action`]: Trader actions and market data batches
//! - [`entropy`]: Stateless Shannon entropy and classification
//! - [`queue`]: Bounded MPMC queue with backpressure
//! - [`window`]: Adaptive sliding-window entropy
//! - [`metrics`]: Atomic pipeline counters
//! - [`source`]: Batch sources for producers
//! - [`pipeline`]: Producer/consumer orchestration
//! - [`config`]: Serializable configuration

// Modules
pub mod action;
pub mod config;
pub mod entropy;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod source;
pub mod window;

// Re-exports for convenient access
pub use action::{MarketData, TraderAction, ACTION_COUNT};
pub use config::{PipelineConfig, QueueConfig, WindowConfig};
pub use entropy::{entropy_from_counts, shannon_entropy, EntropyLevel, MAX_ENTROPY};
pub use error::{ConfigError, FlowError, Result};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use pipeline::{EntropyCallback, Pipeline};
pub use queue::BoundedQueue;
pub use source::{BatchSource, IdleSource, RandomWalkSource, ReplaySource, SourceFactory};
pub use window::{ActionDistribution, SlidingEntropy};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
