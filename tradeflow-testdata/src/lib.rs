// Tradeflow Testdata - Synthetic market scenarios
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Tradeflow Testdata
//!
//! Synthetic trader action streams for exercising Tradeflow.
//!
//! - **Scenarios**: bull, bear, crash, normal and high-frequency regimes
//! - **Recovery**: a crash followed by normal trading
//! - **Pipeline feeds**: [`ScenarioSource`] plugs a scenario into producers
//!
//! ## Quick Start
//!
//! ```rust
//! use tradeflow::SlidingEntropy;
//! use tradeflow_testdata::{generate, Scenario};
//!
//! let window = SlidingEntropy::new(100, 50, 500);
//! for action in generate(Scenario::Crash, 300, Some(42)) {
//!     window.add_action(action);
//! }
//! assert!(window.current_entropy() < 0.9);
//! ```

pub mod scenario;

use std::sync::Arc;
use tradeflow::source::{BatchSource, SourceFactory};

pub use scenario::{generate, recovery, Scenario, ScenarioSource, UnknownScenario};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Factory giving producer `i` a `scenario` feed seeded with `seed + i`.
pub fn scenario_factory(scenario: Scenario, batch_len: usize, seed: u64) -> SourceFactory {
    Arc::new(move |index: usize| -> Box<dyn BatchSource> {
        let seed = seed.wrapping_add(index as u64);
        Box::new(ScenarioSource::new(scenario, batch_len, Some(seed)))
    })
}
