// Tradeflow - Adaptive entropy pipeline for trader actions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sliding-window entropy with an adaptive window size.
//!
//! [`SlidingEntropy`] keeps the most recent events in a ring buffer plus a
//! per-action count, so each update recomputes the entropy in O(K) for
//! K actions regardless of how long the window is.
//!
//! After each update the window capacity adapts to the size of the
//! entropy swing:
//! - a swing above `grow_threshold` widens the lookback by `grow_step`
//! - a swing below `shrink_threshold` narrows it by `shrink_step`
//!
//! The capacity never leaves `[min_window, max_window]` and the window
//! never holds more events than its capacity.

use crate::action::{TraderAction, ACTION_COUNT};
use crate::config::WindowConfig;
use crate::entropy::{entropy_from_counts, EntropyLevel};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Per-action event counts of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDistribution {
    pub hold: u64,
    pub buy: u64,
    pub sell: u64,
}

impl ActionDistribution {
    fn from_counts(counts: &[u64; ACTION_COUNT]) -> Self {
        Self {
            hold: counts[TraderAction::Hold.index()],
            buy: counts[TraderAction::Buy.index()],
            sell: counts[TraderAction::Sell.index()],
        }
    }

    /// Total number of events.
    pub fn total(&self) -> u64 {
        self.hold + self.buy + self.sell
    }

    /// Count for one action.
    pub fn get(&self, action: TraderAction) -> u64 {
        match action {
            TraderAction::Hold => self.hold,
            TraderAction::Buy => self.buy,
            TraderAction::Sell => self.sell,
        }
    }

    /// Share of one action in `[0, 1]`; 0.0 for an empty distribution.
    pub fn proportion(&self, action: TraderAction) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.get(action) as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct WindowState {
    window: VecDeque<TraderAction>,
    counts: [u64; ACTION_COUNT],
    /// Adaptive capacity.
    window_size: usize,
    current: f64,
    previous: f64,
    last_update: Instant,
}

impl WindowState {
    fn new(window_size: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size),
            counts: [0; ACTION_COUNT],
            window_size,
            current: 0.0,
            previous: 0.0,
            last_update: Instant::now(),
        }
    }

    fn admit(&mut self, action: TraderAction) {
        while self.window.len() >= self.window_size {
            if !self.evict_oldest() {
                break;
            }
        }
        self.window.push_back(action);
        self.counts[action.index()] += 1;
    }

    fn evict_oldest(&mut self) -> bool {
        match self.window.pop_front() {
            Some(old) => {
                self.counts[old.index()] -= 1;
                true
            }
            None => false,
        }
    }

    /// Evict the oldest events until the window fits its capacity.
    fn trim(&mut self) {
        while self.window.len() > self.window_size {
            self.evict_oldest();
        }
    }

    fn recompute(&mut self) {
        self.current = entropy_from_counts(&self.counts);
    }
}

/// Thread-safe sliding-window entropy estimator.
///
/// Every method, including the getters, serializes on one internal lock.
#[derive(Debug)]
pub struct SlidingEntropy {
    state: Mutex<WindowState>,
    min_window: usize,
    max_window: usize,
    config: WindowConfig,
}

impl Default for SlidingEntropy {
    fn default() -> Self {
        Self::with_config(WindowConfig::default())
    }
}

impl SlidingEntropy {
    /// Create an estimator with explicit bounds and default thresholds.
    pub fn new(window_size: usize, min_window: usize, max_window: usize) -> Self {
        Self::with_config(WindowConfig::new(window_size, min_window, max_window))
    }

    /// Create an estimator from configuration.
    ///
    /// Bounds are normalized rather than rejected: `min_window` is at
    /// least one, `max_window` at least `min_window`, and the initial
    /// size is clamped between them.
    pub fn with_config(config: WindowConfig) -> Self {
        let min_window = config.min_window.max(1);
        let max_window = config.max_window.max(min_window);
        let window_size = config.window_size.clamp(min_window, max_window);

        Self {
            state: Mutex::new(WindowState::new(window_size)),
            min_window,
            max_window,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit one event, recompute the entropy and adapt the window.
    pub fn add_action(&self, action: TraderAction) {
        let mut state = self.lock();
        state.admit(action);
        state.previous = state.current;
        state.recompute();
        state.last_update = Instant::now();
        self.adapt(&mut state);
    }

    /// Admit a slice of events, recomputing and adapting only once.
    pub fn add_actions_batch(&self, actions: &[TraderAction]) {
        if actions.is_empty() {
            return;
        }

        let mut state = self.lock();
        for &action in actions {
            state.admit(action);
        }
        state.previous = state.current;
        state.recompute();
        state.last_update = Instant::now();
        self.adapt(&mut state);
    }

    fn adapt(&self, state: &mut WindowState) {
        let change = (state.current - state.previous).abs();
        let len = state.window.len();

        let target = if change > self.config.grow_threshold && len < self.max_window {
            (len + self.config.grow_step)
                .min(self.max_window)
                .max(self.min_window)
        } else if change < self.config.shrink_threshold && len > self.min_window {
            len.saturating_sub(self.config.shrink_step)
                .max(self.min_window)
        } else {
            return;
        };

        if target != state.window_size {
            debug!(
                "Window resized {} -> {} (entropy change {:.4})",
                state.window_size, target, change
            );
            state.window_size = target;
        }

        if state.window.len() > state.window_size {
            state.trim();
            state.recompute();
        }
    }

    /// Entropy of the current window in bits.
    pub fn current_entropy(&self) -> f64 {
        self.lock().current
    }

    /// Entropy change per second since the last update.
    ///
    /// Returns 0.0 when less than a millisecond has elapsed.
    pub fn entropy_change_rate(&self) -> f64 {
        let state = self.lock();
        let elapsed_ms = state.last_update.elapsed().as_millis();
        if elapsed_ms == 0 {
            return 0.0;
        }
        (state.current - state.previous) / (elapsed_ms as f64 / 1000.0)
    }

    /// Number of events currently in the window.
    pub fn window_size(&self) -> usize {
        self.lock().window.len()
    }

    /// Current adaptive capacity.
    pub fn window_capacity(&self) -> usize {
        self.lock().window_size
    }

    pub fn min_window(&self) -> usize {
        self.min_window
    }

    pub fn max_window(&self) -> usize {
        self.max_window
    }

    /// Set the capacity, trimming the oldest events at once.
    ///
    /// Sizes outside `[min_window, max_window]` are ignored.
    pub fn set_window_size(&self, size: usize) {
        if size < self.min_window || size > self.max_window {
            return;
        }

        let mut state = self.lock();
        state.window_size = size;
        if state.window.len() > size {
            state.trim();
            state.recompute();
        }
    }

    pub fn action_distribution(&self) -> ActionDistribution {
        ActionDistribution::from_counts(&self.lock().counts)
    }

    pub fn is_high_entropy(&self) -> bool {
        self.level() == EntropyLevel::High
    }

    pub fn is_low_entropy(&self) -> bool {
        self.level() == EntropyLevel::Low
    }

    pub fn is_medium_entropy(&self) -> bool {
        self.level() == EntropyLevel::Medium
    }

    /// Classify the current entropy with the configured thresholds.
    pub fn level(&self) -> EntropyLevel {
        EntropyLevel::classify_with(
            self.current_entropy(),
            self.config.low_entropy,
            self.config.high_entropy,
        )
    }

    /// Drop every event and reset the entropy. The capacity is kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.window.clear();
        state.counts = [0; ACTION_COUNT];
        state.current = 0.0;
        state.previous = 0.0;
        state.last_update = Instant::now();
    }

    /// Copy of the window contents, oldest first.
    pub fn window_actions(&self) -> Vec<TraderAction> {
        self.lock().window.iter().copied().collect()
    }
}
