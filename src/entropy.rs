// Tradeflow - Adaptive entropy pipeline for trader actions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Shannon entropy over trader action distributions.
//!
//! Entropy is measured in bits. With three actions the range is
//! `[0, log2(3)]`: zero when every action in the sample is the same,
//! maximal when all three occur equally often.

use crate::action::{TraderAction, ACTION_COUNT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum entropy for three equally likely actions: log2(3).
pub const MAX_ENTROPY: f64 = 1.584_962_500_721_156;

/// Default upper bound of the low-entropy band (bits).
pub const DEFAULT_LOW_ENTROPY: f64 = 0.5;

/// Default lower bound of the high-entropy band (bits).
pub const DEFAULT_HIGH_ENTROPY: f64 = 1.2;

/// Coarse classification of an entropy value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntropyLevel {
    /// Predictable behavior, one action dominates.
    Low,
    /// Mixed behavior.
    Medium,
    /// Unpredictable behavior, actions close to uniform.
    High,
}

impl EntropyLevel {
    /// Classify with the default thresholds (< 0.5 low, > 1.2 high).
    pub fn classify(entropy: f64) -> Self {
        Self::classify_with(entropy, DEFAULT_LOW_ENTROPY, DEFAULT_HIGH_ENTROPY)
    }

    /// Classify with explicit thresholds. Both bounds belong to `Medium`.
    pub fn classify_with(entropy: f64, low: f64, high: f64) -> Self {
        if entropy < low {
            EntropyLevel::Low
        } else if entropy > high {
            EntropyLevel::High
        } else {
            EntropyLevel::Medium
        }
    }
}

impl fmt::Display for EntropyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntropyLevel::Low => write!(f, "Low (predictable behavior)"),
            EntropyLevel::Medium => write!(f, "Medium (mixed behavior)"),
            EntropyLevel::High => write!(f, "High (unpredictable behavior)"),
        }
    }
}

/// Shannon entropy from per-action counts.
///
/// Zero-count actions contribute nothing, and an all-zero histogram
/// yields 0.0. Cost is O(K) for K actions regardless of how many events
/// the counts summarize.
pub fn entropy_from_counts(counts: &[u64; ACTION_COUNT]) -> f64 {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }

    let n = total as f64;
    let mut entropy = 0.0;

    for &count in counts {
        if count > 0 {
            let p = count as f64 / n;
            entropy -= p * p.log2();
        }
    }

    entropy
}

/// Per-action histogram of a slice.
pub fn action_histogram(actions: &[TraderAction]) -> [u64; ACTION_COUNT] {
    let mut histogram = [0u64; ACTION_COUNT];
    for action in actions {
        histogram[action.index()] += 1;
    }
    histogram
}

/// Shannon entropy of a slice of actions; 0.0 for an empty slice.
pub fn shannon_entropy(actions: &[TraderAction]) -> f64 {
    entropy_from_counts(&action_histogram(actions))
}
