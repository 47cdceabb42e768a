// Tradeflow Testdata - Market scenarios
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Market regimes as action probability tables.
//!
//! Each scenario draws actions independently from a fixed
//! HOLD/BUY/SELL distribution, except [`Scenario::HighFrequency`] which
//! cycles through the three actions deterministically.

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tradeflow::source::BatchSource;
use tradeflow::{entropy_from_counts, MarketData, TraderAction, ACTION_COUNT};

/// Scenario name did not parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown scenario: {0}")]
pub struct UnknownScenario(pub String);

/// Market regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Mostly buying.
    Bull,
    /// Mostly selling.
    Bear,
    /// Panic selling.
    Crash,
    /// Balanced trading.
    Normal,
    /// Strict HOLD, BUY, SELL rotation.
    HighFrequency,
}

impl Scenario {
    /// All scenarios.
    pub const ALL: [Scenario; 5] = [
        Scenario::Bull,
        Scenario::Bear,
        Scenario::Crash,
        Scenario::Normal,
        Scenario::HighFrequency,
    ];

    /// HOLD/BUY/SELL probabilities, or `None` for the deterministic
    /// rotation.
    pub fn probabilities(&self) -> Option<[f64; ACTION_COUNT]> {
        match self {
            Scenario::Bull => Some([0.15, 0.60, 0.25]),
            Scenario::Bear => Some([0.15, 0.20, 0.65]),
            Scenario::Crash => Some([0.02, 0.03, 0.95]),
            Scenario::Normal => Some([0.33, 0.33, 0.34]),
            Scenario::HighFrequency => None,
        }
    }

    /// Entropy of the scenario's distribution in bits.
    pub fn theoretical_entropy(&self) -> f64 {
        match self.probabilities() {
            Some(p) => p
                .iter()
                .filter(|&&p| p > 0.0)
                .map(|&p| -p * p.log2())
                .sum(),
            None => entropy_from_counts(&[1, 1, 1]),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Bull => "bull",
            Scenario::Bear => "bear",
            Scenario::Crash => "crash",
            Scenario::Normal => "normal",
            Scenario::HighFrequency => "high_frequency",
        }
    }

    /// Draw the action at position `index` of the sequence.
    fn draw(&self, index: usize, rng: &mut StdRng) -> TraderAction {
        let [hold, buy, _] = match self.probabilities() {
            Some(p) => p,
            None => return TraderAction::ALL[index % ACTION_COUNT],
        };

        let r: f64 = rng.gen();
        if r < hold {
            TraderAction::Hold
        } else if r < hold + buy {
            TraderAction::Buy
        } else {
            TraderAction::Sell
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == wanted)
            .ok_or_else(|| UnknownScenario(s.to_string()))
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Generate `count` actions from `scenario`.
pub fn generate(scenario: Scenario, count: usize, seed: Option<u64>) -> Vec<TraderAction> {
    let mut rng = make_rng(seed);
    (0..count).map(|i| scenario.draw(i, &mut rng)).collect()
}

/// A crash followed by a return to normal trading.
pub fn recovery(crash_len: usize, normal_len: usize, seed: Option<u64>) -> Vec<TraderAction> {
    let mut rng = make_rng(seed);
    let crash = (0..crash_len).map(|i| Scenario::Crash.draw(i, &mut rng));
    let mut actions: Vec<_> = crash.collect();
    actions.extend((0..normal_len).map(|i| Scenario::Normal.draw(i, &mut rng)));
    actions
}

/// Endless batch feed drawn from one scenario.
#[derive(Debug)]
pub struct ScenarioSource {
    scenario: Scenario,
    batch_len: usize,
    position: usize,
    rng: StdRng,
}

impl ScenarioSource {
    pub fn new(scenario: Scenario, batch_len: usize, seed: Option<u64>) -> Self {
        Self {
            scenario,
            batch_len: batch_len.max(1),
            position: 0,
            rng: make_rng(seed),
        }
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Actions drawn so far.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl BatchSource for ScenarioSource {
    fn next_batch(&mut self) -> Option<MarketData> {
        let mut data = MarketData::with_capacity(self.batch_len);
        for _ in 0..self.batch_len {
            let action = self.scenario.draw(self.position, &mut self.rng);
            data.add_action(action);
            self.position += 1;
        }
        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_probabilities_sum_to_one() {
        for scenario in Scenario::ALL {
            if let Some(p) = scenario.probabilities() {
                assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_theoretical_entropy_ordering() {
        assert!(Scenario::Crash.theoretical_entropy() < 0.5);
        assert!(Scenario::Bull.theoretical_entropy() > 1.2);
        assert_relative_eq!(
            Scenario::HighFrequency.theoretical_entropy(),
            tradeflow::MAX_ENTROPY,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_high_frequency_rotation() {
        let actions = generate(Scenario::HighFrequency, 6, None);
        assert_eq!(
            actions,
            vec![
                TraderAction::Hold,
                TraderAction::Buy,
                TraderAction::Sell,
                TraderAction::Hold,
                TraderAction::Buy,
                TraderAction::Sell,
            ]
        );
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generate(Scenario::Bear, 500, Some(9));
        let b = generate(Scenario::Bear, 500, Some(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Crash".parse::<Scenario>(), Ok(Scenario::Crash));
        assert_eq!("high-frequency".parse::<Scenario>(), Ok(Scenario::HighFrequency));
        assert!("sideways".parse::<Scenario>().is_err());
        assert_eq!(Scenario::HighFrequency.to_string(), "high_frequency");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Scenario::HighFrequency).unwrap();
        assert_eq!(json, "\"high_frequency\"");
    }

    #[test]
    fn test_source_batches() {
        let mut source = ScenarioSource::new(Scenario::HighFrequency, 4, None);
        let first = source.next_batch().unwrap();
        let second = source.next_batch().unwrap();
        assert_eq!(first.actions()[0], TraderAction::Hold);
        assert_eq!(second.actions()[0], TraderAction::Buy);
        assert_eq!(source.position(), 8);
    }
}
