// Tradeflow - Adaptive entropy pipeline for trader actions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Batch sources polled by pipeline producers.
//!
//! Each producer thread owns one [`BatchSource`], built by a
//! [`SourceFactory`] from the producer's index. A source returning `None`
//! has nothing to offer right now; the producer idles and asks again.

use crate::action::{MarketData, TraderAction};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use std::collections::VecDeque;
use std::sync::Arc;

/// Supplier of market data batches for one producer.
pub trait BatchSource: Send {
    /// Next batch, or `None` if nothing is available yet.
    fn next_batch(&mut self) -> Option<MarketData>;
}

/// Builds the source for the producer with the given index.
pub type SourceFactory = Arc<dyn Fn(usize) -> Box<dyn BatchSource> + Send + Sync>;

/// Source that never yields. Producers built on it only idle.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleSource;

impl BatchSource for IdleSource {
    fn next_batch(&mut self) -> Option<MarketData> {
        None
    }
}

/// Factory producing an [`IdleSource`] for every producer.
pub fn idle_factory() -> SourceFactory {
    Arc::new(|_: usize| -> Box<dyn BatchSource> { Box::new(IdleSource) })
}

/// Synthetic trader reacting to a random-walk price.
///
/// Every tick moves the price by a normally distributed return. A move
/// above `dead_band` (relative) is a Buy, below `-dead_band` a Sell, and
/// anything in between a Hold.
#[derive(Debug)]
pub struct RandomWalkSource {
    rng: StdRng,
    price: f64,
    volatility: f64,
    dead_band: f64,
    batch_len: usize,
}

impl RandomWalkSource {
    /// Create a source starting at price 100 with 1% volatility and a
    /// 0.5% dead band.
    pub fn new(batch_len: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            price: 100.0,
            volatility: 0.01,
            dead_band: 0.005,
            batch_len: batch_len.max(1),
        }
    }

    /// Set the per-tick return standard deviation.
    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility.abs();
        self
    }

    /// Set the relative move treated as noise.
    pub fn with_dead_band(mut self, dead_band: f64) -> Self {
        self.dead_band = dead_band.abs();
        self
    }

    /// Current simulated price.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Advance one tick and map the move to an action.
    pub fn tick(&mut self) -> TraderAction {
        let z: f64 = self.rng.sample(StandardNormal);
        let ret = z * self.volatility;
        self.price *= 1.0 + ret;

        if ret > self.dead_band {
            TraderAction::Buy
        } else if ret < -self.dead_band {
            TraderAction::Sell
        } else {
            TraderAction::Hold
        }
    }

    /// Factory giving producer `i` a walk seeded with `seed + i`.
    pub fn factory(batch_len: usize, seed: u64) -> SourceFactory {
        Arc::new(move |index: usize| -> Box<dyn BatchSource> {
            let seed = seed.wrapping_add(index as u64);
            Box::new(RandomWalkSource::new(batch_len, Some(seed)))
        })
    }
}

impl BatchSource for RandomWalkSource {
    fn next_batch(&mut self) -> Option<MarketData> {
        let mut data = MarketData::with_capacity(self.batch_len);
        for _ in 0..self.batch_len {
            let action = self.tick();
            data.add_action(action);
        }
        Some(data)
    }
}

/// Replays a fixed list of batches once, then yields nothing.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    batches: VecDeque<MarketData>,
}

impl ReplaySource {
    pub fn new(batches: impl IntoIterator<Item = MarketData>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
        }
    }

    /// Batches not yet replayed.
    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

impl BatchSource for ReplaySource {
    fn next_batch(&mut self) -> Option<MarketData> {
        self.batches.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::action_histogram;

    #[test]
    fn test_idle_source_never_yields() {
        let mut source = IdleSource;
        assert!(source.next_batch().is_none());

        let factory = idle_factory();
        assert!(factory(3).next_batch().is_none());
    }

    #[test]
    fn test_random_walk_batch_length() {
        let mut source = RandomWalkSource::new(25, Some(42));
        let batch = source.next_batch().unwrap();
        assert_eq!(batch.len(), 25);

        let mut empty = RandomWalkSource::new(0, Some(1));
        assert_eq!(empty.next_batch().unwrap().len(), 1);
    }

    #[test]
    fn test_random_walk_is_reproducible() {
        let mut a = RandomWalkSource::new(50, Some(7));
        let mut b = RandomWalkSource::new(50, Some(7));
        assert_eq!(a.next_batch(), b.next_batch());
        assert_eq!(a.price(), b.price());
    }

    #[test]
    fn test_dead_band_controls_mix() {
        // Huge dead band: every tick is noise.
        let mut calm = RandomWalkSource::new(200, Some(3)).with_dead_band(1.0);
        let batch = calm.next_batch().unwrap();
        assert!(batch.actions().iter().all(|&a| a == TraderAction::Hold));

        // No dead band: almost every tick is a move.
        let mut jumpy = RandomWalkSource::new(2_000, Some(3)).with_dead_band(0.0);
        let counts = action_histogram(jumpy.next_batch().unwrap().actions());
        assert!(counts[TraderAction::Buy.index()] > 800);
        assert!(counts[TraderAction::Sell.index()] > 800);
    }

    #[test]
    fn test_factory_seeds_per_producer() {
        let factory = RandomWalkSource::factory(40, 100);
        let mut first = factory(0);
        let mut again = factory(0);
        assert_eq!(first.next_batch(), again.next_batch());
    }

    #[test]
    fn test_replay_source() {
        let mut source = ReplaySource::new(vec![
            MarketData::from(vec![TraderAction::Buy]),
            MarketData::from(vec![TraderAction::Sell, TraderAction::Hold]),
        ]);
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_batch().unwrap().len(), 1);
        assert_eq!(source.next_batch().unwrap().len(), 2);
        assert!(source.next_batch().is_none());
    }
}
