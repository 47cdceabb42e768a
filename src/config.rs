// Tradeflow - Adaptive entropy pipeline for trader actions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Pipeline configuration.
//!
//! Configuration is an explicit value built once and handed to the
//! constructors; there is no process-wide lookup table. Every struct
//! deserializes with defaults for missing fields, so a JSON document
//! only needs to name what it overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Bounded queue configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of items held at once.
    pub capacity: usize,

    /// Maximum number of items drained by one batch pop.
    pub batch_size: usize,

    /// Occupancy fraction at which producers are asked to throttle.
    pub backpressure_ratio: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            batch_size: 100,
            backpressure_ratio: 0.8,
        }
    }
}

impl QueueConfig {
    /// Create a queue configuration with the default backpressure ratio.
    pub fn new(capacity: usize, batch_size: usize) -> Self {
        Self {
            capacity,
            batch_size,
            ..Default::default()
        }
    }

    /// Occupancy at which backpressure applies for a given capacity.
    pub fn threshold_for(&self, capacity: usize) -> usize {
        backpressure_threshold(capacity, self.backpressure_ratio)
    }

    /// Check the configuration for values the queue cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity(self.capacity));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        check_ratio("backpressure_ratio", self.backpressure_ratio)
    }
}

/// Adaptive sliding window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Initial window capacity.
    pub window_size: usize,

    /// Smallest capacity adaptation may shrink to.
    pub min_window: usize,

    /// Largest capacity adaptation may grow to.
    pub max_window: usize,

    /// Entropy change (bits) above which the window grows.
    pub grow_threshold: f64,

    /// Entropy change (bits) below which the window shrinks.
    pub shrink_threshold: f64,

    /// Events added to the capacity on growth.
    pub grow_step: usize,

    /// Events removed from the capacity on shrink.
    pub shrink_step: usize,

    /// Entropy (bits) above which the window counts as high entropy.
    pub high_entropy: f64,

    /// Entropy (bits) below which the window counts as low entropy.
    pub low_entropy: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            min_window: 50,
            max_window: 500,
            grow_threshold: 0.1,
            shrink_threshold: 0.01,
            grow_step: 10,
            shrink_step: 5,
            high_entropy: 1.2,
            low_entropy: 0.5,
        }
    }
}

impl WindowConfig {
    /// Create a window configuration with explicit bounds.
    pub fn new(window_size: usize, min_window: usize, max_window: usize) -> Self {
        Self {
            window_size,
            min_window,
            max_window,
            ..Default::default()
        }
    }

    /// Set the initial window capacity.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Check bounds and thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_window == 0 || self.min_window > self.max_window {
            return Err(ConfigError::InvalidWindowBounds {
                min: self.min_window,
                max: self.max_window,
            });
        }
        if self.window_size < self.min_window || self.window_size > self.max_window {
            return Err(ConfigError::WindowOutOfBounds {
                size: self.window_size,
                min: self.min_window,
                max: self.max_window,
            });
        }
        if !(self.shrink_threshold >= 0.0 && self.shrink_threshold <= self.grow_threshold) {
            return Err(ConfigError::InvalidRatio {
                name: "shrink_threshold",
                value: self.shrink_threshold,
            });
        }
        if !(self.low_entropy >= 0.0 && self.low_entropy <= self.high_entropy) {
            return Err(ConfigError::InvalidRatio {
                name: "low_entropy",
                value: self.low_entropy,
            });
        }
        Ok(())
    }
}

/// Master configuration for a [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Queue between producers and consumers.
    pub queue: QueueConfig,

    /// Sliding entropy window fed by consumers.
    pub window: WindowConfig,

    /// Occupancy fraction at which a rejected feed waits for relief.
    pub saturation_ratio: f64,

    /// Longest time a rejected feed waits for relief (ms).
    pub backpressure_timeout_ms: u64,

    /// Consumer pause when the queue is empty (µs).
    pub consumer_idle_us: u64,

    /// Producer pause when its source has nothing to offer (µs).
    pub producer_idle_us: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            window: WindowConfig::default(),
            saturation_ratio: 0.9,
            backpressure_timeout_ms: 100,
            consumer_idle_us: 10,
            producer_idle_us: 100,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration matching the positional pipeline constructor.
    pub fn with_sizes(queue_capacity: usize, batch_size: usize, window_size: usize) -> Self {
        Self {
            queue: QueueConfig::new(queue_capacity, batch_size),
            window: WindowConfig::default().with_window_size(window_size),
            ..Default::default()
        }
    }

    /// Set the queue configuration.
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Set the window configuration.
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Set the backpressure wait bound.
    pub fn with_backpressure_timeout(mut self, timeout: Duration) -> Self {
        self.backpressure_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the consumer idle pause.
    pub fn with_consumer_idle(mut self, idle: Duration) -> Self {
        self.consumer_idle_us = idle.as_micros() as u64;
        self
    }

    /// Set the producer idle pause.
    pub fn with_producer_idle(mut self, idle: Duration) -> Self {
        self.producer_idle_us = idle.as_micros() as u64;
        self
    }

    pub fn backpressure_timeout(&self) -> Duration {
        Duration::from_millis(self.backpressure_timeout_ms)
    }

    pub fn consumer_idle(&self) -> Duration {
        Duration::from_micros(self.consumer_idle_us)
    }

    pub fn producer_idle(&self) -> Duration {
        Duration::from_micros(self.producer_idle_us)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.queue.validate()?;
        self.window.validate()?;
        check_ratio("saturation_ratio", self.saturation_ratio)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save to a JSON configuration file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// `capacity * ratio`, kept within `[1, capacity]` so an empty queue is
/// never saturated. Zero only for a zero-capacity queue.
pub(crate) fn backpressure_threshold(capacity: usize, ratio: f64) -> usize {
    if capacity == 0 {
        return 0;
    }
    ((capacity as f64 * ratio) as usize).clamp(1, capacity)
}

fn check_ratio(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRatio { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.queue.capacity, 10_000);
        assert_eq!(config.queue.batch_size, 100);
        assert_eq!(config.window.window_size, 100);
        assert_eq!(config.window.min_window, 50);
        assert_eq!(config.window.max_window, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_for() {
        let queue = QueueConfig::new(100, 10);
        assert_eq!(queue.threshold_for(100), 80);
        assert_eq!(queue.threshold_for(0), 0);
    }

    #[test]
    fn test_threshold_for_tiny_capacities() {
        let queue = QueueConfig::default();
        assert_eq!(queue.threshold_for(1), 1);
        assert_eq!(queue.threshold_for(2), 1);
        assert_eq!(queue.threshold_for(5), 4);

        let full = QueueConfig {
            backpressure_ratio: 1.0,
            ..Default::default()
        };
        assert_eq!(full.threshold_for(3), 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "queue": { "capacity": 256 }, "backpressure_timeout_ms": 5 }"#;
        let config = PipelineConfig::from_json(json).unwrap();

        assert_eq!(config.queue.capacity, 256);
        assert_eq!(config.queue.batch_size, 100);
        assert_eq!(config.backpressure_timeout(), Duration::from_millis(5));
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn test_rejects_inverted_window_bounds() {
        let config = PipelineConfig::new().with_window(WindowConfig::new(60, 80, 40));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidWindowBounds { min: 80, max: 40 })
        );
    }

    #[test]
    fn test_rejects_window_outside_bounds() {
        let config = PipelineConfig::with_sizes(100, 10, 5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WindowOutOfBounds { size: 5, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_ratio() {
        let mut config = PipelineConfig::default();
        config.queue.backpressure_ratio = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRatio { name: "backpressure_ratio", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = PipelineConfig::with_sizes(0, 10, 100);
        assert_eq!(config.validate(), Err(ConfigError::InvalidCapacity(0)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            PipelineConfig::from_json("{ queue: }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");

        let config = PipelineConfig::with_sizes(512, 16, 80)
            .with_consumer_idle(Duration::from_micros(50));
        config.to_json_file(&path).unwrap();

        let loaded = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = PipelineConfig::from_json_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
