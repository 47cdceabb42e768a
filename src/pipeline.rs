// Tradeflow - Adaptive entropy pipeline for trader actions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Producer/consumer pipeline around one queue and one entropy window.
//!
//! ```text
//! source ──▶ producer ──▶ BoundedQueue ──▶ consumer ──▶ SlidingEntropy
//!                              │                           │
//!                     backpressure wait            metrics + callback
//! ```
//!
//! A pipeline is either stopped or running. [`Pipeline::start`] spawns the
//! worker threads, [`Pipeline::stop`] clears the running flag, wakes any
//! blocked queue waiters and joins every worker. Both are idempotent and
//! the cycle can repeat.

use crate::action::MarketData;
use crate::config::PipelineConfig;
use crate::entropy::EntropyLevel;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::queue::BoundedQueue;
use crate::source::{idle_factory, SourceFactory};
use crate::window::{ActionDistribution, SlidingEntropy};
use log::{debug, error, info, trace, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Observer called by consumers with `(entropy, change_rate)` after each
/// drained batch.
pub type EntropyCallback = Arc<dyn Fn(f64, f64) + Send + Sync>;

/// State shared by the pipeline handle and its workers.
struct Shared {
    queue: BoundedQueue<MarketData>,
    entropy: SlidingEntropy,
    metrics: PipelineMetrics,
    running: AtomicBool,
    callback: RwLock<Option<EntropyCallback>>,
    config: PipelineConfig,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn feed(&self, data: MarketData) -> bool {
        let started = Instant::now();

        match self.queue.push(data) {
            Ok(()) => {
                self.metrics.record_feed(started.elapsed());
                true
            }
            Err(_) => {
                self.metrics.record_queue_full();

                let saturation = self.queue.capacity() as f64 * self.config.saturation_ratio;
                if self.queue.len() as f64 >= saturation {
                    self.metrics.record_backpressure();
                    debug!(
                        "Queue saturated ({}/{}), waiting for relief",
                        self.queue.len(),
                        self.queue.capacity()
                    );

                    let timeout = self.config.backpressure_timeout();
                    if !self.queue.wait_for_backpressure_timeout(timeout) {
                        warn!(
                            "Backpressure wait timed out after {:?} with {} queued",
                            timeout,
                            self.queue.len()
                        );
                    }
                }
                false
            }
        }
    }

    fn run_producer(&self, index: usize, factory: SourceFactory) {
        let mut source = factory(index);
        let idle = self.config.producer_idle();

        while self.is_running() {
            match source.next_batch() {
                Some(data) => {
                    self.feed(data);
                }
                None => thread::sleep(idle),
            }
        }
    }

    fn run_consumer(&self) {
        let idle = self.config.consumer_idle();
        let mut batch = Vec::with_capacity(self.queue.batch_size());

        while self.is_running() {
            if !self.queue.try_pop_batch(&mut batch) {
                thread::sleep(idle);
                continue;
            }

            let mut events = 0u64;
            for data in &batch {
                for &action in data.actions() {
                    self.entropy.add_action(action);
                    self.metrics.record_entropy_updates(1);
                    events += 1;
                }
            }

            let entropy = self.entropy.current_entropy();
            let rate = self.entropy.entropy_change_rate();
            self.metrics.set_entropy(entropy, rate);

            trace!(
                "Consumed {} batches ({} events), entropy {:.4}",
                batch.len(),
                events,
                entropy
            );

            let callback = self
                .callback
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(callback) = callback {
                callback(entropy, rate);
            }
        }
    }
}

/// Concurrent entropy pipeline.
pub struct Pipeline {
    shared: Arc<Shared>,
    source: SourceFactory,
    workers: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Create a pipeline with default thresholds and window bounds.
    pub fn new(queue_capacity: usize, batch_size: usize, window_size: usize) -> Self {
        Self::with_config(PipelineConfig::with_sizes(
            queue_capacity,
            batch_size,
            window_size,
        ))
    }

    /// Create a pipeline from configuration.
    pub fn with_config(config: PipelineConfig) -> Self {
        let shared = Shared {
            queue: BoundedQueue::with_config(&config.queue),
            entropy: SlidingEntropy::with_config(config.window.clone()),
            metrics: PipelineMetrics::new(),
            running: AtomicBool::new(false),
            callback: RwLock::new(None),
            config,
        };

        Self {
            shared: Arc::new(shared),
            source: idle_factory(),
            workers: Vec::new(),
        }
    }

    /// Use `factory` to build each producer's batch source.
    ///
    /// Takes effect on the next [`start`](Self::start).
    pub fn with_source(mut self, factory: SourceFactory) -> Self {
        self.source = factory;
        self
    }

    /// Spawn `num_producers` producer and `num_consumers` consumer threads.
    ///
    /// Does nothing if already running.
    pub fn start(&mut self, num_producers: usize, num_consumers: usize) {
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        info!(
            "Starting pipeline: {} producers, {} consumers, capacity {}",
            num_producers,
            num_consumers,
            self.shared.queue.capacity()
        );

        for index in 0..num_producers {
            let shared = Arc::clone(&self.shared);
            let factory = Arc::clone(&self.source);
            self.spawn_worker(format!("tradeflow-producer-{}", index), move || {
                shared.run_producer(index, factory)
            });
        }

        for index in 0..num_consumers {
            let shared = Arc::clone(&self.shared);
            self.spawn_worker(format!("tradeflow-consumer-{}", index), move || {
                shared.run_consumer()
            });
        }
    }

    fn spawn_worker<F>(&mut self, name: String, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match thread::Builder::new().name(name.clone()).spawn(work) {
            Ok(handle) => self.workers.push(handle),
            Err(e) => error!("Failed to spawn {}: {}", name, e),
        }
    }

    /// Stop every worker and wait for them to exit.
    ///
    /// Does nothing if already stopped.
    pub fn stop(&mut self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }

        self.shared.queue.notify_all();

        let workers = std::mem::take(&mut self.workers);
        let count = workers.len();
        for handle in workers {
            if handle.join().is_err() {
                warn!("Pipeline worker panicked");
            }
        }

        info!("Pipeline stopped ({} workers joined)", count);
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Offer a batch to the queue.
    ///
    /// Returns `false` if the queue is full. A rejected feed that finds
    /// the queue saturated waits, up to the configured timeout, for
    /// consumers to relieve it before returning.
    pub fn feed_market_data(&self, data: MarketData) -> bool {
        self.shared.feed(data)
    }

    pub fn current_entropy(&self) -> f64 {
        self.shared.entropy.current_entropy()
    }

    pub fn entropy_change_rate(&self) -> f64 {
        self.shared.entropy.entropy_change_rate()
    }

    /// Batches waiting in the queue.
    pub fn queue_size(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_high_entropy(&self) -> bool {
        self.shared.entropy.is_high_entropy()
    }

    pub fn is_low_entropy(&self) -> bool {
        self.shared.entropy.is_low_entropy()
    }

    pub fn is_medium_entropy(&self) -> bool {
        self.shared.entropy.is_medium_entropy()
    }

    pub fn entropy_level(&self) -> EntropyLevel {
        self.shared.entropy.level()
    }

    pub fn action_distribution(&self) -> ActionDistribution {
        self.shared.entropy.action_distribution()
    }

    /// Register the observer called after each consumed batch, replacing
    /// any previous one.
    ///
    /// A consumer already inside the old callback finishes that call.
    pub fn set_entropy_callback<F>(&self, callback: F)
    where
        F: Fn(f64, f64) + Send + Sync + 'static,
    {
        *self
            .shared
            .callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Remove the registered observer.
    pub fn clear_entropy_callback(&self) {
        *self
            .shared
            .callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Snapshot of every counter and gauge.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn set_queue_capacity(&self, capacity: usize) {
        self.shared.queue.set_capacity(capacity);
    }

    pub fn set_batch_size(&self, batch_size: usize) {
        self.shared.queue.set_batch_size(batch_size);
    }

    /// Resize the entropy window; sizes outside its bounds are ignored.
    pub fn set_window_size(&self, window_size: usize) {
        self.shared.entropy.set_window_size(window_size);
    }

    /// Effective configuration, including runtime changes to the queue
    /// and window sizes.
    pub fn config(&self) -> PipelineConfig {
        let mut config = self.shared.config.clone();
        config.queue.capacity = self.shared.queue.capacity();
        config.queue.batch_size = self.shared.queue.batch_size();
        config.window.window_size = self.shared.entropy.window_capacity();
        config
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("running", &self.is_running())
            .field("workers", &self.workers.len())
            .field("queue", &self.shared.queue)
            .field("entropy", &self.current_entropy())
            .finish()
    }
}
