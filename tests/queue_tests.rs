// Tradeflow - Adaptive entropy pipeline for trader actions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Integration tests for the bounded queue
//!
//! These tests exercise the queue as the pipeline uses it: market data
//! batches, several threads on each end, and backpressure coordination.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tradeflow::{BoundedQueue, MarketData, QueueConfig, TraderAction};

fn batch(tag: usize) -> MarketData {
    (0..=tag % 3).map(|i| TraderAction::ALL[i]).collect()
}

#[test]
fn test_size_tracks_pushes_minus_pops() {
    let mut rng = StdRng::seed_from_u64(11);
    let queue = BoundedQueue::new(50, 7);
    let mut expected = 0usize;

    for step in 0..2_000 {
        match rng.gen_range(0..3) {
            0 | 1 => {
                if queue.push(batch(step)).is_ok() {
                    expected += 1;
                }
            }
            _ => {
                let mut out = Vec::new();
                if queue.try_pop_batch(&mut out) {
                    expected -= out.len();
                }
            }
        }
        assert_eq!(queue.len(), expected);
        assert!(queue.len() <= queue.capacity());
    }
}

#[test]
fn test_batch_pop_preserves_fifo() {
    let queue = BoundedQueue::new(100, 8);
    for i in 0..20usize {
        queue.push(i).unwrap();
    }

    let mut drained = Vec::new();
    let mut out = Vec::new();
    while queue.try_pop_batch(&mut out) {
        assert!(out.len() <= 8);
        drained.extend_from_slice(&out);
    }
    assert_eq!(drained, (0..20).collect::<Vec<_>>());
}

#[test]
fn test_config_construction() {
    let config = QueueConfig {
        capacity: 40,
        batch_size: 5,
        backpressure_ratio: 0.5,
    };
    let queue: BoundedQueue<u8> = BoundedQueue::with_config(&config);
    assert_eq!(queue.capacity(), 40);
    assert_eq!(queue.batch_size(), 5);
    assert_eq!(queue.backpressure_threshold(), 20);

    // Ratio survives runtime resizing.
    queue.set_capacity(10);
    assert_eq!(queue.backpressure_threshold(), 5);
}

#[test]
fn test_raising_capacity_relieves_backpressure() {
    let queue = Arc::new(BoundedQueue::new(5, 1));
    for i in 0..5 {
        queue.push(i).unwrap();
    }

    let waiter = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.wait_for_backpressure_timeout(Duration::from_secs(5)))
    };

    thread::sleep(Duration::from_millis(20));
    queue.set_capacity(100);
    assert!(waiter.join().unwrap());
}

#[test]
fn test_push_does_not_release_backpressure() {
    let queue = BoundedQueue::new(10, 1);
    for i in 0..8 {
        queue.push(i).unwrap();
    }
    assert!(!queue.wait_for_backpressure_timeout(Duration::from_millis(10)));
}

#[test]
fn test_blocking_consumers_receive_everything() {
    const ITEMS: usize = 1_000;

    let queue = Arc::new(BoundedQueue::new(32, 1));
    let received = Arc::new(AtomicUsize::new(0));

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let received = Arc::clone(&received);
            thread::spawn(move || {
                while let Some(item) = queue.wait_and_pop_timeout(Duration::from_millis(200)) {
                    if item == usize::MAX {
                        break;
                    }
                    received.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for i in 0..ITEMS {
        let mut item = i;
        while let Err(back) = queue.push(item) {
            item = back;
            thread::yield_now();
        }
    }
    for _ in 0..3 {
        let mut stop = usize::MAX;
        while let Err(back) = queue.push(stop) {
            stop = back;
            thread::yield_now();
        }
    }

    for consumer in consumers {
        consumer.join().unwrap();
    }
    assert_eq!(received.load(Ordering::SeqCst), ITEMS);
}

#[test]
fn test_producers_throttled_by_backpressure() {
    const PER_PRODUCER: usize = 500;

    let queue = Arc::new(BoundedQueue::new(20, 4));
    let consumed = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..2)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let mut data = batch(i);
                    loop {
                        match queue.push(data) {
                            Ok(()) => break,
                            Err(back) => {
                                data = back;
                                queue.wait_for_backpressure_timeout(Duration::from_millis(50));
                            }
                        }
                    }
                }
            })
        })
        .collect();

    let consumer = {
        let queue = Arc::clone(&queue);
        let consumed = Arc::clone(&consumed);
        thread::spawn(move || {
            let mut out = Vec::new();
            while consumed.load(Ordering::SeqCst) < 2 * PER_PRODUCER {
                if queue.try_pop_batch(&mut out) {
                    consumed.fetch_add(out.len(), Ordering::SeqCst);
                } else {
                    thread::sleep(Duration::from_micros(50));
                }
            }
        })
    };

    for producer in producers {
        producer.join().unwrap();
    }
    consumer.join().unwrap();

    assert_eq!(consumed.load(Ordering::SeqCst), 2 * PER_PRODUCER);
    assert!(queue.is_empty());
}
