//! Injectable randomness for failure injection and metric sampling.
//!
//! The simulated backend never calls `rand` directly; it draws from a
//! [`RandomSource`] so tests can supply seeded or scripted sequences.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

/// Non-seeded randomness backed by the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen()
    }
}

/// Reproducible randomness from a fixed seed.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen()
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
///
/// An empty list always yields `0.0`.
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: Mutex<usize>,
}

impl SequenceRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            cursor: Mutex::new(0),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let value = self.values[*cursor % self.values.len()];
        *cursor += 1;
        value
    }
}

/// Build the random source for an optional seed.
pub fn from_seed(seed: Option<u64>) -> Box<dyn RandomSource> {
    match seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    }
}
