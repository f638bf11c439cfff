//! Chaos links for unreliable delivery
//!
//! Simulates what the provider's unreliable mode is allowed to do:
//! - Loss
//! - Reordering
//! - Duplication
//!
//! Links are step-driven rather than timed: every transmit returns the
//! messages that arrive as a result, which keeps scenarios deterministic
//! for a given seed.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Link chaos configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ChaosConfig {
    /// Message loss rate (0.0 - 1.0)
    pub loss_rate: f64,
    /// Probability a message is held back and overtaken
    pub reorder_prob: f64,
    /// Maximum messages held back at once
    pub reorder_depth: usize,
    /// Duplicate probability
    pub duplicate_prob: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self::good()
    }
}

impl ChaosConfig {
    /// Perfect link
    pub fn none() -> Self {
        ChaosConfig {
            loss_rate: 0.0,
            reorder_prob: 0.0,
            reorder_depth: 0,
            duplicate_prob: 0.0,
        }
    }

    /// Good network conditions
    pub fn good() -> Self {
        ChaosConfig {
            loss_rate: 0.01,
            reorder_prob: 0.01,
            reorder_depth: 2,
            duplicate_prob: 0.001,
        }
    }

    /// Poor network conditions
    pub fn poor() -> Self {
        ChaosConfig {
            loss_rate: 0.05,
            reorder_prob: 0.1,
            reorder_depth: 5,
            duplicate_prob: 0.02,
        }
    }

    /// Hostile network conditions
    pub fn hostile() -> Self {
        ChaosConfig {
            loss_rate: 0.3,
            reorder_prob: 0.2,
            reorder_depth: 10,
            duplicate_prob: 0.05,
        }
    }

    /// Every message is overtaken by the one after it
    pub fn swap_pairs() -> Self {
        ChaosConfig {
            loss_rate: 0.0,
            reorder_prob: 1.0,
            reorder_depth: 1,
            duplicate_prob: 0.0,
        }
    }
}

/// Chaos link statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChaosStats {
    pub sent: u64,
    pub delivered: u64,
    pub lost: u64,
    pub reordered: u64,
    pub duplicated: u64,
}

impl ChaosStats {
    pub fn loss_rate(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.lost as f64 / self.sent as f64
        }
    }

    pub fn merge(&mut self, other: &ChaosStats) {
        self.sent += other.sent;
        self.delivered += other.delivered;
        self.lost += other.lost;
        self.reordered += other.reordered;
        self.duplicated += other.duplicated;
    }
}

/// One direction of a lossy link
#[derive(Debug)]
pub struct ChaosLink<T> {
    config: ChaosConfig,
    rng: StdRng,
    held: VecDeque<T>,
    stats: ChaosStats,
}

impl<T: Clone> ChaosLink<T> {
    /// Create a link with a fixed seed
    pub fn new(config: ChaosConfig, seed: u64) -> Self {
        ChaosLink {
            config,
            rng: StdRng::seed_from_u64(seed),
            held: VecDeque::new(),
            stats: ChaosStats::default(),
        }
    }

    /// Send one message; returns what arrives, in arrival order
    pub fn transmit(&mut self, message: T) -> Vec<T> {
        self.stats.sent += 1;

        if self.rng.gen::<f64>() < self.config.loss_rate {
            self.stats.lost += 1;
            return Vec::new();
        }

        if self.rng.gen::<f64>() < self.config.reorder_prob && self.held.len() < self.config.reorder_depth {
            self.held.push_back(message);
            self.stats.reordered += 1;
            return Vec::new();
        }

        let mut arrived = Vec::with_capacity(2 + self.held.len());
        if self.rng.gen::<f64>() < self.config.duplicate_prob {
            arrived.push(message.clone());
            self.stats.duplicated += 1;
        }
        arrived.push(message);
        // Held messages land after the one that overtook them
        arrived.extend(self.held.drain(..));

        self.stats.delivered += arrived.len() as u64;
        arrived
    }

    /// Release everything held back
    pub fn flush(&mut self) -> Vec<T> {
        let released: Vec<T> = self.held.drain(..).collect();
        self.stats.delivered += released.len() as u64;
        released
    }

    pub fn in_flight(&self) -> usize {
        self.held.len()
    }

    pub fn stats(&self) -> &ChaosStats {
        &self.stats
    }
}
