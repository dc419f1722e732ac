//! Configuration of the prioritized replay buffer.
//!
//! Configurations are plain serde structs with builder-style setters and can
//! be stored as YAML files.

use super::{BetaSchedule, DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_EPSILON};
use crate::error::ReplayBufferError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of prioritization.
///
/// # Examples
///
/// ```rust
/// use maze_rl_core::PerConfig;
///
/// let config = PerConfig::default()
///     .alpha(0.6)
///     .beta_start(0.4)
///     .beta_end(1.0)
///     .beta_anneal_updates(500_000);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PerConfig {
    /// Exponent for prioritization. A value of 0 results in uniform sampling,
    /// 1 in sampling proportional to priority.
    pub alpha: f32,

    /// Floor added to every updated priority so that no stored transition
    /// loses its chance of being sampled.
    pub epsilon: f32,

    /// Importance sampling exponent before any priority update.
    pub beta_start: f32,

    /// Importance sampling exponent once annealing is over.
    pub beta_end: f32,

    /// Number of accepted priority updates over which `beta` moves from
    /// `beta_start` to `beta_end`.
    pub beta_anneal_updates: usize,
}

impl Default for PerConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            epsilon: DEFAULT_EPSILON,
            beta_start: DEFAULT_BETA,
            beta_end: 1.0,
            beta_anneal_updates: 500_000,
        }
    }
}

impl PerConfig {
    /// Sets the prioritization exponent `alpha`.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the priority floor `epsilon`.
    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets `beta_start`.
    pub fn beta_start(mut self, beta: f32) -> Self {
        self.beta_start = beta;
        self
    }

    /// Sets `beta_end`.
    pub fn beta_end(mut self, beta: f32) -> Self {
        self.beta_end = beta;
        self
    }

    /// Sets `beta_anneal_updates`.
    pub fn beta_anneal_updates(mut self, n: usize) -> Self {
        self.beta_anneal_updates = n;
        self
    }

    /// Builds the beta schedule described by this configuration.
    pub fn beta_schedule(&self) -> Result<BetaSchedule> {
        BetaSchedule::new(self.beta_start, self.beta_end, self.beta_anneal_updates)
    }

    /// Checks that every parameter lies in its domain.
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("alpha", self.alpha)?;
        self.beta_schedule()?;
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(ReplayBufferError::InvalidParameter(format!(
                "epsilon must be positive and finite, got {}",
                self.epsilon
            ))
            .into());
        }
        Ok(())
    }
}

/// Configuration of [`PrioritizedReplayBuffer`](super::PrioritizedReplayBuffer).
///
/// # Examples
///
/// ```rust
/// use maze_rl_core::{PerConfig, PrioritizedReplayBufferConfig};
///
/// let config = PrioritizedReplayBufferConfig::default()
///     .capacity(10000)
///     .state_shape(vec![7, 7])
///     .seed(42)
///     .per_config(PerConfig::default().alpha(0.7));
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PrioritizedReplayBufferConfig {
    /// Maximum number of transitions that can be stored in the buffer.
    /// When the buffer is full, new transitions replace the oldest ones.
    pub capacity: usize,

    /// Shape of a single state, e.g. `[height, width]` of a maze view.
    pub state_shape: Vec<usize>,

    /// Random seed used for sampling transitions.
    pub seed: u64,

    /// Prioritization parameters.
    pub per_config: PerConfig,
}

impl Default for PrioritizedReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            state_shape: vec![1],
            seed: 42,
            per_config: PerConfig::default(),
        }
    }
}

impl PrioritizedReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the shape of a single state.
    pub fn state_shape(mut self, state_shape: Vec<usize>) -> Self {
        self.state_shape = state_shape;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the prioritization parameters.
    pub fn per_config(mut self, per_config: PerConfig) -> Self {
        self.per_config = per_config;
        self
    }

    /// Checks that every parameter lies in its domain.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ReplayBufferError::InvalidParameter(
                "capacity must be positive".to_string(),
            )
            .into());
        }
        if self.state_shape.is_empty() || self.state_shape.iter().any(|&d| d == 0) {
            return Err(ReplayBufferError::InvalidParameter(format!(
                "state_shape must be a non-empty list of positive integers, got {:?}",
                self.state_shape
            ))
            .into());
        }
        self.per_config.validate()
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Fails unless `0 <= value <= 1`. NaN is rejected.
pub(super) fn check_unit_interval(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ReplayBufferError::InvalidParameter(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        ))
        .into())
    }
}
