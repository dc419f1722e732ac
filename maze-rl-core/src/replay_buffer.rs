//! Prioritized experience replay.
//!
//! # Key Components
//!
//! - [`PrioritizedReplayBuffer`]: fixed-capacity circular buffer with
//!   proportional prioritization
//! - [`Transition`] and [`TransitionBatch`]: what goes in and what comes out
//! - [`PrioritizedReplayBufferConfig`] and [`PerConfig`]: configuration
//! - [`BetaSchedule`]: annealing of the importance sampling exponent
//! - [`BufferSnapshot`]: persistence of the whole buffer
//!
//! # Examples
//!
//! ```rust
//! use maze_rl_core::{
//!     PerConfig, PrioritizedReplayBuffer, PrioritizedReplayBufferConfig, ReplayBufferBase,
//! };
//!
//! let config = PrioritizedReplayBufferConfig::default()
//!     .capacity(10000)
//!     .state_shape(vec![7, 7])
//!     .seed(42)
//!     .per_config(PerConfig::default().alpha(0.6).beta_start(0.4));
//!
//! let buffer = PrioritizedReplayBuffer::build(&config).unwrap();
//! assert!(buffer.is_empty());
//! ```
mod base;
mod beta_schedule;
mod config;
mod priority;
mod snapshot;
mod store;
mod sum_tree;
mod transition;
mod weight;
pub use base::{BufferPhase, PrioritizedReplayBuffer};
pub use beta_schedule::BetaSchedule;
pub use config::{PerConfig, PrioritizedReplayBufferConfig};
pub use snapshot::BufferSnapshot;
pub use transition::{Transition, TransitionBatch};

/// Default prioritization exponent.
pub const DEFAULT_ALPHA: f32 = 0.6;

/// Default importance sampling exponent.
pub const DEFAULT_BETA: f32 = 0.4;

/// Default floor added to updated priorities.
pub const DEFAULT_EPSILON: f32 = 1e-6;
