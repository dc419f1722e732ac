#![warn(missing_docs)]
//! Prioritized experience replay for reinforcement learning on maze environments.
//!
//! The central type is [`PrioritizedReplayBuffer`], a fixed-capacity circular
//! store of transitions sampled with probability proportional to
//! `priority^alpha`, together with normalized importance-sampling weights.
//!
//! ```
//! use maze_rl_core::{
//!     PrioritizedReplayBuffer, PrioritizedReplayBufferConfig, ReplayBufferBase, Transition,
//! };
//! use ndarray::ArrayD;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = PrioritizedReplayBufferConfig::default()
//!     .capacity(100)
//!     .state_shape(vec![2]);
//! let mut buffer = PrioritizedReplayBuffer::build(&config)?;
//!
//! let state = ArrayD::<f32>::zeros(vec![2]);
//! buffer.append(Transition::new(state.clone(), 1, 0.5, state, false, false))?;
//!
//! let batch = buffer.sample(8, 0.4)?;
//! buffer.update_priorities(&batch.indices, &vec![0.1; batch.len()])?;
//! assert_eq!(buffer.len(), 1);
//! # Ok(())
//! # }
//! ```
pub mod error;
pub mod replay_buffer;

mod base;
pub use base::{ExperienceBufferBase, ReplayBufferBase};
pub use error::ReplayBufferError;
pub use replay_buffer::{
    BetaSchedule, BufferPhase, BufferSnapshot, PerConfig, PrioritizedReplayBuffer,
    PrioritizedReplayBufferConfig, Transition, TransitionBatch, DEFAULT_ALPHA, DEFAULT_BETA,
    DEFAULT_EPSILON,
};
