//! Replay buffer interface for reinforcement learning.
//!
//! Two seams separate the producer side of a replay buffer (environment
//! steps pushed in) from the consumer side (batches pulled out for training,
//! priorities pushed back).

use anyhow::Result;

/// Interface for buffers that store experiences from environments.
///
/// # Examples
///
/// Code that only produces transitions can stay generic over the buffer:
///
/// ```rust
/// use maze_rl_core::{
///     ExperienceBufferBase, PrioritizedReplayBuffer, PrioritizedReplayBufferConfig,
///     ReplayBufferBase, Transition,
/// };
/// use ndarray::ArrayD;
///
/// fn record<B: ExperienceBufferBase<Item = Transition>>(
///     buffer: &mut B,
///     rewards: &[f32],
/// ) -> anyhow::Result<()> {
///     for &r in rewards {
///         let state = ArrayD::from_elem(vec![2], r);
///         buffer.push(Transition::new(state.clone(), 0, r, state, false, false))?;
///     }
///     Ok(())
/// }
///
/// # fn main() -> anyhow::Result<()> {
/// let config = PrioritizedReplayBufferConfig::default()
///     .capacity(2)
///     .state_shape(vec![2]);
/// let mut buffer = PrioritizedReplayBuffer::build(&config)?;
/// record(&mut buffer, &[0.1, 0.2, 0.3])?;
/// assert_eq!(buffer.len(), 2);
/// # Ok(())
/// # }
/// ```
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the current number of experiences in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no experience.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase {
    /// Configuration parameters for the replay buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a new replay buffer from the given configuration.
    ///
    /// Fails if the configuration is outside of its documented domain.
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Samples a batch of `size` experiences for training.
    ///
    /// Implementations decide any extra sampling parameters themselves,
    /// e.g. by scheduling them over priority updates.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;

    /// Updates the priorities of previously sampled experiences.
    ///
    /// `ixs` are indices returned with a batch and `td_errs` the
    /// corresponding magnitudes, typically TD errors.
    fn update_priority(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<()>;
}
