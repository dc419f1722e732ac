//! Prioritized replay buffer.
//!
//! Transitions live in a preallocated circular store and every slot carries
//! a priority. Sampling draws slots with replacement with probability
//! proportional to `priority^alpha` and attaches importance sampling weights
//! that correct for the non-uniform draw.
use super::{
    config::check_unit_interval, priority::PriorityIndex, store::TransitionStore, BetaSchedule,
    PrioritizedReplayBufferConfig, Transition, TransitionBatch,
};
use crate::{error::ReplayBufferError, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
use log::{debug, info, trace};
use rand::{rngs::StdRng, SeedableRng};

/// Filling state of a replay buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferPhase {
    /// No transition has been pushed yet.
    Empty,

    /// Some slots are still unused.
    Filling,

    /// Every slot is in use; each push evicts the oldest transition.
    Full,
}

/// A replay buffer with proportional prioritization.
///
/// The buffer has a fixed capacity `N`. Pushing a transition overwrites the
/// slot at the write cursor, which then advances modulo `N`, so once the
/// buffer is full the oldest transition is evicted first.
///
/// A pushed transition gets the maximum priority currently in the buffer
/// (1 for an empty buffer), so that it is likely to be sampled before its
/// actual priority is known. After training on a batch, priorities are
/// rewritten with [`update_priorities`](Self::update_priorities).
///
/// The buffer has no internal locking. Wrap the whole buffer in a single
/// lock if producers and consumers run on different threads.
///
/// # Examples
///
/// ```rust
/// use maze_rl_core::{
///     PrioritizedReplayBuffer, PrioritizedReplayBufferConfig, ReplayBufferBase, Transition,
/// };
/// use ndarray::ArrayD;
///
/// # fn main() -> anyhow::Result<()> {
/// let config = PrioritizedReplayBufferConfig::default()
///     .capacity(3)
///     .state_shape(vec![1]);
/// let mut buffer = PrioritizedReplayBuffer::build(&config)?;
///
/// for reward in [10.0, 20.0, 30.0, 40.0].iter() {
///     let state = ArrayD::from_elem(vec![1], *reward);
///     buffer.append(Transition::new(state.clone(), 0, *reward, state, false, false))?;
/// }
/// assert_eq!(buffer.len(), 3);
/// assert_eq!(buffer.ptr(), 1);
///
/// let batch = buffer.sample(4, 0.4)?;
/// let td_errs = vec![0.5; batch.len()];
/// buffer.update_priorities(&batch.indices, &td_errs)?;
/// # Ok(())
/// # }
/// ```
pub struct PrioritizedReplayBuffer {
    /// Maximum number of transitions that can be stored.
    capacity: usize,

    /// Next slot to be overwritten.
    ptr: usize,

    /// Current number of stored transitions.
    size: usize,

    store: TransitionStore,

    priority: PriorityIndex,

    /// Random number generator for sampling.
    rng: StdRng,

    /// Beta used by [`ReplayBufferBase::batch`].
    beta_schedule: BetaSchedule,
}

impl PrioritizedReplayBuffer {
    pub(super) fn from_parts(
        ptr: usize,
        size: usize,
        store: TransitionStore,
        priority: PriorityIndex,
        seed: u64,
        beta_schedule: BetaSchedule,
    ) -> Self {
        Self {
            capacity: priority.priorities().len(),
            ptr,
            size,
            store,
            priority,
            rng: StdRng::seed_from_u64(seed),
            beta_schedule,
        }
    }

    /// Writes a transition into the slot at the write cursor.
    ///
    /// Fails with [`ReplayBufferError::ShapeMismatch`] if the state or the
    /// next state does not have the configured shape, in which case the
    /// buffer is left unchanged.
    pub fn append(&mut self, tr: Transition) -> Result<()> {
        self.store.check_shape(&tr)?;

        self.priority.push(self.ptr, self.size);
        self.store.write(self.ptr, tr);
        trace!(
            "Pushed transition into slot {} with priority {}",
            self.ptr,
            self.priority.get(self.ptr)
        );

        self.ptr = (self.ptr + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
            if self.size == self.capacity {
                debug!("Replay buffer is full ({} transitions)", self.capacity);
            }
        }

        Ok(())
    }

    /// Samples `batch_size` transitions with replacement.
    ///
    /// The probability of slot `i` is `priority[i]^alpha` normalized over the
    /// stored transitions and the importance sampling weights are
    /// `(size * P(i))^(-beta)` normalized by their maximum within the batch.
    ///
    /// # Errors
    ///
    /// - [`ReplayBufferError::InvalidParameter`] if `batch_size` is zero or
    ///   `beta` lies outside of `[0, 1]`
    /// - [`ReplayBufferError::EmptyBuffer`] if no transition has been pushed
    pub fn sample(&mut self, batch_size: usize, beta: f32) -> Result<TransitionBatch> {
        if batch_size == 0 {
            return Err(ReplayBufferError::InvalidParameter(
                "batch_size must be positive".to_string(),
            )
            .into());
        }
        check_unit_interval("beta", beta)?;
        if self.size == 0 {
            return Err(ReplayBufferError::EmptyBuffer.into());
        }

        let (ixs, weights) = self
            .priority
            .sample(&mut self.rng, batch_size, self.size, beta);

        Ok(self.store.gather(ixs, weights))
    }

    /// Sets the priorities of the given slots to `|magnitude| + epsilon`.
    ///
    /// `indices` are typically those of a batch returned by
    /// [`sample`](Self::sample) and `magnitudes` the TD errors computed on
    /// it. The buffer does not track whether a slot was overwritten since it
    /// was sampled; update promptly after sampling.
    ///
    /// Each accepted call advances the [`BetaSchedule`] by one update.
    ///
    /// # Errors
    ///
    /// - [`ReplayBufferError::InvalidIndex`] if an index is not below
    ///   [`len`](Self::len)
    /// - [`ReplayBufferError::InvalidParameter`] if the lengths differ or a
    ///   magnitude is not finite
    ///
    /// On error no priority is changed.
    pub fn update_priorities(&mut self, indices: &[usize], magnitudes: &[f32]) -> Result<()> {
        self.priority.update(indices, magnitudes, self.size)?;
        self.beta_schedule.record_update();
        Ok(())
    }

    /// Returns the number of stored transitions.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if no transition has been pushed.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the filling state of the buffer.
    pub fn phase(&self) -> BufferPhase {
        if self.size == 0 {
            BufferPhase::Empty
        } else if self.size < self.capacity {
            BufferPhase::Filling
        } else {
            BufferPhase::Full
        }
    }

    /// Returns the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the slot that the next push overwrites.
    pub fn ptr(&self) -> usize {
        self.ptr
    }

    /// Returns the shape of a single state.
    pub fn state_shape(&self) -> &[usize] {
        self.store.state_shape()
    }

    /// Returns the prioritization exponent.
    pub fn alpha(&self) -> f32 {
        self.priority.alpha()
    }

    /// Returns the floor added to updated priorities.
    pub fn epsilon(&self) -> f32 {
        self.priority.epsilon()
    }

    /// Returns the priority of slot `ix`, or `None` if the slot holds no
    /// transition.
    pub fn priority(&self, ix: usize) -> Option<f32> {
        if ix < self.size {
            Some(self.priority.get(ix))
        } else {
            None
        }
    }

    /// Returns the priorities of the stored transitions.
    pub fn priorities(&self) -> &[f32] {
        &self.priority.priorities()[..self.size]
    }

    /// Returns the probability with which slot `ix` is drawn, or `None` if
    /// the slot holds no transition.
    pub fn probability(&self, ix: usize) -> Option<f64> {
        if ix < self.size {
            Some(self.priority.probability(ix))
        } else {
            None
        }
    }

    /// Returns a copy of the transition stored in slot `ix`, or `None` if
    /// the slot holds no transition.
    pub fn get(&self, ix: usize) -> Option<Transition> {
        if ix < self.size {
            Some(self.store.get(ix))
        } else {
            None
        }
    }

    /// Returns the beta schedule.
    pub fn beta_schedule(&self) -> &BetaSchedule {
        &self.beta_schedule
    }

    /// Returns the sum of the rewards of the stored transitions.
    pub fn sum_rewards(&self) -> f32 {
        self.store.rewards()[..self.size].iter().sum()
    }

    /// Returns the number of stored transitions that ended an episode.
    pub fn num_terminated_flags(&self) -> usize {
        self.store.dones()[..self.size]
            .iter()
            .filter(|&&done| done)
            .count()
    }

    /// Returns the number of stored transitions that were truncated.
    pub fn num_truncated_flags(&self) -> usize {
        self.store.truncateds()[..self.size]
            .iter()
            .filter(|&&truncated| truncated)
            .count()
    }

    pub(super) fn store(&self) -> &TransitionStore {
        &self.store
    }

    pub(super) fn priority_index(&self) -> &PriorityIndex {
        &self.priority
    }
}

impl ExperienceBufferBase for PrioritizedReplayBuffer {
    type Item = Transition;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.append(tr)
    }

    fn len(&self) -> usize {
        self.size
    }
}

impl ReplayBufferBase for PrioritizedReplayBuffer {
    type Config = PrioritizedReplayBufferConfig;
    type Batch = TransitionBatch;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        let per_config = &config.per_config;
        info!(
            "Build prioritized replay buffer: capacity = {}, state_shape = {:?}, alpha = {}",
            capacity, config.state_shape, per_config.alpha
        );

        Ok(Self::from_parts(
            0,
            0,
            TransitionStore::new(capacity, &config.state_shape),
            PriorityIndex::new(capacity, per_config.alpha, per_config.epsilon),
            config.seed,
            per_config.beta_schedule()?,
        ))
    }

    /// Samples with the current beta of the [`BetaSchedule`].
    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let beta = self.beta_schedule.beta();
        self.sample(size, beta)
    }

    fn update_priority(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<()> {
        self.update_priorities(ixs, td_errs)
    }
}
