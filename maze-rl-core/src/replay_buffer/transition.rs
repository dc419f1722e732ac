//! Transitions pushed into the buffer and batches sampled from it.
use ndarray::ArrayD;

/// One step of interaction with an environment.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    /// State before the action.
    pub state: ArrayD<f32>,

    /// Discrete action taken in `state`.
    pub action: i64,

    /// Reward received for the action.
    pub reward: f32,

    /// State after the action.
    pub next_state: ArrayD<f32>,

    /// The episode terminated after this step.
    pub done: bool,

    /// The episode was cut off after this step, e.g. by a step limit.
    pub truncated: bool,
}

impl Transition {
    /// Creates a transition.
    pub fn new(
        state: ArrayD<f32>,
        action: i64,
        reward: f32,
        next_state: ArrayD<f32>,
        done: bool,
        truncated: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
            truncated,
        }
    }
}

/// A batch of transitions sampled from the replay buffer.
///
/// All fields are aligned by position: the `k`-th action belongs to the
/// `k`-th state along the first axis of `states`, was drawn from slot
/// `indices[k]` and carries importance weight `weights[k]`.
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    /// States, shape `(batch_size, *state_shape)`.
    pub states: ArrayD<f32>,

    /// Actions.
    pub actions: Vec<i64>,

    /// Rewards.
    pub rewards: Vec<f32>,

    /// Next states, shape `(batch_size, *state_shape)`.
    pub next_states: ArrayD<f32>,

    /// Termination flags.
    pub dones: Vec<bool>,

    /// Truncation flags.
    pub truncateds: Vec<bool>,

    /// Importance sampling weights, normalized so that their maximum is 1.
    pub weights: Vec<f32>,

    /// Slots the transitions were drawn from. Pass these back to
    /// [`update_priorities`](super::PrioritizedReplayBuffer::update_priorities).
    pub indices: Vec<usize>,
}

impl TransitionBatch {
    /// Returns the number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if the batch holds no transition.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
