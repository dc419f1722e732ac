//! Column-oriented storage of transitions.
use super::{Transition, TransitionBatch};
use crate::error::ReplayBufferError;
use anyhow::Result;
use ndarray::{ArrayD, Axis, IxDyn};

/// Fixed-size circular storage of transition fields.
///
/// Every field lives in its own preallocated column and slot `i` of each
/// column holds the `i`-th stored transition. The store never grows; the
/// caller decides which slot to overwrite.
#[derive(Debug)]
pub(super) struct TransitionStore {
    capacity: usize,
    state_shape: Vec<usize>,
    states: ArrayD<f32>,
    actions: Vec<i64>,
    rewards: Vec<f32>,
    next_states: ArrayD<f32>,
    dones: Vec<bool>,
    truncateds: Vec<bool>,
}

impl TransitionStore {
    pub fn new(capacity: usize, state_shape: &[usize]) -> Self {
        let dims = Self::column_shape(capacity, state_shape);
        Self {
            capacity,
            state_shape: state_shape.to_vec(),
            states: ArrayD::zeros(IxDyn(&dims)),
            actions: vec![0; capacity],
            rewards: vec![0.; capacity],
            next_states: ArrayD::zeros(IxDyn(&dims)),
            dones: vec![false; capacity],
            truncateds: vec![false; capacity],
        }
    }

    /// Builds a store from flattened columns, as kept in a snapshot.
    #[allow(clippy::too_many_arguments)]
    pub fn from_columns(
        capacity: usize,
        state_shape: &[usize],
        states: Vec<f32>,
        actions: Vec<i64>,
        rewards: Vec<f32>,
        next_states: Vec<f32>,
        dones: Vec<bool>,
        truncateds: Vec<bool>,
    ) -> Result<Self> {
        let dims = Self::column_shape(capacity, state_shape);
        let corrupt = |what: &str| ReplayBufferError::CorruptSnapshot(what.to_string());
        let states = ArrayD::from_shape_vec(IxDyn(&dims), states)
            .map_err(|_| corrupt("states do not match capacity and state shape"))?;
        let next_states = ArrayD::from_shape_vec(IxDyn(&dims), next_states)
            .map_err(|_| corrupt("next states do not match capacity and state shape"))?;
        if actions.len() != capacity
            || rewards.len() != capacity
            || dones.len() != capacity
            || truncateds.len() != capacity
        {
            return Err(corrupt("scalar columns do not match capacity").into());
        }

        Ok(Self {
            capacity,
            state_shape: state_shape.to_vec(),
            states,
            actions,
            rewards,
            next_states,
            dones,
            truncateds,
        })
    }

    fn column_shape(capacity: usize, state_shape: &[usize]) -> Vec<usize> {
        let mut dims = Vec::with_capacity(state_shape.len() + 1);
        dims.push(capacity);
        dims.extend_from_slice(state_shape);
        dims
    }

    /// Fails with [`ReplayBufferError::ShapeMismatch`] unless both states
    /// conform to the configured shape.
    pub fn check_shape(&self, tr: &Transition) -> Result<()> {
        for state in [&tr.state, &tr.next_state].iter() {
            if state.shape() != self.state_shape.as_slice() {
                return Err(ReplayBufferError::ShapeMismatch {
                    expected: self.state_shape.clone(),
                    actual: state.shape().to_vec(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Overwrites slot `i`. The shape must have been checked beforehand.
    pub fn write(&mut self, i: usize, tr: Transition) {
        debug_assert!(i < self.capacity);
        self.states.index_axis_mut(Axis(0), i).assign(&tr.state);
        self.next_states
            .index_axis_mut(Axis(0), i)
            .assign(&tr.next_state);
        self.actions[i] = tr.action;
        self.rewards[i] = tr.reward;
        self.dones[i] = tr.done;
        self.truncateds[i] = tr.truncated;
    }

    /// Reads slot `i` back as an owned transition.
    pub fn get(&self, i: usize) -> Transition {
        Transition {
            state: self.states.index_axis(Axis(0), i).to_owned(),
            action: self.actions[i],
            reward: self.rewards[i],
            next_state: self.next_states.index_axis(Axis(0), i).to_owned(),
            done: self.dones[i],
            truncated: self.truncateds[i],
        }
    }

    /// Gathers the given slots into a batch.
    pub fn gather(&self, ixs: Vec<usize>, weights: Vec<f32>) -> TransitionBatch {
        TransitionBatch {
            states: self.states.select(Axis(0), &ixs),
            actions: ixs.iter().map(|&ix| self.actions[ix]).collect(),
            rewards: ixs.iter().map(|&ix| self.rewards[ix]).collect(),
            next_states: self.next_states.select(Axis(0), &ixs),
            dones: ixs.iter().map(|&ix| self.dones[ix]).collect(),
            truncateds: ixs.iter().map(|&ix| self.truncateds[ix]).collect(),
            weights,
            indices: ixs,
        }
    }

    pub fn state_shape(&self) -> &[usize] {
        &self.state_shape
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    pub fn dones(&self) -> &[bool] {
        &self.dones
    }

    pub fn truncateds(&self) -> &[bool] {
        &self.truncateds
    }

    pub fn actions(&self) -> &[i64] {
        &self.actions
    }

    /// Flattened states in logical (row-major) order.
    pub fn states_flat(&self) -> Vec<f32> {
        self.states.iter().cloned().collect()
    }

    /// Flattened next states in logical (row-major) order.
    pub fn next_states_flat(&self) -> Vec<f32> {
        self.next_states.iter().cloned().collect()
    }
}
