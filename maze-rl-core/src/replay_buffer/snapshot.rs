//! Persistence of the whole replay buffer.
//!
//! A [`BufferSnapshot`] holds every field of a [`PrioritizedReplayBuffer`]
//! (configuration, cursor, store columns and priorities) and is written with
//! `bincode`, so floating point values are restored bit for bit. Sum and max
//! trees are not stored; they are rebuilt from the priorities.
use super::{
    config::check_unit_interval, priority::PriorityIndex, store::TransitionStore, BetaSchedule,
    PrioritizedReplayBuffer,
};
use crate::error::ReplayBufferError;
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// All fields of a [`PrioritizedReplayBuffer`].
///
/// States are flattened in row-major order of shape `(capacity, *state_shape)`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BufferSnapshot {
    /// Capacity.
    pub capacity: usize,

    /// Shape of a single state.
    pub state_shape: Vec<usize>,

    /// Prioritization exponent.
    pub alpha: f32,

    /// Floor added to updated priorities.
    pub epsilon: f32,

    /// Number of stored transitions.
    pub size: usize,

    /// Write cursor.
    pub ptr: usize,

    /// States.
    pub states: Vec<f32>,

    /// Actions.
    pub actions: Vec<i64>,

    /// Rewards.
    pub rewards: Vec<f32>,

    /// Next states.
    pub next_states: Vec<f32>,

    /// Termination flags.
    pub dones: Vec<bool>,

    /// Truncation flags.
    pub truncateds: Vec<bool>,

    /// Priorities of all slots.
    pub priorities: Vec<f32>,

    /// Beta schedule, including the number of updates seen so far.
    pub beta_schedule: BetaSchedule,
}

impl BufferSnapshot {
    /// Writes the snapshot to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let wtr = BufWriter::new(File::create(path)?);
        bincode::serialize_into(wtr, self)?;
        Ok(())
    }

    /// Reads a snapshot from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let rdr = BufReader::new(File::open(path)?);
        let snapshot = bincode::deserialize_from(rdr)?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| -> Result<()> {
            Err(ReplayBufferError::CorruptSnapshot(msg).into())
        };

        if self.capacity == 0 {
            return corrupt("capacity is zero".to_string());
        }
        if self.state_shape.is_empty() || self.state_shape.iter().any(|&d| d == 0) {
            return corrupt(format!("invalid state shape {:?}", self.state_shape));
        }
        if self.size > self.capacity || self.ptr >= self.capacity {
            return corrupt(format!(
                "size {} and ptr {} do not fit capacity {}",
                self.size, self.ptr, self.capacity
            ));
        }
        // Until the buffer is full, the cursor trails the last pushed slot.
        if self.size < self.capacity && self.ptr != self.size {
            return corrupt(format!(
                "ptr {} does not follow size {} of a buffer that is not full",
                self.ptr, self.size
            ));
        }
        if self.priorities.len() != self.capacity {
            return corrupt(format!(
                "{} priorities for capacity {}",
                self.priorities.len(),
                self.capacity
            ));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return corrupt(format!("invalid epsilon {}", self.epsilon));
        }
        if check_unit_interval("alpha", self.alpha).is_err() {
            return corrupt(format!("alpha = {} is outside of [0, 1]", self.alpha));
        }
        if let Err(e) = self.beta_schedule.validate() {
            return corrupt(format!("invalid beta schedule: {}", e));
        }

        Ok(())
    }
}

impl PrioritizedReplayBuffer {
    /// Takes a snapshot of all fields of the buffer.
    pub fn snapshot(&self) -> BufferSnapshot {
        let store = self.store();
        BufferSnapshot {
            capacity: self.capacity(),
            state_shape: self.state_shape().to_vec(),
            alpha: self.alpha(),
            epsilon: self.epsilon(),
            size: self.len(),
            ptr: self.ptr(),
            states: store.states_flat(),
            actions: store.actions().to_vec(),
            rewards: store.rewards().to_vec(),
            next_states: store.next_states_flat(),
            dones: store.dones().to_vec(),
            truncateds: store.truncateds().to_vec(),
            priorities: self.priority_index().priorities().to_vec(),
            beta_schedule: self.beta_schedule().clone(),
        }
    }

    /// Restores a buffer from a snapshot.
    ///
    /// The random number generator is not part of the snapshot and is seeded
    /// with `seed`.
    ///
    /// Fails with [`ReplayBufferError::CorruptSnapshot`] if the snapshot is
    /// inconsistent.
    pub fn from_snapshot(snapshot: BufferSnapshot, seed: u64) -> Result<Self> {
        snapshot.validate()?;
        let BufferSnapshot {
            capacity,
            state_shape,
            alpha,
            epsilon,
            size,
            ptr,
            states,
            actions,
            rewards,
            next_states,
            dones,
            truncateds,
            priorities,
            beta_schedule,
        } = snapshot;

        let store = TransitionStore::from_columns(
            capacity,
            &state_shape,
            states,
            actions,
            rewards,
            next_states,
            dones,
            truncateds,
        )?;
        let priority = PriorityIndex::from_priorities(priorities, size, alpha, epsilon)?;

        Ok(Self::from_parts(ptr, size, store, priority, seed, beta_schedule))
    }

    /// Saves the buffer to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.snapshot().save(path)?;
        info!(
            "Saved replay buffer with {} transitions in {:?}",
            self.len(),
            path
        );
        Ok(())
    }

    /// Loads a buffer from a file written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>, seed: u64) -> Result<Self> {
        let path = path.as_ref();
        let buffer = Self::from_snapshot(BufferSnapshot::load(path)?, seed)?;
        info!(
            "Loaded replay buffer with {} transitions from {:?}",
            buffer.len(),
            path
        );
        Ok(buffer)
    }
}
