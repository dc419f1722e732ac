//! Per-slot priorities and proportional sampling.
use super::{sum_tree::SumTree, weight::importance_weights};
use crate::error::ReplayBufferError;
use anyhow::Result;
use rand::Rng;
use segment_tree::{ops::MaxIgnoreNaN, SegmentPoint};

/// Priority of a transition pushed into an empty buffer.
const INITIAL_PRIORITY: f32 = 1.0;

/// Priorities of the slots of the replay buffer.
///
/// Raw priorities are kept as given. The sum tree holds `priority^alpha`,
/// the unnormalized sampling mass, and the segment tree answers the
/// max-priority query needed when new transitions are pushed.
pub(super) struct PriorityIndex {
    alpha: f32,
    epsilon: f32,
    priorities: Vec<f32>,
    sum_tree: SumTree,
    max_tree: SegmentPoint<f32, MaxIgnoreNaN>,
}

impl PriorityIndex {
    pub fn new(capacity: usize, alpha: f32, epsilon: f32) -> Self {
        Self {
            alpha,
            epsilon,
            priorities: vec![0f32; capacity],
            sum_tree: SumTree::new(capacity),
            max_tree: SegmentPoint::build(vec![0f32; capacity], MaxIgnoreNaN),
        }
    }

    /// Rebuilds the index from stored priorities of which the first `size`
    /// are valid.
    pub fn from_priorities(
        priorities: Vec<f32>,
        size: usize,
        alpha: f32,
        epsilon: f32,
    ) -> Result<Self> {
        if let Some(p) = priorities[..size]
            .iter()
            .find(|&&p| !(p.is_finite() && p >= epsilon))
        {
            return Err(ReplayBufferError::CorruptSnapshot(format!(
                "priority {} is below the floor {} or not finite",
                p, epsilon
            ))
            .into());
        }

        let mut index = Self::new(priorities.len(), alpha, epsilon);
        for (ix, &p) in priorities[..size].iter().enumerate() {
            index.set(ix, p);
        }
        // Slots beyond `size` carry no sampling mass but keep their raw value.
        index.priorities = priorities;

        Ok(index)
    }

    /// Maximum priority among the first `size` slots, or the initial priority
    /// if there is none.
    pub fn max_priority(&self, size: usize) -> f32 {
        if size == 0 {
            INITIAL_PRIORITY
        } else {
            self.max_tree.query(0, size)
        }
    }

    fn set(&mut self, ix: usize, p: f32) {
        self.priorities[ix] = p;
        self.sum_tree.set(ix, (p as f64).powf(self.alpha as f64));
        self.max_tree.modify(ix, p);
    }

    /// Assigns the priority of a transition just written to slot `ix` of a
    /// buffer that held `size` transitions before the write.
    pub fn push(&mut self, ix: usize, size: usize) {
        let max_p = self.max_priority(size);
        self.set(ix, max_p);
    }

    /// Sets `priority[ixs[k]] = |magnitudes[k]| + epsilon`.
    ///
    /// All arguments are validated before any priority changes.
    pub fn update(&mut self, ixs: &[usize], magnitudes: &[f32], size: usize) -> Result<()> {
        if ixs.len() != magnitudes.len() {
            return Err(ReplayBufferError::InvalidParameter(format!(
                "{} indices but {} magnitudes",
                ixs.len(),
                magnitudes.len()
            ))
            .into());
        }
        if let Some(&index) = ixs.iter().find(|&&ix| ix >= size) {
            return Err(ReplayBufferError::InvalidIndex { index, size }.into());
        }
        if let Some(m) = magnitudes.iter().find(|m| !m.is_finite()) {
            return Err(
                ReplayBufferError::InvalidParameter(format!("magnitude {} is not finite", m))
                    .into(),
            );
        }

        for (&ix, &m) in ixs.iter().zip(magnitudes.iter()) {
            self.set(ix, m.abs() + self.epsilon);
        }

        Ok(())
    }

    /// Draws `batch_size` slots with replacement, slot `i` with probability
    /// `priority[i]^alpha / sum_j priority[j]^alpha`, and returns them with
    /// their importance sampling weights.
    ///
    /// Only the first `size` slots carry sampling mass, so `size` must be
    /// positive.
    pub fn sample<R: Rng>(
        &self,
        rng: &mut R,
        batch_size: usize,
        size: usize,
        beta: f32,
    ) -> (Vec<usize>, Vec<f32>) {
        debug_assert!(size > 0);
        let total = self.sum_tree.total();
        let ixs = (0..batch_size)
            .map(|_| self.sum_tree.find(total * rng.gen::<f64>()))
            .collect::<Vec<_>>();
        debug_assert!(ixs.iter().all(|&ix| ix < size));

        let probs = ixs
            .iter()
            .map(|&ix| self.sum_tree.leaf(ix) / total)
            .collect::<Vec<_>>();
        let ws = importance_weights(&probs, size, beta);

        (ixs, ws)
    }

    /// Sampling probability of slot `ix`.
    pub fn probability(&self, ix: usize) -> f64 {
        self.sum_tree.leaf(ix) / self.sum_tree.total()
    }

    pub fn get(&self, ix: usize) -> f32 {
        self.priorities[ix]
    }

    pub fn priorities(&self) -> &[f32] {
        &self.priorities
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }
}
