//! A small open grid maze used to feed the replay buffer.
use maze_rl_core::Transition;
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use rand::Rng;

/// Number of discrete actions: up, down, left, right.
pub const N_ACTIONS: usize = 4;

const STEP_REWARD: f32 = -0.01;
const GOAL_REWARD: f32 = 1.0;

/// Square grid where the agent walks from the top-left corner to the
/// bottom-right one.
///
/// The observation is a one-hot `[size, size]` map of the agent position.
pub struct GridMaze {
    size: usize,
    max_steps: usize,
    pos: (usize, usize),
    n_steps: usize,
}

impl GridMaze {
    pub fn new(size: usize, max_steps: usize) -> Self {
        Self {
            size,
            max_steps,
            pos: (0, 0),
            n_steps: 0,
        }
    }

    pub fn state_shape(&self) -> Vec<usize> {
        vec![self.size, self.size]
    }

    pub fn n_cells(&self) -> usize {
        self.size * self.size
    }

    pub fn reset(&mut self) -> ArrayD<f32> {
        self.pos = (0, 0);
        self.n_steps = 0;
        self.observe()
    }

    fn observe(&self) -> ArrayD<f32> {
        let mut obs = ArrayD::zeros(IxDyn(&[self.size, self.size]));
        obs[&[self.pos.0, self.pos.1][..]] = 1.0;
        obs
    }

    /// Takes `action` from `state` and returns the transition. Moves into the
    /// border leave the agent in place.
    pub fn step(&mut self, state: ArrayD<f32>, action: usize) -> Transition {
        let (r, c) = self.pos;
        self.pos = match action {
            0 => (r.saturating_sub(1), c),
            1 => ((r + 1).min(self.size - 1), c),
            2 => (r, c.saturating_sub(1)),
            _ => (r, (c + 1).min(self.size - 1)),
        };
        self.n_steps += 1;

        let done = self.pos == (self.size - 1, self.size - 1);
        let truncated = !done && self.n_steps >= self.max_steps;
        let reward = if done { GOAL_REWARD } else { STEP_REWARD };

        Transition::new(state, action as i64, reward, self.observe(), done, truncated)
    }
}

/// Index of the cell marked in a one-hot observation.
pub fn cell(obs: ArrayViewD<f32>) -> usize {
    obs.iter()
        .position(|&v| v > 0.5)
        .unwrap_or_default()
}

/// Picks a uniformly random action.
pub fn random_action<R: Rng>(rng: &mut R) -> usize {
    rng.gen_range(0..N_ACTIONS)
}
