//! Runs the append, sample and update cycle of the prioritized replay buffer
//! on a small grid maze.
//!
//! A tabular Q function stands in for the network: sampled batches are used
//! for importance-weighted Q-learning updates and the absolute TD errors are
//! fed back as priorities.
mod grid;

use anyhow::{bail, Result};
use clap::Parser;
use grid::{cell, random_action, GridMaze, N_ACTIONS};
use log::info;
use maze_rl_core::{
    ExperienceBufferBase, PerConfig, PrioritizedReplayBuffer, PrioritizedReplayBufferConfig,
    ReplayBufferBase, TransitionBatch,
};
use ndarray::Axis;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::PathBuf;

const DISCOUNT_FACTOR: f32 = 0.95;
const LR: f32 = 0.1;
const EPSILON_GREEDY: f64 = 0.2;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Replay buffer configuration (YAML). Overrides the buffer options below.
    /// Its state shape must match the grid
    #[arg(long)]
    config: Option<PathBuf>,

    /// Capacity of the replay buffer
    #[arg(long, default_value_t = 10000)]
    capacity: usize,

    /// Prioritization exponent
    #[arg(long, default_value_t = 0.6)]
    alpha: f32,

    /// Importance sampling exponent at the first update, annealed to 1
    #[arg(long, default_value_t = 0.4)]
    beta: f32,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Side length of the grid maze
    #[arg(long, default_value_t = 5)]
    grid_size: usize,

    /// Maximum steps of an episode
    #[arg(long, default_value_t = 100)]
    max_steps: usize,

    /// Number of environment steps
    #[arg(long, default_value_t = 20000)]
    steps: usize,

    /// Environment steps before the first optimization
    #[arg(long, default_value_t = 500)]
    warmup: usize,

    /// Batch size
    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Interval of logging in environment steps
    #[arg(long, default_value_t = 2000)]
    log_interval: usize,

    /// Saves the buffer here at the end of the run and loads it back
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

/// Tabular action values.
struct QTable {
    n_actions: usize,
    q: Vec<f32>,
}

impl QTable {
    fn new(n_cells: usize, n_actions: usize) -> Self {
        Self {
            n_actions,
            q: vec![0.0; n_cells * n_actions],
        }
    }

    fn row(&self, cell: usize) -> &[f32] {
        &self.q[cell * self.n_actions..(cell + 1) * self.n_actions]
    }

    fn greedy(&self, cell: usize) -> usize {
        let row = self.row(cell);
        (0..self.n_actions)
            .fold(0, |best, a| if row[a] > row[best] { a } else { best })
    }

    /// Applies importance-weighted Q-learning to a batch and returns the TD
    /// errors.
    fn update(&mut self, batch: &TransitionBatch) -> Vec<f32> {
        (0..batch.len())
            .map(|k| {
                let s = cell(batch.states.index_axis(Axis(0), k));
                let s_ = cell(batch.next_states.index_axis(Axis(0), k));
                let a = batch.actions[k] as usize;
                let bootstrap = if batch.dones[k] {
                    0.0
                } else {
                    self.row(s_).iter().cloned().fold(f32::MIN, f32::max)
                };
                let ix = s * self.n_actions + a;
                let td_err = batch.rewards[k] + DISCOUNT_FACTOR * bootstrap - self.q[ix];
                self.q[ix] += LR * batch.weights[k] * td_err;
                td_err
            })
            .collect()
    }
}

fn buffer_config(args: &Args, state_shape: Vec<usize>) -> Result<PrioritizedReplayBufferConfig> {
    let config = match &args.config {
        Some(path) => {
            info!("Load replay buffer config from {:?}", path);
            PrioritizedReplayBufferConfig::load(path)?
        }
        None => PrioritizedReplayBufferConfig::default()
            .capacity(args.capacity)
            .state_shape(state_shape.clone())
            .seed(args.seed)
            .per_config(
                PerConfig::default()
                    .alpha(args.alpha)
                    .beta_start(args.beta)
                    .beta_anneal_updates(args.steps.saturating_sub(args.warmup)),
            ),
    };
    if config.state_shape != state_shape {
        bail!(
            "state_shape {:?} of the buffer config does not match the {}x{} grid",
            config.state_shape,
            args.grid_size,
            args.grid_size
        );
    }
    Ok(config)
}

fn run(args: &Args) -> Result<PrioritizedReplayBuffer> {
    let mut env = GridMaze::new(args.grid_size, args.max_steps);
    let config = buffer_config(args, env.state_shape())?;
    let mut buffer = PrioritizedReplayBuffer::build(&config)?;
    let mut qtable = QTable::new(env.n_cells(), N_ACTIONS);
    let mut rng = StdRng::seed_from_u64(args.seed);

    let mut state = env.reset();
    let mut n_episodes = 0;
    let mut n_opts = 0;
    let mut abs_td_err_sum = 0.0;

    for step in 1..=args.steps {
        let action = if rng.gen_bool(EPSILON_GREEDY) {
            random_action(&mut rng)
        } else {
            qtable.greedy(cell(state.view()))
        };
        let tr = env.step(state, action);
        let episode_over = tr.done || tr.truncated;
        state = tr.next_state.clone();
        buffer.push(tr)?;

        if episode_over {
            n_episodes += 1;
            state = env.reset();
        }

        if step > args.warmup {
            let batch = buffer.batch(args.batch_size)?;
            let td_errs = qtable.update(&batch);
            abs_td_err_sum += td_errs.iter().map(|e| e.abs()).sum::<f32>() / td_errs.len() as f32;
            buffer.update_priority(&batch.indices, &td_errs)?;
            n_opts += 1;
        }

        if args.log_interval > 0 && step % args.log_interval == 0 {
            let mean_abs_td_err = if n_opts > 0 {
                abs_td_err_sum / n_opts as f32
            } else {
                0.0
            };
            info!(
                "step = {}, episodes = {}, buffer = {} ({:?}), beta = {:.3}, goals in buffer = {}, mean |td| = {:.4}",
                step,
                n_episodes,
                buffer.len(),
                buffer.phase(),
                buffer.beta_schedule().beta(),
                buffer.num_terminated_flags(),
                mean_abs_td_err,
            );
            abs_td_err_sum = 0.0;
            n_opts = 0;
        }
    }

    Ok(buffer)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let buffer = run(&args)?;
    info!(
        "Finished: {} transitions, sum of rewards = {:.2}, truncated = {}",
        buffer.len(),
        buffer.sum_rewards(),
        buffer.num_truncated_flags()
    );

    if let Some(path) = &args.snapshot {
        buffer.save(path)?;
        let restored = PrioritizedReplayBuffer::load(path, args.seed)?;
        info!(
            "Restored buffer: {} transitions, ptr = {}",
            restored.len(),
            restored.ptr()
        );
    }

    Ok(())
}
