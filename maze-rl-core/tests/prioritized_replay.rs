use anyhow::Result;
use maze_rl_core::{
    BufferPhase, PerConfig, PrioritizedReplayBuffer, PrioritizedReplayBufferConfig,
    ReplayBufferBase, ReplayBufferError, Transition,
};
use ndarray::{ArrayD, IxDyn};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn config(capacity: usize, state_shape: Vec<usize>, alpha: f32) -> PrioritizedReplayBufferConfig {
    PrioritizedReplayBufferConfig::default()
        .capacity(capacity)
        .state_shape(state_shape)
        .per_config(PerConfig::default().alpha(alpha))
}

fn transition(state_shape: &[usize], reward: f32) -> Transition {
    let state = ArrayD::from_elem(IxDyn(state_shape), reward);
    let next_state = ArrayD::from_elem(IxDyn(state_shape), reward + 1.0);
    Transition::new(state, reward as i64, reward, next_state, false, false)
}

fn counts(indices: &[usize], n: usize) -> Vec<usize> {
    let mut counts = vec![0; n];
    indices.iter().for_each(|&ix| counts[ix] += 1);
    counts
}

#[test]
fn test_overwrites_oldest_transitions() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(3, vec![1], 0.6))?;
    for r in [10.0, 20.0, 30.0, 40.0].iter() {
        buffer.append(transition(&[1], *r))?;
    }

    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.ptr(), 1);
    assert_eq!(buffer.phase(), BufferPhase::Full);
    let rewards = (0..3)
        .map(|ix| buffer.get(ix).unwrap().reward)
        .collect::<Vec<_>>();
    assert_eq!(rewards, vec![40.0, 20.0, 30.0]);

    // The next push overwrites the slot holding reward 20.
    assert_eq!(buffer.get(buffer.ptr()).unwrap().reward, 20.0);

    Ok(())
}

#[test]
fn test_keeps_last_capacity_transitions_in_circular_order() -> Result<()> {
    let capacity = 5;
    let n_pushes = 12;
    let mut buffer = PrioritizedReplayBuffer::build(&config(capacity, vec![2, 2], 0.6))?;
    for i in 0..n_pushes {
        buffer.append(transition(&[2, 2], i as f32))?;
    }

    assert_eq!(buffer.len(), capacity);
    for k in 0..capacity {
        let tr = buffer.get((buffer.ptr() + k) % capacity).unwrap();
        let expected = transition(&[2, 2], (n_pushes - capacity + k) as f32);
        assert_eq!(tr, expected);
    }

    Ok(())
}

#[test]
fn test_sample_from_empty_buffer() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(4, vec![3], 0.6))?;
    let err = buffer.sample(8, 0.4).err().unwrap();
    assert_eq!(
        err.downcast_ref::<ReplayBufferError>(),
        Some(&ReplayBufferError::EmptyBuffer)
    );
    Ok(())
}

#[test]
fn test_new_transition_gets_max_priority() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(4, vec![1], 0.6))?;
    buffer.append(transition(&[1], 0.0))?;
    assert_eq!(buffer.priority(0), Some(1.0));

    buffer.append(transition(&[1], 1.0))?;
    buffer.update_priorities(&[0, 1], &[0.2, 5.0])?;
    buffer.append(transition(&[1], 2.0))?;
    assert_eq!(buffer.priority(2), buffer.priority(1));

    buffer.update_priorities(&[1, 2], &[0.1, 0.1])?;
    buffer.append(transition(&[1], 3.0))?;
    assert_eq!(buffer.priority(3), Some(0.2 + buffer.epsilon()));

    // Overwriting slot 0 takes the max over all stored slots, including
    // the one being evicted.
    buffer.update_priorities(&[0, 1, 2, 3], &[7.0, 0.1, 0.1, 0.1])?;
    buffer.append(transition(&[1], 4.0))?;
    assert_eq!(buffer.priority(0), Some(7.0 + buffer.epsilon()));

    Ok(())
}

#[test]
fn test_zero_magnitude_gives_epsilon() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(4, vec![1], 0.6))?;
    for r in 0..3 {
        buffer.append(transition(&[1], r as f32))?;
    }
    buffer.update_priorities(&[1], &[0.0])?;
    assert_eq!(buffer.priority(1), Some(buffer.epsilon()));

    buffer.update_priorities(&[2], &[-3.0])?;
    assert_eq!(buffer.priority(2), Some(3.0 + buffer.epsilon()));

    Ok(())
}

#[test]
fn test_invalid_index_is_rejected() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(4, vec![1], 0.6))?;
    for r in 0..2 {
        buffer.append(transition(&[1], r as f32))?;
    }

    let err = buffer.update_priorities(&[1, 2], &[0.5, 0.5]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ReplayBufferError>(),
        Some(&ReplayBufferError::InvalidIndex { index: 2, size: 2 })
    );
    assert_eq!(buffer.priorities(), &[1.0, 1.0]);

    Ok(())
}

#[test]
fn test_priorities_never_fall_below_epsilon() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(16, vec![2], 0.6))?;
    let mut rng = StdRng::seed_from_u64(0);
    let eps = buffer.epsilon();

    for step in 0..200 {
        buffer.append(transition(&[2], step as f32))?;
        if step % 3 == 0 {
            let batch = buffer.sample(8, 0.4)?;
            let magnitudes = (0..batch.len())
                .map(|k| match k % 3 {
                    0 => 0.0,
                    1 => -rng.gen::<f32>(),
                    _ => 10.0 * rng.gen::<f32>(),
                })
                .collect::<Vec<_>>();
            buffer.update_priorities(&batch.indices, &magnitudes)?;
        }
        assert!(buffer.priorities().iter().all(|&p| p >= eps));
    }

    Ok(())
}

#[test]
fn test_max_weight_is_one() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(32, vec![3], 0.6))?;
    for r in 0..20 {
        buffer.append(transition(&[3], r as f32))?;
    }
    let ixs = (0..20).collect::<Vec<_>>();
    let magnitudes = (0..20).map(|i| (i * i) as f32 * 0.1).collect::<Vec<_>>();
    buffer.update_priorities(&ixs, &magnitudes)?;

    for &beta in [0.0, 0.4, 0.7, 1.0].iter() {
        let batch = buffer.sample(64, beta)?;
        assert_eq!(batch.len(), 64);
        assert_eq!(batch.weights.len(), 64);
        assert_eq!(batch.states.shape(), &[64, 3]);
        assert_eq!(batch.next_states.shape(), &[64, 3]);

        let w_max = batch.weights.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(w_max, 1.0);
        assert!(batch.weights.iter().all(|&w| w > 0.0 && w <= 1.0));
    }

    Ok(())
}

#[test]
fn test_batch_fields_are_aligned() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(8, vec![2], 0.6))?;
    for r in 0..8 {
        buffer.append(transition(&[2], r as f32))?;
    }

    let batch = buffer.sample(32, 0.4)?;
    for (k, &ix) in batch.indices.iter().enumerate() {
        let tr = buffer.get(ix).unwrap();
        assert_eq!(batch.rewards[k], tr.reward);
        assert_eq!(batch.actions[k], tr.action);
        assert_eq!(batch.states.index_axis(ndarray::Axis(0), k), tr.state);
        assert_eq!(batch.next_states.index_axis(ndarray::Axis(0), k), tr.next_state);
    }

    Ok(())
}

#[test]
fn test_alpha_zero_samples_uniformly() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(4, vec![1], 0.0))?;
    for r in 0..4 {
        buffer.append(transition(&[1], r as f32))?;
    }
    buffer.update_priorities(&[0, 1, 2, 3], &[0.0, 1.0, 10.0, 100.0])?;

    let n_samples = 40000;
    let batch = buffer.sample(n_samples, 0.4)?;
    for (ix, n) in counts(&batch.indices, 4).into_iter().enumerate() {
        let freq = n as f64 / n_samples as f64;
        assert!((freq - 0.25).abs() < 0.02, "ix={}: {}", ix, freq);
        assert_eq!(buffer.probability(ix), Some(0.25));
    }
    // Equal probabilities leave nothing to correct.
    assert!(batch.weights.iter().all(|&w| w == 1.0));

    Ok(())
}

#[test]
fn test_sampling_is_proportional_to_priority() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(4, vec![1], 1.0))?;
    for r in 0..4 {
        buffer.append(transition(&[1], r as f32))?;
    }
    buffer.update_priorities(&[0, 1, 2, 3], &[1.0, 2.0, 3.0, 4.0])?;

    let n_samples = 50000;
    let batch = buffer.sample(n_samples, 1.0)?;
    let total: f64 = buffer.priorities().iter().map(|&p| p as f64).sum();
    for (ix, n) in counts(&batch.indices, 4).into_iter().enumerate() {
        let expected = buffer.priorities()[ix] as f64 / total;
        let freq = n as f64 / n_samples as f64;
        assert!((freq - expected).abs() < 0.01, "ix={}: {} vs {}", ix, freq, expected);
    }

    Ok(())
}

#[test]
fn test_dominant_priority_is_sampled_most() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(4, vec![1], 1.0))?;
    for r in 0..4 {
        buffer.append(transition(&[1], r as f32))?;
    }
    buffer.update_priorities(&[0, 1, 2, 3], &[0.0, 0.0, 0.0, 100.0])?;

    let n_trials = 10000;
    let mut indices = Vec::with_capacity(n_trials);
    for _ in 0..n_trials {
        let batch = buffer.sample(1, 0.0)?;
        assert_eq!(batch.weights, vec![1.0]);
        indices.push(batch.indices[0]);
    }

    let counts = counts(&indices, 4);
    let p: Vec<f64> = buffer.priorities().iter().map(|&p| p as f64).collect();
    let expected = p[3] / p.iter().sum::<f64>();
    let freq = counts[3] as f64 / n_trials as f64;
    assert!((freq - expected).abs() < 0.01);
    assert!(counts[..3].iter().all(|&n| n < counts[3]));

    Ok(())
}

#[test]
fn test_same_seed_same_batches() -> Result<()> {
    let config = config(16, vec![2], 0.6).seed(123);
    let mut b1 = PrioritizedReplayBuffer::build(&config)?;
    let mut b2 = PrioritizedReplayBuffer::build(&config)?;
    for r in 0..10 {
        b1.append(transition(&[2], r as f32))?;
        b2.append(transition(&[2], r as f32))?;
    }

    let batch1 = b1.sample(16, 0.4)?;
    let batch2 = b2.sample(16, 0.4)?;
    assert_eq!(batch1.indices, batch2.indices);
    assert_eq!(batch1.weights, batch2.weights);

    Ok(())
}
