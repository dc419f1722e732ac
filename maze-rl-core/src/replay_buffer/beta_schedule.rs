//! Annealing of the importance sampling exponent over priority updates.
use super::config::check_unit_interval;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Value of `beta` as a function of the number of accepted priority updates.
///
/// `beta` moves linearly from `start` to `end` during the first
/// `anneal_updates` calls of
/// [`update_priorities`](super::PrioritizedReplayBuffer::update_priorities)
/// that succeed, then stays at `end`. With `anneal_updates == 0` it is `end`
/// from the start.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct BetaSchedule {
    pub(super) start: f32,
    pub(super) end: f32,
    pub(super) anneal_updates: usize,
    pub(super) n_updates: usize,
}

impl BetaSchedule {
    /// Creates a schedule at zero updates.
    ///
    /// Fails with [`InvalidParameter`](crate::ReplayBufferError::InvalidParameter)
    /// unless both ends lie in `[0, 1]`.
    pub fn new(start: f32, end: f32, anneal_updates: usize) -> Result<Self> {
        let schedule = Self {
            start,
            end,
            anneal_updates,
            n_updates: 0,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// A schedule that always yields `beta`.
    pub fn constant(beta: f32) -> Result<Self> {
        Self::new(beta, beta, 0)
    }

    /// Current value of `beta`.
    pub fn beta(&self) -> f32 {
        if self.n_updates >= self.anneal_updates {
            return self.end;
        }
        let progress = self.n_updates as f32 / self.anneal_updates as f32;
        self.start + (self.end - self.start) * progress
    }

    /// Number of accepted priority updates so far.
    pub fn n_updates(&self) -> usize {
        self.n_updates
    }

    /// Returns `true` once `beta` has reached its final value.
    pub fn is_annealed(&self) -> bool {
        self.n_updates >= self.anneal_updates
    }

    pub(super) fn record_update(&mut self) {
        self.n_updates = self.n_updates.saturating_add(1);
    }

    pub(super) fn validate(&self) -> Result<()> {
        check_unit_interval("beta_start", self.start)?;
        check_unit_interval("beta_end", self.end)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ReplayBufferError;

    #[test]
    fn test_anneals_then_holds() {
        let mut schedule = BetaSchedule::new(0.4, 1.0, 4).unwrap();
        assert_eq!(schedule.beta(), 0.4);

        schedule.record_update();
        schedule.record_update();
        assert!((schedule.beta() - 0.7).abs() < 1e-6);
        assert!(!schedule.is_annealed());

        (0..10).for_each(|_| schedule.record_update());
        assert_eq!(schedule.n_updates(), 12);
        assert_eq!(schedule.beta(), 1.0);
        assert!(schedule.is_annealed());
    }

    #[test]
    fn test_zero_anneal_updates() {
        let schedule = BetaSchedule::new(0.4, 0.9, 0).unwrap();
        assert_eq!(schedule.beta(), 0.9);
        assert_eq!(BetaSchedule::constant(0.5).unwrap().beta(), 0.5);
    }

    #[test]
    fn test_rejects_out_of_range_ends() {
        for (start, end) in [(-0.1, 1.0), (0.4, 1.5), (f32::NAN, 1.0)].iter() {
            let err = BetaSchedule::new(*start, *end, 10).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ReplayBufferError>(),
                Some(ReplayBufferError::InvalidParameter(_))
            ));
        }
    }
}
