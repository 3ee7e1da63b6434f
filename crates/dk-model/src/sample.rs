//! Periodic sample-event bookkeeping.

use crate::error::{ModelError, ModelResult};
use dk_core::Real;

/// One periodic sample generator: fires at `start`, `start + interval`, ...
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplePlan {
    pub start: Real,
    pub interval: Real,
}

/// Tracks the next firing time of every sample plan and which plans are
/// active during the current event pass.
///
/// The activate/deactivate split mirrors how the event coordinator uses
/// samples: due plans are activated before the discrete update is
/// evaluated, and advanced by one period once the update has seen them.
#[derive(Clone, Debug)]
pub struct SampleSchedule {
    plans: Vec<SamplePlan>,
    next_times: Vec<Real>,
    active: Vec<bool>,
}

impl SampleSchedule {
    pub fn new(plans: Vec<SamplePlan>) -> ModelResult<Self> {
        for (i, plan) in plans.iter().enumerate() {
            if !plan.start.is_finite() || !plan.interval.is_finite() {
                return Err(ModelError::Description {
                    what: format!("sample plan {i} has non-finite timing"),
                });
            }
            if plan.interval <= 0.0 {
                return Err(ModelError::Description {
                    what: format!("sample plan {i} interval must be positive"),
                });
            }
        }
        let next_times = plans.iter().map(|p| p.start).collect();
        let active = vec![false; plans.len()];
        Ok(Self {
            plans,
            next_times,
            active,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Re-seed every plan's next firing time to the first occurrence at or
    /// after `t0`.
    pub fn reset(&mut self, t0: Real) {
        for (plan, next) in self.plans.iter().zip(self.next_times.iter_mut()) {
            *next = if plan.start >= t0 {
                plan.start
            } else {
                let periods = ((t0 - plan.start) / plan.interval).ceil();
                plan.start + periods * plan.interval
            };
        }
        self.active.fill(false);
    }

    /// Earliest scheduled firing time over all plans.
    pub fn next_event(&self) -> Option<Real> {
        self.next_times
            .iter()
            .copied()
            .min_by(|a, b| a.partial_cmp(b).expect("sample times are finite"))
    }

    /// Mark every plan whose scheduled time has elapsed as active.
    /// Returns how many plans fired.
    pub fn activate_due(&mut self, t: Real) -> usize {
        let mut fired = 0;
        for i in 0..self.plans.len() {
            if self.next_times[i] <= t {
                self.active[i] = true;
                fired += 1;
            }
        }
        fired
    }

    pub fn any_active(&self) -> bool {
        self.active.iter().any(|&a| a)
    }

    /// Clear active marks and advance each fired plan by its period.
    pub fn deactivate_and_advance(&mut self) {
        for i in 0..self.plans.len() {
            if self.active[i] {
                self.active[i] = false;
                self.next_times[i] += self.plans[i].interval;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nonpositive_interval() {
        let err = SampleSchedule::new(vec![SamplePlan {
            start: 0.0,
            interval: 0.0,
        }]);
        assert!(err.is_err());
    }

    #[test]
    fn reset_seeds_first_occurrence_at_or_after_t0() {
        let mut s = SampleSchedule::new(vec![
            SamplePlan {
                start: 0.0,
                interval: 0.25,
            },
            SamplePlan {
                start: 1.0,
                interval: 1.0,
            },
        ])
        .unwrap();
        s.reset(0.3);
        assert_eq!(s.next_event().unwrap(), 0.5);
        s.reset(0.0);
        assert_eq!(s.next_event().unwrap(), 0.0);
    }

    #[test]
    fn fire_and_advance_by_period() {
        let mut s = SampleSchedule::new(vec![SamplePlan {
            start: 0.5,
            interval: 0.5,
        }])
        .unwrap();
        s.reset(0.0);
        assert_eq!(s.activate_due(0.4), 0);
        assert_eq!(s.activate_due(0.5), 1);
        assert!(s.any_active());
        s.deactivate_and_advance();
        assert!(!s.any_active());
        assert_eq!(s.next_event().unwrap(), 1.0);
    }

    #[test]
    fn empty_schedule_has_no_events() {
        let s = SampleSchedule::new(Vec::new()).unwrap();
        assert!(s.is_empty());
        assert!(s.next_event().is_none());
    }
}
