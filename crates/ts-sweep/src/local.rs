//! In-process controller that samples the declared space at random.
//!
//! Useful for smoke runs of a tuning binary without an external optimizer.
//! It draws each parameter independently and keeps the best result seen; it
//! does not model the objective.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_types::{
    Distribution, Domain, ParameterSpace, ParameterSpec, ParameterValue, TrialAssignment,
    TrialResult,
};

use crate::controller::{SweepController, SweepHandle};
use crate::errors::{ControllerError, ControllerResult};

/// Best trial seen so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestTrial {
    pub trial_number: usize,
    pub objective: f64,
    pub assignment: TrialAssignment,
    pub result: TrialResult,
}

/// Aggregate progress of a locally driven sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepStatus {
    pub trials_issued: usize,
    pub trials_reported: usize,
    /// Reports that were empty or lacked the objective metric.
    pub trials_without_objective: usize,
    pub best_trial: Option<BestTrial>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

pub struct RandomSearchController {
    space: Option<ParameterSpace>,
    sweep: Option<SweepHandle>,
    max_trials: usize,
    rng: StdRng,
    pending: Option<TrialAssignment>,
    status: SweepStatus,
}

impl RandomSearchController {
    pub fn new(max_trials: usize) -> Self {
        Self::with_rng(max_trials, StdRng::from_os_rng())
    }

    pub fn seeded(max_trials: usize, seed: u64) -> Self {
        Self::with_rng(max_trials, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_trials: usize, rng: StdRng) -> Self {
        Self {
            space: None,
            sweep: None,
            max_trials,
            rng,
            pending: None,
            status: SweepStatus::default(),
        }
    }

    pub fn status(&self) -> &SweepStatus {
        &self.status
    }

    fn check_sweep(&self, sweep: &SweepHandle) -> ControllerResult<&ParameterSpace> {
        match (&self.sweep, &self.space) {
            (Some(declared), Some(space)) if declared.id == sweep.id => Ok(space),
            _ => Err(ControllerError::UnknownSweep {
                sweep_id: sweep.id.to_string(),
            }),
        }
    }

    /// Update the best trial if `result` improves on the current best.
    fn update_best(&mut self, assignment: TrialAssignment, result: &TrialResult) {
        let Some(space) = &self.space else { return };
        let Some(objective) = result.objective(&space.objective) else {
            self.status.trials_without_objective += 1;
            return;
        };
        let improves = match &self.status.best_trial {
            None => true,
            Some(best) => space.objective.is_better(objective, best.objective),
        };
        if improves {
            info!(
                "New best {} = {} at trial {}",
                space.objective.metric_name, objective, self.status.trials_reported
            );
            self.status.best_trial = Some(BestTrial {
                trial_number: self.status.trials_reported,
                objective,
                assignment,
                result: result.clone(),
            });
        }
    }
}

/// Draw one assignment covering every parameter of `space`.
pub fn sample_assignment<R: Rng>(space: &ParameterSpace, rng: &mut R) -> TrialAssignment {
    space
        .parameters
        .iter()
        .map(|param| (param.name.clone(), sample_value(param, rng)))
        .collect()
}

fn sample_value<R: Rng>(param: &ParameterSpec, rng: &mut R) -> ParameterValue {
    match (&param.domain, param.distribution) {
        (Domain::Integer { min, max }, _) => ParameterValue::Int(rng.random_range(*min..=*max)),
        (Domain::Real { min, max }, Distribution::LogUniform) => {
            let log_val: f64 = rng.random_range(min.ln()..=max.ln());
            ParameterValue::Float(log_val.exp().clamp(*min, *max))
        }
        (Domain::Real { min, max }, _) => ParameterValue::Float(rng.random_range(*min..=*max)),
        (Domain::Categorical { values }, _) => {
            let idx = rng.random_range(0..values.len());
            ParameterValue::from(values[idx].clone())
        }
    }
}

#[async_trait]
impl SweepController for RandomSearchController {
    async fn declare_space(&mut self, space: &ParameterSpace) -> ControllerResult<SweepHandle> {
        // Sampling panics on empty choices or inverted bounds
        space.validate()?;
        let sweep = SweepHandle::new();
        debug!(
            "Declared local sweep {} over {} parameters",
            sweep.id,
            space.parameters.len()
        );
        self.space = Some(space.clone());
        self.sweep = Some(sweep.clone());
        self.pending = None;
        self.status = SweepStatus {
            started_at: Some(Utc::now()),
            ..SweepStatus::default()
        };
        Ok(sweep)
    }

    async fn next_assignment(
        &mut self,
        sweep: &SweepHandle,
    ) -> ControllerResult<Option<TrialAssignment>> {
        self.check_sweep(sweep)?;
        if self.status.trials_issued >= self.max_trials {
            if self.status.finished_at.is_none() {
                self.status.finished_at = Some(Utc::now());
            }
            return Ok(None);
        }
        let assignment = match &self.space {
            Some(space) => sample_assignment(space, &mut self.rng),
            None => return Ok(None),
        };
        self.status.trials_issued += 1;
        self.pending = Some(assignment.clone());
        Ok(Some(assignment))
    }

    async fn log(&mut self, sweep: &SweepHandle, result: &TrialResult) -> ControllerResult<()> {
        self.check_sweep(sweep)?;
        self.status.trials_reported += 1;
        let assignment = self.pending.take().unwrap_or_default();
        self.update_best(assignment, result);
        Ok(())
    }

    fn name(&self) -> &str {
        "random"
    }
}
