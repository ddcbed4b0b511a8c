//! The per-trial loop between a sweep controller and the tuning binary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use ts_types::{ParameterSpace, TrialAssignment, TrialResult};

use crate::config::AgentConfig;
use crate::controller::{SweepController, SweepHandle};
use crate::errors::{ControllerError, SweepResult};
use crate::executor::{ExitState, TrialExecutor};
use crate::parser;

/// What happened during one trial, kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_number: usize,
    pub assignment: TrialAssignment,
    pub result: TrialResult,
    /// `None` when the binary could not be launched.
    pub exit: Option<ExitState>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub error: Option<String>,
}

/// Outcome of asking the controller for one trial.
#[derive(Debug)]
pub enum TrialOutcome {
    Reported(TrialRecord),
    /// The controller has no more assignments.
    Exhausted,
    ControllerFailed(ControllerError),
}

/// Totals for one [`SweepAdapter::run`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub trials: usize,
    pub empty_results: usize,
    pub timed_out: usize,
    /// Set when the loop ended because the controller failed.
    pub controller_error: Option<String>,
}

/// Runs trials for one declared space against the tuning binary.
#[derive(Debug, Clone)]
pub struct SweepAdapter {
    space: ParameterSpace,
    executor: TrialExecutor,
}

impl SweepAdapter {
    pub fn new(space: ParameterSpace, executor: TrialExecutor) -> SweepResult<Self> {
        space.validate()?;
        Ok(Self { space, executor })
    }

    pub fn from_config(config: &AgentConfig) -> SweepResult<Self> {
        let executor = TrialExecutor::new(config.trial_command(), config.trial_timeout);
        Self::new(config.variant.describe(), executor)
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn executor(&self) -> &TrialExecutor {
        &self.executor
    }

    /// Execute one assignment and parse its output. Never fails: launch
    /// errors, timeouts and unusable output all produce an empty result.
    pub async fn evaluate(&self, trial_number: usize, assignment: TrialAssignment) -> TrialRecord {
        let started_at = Utc::now();
        info!("Trial {} starting with {} parameters", trial_number, assignment.len());

        let (result, exit, error) = match self.executor.execute(&assignment).await {
            Ok(output) => {
                debug!("Trial {} stdout:\n{}", trial_number, output.stdout);
                if !output.stderr.is_empty() {
                    debug!("Trial {} stderr:\n{}", trial_number, output.stderr);
                }
                match output.status {
                    ExitState::TimedOut => (
                        TrialResult::empty(),
                        Some(output.status),
                        Some(format!(
                            "timed out after {:?}",
                            self.executor.timeout()
                        )),
                    ),
                    status => {
                        if !status.is_success() {
                            warn!("Trial {} exited unsuccessfully: {:?}", trial_number, status);
                        }
                        match parser::try_parse(&output.stdout) {
                            Ok(result) => (result, Some(status), None),
                            Err(failure) => {
                                warn!(
                                    "Trial {} produced no usable result: {}",
                                    trial_number, failure
                                );
                                (TrialResult::empty(), Some(status), Some(failure.to_string()))
                            }
                        }
                    }
                }
            }
            Err(e) => {
                error!("Trial {} failed to run: {}", trial_number, e);
                (TrialResult::empty(), None, Some(e.to_string()))
            }
        };

        let finished_at = Utc::now();
        let elapsed_seconds = (finished_at - started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        TrialRecord {
            trial_number,
            assignment,
            result,
            exit,
            started_at,
            finished_at,
            elapsed_seconds,
            error,
        }
    }

    /// Fetch the next assignment, evaluate it and report the result.
    pub async fn run_trial<C>(
        &self,
        controller: &mut C,
        sweep: &SweepHandle,
        trial_number: usize,
    ) -> TrialOutcome
    where
        C: SweepController + ?Sized,
    {
        let assignment = match controller.next_assignment(sweep).await {
            Ok(Some(assignment)) => assignment,
            Ok(None) => return TrialOutcome::Exhausted,
            Err(e) => return TrialOutcome::ControllerFailed(e),
        };

        let record = self.evaluate(trial_number, assignment).await;
        if record.result.objective(&self.space.objective).is_none() && !record.result.is_empty() {
            warn!(
                "Trial {} did not report objective metric {}",
                trial_number, self.space.objective.metric_name
            );
        }

        match controller.log(sweep, &record.result).await {
            Ok(()) => TrialOutcome::Reported(record),
            Err(e) => TrialOutcome::ControllerFailed(e),
        }
    }

    /// Declare the space and run trials until the controller stops handing
    /// out assignments. Controller failures end the loop and are recorded in
    /// the summary.
    pub async fn run<C>(&self, controller: &mut C) -> SweepSummary
    where
        C: SweepController + ?Sized,
    {
        let mut summary = SweepSummary::default();

        let sweep = match controller.declare_space(&self.space).await {
            Ok(sweep) => sweep,
            Err(e) => {
                error!("Failed to declare sweep with {} controller: {}", controller.name(), e);
                summary.controller_error = Some(e.to_string());
                return summary;
            }
        };
        info!(
            "Sweep {} declared with {} controller, objective {} ({})",
            sweep.id,
            controller.name(),
            self.space.objective.metric_name,
            self.space.objective.goal
        );

        loop {
            match self.run_trial(controller, &sweep, summary.trials + 1).await {
                TrialOutcome::Reported(record) => {
                    summary.trials += 1;
                    if record.result.is_empty() {
                        summary.empty_results += 1;
                    }
                    if record.exit == Some(ExitState::TimedOut) {
                        summary.timed_out += 1;
                    }
                    info!(
                        "Trial {} reported {} metrics in {:.1}s",
                        record.trial_number,
                        record.result.len(),
                        record.elapsed_seconds
                    );
                }
                TrialOutcome::Exhausted => break,
                TrialOutcome::ControllerFailed(e) => {
                    error!("Controller {} failed: {}", controller.name(), e);
                    summary.controller_error = Some(e.to_string());
                    break;
                }
            }
        }

        info!(
            "Sweep {} finished: {} trials, {} empty results",
            sweep.id, summary.trials, summary.empty_results
        );
        summary
    }
}
