//! The search controller abstraction the agent reports to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_types::{ParameterSpace, TrialAssignment, TrialResult};
use uuid::Uuid;

use crate::errors::ControllerResult;

/// Identifies a declared sweep to its controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepHandle {
    pub id: Uuid,
    pub declared_at: DateTime<Utc>,
}

impl SweepHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            declared_at: Utc::now(),
        }
    }
}

impl Default for SweepHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// An external search controller: it owns the optimization algorithm and the
/// trial history, the agent only asks for assignments and reports results.
#[async_trait]
pub trait SweepController: Send {
    /// Register the parameter space and return the handle for its sweep.
    async fn declare_space(&mut self, space: &ParameterSpace) -> ControllerResult<SweepHandle>;

    /// Next assignment to evaluate, or `None` once the sweep is finished.
    async fn next_assignment(
        &mut self,
        sweep: &SweepHandle,
    ) -> ControllerResult<Option<TrialAssignment>>;

    /// Report the metrics of the trial most recently handed out.
    async fn log(&mut self, sweep: &SweepHandle, result: &TrialResult) -> ControllerResult<()>;

    /// Human-readable controller name.
    fn name(&self) -> &str;
}
