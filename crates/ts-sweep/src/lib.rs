//! # ts-sweep
//!
//! Sweep agent for the compression tuning binary.
//!
//! A search controller hands out parameter assignments; for each one the agent
//! launches the tuning binary, feeds it the assignment as JSON on stdin, reads
//! the metrics from the last line of its stdout and reports them back. A
//! broken trial is reported as an empty result and never stops the sweep.

mod adapter;
mod config;
mod controller;
mod errors;
mod executor;
mod local;
pub mod parser;
mod spaces;
mod stdio;

pub use adapter::{SweepAdapter, SweepSummary, TrialOutcome, TrialRecord};
pub use config::{
    AgentConfig, ControllerKind, DEFAULT_BINARY, DEFAULT_MAX_TRIALS, DEFAULT_TRIAL_TIMEOUT,
};
pub use controller::{SweepController, SweepHandle};
pub use errors::{
    ConfigError, ControllerError, ControllerResult, ExecutorError, ExecutorResult, SweepError,
    SweepResult,
};
pub use executor::{ExitState, TrialCommand, TrialExecutor, TrialOutput};
pub use local::{sample_assignment, BestTrial, RandomSearchController, SweepStatus};
pub use parser::{parse, try_parse, ParseFailure};
pub use spaces::{compression_effort, dictionary_training, SweepVariant};
pub use stdio::JsonLinesController;
