use thiserror::Error;
use ts_types::SpaceError;

/// Top-level error for setting up a sweep agent.
///
/// Per-trial failures never surface as this type; the adapter turns them into
/// empty results.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Space error: {0}")]
    Space(#[from] SpaceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),
}

pub type SweepResult<T> = Result<T, SweepError>;

/// Failures while running the tuning subprocess.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize assignment: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Subprocess IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Failures talking to the sweep controller.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Controller channel IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed assignment from controller: {message}, line: {line}")]
    MalformedAssignment { line: String, message: String },

    #[error("Controller rejected parameter space: {0}")]
    InvalidSpace(#[from] SpaceError),

    #[error("Sweep was not declared with this controller: {sweep_id}")]
    UnknownSweep { sweep_id: String },

    #[error("Controller serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Invalid agent configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({message})")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("Unknown sweep variant: {0}")]
    UnknownVariant(String),

    #[error("Unknown controller: {0}")]
    UnknownController(String),
}
