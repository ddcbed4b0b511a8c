use thiserror::Error;

/// Violations of the parameter space invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpaceError {
    #[error("Parameter name must not be empty")]
    EmptyName,

    #[error("Duplicate parameter: {name}")]
    DuplicateName { name: String },

    #[error("Invalid bounds for {name}: min {min} must be below max {max}")]
    InvalidBounds { name: String, min: String, max: String },

    #[error("Categorical parameter {name} has no values")]
    EmptyChoices { name: String },

    #[error("Distribution {distribution} does not fit the domain of {name}")]
    DistributionMismatch { name: String, distribution: String },

    #[error("Log-uniform parameter {name} needs a positive lower bound, got {min}")]
    NonPositiveLogBound { name: String, min: f64 },

    #[error("Objective metric name must not be empty")]
    EmptyObjective,
}

pub type SpaceResult<T> = Result<T, SpaceError>;
