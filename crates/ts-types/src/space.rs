//! Parameter space definitions handed to a sweep controller.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

use crate::errors::{SpaceError, SpaceResult};

/// Search method requested from the controller when none is set.
pub const DEFAULT_METHOD: &str = "bayes";

/// Whether the sweep maximizes or minimizes its objective metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveGoal {
    Maximize,
    Minimize,
}

impl Default for ObjectiveGoal {
    fn default() -> Self {
        Self::Maximize
    }
}

impl std::fmt::Display for ObjectiveGoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Maximize => write!(f, "maximize"),
            Self::Minimize => write!(f, "minimize"),
        }
    }
}

/// The metric a sweep optimizes.
///
/// `metric_name` is a contract with the tuning binary: nothing checks that the
/// binary actually reports it until a result comes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    #[serde(rename = "name")]
    pub metric_name: String,
    pub goal: ObjectiveGoal,
}

impl Objective {
    pub fn maximize(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            goal: ObjectiveGoal::Maximize,
        }
    }

    pub fn minimize(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            goal: ObjectiveGoal::Minimize,
        }
    }

    /// Returns true when `candidate` improves on `incumbent` under this goal.
    pub fn is_better(&self, candidate: f64, incumbent: f64) -> bool {
        match self.goal {
            ObjectiveGoal::Maximize => candidate > incumbent,
            ObjectiveGoal::Minimize => candidate < incumbent,
        }
    }
}

/// The set of values a parameter may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Domain {
    /// Integer range [min, max] inclusive.
    Integer { min: i64, max: i64 },
    /// Real range [min, max].
    Real { min: f64, max: f64 },
    /// Explicit set of allowed values.
    Categorical { values: Vec<Value> },
}

/// Sampling hint forwarded to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    Uniform,
    LogUniform,
    IntUniform,
    Choice,
}

impl Distribution {
    fn fits(&self, domain: &Domain) -> bool {
        matches!(
            (self, domain),
            (Self::IntUniform, Domain::Integer { .. })
                | (Self::Uniform, Domain::Real { .. })
                | (Self::LogUniform, Domain::Real { .. })
                | (Self::Choice, Domain::Categorical { .. })
        )
    }
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uniform => "uniform",
            Self::LogUniform => "log_uniform",
            Self::IntUniform => "int_uniform",
            Self::Choice => "choice",
        };
        f.write_str(name)
    }
}

/// A single named dimension of the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name as the tuning binary expects it (e.g. "datasetSize").
    pub name: String,
    pub domain: Domain,
    pub distribution: Distribution,
}

impl ParameterSpec {
    pub fn validate(&self) -> SpaceResult<()> {
        if self.name.is_empty() {
            return Err(SpaceError::EmptyName);
        }
        if !self.distribution.fits(&self.domain) {
            return Err(SpaceError::DistributionMismatch {
                name: self.name.clone(),
                distribution: self.distribution.to_string(),
            });
        }
        match &self.domain {
            Domain::Integer { min, max } => {
                if min >= max {
                    return Err(self.invalid_bounds(min, max));
                }
            }
            Domain::Real { min, max } => {
                // NaN fails the comparison as well
                if !(min.is_finite() && max.is_finite() && min < max) {
                    return Err(self.invalid_bounds(min, max));
                }
                if self.distribution == Distribution::LogUniform && *min <= 0.0 {
                    return Err(SpaceError::NonPositiveLogBound {
                        name: self.name.clone(),
                        min: *min,
                    });
                }
            }
            Domain::Categorical { values } => {
                if values.is_empty() {
                    return Err(SpaceError::EmptyChoices {
                        name: self.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn invalid_bounds(&self, min: impl ToString, max: impl ToString) -> SpaceError {
        SpaceError::InvalidBounds {
            name: self.name.clone(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// Controller-facing description of this parameter.
    fn sweep_entry(&self) -> Value {
        match (&self.domain, self.distribution) {
            (Domain::Integer { min, max }, dist) => json!({
                "distribution": dist.to_string(),
                "min": min,
                "max": max,
            }),
            (Domain::Real { min, max }, Distribution::LogUniform) => json!({
                "distribution": "log_uniform_values",
                "min": min,
                "max": max,
            }),
            (Domain::Real { min, max }, dist) => json!({
                "distribution": dist.to_string(),
                "min": min,
                "max": max,
            }),
            (Domain::Categorical { values }, _) => json!({ "values": values }),
        }
    }
}

/// The full search space: an ordered list of parameters plus the objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    pub method: String,
    pub objective: Objective,
    pub parameters: Vec<ParameterSpec>,
}

impl ParameterSpace {
    pub fn new(objective: Objective) -> Self {
        Self {
            method: DEFAULT_METHOD.to_string(),
            objective,
            parameters: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn add_int(self, name: impl Into<String>, min: i64, max: i64) -> Self {
        self.push(name, Domain::Integer { min, max }, Distribution::IntUniform)
    }

    pub fn add_uniform(self, name: impl Into<String>, min: f64, max: f64) -> Self {
        self.push(name, Domain::Real { min, max }, Distribution::Uniform)
    }

    pub fn add_log_uniform(self, name: impl Into<String>, min: f64, max: f64) -> Self {
        self.push(name, Domain::Real { min, max }, Distribution::LogUniform)
    }

    pub fn add_choice(self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.push(name, Domain::Categorical { values }, Distribution::Choice)
    }

    fn push(mut self, name: impl Into<String>, domain: Domain, distribution: Distribution) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            domain,
            distribution,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    /// Check every parameter invariant and name uniqueness.
    pub fn validate(&self) -> SpaceResult<()> {
        if self.objective.metric_name.is_empty() {
            return Err(SpaceError::EmptyObjective);
        }
        let mut seen = HashSet::new();
        for param in &self.parameters {
            param.validate()?;
            if !seen.insert(param.name.as_str()) {
                return Err(SpaceError::DuplicateName {
                    name: param.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Render the sweep configuration document a controller expects:
    /// `{"method", "metric": {"name", "goal"}, "parameters": {...}}`.
    pub fn to_sweep_config(&self) -> Value {
        let parameters: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.sweep_entry()))
            .collect();
        json!({
            "method": self.method,
            "metric": {
                "name": self.objective.metric_name,
                "goal": self.objective.goal,
            },
            "parameters": parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_space() -> ParameterSpace {
        ParameterSpace::new(Objective::maximize("train_inf_gain"))
            .add_int("f", 5, 26)
            .add_uniform("dictionarySizePercentage", 0.0, 1.0)
            .add_log_uniform("lr", 1e-5, 1e-1)
            .add_choice("d", vec![json!(6), json!(8)])
    }

    #[test]
    fn builder_chain_keeps_order() {
        let space = sample_space();
        let names: Vec<&str> = space.names().collect();
        assert_eq!(names, vec!["f", "dictionarySizePercentage", "lr", "d"]);
        assert_eq!(space.method, "bayes");
        assert!(space.validate().is_ok());
    }

    #[test]
    fn duplicate_names_rejected() {
        let space = sample_space().add_int("f", 1, 2);
        assert_eq!(
            space.validate(),
            Err(SpaceError::DuplicateName { name: "f".into() })
        );
    }

    #[test]
    fn inverted_bounds_rejected() {
        let space = ParameterSpace::new(Objective::minimize("val_bpt")).add_int("k", 10, 10);
        assert!(matches!(
            space.validate(),
            Err(SpaceError::InvalidBounds { .. })
        ));

        let space = ParameterSpace::new(Objective::minimize("val_bpt")).add_uniform("x", 1.0, 0.5);
        assert!(matches!(
            space.validate(),
            Err(SpaceError::InvalidBounds { .. })
        ));

        let space =
            ParameterSpace::new(Objective::minimize("val_bpt")).add_uniform("x", f64::NAN, 1.0);
        assert!(space.validate().is_err());
    }

    #[test]
    fn empty_choices_rejected() {
        let space = ParameterSpace::new(Objective::maximize("m")).add_choice("d", vec![]);
        assert_eq!(
            space.validate(),
            Err(SpaceError::EmptyChoices { name: "d".into() })
        );
    }

    #[test]
    fn mismatched_distribution_rejected() {
        let mut space = ParameterSpace::new(Objective::maximize("m")).add_int("k", 1, 5);
        space.parameters[0].distribution = Distribution::Uniform;
        assert!(matches!(
            space.validate(),
            Err(SpaceError::DistributionMismatch { .. })
        ));
    }

    #[test]
    fn log_uniform_needs_positive_min() {
        let space = ParameterSpace::new(Objective::maximize("m")).add_log_uniform("lr", 0.0, 1.0);
        assert!(matches!(
            space.validate(),
            Err(SpaceError::NonPositiveLogBound { .. })
        ));
    }

    #[test]
    fn empty_objective_rejected() {
        let space = ParameterSpace::new(Objective::maximize("")).add_int("k", 1, 5);
        assert_eq!(space.validate(), Err(SpaceError::EmptyObjective));
    }

    #[test]
    fn sweep_config_document() {
        let config = sample_space().to_sweep_config();
        assert_eq!(config["method"], "bayes");
        assert_eq!(config["metric"]["name"], "train_inf_gain");
        assert_eq!(config["metric"]["goal"], "maximize");
        assert_eq!(
            config["parameters"]["f"],
            json!({"distribution": "int_uniform", "min": 5, "max": 26})
        );
        assert_eq!(
            config["parameters"]["lr"]["distribution"],
            "log_uniform_values"
        );
        assert_eq!(config["parameters"]["d"], json!({"values": [6, 8]}));
    }

    #[test]
    fn objective_comparison_follows_goal() {
        assert!(Objective::maximize("m").is_better(2.0, 1.0));
        assert!(!Objective::maximize("m").is_better(1.0, 2.0));
        assert!(Objective::minimize("m").is_better(1.0, 2.0));
    }
}
