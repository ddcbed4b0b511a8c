//! Per-trial assignment and result types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::space::Objective;

/// A concrete parameter value chosen by the controller.
///
/// Integer variants are tried before `Float` when deserializing so that `512`
/// stays an integer on its way to the tuning binary. `UInt` only holds values
/// above `i64::MAX`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Json(Value),
}

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Json(v) => v.as_f64(),
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Value> for ParameterValue {
    fn from(v: Value) -> Self {
        if let Some(i) = v.as_i64() {
            Self::Int(i)
        } else if let Some(u) = v.as_u64() {
            Self::UInt(u)
        } else {
            Self::Json(v)
        }
    }
}

/// One trial's parameter assignment, keyed by parameter name.
///
/// Serializes as a flat JSON object, which is exactly the payload written to
/// the tuning binary's stdin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialAssignment(BTreeMap<String, ParameterValue>);

impl TrialAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl FromIterator<(String, ParameterValue)> for TrialAssignment {
    fn from_iter<I: IntoIterator<Item = (String, ParameterValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Metrics reported by one trial. Empty means "no usable result".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialResult(Map<String, Value>);

impl TrialResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_metrics(metrics: Map<String, Value>) -> Self {
        Self(metrics)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Numeric value of `name`, if present and a number.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    /// Value of the sweep's objective metric in this result.
    pub fn objective(&self, objective: &Objective) -> Option<f64> {
        self.metric(&objective.metric_name)
    }

    pub fn metrics(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_metrics(self) -> Map<String, Value> {
        self.0
    }
}
