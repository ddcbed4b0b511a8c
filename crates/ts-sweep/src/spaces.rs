//! The declared sweep spaces for the compression tuning binary.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use ts_types::{Objective, ParameterSpace};

use crate::errors::ConfigError;

/// Which declared space a sweep explores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepVariant {
    /// Dataset size, dictionary sizing and the fastCover d/f/k knobs.
    DictionaryTraining,
    /// Compression level against dictionary shape, scored on validation data.
    CompressionEffort,
}

impl SweepVariant {
    pub fn describe(&self) -> ParameterSpace {
        match self {
            Self::DictionaryTraining => dictionary_training(),
            Self::CompressionEffort => compression_effort(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DictionaryTraining => "dictionary",
            Self::CompressionEffort => "compression",
        }
    }
}

impl Default for SweepVariant {
    fn default() -> Self {
        Self::DictionaryTraining
    }
}

impl FromStr for SweepVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dictionary" | "dictionary_training" => Ok(Self::DictionaryTraining),
            "compression" | "compression_effort" => Ok(Self::CompressionEffort),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

pub fn dictionary_training() -> ParameterSpace {
    ParameterSpace::new(Objective::maximize("train_inf_gain"))
        .add_int("datasetSize", 1_000_000, 180_000_000)
        .add_uniform("dictionarySizePercentage", 0.0, 1.0)
        .add_int("compressionLevel", 1, 8)
        .add_choice("d", vec![json!(6), json!(8)])
        .add_int("f", 5, 26)
        .add_int("k", 16, 2048)
}

pub fn compression_effort() -> ParameterSpace {
    ParameterSpace::new(Objective::minimize("val_bpt"))
        .add_int("compressionLevel", 1, 22)
        .add_choice("d", vec![json!(6), json!(8)])
        .add_int("k", 16, 2048)
        .add_log_uniform("dictionarySizePercentage", 0.001, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ts_types::{Domain, ObjectiveGoal};

    #[test]
    fn declared_spaces_validate() {
        for variant in [SweepVariant::DictionaryTraining, SweepVariant::CompressionEffort] {
            let space = variant.describe();
            assert!(space.validate().is_ok(), "{} failed validation", variant.name());
        }
    }

    #[test]
    fn describe_is_deterministic() {
        assert_eq!(dictionary_training(), dictionary_training());
        assert_eq!(compression_effort(), compression_effort());
    }

    #[test]
    fn dictionary_space_matches_tuning_binary() {
        let space = dictionary_training();
        assert_eq!(space.objective.metric_name, "train_inf_gain");
        assert_eq!(space.objective.goal, ObjectiveGoal::Maximize);
        let names: Vec<&str> = space.names().collect();
        assert_eq!(
            names,
            vec![
                "datasetSize",
                "dictionarySizePercentage",
                "compressionLevel",
                "d",
                "f",
                "k"
            ]
        );
        assert_eq!(
            space.get("k").map(|p| &p.domain),
            Some(&Domain::Integer { min: 16, max: 2048 })
        );
    }

    #[test]
    fn spaces_overlap_but_differ() {
        let a = dictionary_training();
        let b = compression_effort();
        assert!(b.names().all(|n| a.get(n).is_some()));
        assert_ne!(a.parameters.len(), b.parameters.len());
        assert_eq!(b.objective.goal, ObjectiveGoal::Minimize);
    }

    #[test]
    fn variant_from_str() {
        assert_eq!(
            "Compression".parse::<SweepVariant>(),
            Ok(SweepVariant::CompressionEffort)
        );
        assert_eq!(
            "dictionary_training".parse::<SweepVariant>(),
            Ok(SweepVariant::DictionaryTraining)
        );
        assert!("grid".parse::<SweepVariant>().is_err());
    }
}
