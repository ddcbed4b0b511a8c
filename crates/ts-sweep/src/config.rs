//! Agent configuration, read from the environment by the `ts-agent` binary.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::executor::TrialCommand;
use crate::spaces::SweepVariant;

pub const ENV_BINARY: &str = "TS_TUNING_BINARY";
pub const ENV_TIMEOUT_SECS: &str = "TS_TRIAL_TIMEOUT_SECS";
pub const ENV_VARIANT: &str = "TS_SWEEP_VARIANT";
pub const ENV_CONTROLLER: &str = "TS_CONTROLLER";
pub const ENV_MAX_TRIALS: &str = "TS_MAX_TRIALS";
pub const ENV_SEED: &str = "TS_SEED";

pub const DEFAULT_BINARY: &str = "target/release/tuning";
/// One hour per trial.
pub const DEFAULT_TRIAL_TIMEOUT: Duration = Duration::from_secs(3600);
pub const DEFAULT_MAX_TRIALS: usize = 20;

/// Which controller feeds assignments to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    /// Line-delimited JSON over the agent's stdin/stdout.
    Stdio,
    /// In-process random search.
    Random,
}

impl Default for ControllerKind {
    fn default() -> Self {
        Self::Stdio
    }
}

impl FromStr for ControllerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "random" => Ok(Self::Random),
            other => Err(ConfigError::UnknownController(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Pre-built tuning executable, launched once per trial.
    pub binary: PathBuf,
    pub binary_args: Vec<String>,
    pub trial_timeout: Duration,
    pub variant: SweepVariant,
    pub controller: ControllerKind,
    /// Trial budget for the random controller; external controllers decide
    /// their own.
    pub max_trials: usize,
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            binary_args: Vec::new(),
            trial_timeout: DEFAULT_TRIAL_TIMEOUT,
            variant: SweepVariant::default(),
            controller: ControllerKind::default(),
            max_trials: DEFAULT_MAX_TRIALS,
            seed: None,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(binary) = lookup(ENV_BINARY).filter(|v| !v.trim().is_empty()) {
            config.binary = PathBuf::from(binary);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = parse_number(ENV_TIMEOUT_SECS, &raw)?;
            if secs == 0 {
                return Err(invalid(ENV_TIMEOUT_SECS, &raw, "must be positive"));
            }
            config.trial_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(ENV_VARIANT) {
            config.variant = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_CONTROLLER) {
            config.controller = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_MAX_TRIALS) {
            config.max_trials = parse_number(ENV_MAX_TRIALS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SEED) {
            config.seed = Some(parse_number(ENV_SEED, &raw)?);
        }

        Ok(config)
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_binary_args(mut self, args: Vec<String>) -> Self {
        self.binary_args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.trial_timeout = timeout;
        self
    }

    pub fn with_variant(mut self, variant: SweepVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn trial_command(&self) -> TrialCommand {
        TrialCommand {
            program: self.binary.clone(),
            args: self.binary_args.clone(),
        }
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, raw, &e.to_string()))
}

fn invalid(key: &str, value: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AgentConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.binary, PathBuf::from("target/release/tuning"));
        assert_eq!(config.trial_timeout, Duration::from_secs(3600));
        assert_eq!(config.controller, ControllerKind::Stdio);
        assert!(config.trial_command().args.is_empty());
    }

    #[test]
    fn reads_all_keys() {
        let config = AgentConfig::from_lookup(lookup(&[
            (ENV_BINARY, "/opt/tuning"),
            (ENV_TIMEOUT_SECS, " 90 "),
            (ENV_VARIANT, "compression"),
            (ENV_CONTROLLER, "random"),
            (ENV_MAX_TRIALS, "5"),
            (ENV_SEED, "42"),
        ]))
        .unwrap();
        assert_eq!(config.binary, PathBuf::from("/opt/tuning"));
        assert_eq!(config.trial_timeout, Duration::from_secs(90));
        assert_eq!(config.variant, SweepVariant::CompressionEffort);
        assert_eq!(config.controller, ControllerKind::Random);
        assert_eq!(config.max_trials, 5);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            AgentConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "0")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            AgentConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "soon")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            AgentConfig::from_lookup(lookup(&[(ENV_CONTROLLER, "wandb")])),
            Err(ConfigError::UnknownController(_))
        ));
        assert!(matches!(
            AgentConfig::from_lookup(lookup(&[(ENV_VARIANT, "tokenizer")])),
            Err(ConfigError::UnknownVariant(_))
        ));
    }
}
