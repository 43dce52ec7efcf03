//! Planner configuration.
//!
//! Configuration can be built in code, read from environment variables, or
//! (with the `config` feature) parsed from JSON.

use std::env;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lowering::{EmissionOrder, LongestSuspensionChain, Scheduler};

/// Default bound on traversal depth.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Which scheduler linearizes asynchronous plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum SchedulerKind {
    /// Greedy longest-pending-suspension-chain heuristic
    #[default]
    LongestSuspensionChain,
    /// Keep raw dependency order
    EmissionOrder,
}

impl SchedulerKind {
    pub fn scheduler(self) -> &'static dyn Scheduler {
        match self {
            SchedulerKind::LongestSuspensionChain => &LongestSuspensionChain,
            SchedulerKind::EmissionOrder => &EmissionOrder,
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "longest_suspension_chain" | "longest" => Ok(SchedulerKind::LongestSuspensionChain),
            "emission_order" | "emission" => Ok(SchedulerKind::EmissionOrder),
            _ => Err(ConfigError::InvalidValue { key: "scheduler", value: s.to_string() }),
        }
    }
}

/// Settings for a planning run.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{PlannerConfig, SchedulerKind};
///
/// let config = PlannerConfig::default();
/// assert_eq!(config.scheduler, SchedulerKind::LongestSuspensionChain);
/// assert_eq!(config.max_depth, 1024);
///
/// let config = PlannerConfig::new().with_scheduler(SchedulerKind::EmissionOrder).with_max_depth(64);
/// assert_eq!(config.max_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct PlannerConfig {
    pub scheduler: SchedulerKind,
    /// Traversals deeper than this abort with `PlanError::DepthExceeded`
    pub max_depth: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { scheduler: SchedulerKind::default(), max_depth: DEFAULT_MAX_DEPTH }
    }
}

impl PlannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerKind) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reads `{PREFIX}_SCHEDULER` and `{PREFIX}_MAX_DEPTH`, keeping defaults
    /// for unset variables.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let mut config = Self::default();
        if let Ok(value) = env::var(format!("{}_SCHEDULER", prefix)) {
            config.scheduler = value.parse()?;
        }
        if let Ok(value) = env::var(format!("{}_MAX_DEPTH", prefix)) {
            config.max_depth = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key: "max_depth", value })?;
        }
        Ok(config)
    }

    /// Parses a JSON object; missing fields keep their defaults.
    ///
    /// ```rust
    /// # #[cfg(feature = "config")]
    /// # {
    /// use ferrous_inject::{PlannerConfig, SchedulerKind};
    ///
    /// let config = PlannerConfig::from_json_str(r#"{ "scheduler": "emission_order" }"#).unwrap();
    /// assert_eq!(config.scheduler, SchedulerKind::EmissionOrder);
    /// assert_eq!(config.max_depth, 1024);
    /// # }
    /// ```
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_kind_parses_aliases() {
        assert_eq!("longest".parse::<SchedulerKind>().ok(), Some(SchedulerKind::LongestSuspensionChain));
        assert_eq!(" Emission_Order ".parse::<SchedulerKind>().ok(), Some(SchedulerKind::EmissionOrder));
        assert!("fastest".parse::<SchedulerKind>().is_err());
    }

    #[test]
    fn env_overrides_defaults() {
        env::set_var("FERROUS_INJECT_TEST_SCHEDULER", "emission");
        env::set_var("FERROUS_INJECT_TEST_MAX_DEPTH", "12");
        let config = PlannerConfig::from_env("ferrous_inject_test").unwrap();
        assert_eq!(config.scheduler, SchedulerKind::EmissionOrder);
        assert_eq!(config.max_depth, 12);

        env::set_var("FERROUS_INJECT_BAD_MAX_DEPTH", "deep");
        assert!(PlannerConfig::from_env("ferrous_inject_bad").is_err());
    }
}
