use std::fmt;

use serde::{Deserialize, Serialize};

pub const PRODUCTION_STAGE: &str = "prod";
pub const DEFAULT_STAGE: &str = "dev";

/// Deployment environment selector (`dev`, `prod`, ...).
///
/// Only the production marker changes behavior; every other value is treated
/// as a non-production deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Stage(String);

impl Stage {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self::from_env_value(Some(value.as_ref()))
    }

    pub fn production() -> Self {
        Self(PRODUCTION_STAGE.to_string())
    }

    /// Absent or blank values fall back to [`DEFAULT_STAGE`].
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(stage) if !stage.is_empty() => Self(stage.to_string()),
            _ => Self(DEFAULT_STAGE.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_production(&self) -> bool {
        self.0 == PRODUCTION_STAGE
    }

    /// Parameter store namespace suffix used by the deployed function.
    pub fn parameter_suffix(&self) -> &'static str {
        if self.is_production() {
            "prod"
        } else {
            "test"
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self(DEFAULT_STAGE.to_string())
    }
}

impl From<String> for Stage {
    fn from(value: String) -> Self {
        Self::from_env_value(Some(&value))
    }
}

impl From<Stage> for String {
    fn from(value: Stage) -> Self {
        value.0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application-level stack identifier: production deploys under the bare
/// base name, every other stage gets a `-<stage>` suffix so stage
/// deployments never collide.
pub fn app_stack_id(base: &str, stage: &Stage) -> String {
    if stage.is_production() {
        base.to_string()
    } else {
        format!("{base}-{}", stage.as_str())
    }
}
