//! Environment contract between the stack and the export function.
//!
//! The stack writes these variables; the function reads them back on every
//! invocation and refuses to run without them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ExportModePolicy;
use crate::stage::Stage;

pub const ENV_SSM_KEY_BASE: &str = "SSM_KEY_BASE";
pub const ENV_EXPORT_MODE: &str = "WEB_KIOSK_EXPORT_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    Full,
    Incremental,
}

impl ExportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }

    pub fn for_stage(stage: &Stage, policy: ExportModePolicy) -> Self {
        match policy {
            ExportModePolicy::AlwaysIncremental => Self::Incremental,
            ExportModePolicy::StageDependent if stage.is_production() => Self::Incremental,
            ExportModePolicy::StageDependent => Self::Full,
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportMode {
    type Err = RuntimeEnvError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "full" => Ok(Self::Full),
            "incremental" => Ok(Self::Incremental),
            other => Err(RuntimeEnvError::InvalidExportMode(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeEnvError {
    #[error("environment variable {0} must be defined")]
    Missing(&'static str),
    #[error("WEB_KIOSK_EXPORT_MODE must be \"full\" or \"incremental\" (got \"{0}\")")]
    InvalidExportMode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEnvironment {
    pub ssm_key_base: String,
    pub export_mode: ExportMode,
}

impl FunctionEnvironment {
    pub fn for_stage(parameter_namespace: &str, stage: &Stage, policy: ExportModePolicy) -> Self {
        Self {
            ssm_key_base: format!(
                "/all/{parameter_namespace}/{}",
                stage.parameter_suffix()
            ),
            export_mode: ExportMode::for_stage(stage, policy),
        }
    }

    pub fn variables(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (ENV_SSM_KEY_BASE.to_string(), self.ssm_key_base.clone()),
            (
                ENV_EXPORT_MODE.to_string(),
                self.export_mode.as_str().to_string(),
            ),
        ])
    }

    /// Reader side of the contract, e.g. `from_vars(|key| std::env::var(key).ok())`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RuntimeEnvError> {
        let ssm_key_base = lookup(ENV_SSM_KEY_BASE)
            .filter(|value| !value.trim().is_empty())
            .ok_or(RuntimeEnvError::Missing(ENV_SSM_KEY_BASE))?;
        let export_mode = lookup(ENV_EXPORT_MODE)
            .ok_or(RuntimeEnvError::Missing(ENV_EXPORT_MODE))?
            .parse()?;
        Ok(Self {
            ssm_key_base,
            export_mode,
        })
    }
}
