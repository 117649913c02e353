use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::SynthError;
use crate::stage::Stage;

pub const DEFAULT_ASSET_PATH: &str = "../../src";
pub const DEFAULT_HANDLER: &str = "handler.run";
pub const DEFAULT_RUNTIME: &str = "python3.7";
pub const DEFAULT_MEMORY_SIZE_MB: u32 = 256;
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 900;
pub const DEFAULT_PARAMETER_NAMESPACE: &str = "marble-data-processing";
pub const DEFAULT_KMS_KEY_ID: &str = "CMK";
pub const DEFAULT_EMAIL_IDENTITY: &str = "nd.edu";
pub const DEFAULT_DESCRIPTION: &str = "This function retrieves Embark Web Kiosk metadata from a web call, breaks it apart by object described, and saves each resulting metadata xml file to a google team drive.";

/// Layer exports the function was built against. Attaching them is opt-in.
pub const KNOWN_LAYER_EXPORTS: [&str; 2] = [
    "sentry-sdk-python-layer:LayerArn",
    "google-api-python-layer:LayerArn",
];

const MEMORY_RANGE_MB: std::ops::RangeInclusive<u32> = 128..=10_240;
const ARN_FORBIDDEN_CHARS: [char; 4] = ['$', '{', '}', '*'];
const TIMEOUT_RANGE_SECONDS: std::ops::RangeInclusive<u32> = 1..=900;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Where the function's deployment package comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodeSource {
    /// Local source directory packaged and uploaded as an asset.
    Asset {
        path: String,
        #[serde(default)]
        hash: Option<String>,
    },
    /// Bucket and key supplied as template parameters by an external
    /// pipeline.
    ExternalParameter,
}

impl Default for CodeSource {
    fn default() -> Self {
        Self::Asset {
            path: DEFAULT_ASSET_PATH.to_string(),
            hash: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportModePolicy {
    /// Incremental in production, full everywhere else.
    #[default]
    StageDependent,
    AlwaysIncremental,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ParameterNamespace {
    /// `marble-data-processing`, the namespace the deployed stack reads from.
    #[default]
    Shared,
    Named(String),
    /// Namespace named after the stack's logical identifier.
    PerStack,
}

impl ParameterNamespace {
    pub fn resolve(&self, id: &str) -> String {
        match self {
            Self::Shared => DEFAULT_PARAMETER_NAMESPACE.to_string(),
            Self::Named(name) => name.clone(),
            Self::PerStack => id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyShape {
    #[default]
    Scoped,
    Consolidated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionSettings {
    pub handler: String,
    pub runtime: String,
    pub memory_size_mb: u32,
    pub timeout_seconds: u32,
    pub description: String,
}

impl Default for FunctionSettings {
    fn default() -> Self {
        Self {
            handler: DEFAULT_HANDLER.to_string(),
            runtime: DEFAULT_RUNTIME.to_string(),
            memory_size_mb: DEFAULT_MEMORY_SIZE_MB,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }
}

/// Everything synthesis depends on besides the logical identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub stage: Stage,
    pub code_source: CodeSource,
    pub export_mode_policy: ExportModePolicy,
    pub function: FunctionSettings,
    pub parameter_namespace: ParameterNamespace,
    pub kms_key_id: String,
    pub email_identity: String,
    pub policy_shape: PolicyShape,
    pub layer_exports: Vec<String>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stage: Stage::default(),
            code_source: CodeSource::default(),
            export_mode_policy: ExportModePolicy::default(),
            function: FunctionSettings::default(),
            parameter_namespace: ParameterNamespace::default(),
            kms_key_id: DEFAULT_KMS_KEY_ID.to_string(),
            email_identity: DEFAULT_EMAIL_IDENTITY.to_string(),
            policy_shape: PolicyShape::default(),
            layer_exports: Vec::new(),
        }
    }
}

impl StackConfig {
    pub fn for_stage(stage: Stage) -> Self {
        Self {
            stage,
            ..Self::default()
        }
    }

    /// Pipeline-fed deployment: code arrives through template parameters and
    /// the export always runs incrementally.
    pub fn pipeline(stage: Stage) -> Self {
        Self::for_stage(stage).with_pipeline_code()
    }

    /// Switches only the code source and export mode to the pipeline-fed
    /// variant; every other setting is kept.
    pub fn with_pipeline_code(mut self) -> Self {
        self.code_source = CodeSource::ExternalParameter;
        self.export_mode_policy = ExportModePolicy::AlwaysIncremental;
        self
    }

    pub fn with_known_layers(mut self) -> Self {
        for export in KNOWN_LAYER_EXPORTS {
            if !self.layer_exports.iter().any(|existing| existing == export) {
                self.layer_exports.push(export.to_string());
            }
        }
        self
    }

    /// Reads a TOML config file; no path means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            debug!("no stack config file given, using defaults");
            return Ok(Self::default());
        };

        debug!(path = %path.display(), "loading stack config");
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        let function = &self.function;
        if function.handler.trim().is_empty() {
            return Err(SynthError::InvalidConfig(
                "function handler cannot be empty".to_string(),
            ));
        }
        if function.runtime.trim().is_empty() {
            return Err(SynthError::InvalidConfig(
                "function runtime cannot be empty".to_string(),
            ));
        }
        if !MEMORY_RANGE_MB.contains(&function.memory_size_mb) {
            return Err(SynthError::InvalidConfig(format!(
                "memory_size_mb must be within {}..={} (got {})",
                MEMORY_RANGE_MB.start(),
                MEMORY_RANGE_MB.end(),
                function.memory_size_mb
            )));
        }
        if !TIMEOUT_RANGE_SECONDS.contains(&function.timeout_seconds) {
            return Err(SynthError::InvalidConfig(format!(
                "timeout_seconds must be within {}..={} (got {})",
                TIMEOUT_RANGE_SECONDS.start(),
                TIMEOUT_RANGE_SECONDS.end(),
                function.timeout_seconds
            )));
        }
        check_arn_segment("kms_key_id", &self.kms_key_id)?;
        check_arn_segment("email_identity", &self.email_identity)?;
        if let ParameterNamespace::Named(name) = &self.parameter_namespace {
            check_arn_segment("parameter namespace", name)?;
            if name.contains('/') {
                return Err(SynthError::InvalidConfig(format!(
                    "parameter namespace '{name}' must be a single path segment"
                )));
            }
        }
        if let CodeSource::Asset { path, .. } = &self.code_source {
            if path.trim().is_empty() {
                return Err(SynthError::InvalidConfig(
                    "asset path cannot be empty".to_string(),
                ));
            }
        }
        if self.layer_exports.iter().any(|name| name.trim().is_empty()) {
            return Err(SynthError::InvalidConfig(
                "layer export names must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Values spliced into `Fn::Sub` resource ARNs must not introduce their own
/// substitutions or wildcards.
fn check_arn_segment(field: &str, value: &str) -> Result<(), SynthError> {
    if value.trim().is_empty() {
        return Err(SynthError::InvalidConfig(format!("{field} cannot be empty")));
    }
    if let Some(bad) = value.chars().find(|c| ARN_FORBIDDEN_CHARS.contains(c)) {
        return Err(SynthError::InvalidConfig(format!(
            "{field} '{value}' contains forbidden character '{bad}'"
        )));
    }
    Ok(())
}
