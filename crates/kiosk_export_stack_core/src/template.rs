//! CloudFormation template model.
//!
//! Maps are ordered so that the same resource graph always serializes to the
//! same bytes, which keeps diffs between synth runs reproducible.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::SynthError;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// A property value, either a plain string or one of the intrinsic
/// functions resolved by the provisioning engine at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(String),
    Sub(String),
    Ref(String),
    GetAtt { logical_id: String, attribute: String },
    ImportValue(String),
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Self::Sub(template.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref(logical_id.into())
    }

    pub fn arn_of(logical_id: impl Into<String>) -> Self {
        Self::GetAtt {
            logical_id: logical_id.into(),
            attribute: "Arn".to_string(),
        }
    }

    pub fn import_value(export_name: impl Into<String>) -> Self {
        Self::ImportValue(export_name.into())
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(value) => serializer.serialize_str(value),
            Self::Sub(template) => single_entry(serializer, "Fn::Sub", template),
            Self::Ref(logical_id) => single_entry(serializer, "Ref", logical_id),
            Self::GetAtt {
                logical_id,
                attribute,
            } => single_entry(serializer, "Fn::GetAtt", &[logical_id, attribute]),
            Self::ImportValue(export_name) => {
                single_entry(serializer, "Fn::ImportValue", export_name)
            }
        }
    }
}

fn single_entry<S: Serializer, V: Serialize + ?Sized>(
    serializer: S,
    key: &str,
    value: &V,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub parameter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            parameter_type: "String".to_string(),
            description: Some(description.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Resource {
    pub fn new(resource_type: &str, properties: impl Serialize) -> Result<Self, SynthError> {
        let properties =
            serde_json::to_value(properties).map_err(|error| SynthError::Serialize {
                resource: resource_type.to_string(),
                message: error.to_string(),
            })?;
        Ok(Self {
            resource_type: resource_type.to_string(),
            properties,
            depends_on: Vec::new(),
            metadata: BTreeMap::new(),
        })
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(
        rename = "Description",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        rename = "Parameters",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub parameters: BTreeMap<String, Parameter>,
    #[serde(rename = "Resources", default)]
    pub resources: BTreeMap<String, Resource>,
}

impl Template {
    pub fn new(description: Option<String>) -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description,
            parameters: BTreeMap::new(),
            resources: BTreeMap::new(),
        }
    }

    pub fn add_parameter(
        &mut self,
        logical_id: impl Into<String>,
        parameter: Parameter,
    ) -> Result<(), SynthError> {
        let logical_id = logical_id.into();
        if self.parameters.contains_key(&logical_id) || self.resources.contains_key(&logical_id) {
            return Err(SynthError::DuplicateLogicalId(logical_id));
        }
        self.parameters.insert(logical_id, parameter);
        Ok(())
    }

    pub fn add_resource(
        &mut self,
        logical_id: impl Into<String>,
        resource: Resource,
    ) -> Result<(), SynthError> {
        let logical_id = logical_id.into();
        if self.resources.contains_key(&logical_id) || self.parameters.contains_key(&logical_id) {
            return Err(SynthError::DuplicateLogicalId(logical_id));
        }
        tracing::debug!(
            logical_id = %logical_id,
            resource_type = %resource.resource_type,
            "adding resource"
        );
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn to_json(&self) -> Result<String, SynthError> {
        serde_json::to_string(self).map_err(|error| self.serialize_error(error))
    }

    pub fn to_json_pretty(&self) -> Result<String, SynthError> {
        serde_json::to_string_pretty(self).map_err(|error| self.serialize_error(error))
    }

    /// Hex SHA-256 of the compact JSON form.
    pub fn fingerprint(&self) -> Result<String, SynthError> {
        let mut hasher = Sha256::new();
        hasher.update(self.to_json()?);
        Ok(format!("{:x}", hasher.finalize()))
    }

    fn serialize_error(&self, error: serde_json::Error) -> SynthError {
        SynthError::Serialize {
            resource: "template".to_string(),
            message: error.to_string(),
        }
    }
}
