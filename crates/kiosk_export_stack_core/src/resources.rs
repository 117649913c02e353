use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::config::{CodeSource, StackConfig};
use crate::error::SynthError;
use crate::naming::{
    ResourceNames, FUNCTION_LOGICAL_ID, POLICY_LOGICAL_ID, ROLE_LOGICAL_ID, RULE_LOGICAL_ID,
};
use crate::policy::{
    trust_policy, PolicyDocument, PolicyStatement, EVENTS_SERVICE_PRINCIPAL,
    LAMBDA_SERVICE_PRINCIPAL,
};
use crate::runtime_env::FunctionEnvironment;
use crate::template::{Expr, Parameter, Resource};

pub const ROLE_TYPE: &str = "AWS::IAM::Role";
pub const POLICY_TYPE: &str = "AWS::IAM::Policy";
pub const FUNCTION_TYPE: &str = "AWS::Lambda::Function";
pub const RULE_TYPE: &str = "AWS::Events::Rule";
pub const PERMISSION_TYPE: &str = "AWS::Lambda::Permission";

pub const RULE_TARGET_ID: &str = "Target0";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RoleProperties {
    assume_role_policy_document: PolicyDocument,
    role_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyProperties {
    policy_document: PolicyDocument,
    policy_name: String,
    roles: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionCode {
    pub s3_bucket: Expr,
    pub s3_key: Expr,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EnvironmentProperties {
    variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct FunctionProperties {
    code: FunctionCode,
    description: String,
    environment: EnvironmentProperties,
    function_name: String,
    handler: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    layers: Vec<Expr>,
    memory_size: u32,
    role: Expr,
    runtime: String,
    timeout: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RuleTarget {
    arn: Expr,
    id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RuleProperties {
    name: String,
    schedule_expression: String,
    state: String,
    targets: Vec<RuleTarget>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PermissionProperties {
    action: String,
    function_name: Expr,
    principal: String,
    source_arn: Expr,
}

/// Template parameters and metadata that go with a function's code source.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBinding {
    pub parameters: Vec<(String, Parameter)>,
    pub code: FunctionCode,
    pub metadata: BTreeMap<String, Value>,
}

pub fn code_binding(source: &CodeSource) -> CodeBinding {
    match source {
        CodeSource::Asset { path, hash } => {
            let bucket = format!("{FUNCTION_LOGICAL_ID}CodeS3Bucket");
            let key = format!("{FUNCTION_LOGICAL_ID}CodeS3Key");
            let mut metadata = BTreeMap::from([
                ("aws:asset:path".to_string(), Value::from(path.as_str())),
                ("aws:asset:property".to_string(), Value::from("Code")),
            ]);
            if let Some(hash) = hash {
                metadata.insert("aws:asset:hash".to_string(), Value::from(hash.as_str()));
            }
            CodeBinding {
                parameters: vec![
                    (
                        bucket.clone(),
                        Parameter::string(format!("S3 bucket for asset \"{path}\"")),
                    ),
                    (
                        key.clone(),
                        Parameter::string(format!("S3 key for asset \"{path}\"")),
                    ),
                ],
                code: FunctionCode {
                    s3_bucket: Expr::reference(bucket),
                    s3_key: Expr::reference(key),
                },
                metadata,
            }
        }
        CodeSource::ExternalParameter => {
            let bucket = format!("{FUNCTION_LOGICAL_ID}SourceBucketNameParameter");
            let key = format!("{FUNCTION_LOGICAL_ID}SourceObjectKeyParameter");
            CodeBinding {
                parameters: vec![
                    (
                        bucket.clone(),
                        Parameter::string("The S3 bucket holding the function code"),
                    ),
                    (
                        key.clone(),
                        Parameter::string("The S3 object key of the function code"),
                    ),
                ],
                code: FunctionCode {
                    s3_bucket: Expr::reference(bucket),
                    s3_key: Expr::reference(key),
                },
                metadata: BTreeMap::new(),
            }
        }
    }
}

pub fn execution_role(names: &ResourceNames) -> Result<Resource, SynthError> {
    Resource::new(
        ROLE_TYPE,
        RoleProperties {
            assume_role_policy_document: trust_policy(LAMBDA_SERVICE_PRINCIPAL),
            role_name: names.role.clone(),
        },
    )
}

pub fn permission_policy(
    names: &ResourceNames,
    statements: Vec<PolicyStatement>,
) -> Result<Resource, SynthError> {
    Resource::new(
        POLICY_TYPE,
        PolicyProperties {
            policy_document: PolicyDocument::new(statements),
            policy_name: names.policy.clone(),
            roles: vec![Expr::reference(ROLE_LOGICAL_ID)],
        },
    )
}

pub fn scheduled_function(
    names: &ResourceNames,
    config: &StackConfig,
    environment: &FunctionEnvironment,
    binding: CodeBinding,
) -> Result<Resource, SynthError> {
    let settings = &config.function;
    let mut resource = Resource::new(
        FUNCTION_TYPE,
        FunctionProperties {
            code: binding.code,
            description: settings.description.clone(),
            environment: EnvironmentProperties {
                variables: environment.variables(),
            },
            function_name: names.function.clone(),
            handler: settings.handler.clone(),
            layers: config
                .layer_exports
                .iter()
                .map(|export| Expr::import_value(export.as_str()))
                .collect(),
            memory_size: settings.memory_size_mb,
            role: Expr::arn_of(ROLE_LOGICAL_ID),
            runtime: settings.runtime.clone(),
            timeout: settings.timeout_seconds,
        },
    )?
    .depends_on(POLICY_LOGICAL_ID)
    .depends_on(ROLE_LOGICAL_ID);

    for (key, value) in binding.metadata {
        resource = resource.with_metadata(key, value);
    }
    Ok(resource)
}

pub fn schedule_rule(
    names: &ResourceNames,
    schedule_expression: &str,
) -> Result<Resource, SynthError> {
    Resource::new(
        RULE_TYPE,
        RuleProperties {
            name: names.rule.clone(),
            schedule_expression: schedule_expression.to_string(),
            state: "ENABLED".to_string(),
            targets: vec![RuleTarget {
                arn: Expr::arn_of(FUNCTION_LOGICAL_ID),
                id: RULE_TARGET_ID.to_string(),
            }],
        },
    )
}

/// Invoke grant for the rule's target.
pub fn rule_invoke_permission() -> Result<Resource, SynthError> {
    Resource::new(
        PERMISSION_TYPE,
        PermissionProperties {
            action: "lambda:InvokeFunction".to_string(),
            function_name: Expr::arn_of(FUNCTION_LOGICAL_ID),
            principal: EVENTS_SERVICE_PRINCIPAL.to_string(),
            source_arn: Expr::arn_of(RULE_LOGICAL_ID),
        },
    )
}
