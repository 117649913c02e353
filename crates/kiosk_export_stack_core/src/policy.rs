use serde::{Deserialize, Serialize};

use crate::config::{PolicyShape, StackConfig};
use crate::template::Expr;

pub const POLICY_VERSION: &str = "2012-10-17";
pub const LAMBDA_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";
pub const EVENTS_SERVICE_PRINCIPAL: &str = "events.amazonaws.com";

pub const LOG_ACTIONS: [&str; 3] = [
    "logs:CreateLogGroup",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
];
pub const PARAMETER_READ_ACTIONS: [&str; 4] = [
    "ssm:GetParameterHistory",
    "ssm:GetParametersByPath",
    "ssm:GetParameters",
    "ssm:GetParameter",
];
// Parameter discovery cannot be restricted to a resource, so it always
// targets "*".
pub const PARAMETER_DISCOVERY_ACTION: &str = "ssm:DescribeParameters";
pub const KEY_ACTIONS: [&str; 2] = ["kms:Decrypt", "kms:Encrypt"];
pub const SEND_EMAIL_ACTION: &str = "ses:SendEmail";

/// A single value serializes bare, several as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(mut values: Vec<T>) -> Self {
        if values.len() == 1 {
            Self::One(values.remove(0))
        } else {
            Self::Many(values)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServicePrincipal {
    #[serde(rename = "Service")]
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub action: OneOrMany<String>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<ServicePrincipal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<OneOrMany<Expr>>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resources: Vec<Expr>) -> Self {
        Self {
            action: actions
                .iter()
                .map(|action| action.to_string())
                .collect::<Vec<_>>()
                .into(),
            effect: Effect::Allow,
            principal: None,
            resource: Some(resources.into()),
        }
    }

    pub fn assume_role_by(service: &str) -> Self {
        Self {
            action: OneOrMany::One("sts:AssumeRole".to_string()),
            effect: Effect::Allow,
            principal: Some(ServicePrincipal {
                service: service.to_string(),
            }),
            resource: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub statement: Vec<PolicyStatement>,
    pub version: String,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            statement,
            version: POLICY_VERSION.to_string(),
        }
    }
}

pub fn trust_policy(service: &str) -> PolicyDocument {
    PolicyDocument::new(vec![PolicyStatement::assume_role_by(service)])
}

pub fn parameter_path_arn(path: &str) -> Expr {
    Expr::sub(format!(
        "arn:aws:ssm:${{AWS::Region}}:${{AWS::AccountId}}:parameter{path}/*"
    ))
}

/// Statements granted to the export function, in a fixed order so repeated
/// synth runs produce identical documents.
pub fn export_job_statements(
    parameter_namespace: &str,
    config: &StackConfig,
) -> Vec<PolicyStatement> {
    let logs_arn = Expr::sub("arn:aws:logs:${AWS::Region}:${AWS::AccountId}:*");
    let key_arn = Expr::sub(format!(
        "arn:aws:kms:${{AWS::Region}}:${{AWS::AccountId}}:key/{}",
        config.kms_key_id
    ));
    let identity_arn = Expr::sub(format!(
        "arn:aws:ses:${{AWS::Region}}:${{AWS::AccountId}}:identity/{}",
        config.email_identity
    ));

    match config.policy_shape {
        PolicyShape::Scoped => vec![
            PolicyStatement::allow(&LOG_ACTIONS, vec![logs_arn]),
            PolicyStatement::allow(
                &PARAMETER_READ_ACTIONS,
                vec![parameter_path_arn(&format!("/all/{parameter_namespace}"))],
            ),
            PolicyStatement::allow(&[PARAMETER_DISCOVERY_ACTION], vec![Expr::literal("*")]),
            PolicyStatement::allow(&KEY_ACTIONS, vec![key_arn]),
            PolicyStatement::allow(&[SEND_EMAIL_ACTION], vec![identity_arn]),
        ],
        PolicyShape::Consolidated => {
            let mut unscoped = vec![PARAMETER_DISCOVERY_ACTION];
            unscoped.extend(LOG_ACTIONS);
            vec![
                PolicyStatement::allow(&unscoped, vec![Expr::literal("*")]),
                PolicyStatement::allow(&PARAMETER_READ_ACTIONS, vec![parameter_path_arn("/all")]),
                PolicyStatement::allow(&KEY_ACTIONS, vec![key_arn]),
                PolicyStatement::allow(&[SEND_EMAIL_ACTION], vec![identity_arn]),
            ]
        }
    }
}
