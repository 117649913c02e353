//! Assertions over synthesized templates.
//!
//! `has_resource` compares the listed top-level properties exactly and
//! ignores properties that are not listed. `has_resource_like` also lets
//! nested objects carry extra keys. Arrays always compare element by element.

use serde_json::Value;
use thiserror::Error;

use crate::template::{Resource, Template};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no {resource_type} resource matches {expected} (candidates: {candidates})")]
pub struct AssertionError {
    pub resource_type: String,
    pub expected: String,
    pub candidates: String,
}

pub fn resources_of_type<'a>(
    template: &'a Template,
    resource_type: &str,
) -> Vec<(&'a str, &'a Resource)> {
    template
        .resources
        .iter()
        .filter(|(_, resource)| resource.resource_type == resource_type)
        .map(|(logical_id, resource)| (logical_id.as_str(), resource))
        .collect()
}

pub fn has_resource(
    template: &Template,
    resource_type: &str,
    expected: &Value,
) -> Result<(), AssertionError> {
    find_matching(template, resource_type, expected, top_level_subset)
}

pub fn has_resource_like(
    template: &Template,
    resource_type: &str,
    expected: &Value,
) -> Result<(), AssertionError> {
    find_matching(template, resource_type, expected, deep_subset)
}

/// Compares two statement lists ignoring order, since the provisioning
/// engine treats policy statements as a set.
pub fn same_statement_set(expected: &[Value], actual: &[Value]) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    let mut expected: Vec<String> = expected.iter().map(Value::to_string).collect();
    let mut actual: Vec<String> = actual.iter().map(Value::to_string).collect();
    expected.sort();
    actual.sort();
    expected == actual
}

fn find_matching(
    template: &Template,
    resource_type: &str,
    expected: &Value,
    matches: impl Fn(&Value, &Value) -> bool,
) -> Result<(), AssertionError> {
    let candidates = resources_of_type(template, resource_type);
    if candidates
        .iter()
        .any(|(_, resource)| matches(expected, &resource.properties))
    {
        return Ok(());
    }

    Err(AssertionError {
        resource_type: resource_type.to_string(),
        expected: expected.to_string(),
        candidates: candidates
            .iter()
            .map(|(logical_id, _)| *logical_id)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn top_level_subset(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => expected
            .iter()
            .all(|(key, value)| actual.get(key) == Some(value)),
        _ => expected == actual,
    }
}

fn deep_subset(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => {
            expected.iter().all(|(key, value)| {
                actual
                    .get(key)
                    .map(|candidate| deep_subset(value, candidate))
                    .unwrap_or(false)
            })
        }
        (Value::Array(expected), Value::Array(actual)) => {
            expected.len() == actual.len()
                && expected
                    .iter()
                    .zip(actual)
                    .all(|(expected, actual)| deep_subset(expected, actual))
        }
        _ => expected == actual,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn template_with_role() -> Template {
        let mut template = Template::new(None);
        template
            .add_resource(
                "LambdaTrustRole",
                Resource::new(
                    "AWS::IAM::Role",
                    json!({
                        "RoleName": "kiosk-role",
                        "AssumeRolePolicyDocument": {"Version": "2012-10-17", "Statement": []}
                    }),
                )
                .expect("resource should build"),
            )
            .expect("insert should pass");
        template
    }

    #[test]
    fn ignores_unlisted_top_level_properties() {
        let template = template_with_role();
        has_resource(&template, "AWS::IAM::Role", &json!({"RoleName": "kiosk-role"}))
            .expect("role should match");
    }

    #[test]
    fn nested_objects_must_match_exactly_unless_like() {
        let template = template_with_role();
        let expected = json!({"AssumeRolePolicyDocument": {"Version": "2012-10-17"}});

        let error = has_resource(&template, "AWS::IAM::Role", &expected)
            .expect_err("partial nested object should not match");
        assert_eq!(error.candidates, "LambdaTrustRole");

        has_resource_like(&template, "AWS::IAM::Role", &expected)
            .expect("like-matching should accept nested subset");
    }

    #[test]
    fn reports_missing_type_with_no_candidates() {
        let template = template_with_role();
        let error = has_resource(&template, "AWS::Events::Rule", &json!({}))
            .expect_err("no rule defined");
        assert_eq!(error.candidates, "");
    }

    #[test]
    fn statement_sets_ignore_order() {
        let a = json!({"Action": "ses:SendEmail"});
        let b = json!({"Action": "kms:Decrypt"});
        assert!(same_statement_set(&[a.clone(), b.clone()], &[b.clone(), a.clone()]));
        assert!(!same_statement_set(&[a.clone()], &[a, b]));
    }
}
