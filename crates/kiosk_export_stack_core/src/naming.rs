use crate::error::SynthError;

pub const ROLE_LOGICAL_ID: &str = "LambdaTrustRole";
pub const POLICY_LOGICAL_ID: &str = "EmbarkLambdaPolicy";
pub const FUNCTION_LOGICAL_ID: &str = "EmbarkLambda";
pub const RULE_LOGICAL_ID: &str = "Rule";
pub const RULE_PERMISSION_LOGICAL_ID: &str = "RuleAllowEventRuleEmbarkLambda";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Stack,
    Role,
    Policy,
    Function,
    Rule,
}

impl ResourceKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Stack => "-stack",
            Self::Role => "-role",
            Self::Policy => "-policy",
            Self::Function => "",
            Self::Rule => "-rule",
        }
    }

    fn max_len(self) -> usize {
        match self {
            Self::Stack => 128,
            Self::Role => 64,
            Self::Policy => 128,
            Self::Function => 64,
            Self::Rule => 64,
        }
    }
}

pub fn resource_name(id: &str, kind: ResourceKind) -> String {
    format!("{id}{}", kind.suffix())
}

/// Physical names of every resource in the stack, all derived from one
/// logical identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub id: String,
    pub stack: String,
    pub role: String,
    pub policy: String,
    pub function: String,
    pub rule: String,
}

impl ResourceNames {
    pub fn for_id(id: &str) -> Result<Self, SynthError> {
        validate_identifier(id)?;

        let names = Self {
            id: id.to_string(),
            stack: resource_name(id, ResourceKind::Stack),
            role: resource_name(id, ResourceKind::Role),
            policy: resource_name(id, ResourceKind::Policy),
            function: resource_name(id, ResourceKind::Function),
            rule: resource_name(id, ResourceKind::Rule),
        };

        for (kind, name) in [
            (ResourceKind::Stack, &names.stack),
            (ResourceKind::Role, &names.role),
            (ResourceKind::Policy, &names.policy),
            (ResourceKind::Function, &names.function),
            (ResourceKind::Rule, &names.rule),
        ] {
            if name.len() > kind.max_len() {
                return Err(SynthError::invalid_name(
                    name.as_str(),
                    format!("exceeds {} characters", kind.max_len()),
                ));
            }
        }

        Ok(names)
    }
}

fn validate_identifier(id: &str) -> Result<(), SynthError> {
    if id.is_empty() {
        return Err(SynthError::invalid_name(id, "identifier cannot be empty"));
    }
    if let Some(bad) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(SynthError::invalid_name(
            id,
            format!("unsupported character '{bad}'"),
        ));
    }
    Ok(())
}
