use kiosk_export_stack_core::assertions::{
    has_resource, has_resource_like, resources_of_type, same_statement_set,
};
use kiosk_export_stack_core::config::{
    CodeSource, ParameterNamespace, StackConfig, KNOWN_LAYER_EXPORTS,
};
use kiosk_export_stack_core::stage::Stage;
use kiosk_export_stack_core::{synthesize, Template, SCHEDULE_EXPRESSION};
use serde_json::{json, Value};

const ID: &str = "marble-web-kiosk-export";

fn default_stack() -> Template {
    synthesize(ID, &StackConfig::default()).expect("synth should pass")
}

fn policy_statements(template: &Template) -> Vec<Value> {
    let policies = resources_of_type(template, "AWS::IAM::Policy");
    assert_eq!(policies.len(), 1);
    policies[0].1.properties["PolicyDocument"]["Statement"]
        .as_array()
        .expect("statement list")
        .clone()
}

fn export_mode(template: &Template) -> Value {
    template.resources["EmbarkLambda"].properties["Environment"]["Variables"]
        ["WEB_KIOSK_EXPORT_MODE"]
        .clone()
}

#[test]
fn defines_trust_role_named_after_identifier() {
    has_resource(
        &default_stack(),
        "AWS::IAM::Role",
        &json!({"RoleName": "marble-web-kiosk-export-role"}),
    )
    .expect("role should be defined");
}

#[test]
fn defines_policy_named_after_identifier() {
    has_resource(
        &default_stack(),
        "AWS::IAM::Policy",
        &json!({
            "PolicyName": "marble-web-kiosk-export-policy",
            "Roles": [{"Ref": "LambdaTrustRole"}]
        }),
    )
    .expect("policy should be defined");
}

#[test]
fn policy_grants_logs_parameters_keys_and_email() {
    let expected = vec![
        json!({
            "Action": ["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
            "Effect": "Allow",
            "Resource": {"Fn::Sub": "arn:aws:logs:${AWS::Region}:${AWS::AccountId}:*"}
        }),
        json!({
            "Action": [
                "ssm:GetParameterHistory",
                "ssm:GetParametersByPath",
                "ssm:GetParameters",
                "ssm:GetParameter"
            ],
            "Effect": "Allow",
            "Resource": {
                "Fn::Sub": "arn:aws:ssm:${AWS::Region}:${AWS::AccountId}:parameter/all/marble-data-processing/*"
            }
        }),
        json!({"Action": "ssm:DescribeParameters", "Effect": "Allow", "Resource": "*"}),
        json!({
            "Action": ["kms:Decrypt", "kms:Encrypt"],
            "Effect": "Allow",
            "Resource": {"Fn::Sub": "arn:aws:kms:${AWS::Region}:${AWS::AccountId}:key/CMK"}
        }),
        json!({
            "Action": "ses:SendEmail",
            "Effect": "Allow",
            "Resource": {"Fn::Sub": "arn:aws:ses:${AWS::Region}:${AWS::AccountId}:identity/nd.edu"}
        }),
    ];

    let template = default_stack();
    let actual = policy_statements(&template);
    assert!(same_statement_set(&expected, &actual), "statements: {actual:#?}");

    has_resource(
        &template,
        "AWS::IAM::Policy",
        &json!({"PolicyDocument": {"Statement": expected, "Version": "2012-10-17"}}),
    )
    .expect("policy document should match exactly in insertion order");
}

#[test]
fn function_is_bound_to_role_with_limits() {
    has_resource_like(
        &default_stack(),
        "AWS::Lambda::Function",
        &json!({
            "FunctionName": "marble-web-kiosk-export",
            "Handler": "handler.run",
            "Runtime": "python3.7",
            "MemorySize": 256,
            "Timeout": 900,
            "Role": {"Fn::GetAtt": ["LambdaTrustRole", "Arn"]}
        }),
    )
    .expect("function should be defined");
}

#[test]
fn end_to_end_without_stage() {
    let config = StackConfig::for_stage(Stage::from_env_value(None));
    let template = synthesize(ID, &config).expect("synth should pass");

    has_resource(
        &template,
        "AWS::IAM::Role",
        &json!({"RoleName": "marble-web-kiosk-export-role"}),
    )
    .expect("role");
    has_resource(
        &template,
        "AWS::IAM::Policy",
        &json!({"PolicyName": "marble-web-kiosk-export-policy"}),
    )
    .expect("policy");
    has_resource(
        &template,
        "AWS::Events::Rule",
        &json!({"Name": "marble-web-kiosk-export-rule"}),
    )
    .expect("rule");
    assert_eq!(export_mode(&template), json!("full"));
    assert_eq!(
        template.resources["EmbarkLambda"].properties["Environment"]["Variables"]["SSM_KEY_BASE"],
        json!("/all/marble-data-processing/test")
    );
}

#[test]
fn export_mode_follows_stage() {
    for (stage, expected) in [("prod", "incremental"), ("dev", "full"), ("test", "full")] {
        let template = synthesize(ID, &StackConfig::for_stage(Stage::new(stage)))
            .expect("synth should pass");
        assert_eq!(export_mode(&template), json!(expected), "stage {stage}");
    }
}

#[test]
fn pipeline_variant_is_always_incremental_and_parameterized() {
    let template =
        synthesize(ID, &StackConfig::pipeline(Stage::new("dev"))).expect("synth should pass");

    assert_eq!(export_mode(&template), json!("incremental"));
    let parameter_ids: Vec<_> = template.parameters.keys().map(String::as_str).collect();
    assert_eq!(
        parameter_ids,
        vec![
            "EmbarkLambdaSourceBucketNameParameter",
            "EmbarkLambdaSourceObjectKeyParameter"
        ]
    );
    assert!(template.resources["EmbarkLambda"].metadata.is_empty());
}

#[test]
fn schedule_is_fixed_regardless_of_stage() {
    for stage in ["prod", "dev", "qa"] {
        let template = synthesize(ID, &StackConfig::for_stage(Stage::new(stage)))
            .expect("synth should pass");
        has_resource_like(
            &template,
            "AWS::Events::Rule",
            &json!({
                "ScheduleExpression": "cron(0 7 * * ? *)",
                "Targets": [{"Arn": {"Fn::GetAtt": ["EmbarkLambda", "Arn"]}}]
            }),
        )
        .expect("rule should use fixed schedule");
    }
    assert_eq!(SCHEDULE_EXPRESSION, "cron(0 7 * * ? *)");
}

#[test]
fn rule_may_invoke_function() {
    has_resource(
        &default_stack(),
        "AWS::Lambda::Permission",
        &json!({
            "Action": "lambda:InvokeFunction",
            "Principal": "events.amazonaws.com",
            "SourceArn": {"Fn::GetAtt": ["Rule", "Arn"]}
        }),
    )
    .expect("invoke permission should be defined");
}

#[test]
fn synthesis_is_byte_identical_for_identical_inputs() {
    let config = StackConfig::for_stage(Stage::new("prod"));
    let first = synthesize(ID, &config).expect("synth should pass");
    let second = synthesize(ID, &config).expect("synth should pass");

    assert_eq!(
        first.to_json_pretty().expect("json"),
        second.to_json_pretty().expect("json")
    );
    assert_eq!(
        first.fingerprint().expect("fingerprint"),
        second.fingerprint().expect("fingerprint")
    );
}

#[test]
fn layers_are_disabled_by_default_and_imported_when_enabled() {
    let template = default_stack();
    assert!(template.resources["EmbarkLambda"].properties.get("Layers").is_none());

    let template = synthesize(ID, &StackConfig::default().with_known_layers())
        .expect("synth should pass");
    has_resource_like(
        &template,
        "AWS::Lambda::Function",
        &json!({
            "Layers": [
                {"Fn::ImportValue": KNOWN_LAYER_EXPORTS[0]},
                {"Fn::ImportValue": KNOWN_LAYER_EXPORTS[1]}
            ]
        }),
    )
    .expect("layers should be imported");
}

#[test]
fn per_stack_namespace_scopes_parameters_to_identifier() {
    let config = StackConfig {
        parameter_namespace: ParameterNamespace::PerStack,
        ..StackConfig::default()
    };
    let template = synthesize(ID, &config).expect("synth should pass");
    let statements = policy_statements(&template);
    assert_eq!(
        statements[1]["Resource"],
        json!({
            "Fn::Sub": "arn:aws:ssm:${AWS::Region}:${AWS::AccountId}:parameter/all/marble-web-kiosk-export/*"
        })
    );
}

#[test]
fn asset_hash_is_recorded_in_function_metadata() {
    let config = StackConfig {
        code_source: CodeSource::Asset {
            path: "../../src".to_string(),
            hash: Some("0f0e".to_string()),
        },
        ..StackConfig::default()
    };
    let template = synthesize(ID, &config).expect("synth should pass");
    let metadata = &template.resources["EmbarkLambda"].metadata;
    assert_eq!(metadata["aws:asset:hash"], json!("0f0e"));
    assert_eq!(metadata["aws:asset:property"], json!("Code"));
}

#[test]
fn serialized_template_parses_back() {
    let template = default_stack();
    let parsed: Template =
        serde_json::from_str(&template.to_json().expect("json")).expect("template should parse");
    assert_eq!(parsed, template);
}
