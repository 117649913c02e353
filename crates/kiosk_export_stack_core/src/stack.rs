use tracing::{debug, info};

use crate::config::StackConfig;
use crate::error::SynthError;
use crate::naming::{
    ResourceNames, FUNCTION_LOGICAL_ID, POLICY_LOGICAL_ID, ROLE_LOGICAL_ID, RULE_LOGICAL_ID,
    RULE_PERMISSION_LOGICAL_ID,
};
use crate::policy::export_job_statements;
use crate::resources::{
    code_binding, execution_role, permission_policy, rule_invoke_permission, schedule_rule,
    scheduled_function,
};
use crate::runtime_env::FunctionEnvironment;
use crate::template::Template;

/// Daily at 07:00 UTC.
pub const SCHEDULE_EXPRESSION: &str = "cron(0 7 * * ? *)";

/// Builds the whole stack for `id`. Pure: identical inputs always give
/// byte-identical templates, and nothing is provisioned here.
pub fn synthesize(id: &str, config: &StackConfig) -> Result<Template, SynthError> {
    let names = ResourceNames::for_id(id)?;
    config.validate()?;

    let parameter_namespace = config.parameter_namespace.resolve(id);
    let environment = FunctionEnvironment::for_stage(
        &parameter_namespace,
        &config.stage,
        config.export_mode_policy,
    );
    debug!(
        stack = %names.stack,
        stage = %config.stage,
        export_mode = %environment.export_mode,
        "synthesizing stack"
    );

    let mut template = Template::new(Some(format!(
        "Scheduled web kiosk export ({})",
        names.stack
    )));

    template.add_resource(ROLE_LOGICAL_ID, execution_role(&names)?)?;
    template.add_resource(
        POLICY_LOGICAL_ID,
        permission_policy(&names, export_job_statements(&parameter_namespace, config))?,
    )?;

    let binding = code_binding(&config.code_source);
    for (logical_id, parameter) in binding.parameters.clone() {
        template.add_parameter(logical_id, parameter)?;
    }
    template.add_resource(
        FUNCTION_LOGICAL_ID,
        scheduled_function(&names, config, &environment, binding)?,
    )?;

    template.add_resource(RULE_LOGICAL_ID, schedule_rule(&names, SCHEDULE_EXPRESSION)?)?;
    template.add_resource(RULE_PERMISSION_LOGICAL_ID, rule_invoke_permission()?)?;

    info!(
        stack = %names.stack,
        resources = template.resources.len(),
        parameters = template.parameters.len(),
        "stack synthesized"
    );
    Ok(template)
}
