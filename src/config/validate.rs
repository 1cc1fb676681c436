use crate::config::{ConfigError, EngineConfig};
use crate::shared::ids::validate_identifier_value;
use crate::workflow::StepKind;

pub fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "pollIntervalMs must be greater than zero".to_string(),
        ));
    }

    for name in config.agents.keys() {
        validate_identifier_value("agent name", name).map_err(ConfigError::Validation)?;
    }

    for (template_name, template) in &config.templates {
        validate_identifier_value("template name", template_name)
            .map_err(ConfigError::Validation)?;
        if template.steps.is_empty() {
            return Err(ConfigError::Validation(format!(
                "template `{template_name}` declares no steps"
            )));
        }
        for step in template.resolve_steps() {
            match &step.kind {
                StepKind::Agent { agent, .. } => {
                    if !config.agents.contains_key(agent) {
                        return Err(ConfigError::Validation(format!(
                            "template `{template_name}` step `{}` references unknown agent `{agent}`",
                            step.name
                        )));
                    }
                }
                StepKind::Routing { routes, .. } => {
                    if routes.is_empty() {
                        return Err(ConfigError::Validation(format!(
                            "template `{template_name}` step `{}` declares no routes",
                            step.name
                        )));
                    }
                    for route in routes {
                        validate_identifier_value("route label", &route.label)
                            .map_err(ConfigError::Validation)?;
                    }
                }
                _ => {}
            }
        }
    }

    Ok(())
}
