use serde::{Deserialize, Serialize};

// Step shape as written in a template. Which fields are present decides the
// step kind, once, at template resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    pub name: String,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub creates: Option<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub routes: Vec<RouteDefinition>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub decision_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDefinition {
    pub label: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    Agent {
        agent: String,
        #[serde(default)]
        action: Option<String>,
        #[serde(default)]
        creates: Option<String>,
        #[serde(default)]
        outputs: Vec<String>,
    },
    Routing {
        routes: Vec<RouteDefinition>,
        #[serde(default)]
        decision_key: Option<String>,
    },
    Action {
        action: String,
    },
    Decision {
        condition: String,
    },
    Container,
}

impl StepKind {
    // Priority: agent, then routes, then bare action, then bare condition;
    // a step with none of these is an inert named container.
    pub fn classify(raw: &RawStep) -> StepKind {
        if let Some(agent) = raw.agent.as_ref() {
            return StepKind::Agent {
                agent: agent.clone(),
                action: raw.action.clone(),
                creates: raw.creates.clone().filter(|v| !v.is_empty()),
                outputs: raw.outputs.clone(),
            };
        }
        if !raw.routes.is_empty() {
            return StepKind::Routing {
                routes: raw.routes.clone(),
                decision_key: raw.decision_key.clone(),
            };
        }
        if let Some(action) = raw.action.as_ref() {
            return StepKind::Action {
                action: action.clone(),
            };
        }
        if let Some(condition) = raw.condition.as_ref() {
            return StepKind::Decision {
                condition: condition.clone(),
            };
        }
        StepKind::Container
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    pub name: String,
    #[serde(flatten)]
    pub kind: StepKind,
}

impl StepDefinition {
    pub fn from_raw(raw: &RawStep) -> StepDefinition {
        StepDefinition {
            name: raw.name.clone(),
            kind: StepKind::classify(raw),
        }
    }

    // The declared action name when present, otherwise the step name.
    pub fn decision_name(&self) -> &str {
        if let StepKind::Agent {
            action: Some(action),
            ..
        } = &self.kind
        {
            return action;
        }
        &self.name
    }
}
