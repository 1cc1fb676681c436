use maestro::workflow::{RawStep, RouteDefinition, StepDefinition, StepKind};

fn raw(name: &str) -> RawStep {
    RawStep {
        name: name.to_string(),
        ..RawStep::default()
    }
}

#[test]
fn classification_prefers_agent_over_every_other_field() {
    let mut step = raw("ambiguous");
    step.agent = Some("analyst".to_string());
    step.action = Some("gather".to_string());
    step.condition = Some("always".to_string());
    step.routes = vec![RouteDefinition {
        label: "single_story".to_string(),
        keywords: vec![],
    }];

    let classified = StepKind::classify(&step);
    assert!(matches!(classified, StepKind::Agent { ref agent, .. } if agent == "analyst"));
}

#[test]
fn classification_orders_routes_before_action_before_condition() {
    let mut step = raw("route");
    step.routes = vec![RouteDefinition {
        label: "epic".to_string(),
        keywords: vec![],
    }];
    step.action = Some("gather".to_string());
    step.condition = Some("always".to_string());
    assert!(matches!(StepKind::classify(&step), StepKind::Routing { .. }));

    let mut step = raw("act");
    step.action = Some("pause_for_input".to_string());
    step.condition = Some("always".to_string());
    assert!(matches!(
        StepKind::classify(&step),
        StepKind::Action { ref action } if action == "pause_for_input"
    ));

    let mut step = raw("gate");
    step.condition = Some("always".to_string());
    assert!(matches!(StepKind::classify(&step), StepKind::Decision { .. }));

    assert_eq!(StepKind::classify(&raw("noop")), StepKind::Container);
}

#[test]
fn empty_creates_field_is_not_a_deliverable() {
    let mut step = raw("analyze");
    step.agent = Some("analyst".to_string());
    step.creates = Some(String::new());
    let StepKind::Agent { creates, .. } = StepKind::classify(&step) else {
        panic!("expected agent step");
    };
    assert_eq!(creates, None);
}

#[test]
fn decision_name_is_the_action_when_declared() {
    let mut step = raw("analyze");
    step.agent = Some("analyst".to_string());
    step.action = Some("assess_scope".to_string());
    let definition = StepDefinition::from_raw(&step);
    assert_eq!(definition.decision_name(), "assess_scope");

    let plain = StepDefinition::from_raw(&{
        let mut s = raw("review");
        s.agent = Some("architect".to_string());
        s
    });
    assert_eq!(plain.decision_name(), "review");
}

#[test]
fn step_definition_round_trips_through_json() {
    let mut step = raw("route");
    step.routes = vec![RouteDefinition {
        label: "single_story".to_string(),
        keywords: vec!["small".to_string(), "fix".to_string()],
    }];
    step.decision_key = Some("analyze".to_string());

    let definition = StepDefinition::from_raw(&step);
    let json = serde_json::to_string(&definition).expect("serialize");
    let back: StepDefinition = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, definition);
}
