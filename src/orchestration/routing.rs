use crate::workflow::{RouteDefinition, WorkflowContext};

const LABEL_TOKEN_BOOST: f32 = 1.8;
const KEYWORD_HIT_SCORE: f32 = 1.0;

// Keyword hits count once per declared keyword; tokens of the route label
// itself score higher. Zero-score texts fall back to the first declared route.
pub fn classify_route(decision_text: &str, routes: &[RouteDefinition]) -> Option<String> {
    let first = routes.first()?;
    let tokens = tokenize(decision_text);
    if tokens.is_empty() {
        return Some(first.label.clone());
    }

    let mut best: Option<(f32, &RouteDefinition)> = None;
    for route in routes {
        let mut score = 0.0;
        for keyword in &route.keywords {
            if tokens.iter().any(|t| t == &keyword.to_lowercase()) {
                score += KEYWORD_HIT_SCORE;
            }
        }
        for label_token in tokenize(&route.label) {
            if tokens.contains(&label_token) {
                score += LABEL_TOKEN_BOOST;
            }
        }
        if score > best.map(|(s, _)| s).unwrap_or(0.0) {
            best = Some((score, route));
        }
    }

    Some(best.map(|(_, route)| route.label.clone()).unwrap_or_else(|| first.label.clone()))
}

// The context entry named by `decision_key` when declared, otherwise every
// stored decision joined.
pub fn decision_text_for(context: &WorkflowContext, decision_key: Option<&str>) -> String {
    match decision_key {
        Some(key) => context.decisions.get(key).cloned().unwrap_or_default(),
        None => context
            .decisions
            .values()
            .cloned()
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}
