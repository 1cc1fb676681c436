use serde_json::Value;

// A reply that wraps the JSON array in prose is salvaged by scanning from
// the first `[` to the last `]`. Unparseable replies mean no questions.
pub fn parse_question_list(content: &str) -> Vec<String> {
    let trimmed = content.trim();
    if let Some(questions) = try_parse_array(trimmed) {
        return questions;
    }
    let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']')) else {
        return Vec::new();
    };
    if start >= end {
        return Vec::new();
    }
    try_parse_array(&trimmed[start..=end]).unwrap_or_default()
}

fn try_parse_array(raw: &str) -> Option<Vec<String>> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}
