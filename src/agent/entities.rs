//! Advisory entity extraction (spec.md §4.4 step 2): a lightweight LLM call
//! asking for values matching the first tool's required schema properties.
//! Extraction failures never fail the request — the result is simply an
//! empty map.

use std::collections::HashMap;

use serde_json::Value;

use crate::llm::provider::ChatClient;
use crate::llm::types::{ChatMessage, CompletionRequest};

pub async fn extract_entities(
    client: &dyn ChatClient,
    user_text: &str,
    first_tool_schema: Option<&Value>,
) -> HashMap<String, Value> {
    let Some(schema) = first_tool_schema else {
        return HashMap::new();
    };
    let required: Vec<String> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    if required.is_empty() {
        return HashMap::new();
    }

    let prompt = format!(
        "Extract the following fields from the user's message as a flat JSON object \
         with only those keys present when a confident value exists. Fields: {}.\n\nMessage: {}",
        required.join(", "),
        user_text
    );

    let request = CompletionRequest::new(vec![
        ChatMessage::system("You extract structured data. Reply with JSON only, no prose."),
        ChatMessage::user(prompt),
    ]);

    let Ok(response) = client.complete(request).await else {
        return HashMap::new();
    };

    match serde_json::from_str::<Value>(response.content.trim()) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        _ => HashMap::new(),
    }
}
