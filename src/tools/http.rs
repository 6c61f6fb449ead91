//! HTTP_GET / HTTP_POST callables. Grounded on `tools/web.rs`'s
//! `WebFetchTool`/`WebRequestTool` (timeout, header merge, response
//! truncation), adapted to substitute `{placeholder}` endpoint segments from
//! validated arguments and to always overlay the bearer token.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{CallableTool, ToolOutcome};
use super::validate::CompiledSchema;

const MAX_RESPONSE_SIZE: usize = 64 * 1024;

pub struct HttpGetTool {
    pub tool_name: String,
    pub description: String,
    pub endpoint_template: String,
    pub static_headers: HashMap<String, String>,
    pub timeout: Duration,
    pub schema: CompiledSchema,
    client: reqwest::Client,
}

impl HttpGetTool {
    pub fn new(
        tool_name: String,
        description: String,
        endpoint_template: String,
        static_headers: HashMap<String, String>,
        timeout: Duration,
        schema: CompiledSchema,
    ) -> Self {
        Self {
            tool_name,
            description,
            endpoint_template,
            static_headers,
            timeout,
            schema,
            client: reqwest::Client::new(),
        }
    }
}

/// Substitutes `{name}` segments in `template` with URL-encoded values from
/// `arguments`. Missing properties are left as a literal error rather than
/// silently dropped.
pub fn expand_endpoint(template: &str, arguments: &Value) -> Result<String, String> {
    let mut result = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = template[i..].find('}') {
                let name = &template[i + 1..i + end];
                let value = arguments
                    .get(name)
                    .ok_or_else(|| format!("missing value for placeholder '{name}'"))?;
                let value_str = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                result.push_str(&urlencoding::encode(&value_str));
                i += end + 1;
                continue;
            }
        }
        let ch = template[i..].chars().next().unwrap_or('\0');
        result.push(ch);
        i += ch.len_utf8();
    }
    Ok(result)
}

#[async_trait]
impl CallableTool for HttpGetTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> &Value {
        self.schema.raw()
    }

    async fn invoke(&self, arguments: Value, bearer_token: &str) -> ToolOutcome {
        if let Err(detail) = self.schema.validate(&arguments) {
            return ToolOutcome::error("schema_invalid", detail);
        }

        let url = match expand_endpoint(&self.endpoint_template, &arguments) {
            Ok(u) => u,
            Err(detail) => return ToolOutcome::error("schema_invalid", detail),
        };

        let mut request = self.client.get(&url).timeout(self.timeout).bearer_auth(bearer_token);
        for (key, value) in &self.static_headers {
            if key.eq_ignore_ascii_case("authorization") {
                continue; // tool spec cannot override Authorization (spec.md §6)
            }
            request = request.header(key, value);
        }

        execute(request).await
    }
}

pub struct HttpPostTool {
    pub tool_name: String,
    pub description: String,
    pub endpoint_template: String,
    pub static_headers: HashMap<String, String>,
    pub timeout: Duration,
    pub schema: CompiledSchema,
    client: reqwest::Client,
}

impl HttpPostTool {
    pub fn new(
        tool_name: String,
        description: String,
        endpoint_template: String,
        static_headers: HashMap<String, String>,
        timeout: Duration,
        schema: CompiledSchema,
    ) -> Self {
        Self {
            tool_name,
            description,
            endpoint_template,
            static_headers,
            timeout,
            schema,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CallableTool for HttpPostTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> &Value {
        self.schema.raw()
    }

    async fn invoke(&self, arguments: Value, bearer_token: &str) -> ToolOutcome {
        if let Err(detail) = self.schema.validate(&arguments) {
            return ToolOutcome::error("schema_invalid", detail);
        }

        let url = match expand_endpoint(&self.endpoint_template, &arguments) {
            Ok(u) => u,
            Err(detail) => return ToolOutcome::error("schema_invalid", detail),
        };

        let mut request = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(bearer_token)
            .json(&arguments);
        for (key, value) in &self.static_headers {
            if key.eq_ignore_ascii_case("authorization") {
                continue;
            }
            request = request.header(key, value);
        }

        execute(request).await
    }
}

async fn execute(request: reqwest::RequestBuilder) -> ToolOutcome {
    let response = match request.send().await {
        Ok(r) => r,
        Err(e) if e.is_timeout() => return ToolOutcome::error("tool_timeout", e.to_string()),
        Err(e) => return ToolOutcome::error("tool_transport_error", e.to_string()),
    };

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let was_truncated = body.len() > MAX_RESPONSE_SIZE;
    let truncated = truncate_at_char_boundary(body, MAX_RESPONSE_SIZE);

    if !status.is_success() {
        return ToolOutcome {
            success: false,
            output: serde_json::json!({
                "error": "tool_http_error",
                "status": status.as_u16(),
                "body": truncated,
                "truncated": was_truncated,
            }),
        };
    }

    let parsed: Value = serde_json::from_str(&truncated)
        .unwrap_or_else(|_| Value::String(truncated.clone()));
    ToolOutcome::ok(parsed)
}

/// Cuts `text` to at most `max_bytes`, backing off to the nearest char
/// boundary rather than slicing mid-codepoint (mirrors
/// `agent::executor::truncate`'s idiom for the same problem on tool results
/// fed back into the loop).
fn truncate_at_char_boundary(text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text[..cut].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_single_placeholder() {
        let result = expand_endpoint(
            "https://api.example/r/{tax_code}",
            &json!({"tax_code": "0123456789012"}),
        )
        .unwrap();
        assert_eq!(result, "https://api.example/r/0123456789012");
    }

    #[test]
    fn errors_on_missing_placeholder_value() {
        let result = expand_endpoint("https://api.example/r/{tax_code}", &json!({}));
        assert!(result.is_err());
    }

    #[test]
    fn url_encodes_substituted_values() {
        let result = expand_endpoint("https://api.example/q/{name}", &json!({"name": "a b"})).unwrap();
        assert!(result.contains("a%20b"));
    }
}
