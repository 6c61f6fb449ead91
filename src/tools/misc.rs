//! RAG, DB_QUERY, and OCR callables (spec.md §4.2).
//!
//! RAG delegates to an external knowledge-base endpoint; DB_QUERY and OCR
//! are declared-but-unimplemented stubs whose presence in the catalog must
//! not crash loading.

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{CallableTool, ToolOutcome};
use super::validate::CompiledSchema;

/// Delegates to an external knowledge-base query function with
/// `(tenant_id, query_text, top_k)`, treated as a black box (spec.md §4.2).
pub struct RagTool {
    pub tool_name: String,
    pub description: String,
    pub endpoint: String,
    pub tenant_id: String,
    pub schema: CompiledSchema,
    client: reqwest::Client,
}

impl RagTool {
    pub fn new(tool_name: String, description: String, endpoint: String, tenant_id: String, schema: CompiledSchema) -> Self {
        Self { tool_name, description, endpoint, tenant_id, schema, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl CallableTool for RagTool {
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

        let query_text = arguments.get("query_text").and_then(Value::as_str).unwrap_or_default();
        let top_k = arguments.get("top_k").and_then(Value::as_u64).unwrap_or(5);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(bearer_token)
            .json(&serde_json::json!({
                "tenant_id": self.tenant_id,
                "query_text": query_text,
                "top_k": top_k,
            }))
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => match r.json::<Value>().await {
                Ok(body) => ToolOutcome::ok(body),
                Err(e) => ToolOutcome::error("tool_transport_error", e.to_string()),
            },
            Ok(r) => ToolOutcome::error("tool_http_error", format!("status {}", r.status())),
            Err(e) if e.is_timeout() => ToolOutcome::error("tool_timeout", e.to_string()),
            Err(e) => ToolOutcome::error("tool_transport_error", e.to_string()),
        }
    }
}

/// Stub for a base kind declared in the catalog but not yet implemented.
/// Registers successfully; every invocation returns `NotImplemented`.
pub struct NotImplementedTool {
    pub tool_name: String,
    pub description: String,
    pub schema: CompiledSchema,
}

#[async_trait]
impl CallableTool for NotImplementedTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> &Value {
        self.schema.raw()
    }

    async fn invoke(&self, _arguments: Value, _bearer_token: &str) -> ToolOutcome {
        ToolOutcome::error("not_implemented", format!("tool '{}' is not yet implemented", self.tool_name))
    }
}
