//! `CallableTool` contract. Grounded on `tools/traits.rs`'s `Tool`/`ToolResult`.

use async_trait::async_trait;
use serde_json::Value;

/// The structured outcome of a tool invocation. Per spec.md §4.2's failure
/// model, a tool failure is *not* a request failure: it is wrapped here and
/// handed back to the LLM as the next turn's tool-result message.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolOutcome {
    pub success: bool,
    /// `{error, detail}` on failure, or the parsed/raw response on success.
    pub output: Value,
}

impl ToolOutcome {
    pub fn ok(output: Value) -> Self {
        Self { success: true, output }
    }

    pub fn error(error_code: &str, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            output: serde_json::json!({ "error": error_code, "detail": detail.into() }),
        }
    }
}

#[async_trait]
pub trait CallableTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> &Value;

    /// Validates `arguments` against `parameters_schema` and invokes the
    /// tool. `bearer_token` is injected here, from the per-request call
    /// context, never stored on `self` (spec.md §4.2 step 6, §5, §9).
    async fn invoke(&self, arguments: Value, bearer_token: &str) -> ToolOutcome;
}
