//! Row types for the tables in `schema.rs`.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::schema::*;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tenants)]
pub struct Tenant {
    pub id: String,
    /// `"active"` | `"inactive"`.
    pub status: String,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = llm_provider_models)]
pub struct LlmProviderModel {
    pub id: String,
    pub provider_tag: String,
    pub model_name: String,
    pub context_window: i32,
    pub cost_per_input_token: f64,
    pub cost_per_output_token: f64,
    pub active: i32,
    /// Overrides `ProviderTag`'s default base URL — self-hosted
    /// OpenAI-compatible proxies, Azure-style deployments, or a test double.
    pub base_url_override: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tenant_llm_bindings)]
pub struct TenantLlmBinding {
    pub tenant_id: String,
    pub llm_model_id: String,
    pub api_key_ciphertext: Vec<u8>,
    pub api_key_nonce: Vec<u8>,
    pub rpm_hint: Option<i32>,
    pub tpm_hint: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tool_specs)]
pub struct ToolSpec {
    pub id: String,
    pub name: String,
    /// `"HTTP_GET"` | `"HTTP_POST"` | `"RAG"` | `"DB_QUERY"` | `"OCR"`.
    pub base_kind: String,
    pub endpoint_template: Option<String>,
    /// JSON object of static headers.
    pub static_headers: String,
    pub timeout_secs: i32,
    /// JSON-Schema for the tool's arguments.
    pub input_schema: String,
    pub output_format: String,
    pub active: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = agent_specs)]
pub struct AgentSpec {
    pub id: String,
    pub name: String,
    pub system_prompt: String,
    pub llm_model_id: String,
    pub handler_class: String,
    pub active: i32,
}

impl AgentSpec {
    pub fn is_active(&self) -> bool {
        self.active != 0
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = agent_tools)]
pub struct AgentTool {
    pub agent_id: String,
    pub tool_id: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tenant_agent_grants)]
pub struct TenantAgentGrant {
    pub tenant_id: String,
    pub agent_id: String,
    pub enabled: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tenant_tool_grants)]
pub struct TenantToolGrant {
    pub tenant_id: String,
    pub tool_id: String,
    pub enabled: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = sessions)]
pub struct Session {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub last_agent: Option<String>,
    pub thread_id: String,
    pub created_at: String,
    pub last_activity_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    /// `"user"` | `"assistant"` | `"system"`.
    pub role: String,
    pub text: String,
    pub created_at: String,
    /// JSON object; see spec.md §4.4/§4.6 for the keys assistant messages carry.
    pub metadata: String,
}

/// Structured content of `Message::metadata` for assistant messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantMetadata {
    pub agent: Option<String>,
    pub intent: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<String>,
    #[serde(default)]
    pub extracted_entities: serde_json::Map<String, serde_json::Value>,
    pub llm_model: Option<String>,
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub overflow: bool,
}
