pub mod entities;
pub mod executor;
pub mod handler_registry;

use std::collections::HashMap;

use serde::Serialize;

pub use executor::DomainAgentExecutor;
pub use handler_registry::HandlerRegistry;

/// Contract result of `invoke(agent_spec, user_text, session_id)`
/// (spec.md §4.4).
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    pub text: String,
    pub tool_calls_made: Vec<String>,
    pub entities_extracted: HashMap<String, serde_json::Value>,
    pub llm_model: String,
    pub duration_ms: i64,
    pub overflow: bool,
}

/// Everything an executor strategy needs for one invocation, threaded
/// through so the generic executor and any specialized strategy share the
/// same inputs (spec.md §4.4 step 1, §4.5 "Handler-class threading").
pub struct AgentContext<'a> {
    pub agent: &'a crate::db::models::AgentSpec,
    pub tenant_id: String,
    pub session_id: String,
    pub user_text: String,
    pub bearer_token: String,
    pub language: String,
}
