//! `ToolRegistry`: loads permission-filtered, schema-validated callable
//! tools from DB rows (spec.md §4.2). Grounded on `tools/registry.rs`'s
//! `HashMap<String, Arc<dyn Tool>>` idiom, extended with the DB-driven load
//! and tenant-grant filtering the teacher's static registry never had.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use diesel::prelude::*;

use super::http::{HttpGetTool, HttpPostTool};
use super::misc::{NotImplementedTool, RagTool};
use super::traits::CallableTool;
use super::validate::CompiledSchema;
use crate::db::{models, schema, DbPool};
use crate::error::AppError;

pub struct ToolRegistry {
    pool: DbPool,
    priority_limit: i64,
    rag_endpoint: String,
    compiled: DashMap<(String, String), Arc<dyn CallableTool>>,
}

impl ToolRegistry {
    pub fn new(pool: DbPool, priority_limit: usize, rag_endpoint: String) -> Self {
        Self {
            pool,
            priority_limit: priority_limit as i64,
            rag_endpoint,
            compiled: DashMap::new(),
        }
    }

    /// Evicts the cached compiled tool for `(tenant_id, tool_id)` (on admin
    /// writes to `ToolSpec`/`TenantToolGrant`).
    pub fn invalidate(&self, tenant_id: &str, tool_id: &str) {
        self.compiled.remove(&(tenant_id.to_string(), tool_id.to_string()));
    }

    /// `load_tools_for_agent(agent_id, tenant_id, bearer_token)` per
    /// spec.md §4.2. The bearer token is *not* part of the cache key and is
    /// never stored on the returned tool objects; it is injected at
    /// invoke-time by the caller via `CallableTool::invoke`.
    pub fn load_tools_for_agent(
        &self,
        agent_id: &str,
        tenant_id: &str,
    ) -> Result<Vec<Arc<dyn CallableTool>>, AppError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| AppError::Internal(format!("pool error: {e}")))?;

        let rows: Vec<models::AgentTool> = schema::agent_tools::table
            .filter(schema::agent_tools::agent_id.eq(agent_id))
            .order((schema::agent_tools::priority.asc(), schema::agent_tools::tool_id.asc()))
            .limit(self.priority_limit)
            .select(models::AgentTool::as_select())
            .load(&mut conn)
            .map_err(|e| AppError::Internal(format!("store error: {e}")))?;

        let mut tools = Vec::with_capacity(rows.len());

        for row in rows {
            let spec = schema::tool_specs::table
                .filter(schema::tool_specs::id.eq(&row.tool_id))
                .select(models::ToolSpec::as_select())
                .first::<models::ToolSpec>(&mut conn)
                .optional()
                .map_err(|e| AppError::Internal(format!("store error: {e}")))?;

            let Some(spec) = spec else {
                tracing::warn!(tool_id = %row.tool_id, "agent_tools references unknown tool_spec; skipping");
                continue;
            };
            if spec.active == 0 {
                tracing::warn!(tool = %spec.name, "tool_spec inactive; skipping");
                continue;
            }

            let grant: Option<models::TenantToolGrant> = schema::tenant_tool_grants::table
                .filter(schema::tenant_tool_grants::tenant_id.eq(tenant_id))
                .filter(schema::tenant_tool_grants::tool_id.eq(&spec.id))
                .select(models::TenantToolGrant::as_select())
                .first(&mut conn)
                .optional()
                .map_err(|e| AppError::Internal(format!("store error: {e}")))?;

            match grant {
                Some(g) if g.enabled != 0 => {}
                _ => {
                    tracing::warn!(tool = %spec.name, tenant_id, "tool not granted to tenant; skipping");
                    continue;
                }
            }

            let cache_key = (tenant_id.to_string(), spec.id.clone());
            if let Some(cached) = self.compiled.get(&cache_key) {
                tools.push(cached.clone());
                continue;
            }

            let compiled = self.compile_tool(&spec, tenant_id)?;
            self.compiled.insert(cache_key, compiled.clone());
            tools.push(compiled);
        }

        Ok(tools)
    }

    fn compile_tool(&self, spec: &models::ToolSpec, tenant_id: &str) -> Result<Arc<dyn CallableTool>, AppError> {
        let input_schema: serde_json::Value = serde_json::from_str(&spec.input_schema)
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}));
        let compiled_schema = CompiledSchema::compile(&input_schema)
            .map_err(|e| AppError::Internal(format!("invalid tool schema for {}: {e}", spec.name)))?;

        let headers: HashMap<String, String> = serde_json::from_str(&spec.static_headers).unwrap_or_default();
        let timeout = Duration::from_secs(spec.timeout_secs.max(1) as u64);

        let tool: Arc<dyn CallableTool> = match spec.base_kind.as_str() {
            "HTTP_GET" => Arc::new(HttpGetTool::new(
                spec.name.clone(),
                spec.name.clone(),
                spec.endpoint_template.clone().unwrap_or_default(),
                headers,
                timeout,
                compiled_schema,
            )),
            "HTTP_POST" => Arc::new(HttpPostTool::new(
                spec.name.clone(),
                spec.name.clone(),
                spec.endpoint_template.clone().unwrap_or_default(),
                headers,
                timeout,
                compiled_schema,
            )),
            "RAG" => Arc::new(RagTool::new(
                spec.name.clone(),
                spec.name.clone(),
                self.rag_endpoint.clone(),
                tenant_id.to_string(),
                compiled_schema,
            )),
            "DB_QUERY" | "OCR" => Arc::new(NotImplementedTool {
                tool_name: spec.name.clone(),
                description: spec.name.clone(),
                schema: compiled_schema,
            }),
            other => {
                return Err(AppError::Internal(format!("unknown tool base_kind: {other}")));
            }
        };

        Ok(tool)
    }
}
