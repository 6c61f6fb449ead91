pub mod provider;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use diesel::prelude::*;
use tokio::sync::Mutex as AsyncMutex;

use crate::crypto;
use crate::db::{models, schema, DbPool};
use crate::error::AppError;

pub use provider::ChatClient;

/// Resolves tenant → provider + model + key → cached chat client
/// (spec.md §4.1). The cache is process-shared; cold constructions for the
/// same `(tenant_id, llm_model_id)` are coordinated by a per-key async
/// mutex so concurrent first-touches share one construction instead of
/// racing the database (spec.md §5, §8 "single-flight").
pub struct LLMClientManager {
    pool: DbPool,
    encryption_key: Option<String>,
    clients: DashMap<(String, String), Arc<dyn ChatClient>>,
    locks: DashMap<(String, String), Arc<AsyncMutex<()>>>,
}

impl LLMClientManager {
    pub fn new(pool: DbPool, encryption_key: Option<String>) -> Self {
        Self {
            pool,
            encryption_key,
            clients: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    pub async fn get_client(&self, tenant_id: &str) -> Result<Arc<dyn ChatClient>, AppError> {
        let (binding, model) = self.load_binding(tenant_id)?;
        let key = (tenant_id.to_string(), model.id.clone());

        if let Some(existing) = self.clients.get(&key) {
            return Ok(existing.clone());
        }

        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Re-check: another caller may have constructed it while we waited.
        if let Some(existing) = self.clients.get(&key) {
            return Ok(existing.clone());
        }

        let secret = self
            .encryption_key
            .as_ref()
            .ok_or(AppError::ConfigMissing)?;
        let api_key = crypto::decrypt(secret, &binding.api_key_ciphertext, &binding.api_key_nonce)
            .map_err(|_| AppError::ConfigDecryptFailure)?;

        let tag = provider::ProviderTag::parse(&model.provider_tag)?;
        let client: Arc<dyn ChatClient> = Arc::new(provider::HttpChatClient::new(
            tag,
            api_key,
            model.model_name.clone(),
            Duration::from_secs(60),
            model.base_url_override.clone(),
        ));

        self.clients.insert(key, client.clone());
        Ok(client)
    }

    /// Evicts the cached client for `tenant_id` (on admin writes to
    /// `TenantLLMBinding`/`LLMProviderModel`). Callers tolerate a cold-start
    /// latency of a single reconstruction on the next `get_client` call.
    pub fn invalidate(&self, tenant_id: &str) {
        self.clients.retain(|(t, _), _| t != tenant_id);
    }

    fn load_binding(
        &self,
        tenant_id: &str,
    ) -> Result<(models::TenantLlmBinding, models::LlmProviderModel), AppError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| AppError::Internal(format!("pool error: {e}")))?;

        let binding = schema::tenant_llm_bindings::table
            .filter(schema::tenant_llm_bindings::tenant_id.eq(tenant_id))
            .select(models::TenantLlmBinding::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::Internal(format!("store error: {e}")))?
            .ok_or(AppError::ConfigMissing)?;

        let model = schema::llm_provider_models::table
            .filter(schema::llm_provider_models::id.eq(&binding.llm_model_id))
            .select(models::LlmProviderModel::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::Internal(format!("store error: {e}")))?
            .ok_or(AppError::ConfigMissing)?;

        Ok((binding, model))
    }
}
