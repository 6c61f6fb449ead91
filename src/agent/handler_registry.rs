//! Handler-class dispatch: a startup-registered whitelist mapping a string
//! tag to a concrete executor strategy (spec.md §4.4 step 1, §9 "Dynamic
//! class dispatch by string"). Unknown tags fall back to the generic
//! strategy with a warning — never a hard failure — keeping new agents
//! fully database-driven (spec.md §9 Open Question: whitelist, not
//! arbitrary module-tree lookup).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{AgentContext, AgentResult};
use crate::cache::PermissionCache;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::llm::LLMClientManager;
use crate::memory::ConversationMemory;
use crate::tools::ToolRegistry;

/// Shared, process-lifetime resources every executor strategy needs.
pub struct ExecutorDeps {
    pub llm_manager: Arc<LLMClientManager>,
    pub tool_registry: Arc<ToolRegistry>,
    pub memory: Arc<ConversationMemory>,
    pub permission_cache: Arc<PermissionCache>,
    pub config: Arc<AppConfig>,
}

#[async_trait]
pub trait ExecutorStrategy: Send + Sync {
    async fn invoke(&self, ctx: AgentContext<'_>, deps: &ExecutorDeps) -> Result<AgentResult, AppError>;
}

pub const GENERIC_HANDLER: &str = "generic";

pub struct HandlerRegistry {
    strategies: HashMap<String, Arc<dyn ExecutorStrategy>>,
    generic: Arc<dyn ExecutorStrategy>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
            generic: Arc::new(super::executor::DomainAgentExecutor),
        }
    }

    pub fn register(&mut self, handler_class: impl Into<String>, strategy: Arc<dyn ExecutorStrategy>) {
        self.strategies.insert(handler_class.into(), strategy);
    }

    pub fn resolve(&self, handler_class: &str) -> Arc<dyn ExecutorStrategy> {
        if handler_class.is_empty() || handler_class == GENERIC_HANDLER {
            return self.generic.clone();
        }
        match self.strategies.get(handler_class) {
            Some(strategy) => strategy.clone(),
            None => {
                tracing::warn!(handler_class, "unregistered handler_class; falling back to generic executor");
                self.generic.clone()
            }
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
