//! `ChatOrchestrator`: the per-request glue tying tenant resolution, session
//! management, routing, and message persistence together (spec.md §4.6).
//!
//! Grounded in overall shape on `gateway/daemon.rs`'s router composition and
//! `gateway/routes.rs`'s handler signatures, but fully implemented rather
//! than `TODO`-stubbed.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use diesel::prelude::*;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::agent::handler_registry::ExecutorDeps;
use crate::agent::{AgentContext, HandlerRegistry};
use crate::config::AppConfig;
use crate::db::{models, schema, DbPool};
use crate::error::AppError;
use crate::llm::LLMClientManager;
use crate::memory::ConversationMemory;
use crate::supervisor::{self, RouteOutcome, SupervisorRouter};

/// `{session_id, message_id, text, agent, intent, metadata}` (spec.md §4.6 step 7).
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub message_id: String,
    pub text: String,
    pub agent: Option<String>,
    pub intent: Option<String>,
    pub metadata: models::AssistantMetadata,
}

pub struct ChatOrchestrator {
    pool: DbPool,
    config: Arc<AppConfig>,
    supervisor: SupervisorRouter,
    handler_registry: Arc<HandlerRegistry>,
    executor_deps: Arc<ExecutorDeps>,
    memory: Arc<ConversationMemory>,
    llm_manager: Arc<LLMClientManager>,
    session_locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl ChatOrchestrator {
    pub fn new(
        pool: DbPool,
        config: Arc<AppConfig>,
        handler_registry: Arc<HandlerRegistry>,
        executor_deps: Arc<ExecutorDeps>,
        memory: Arc<ConversationMemory>,
        llm_manager: Arc<LLMClientManager>,
    ) -> Self {
        Self {
            supervisor: SupervisorRouter::new(pool.clone()),
            pool,
            config,
            handler_registry,
            executor_deps,
            memory,
            llm_manager,
            session_locks: DashMap::new(),
        }
    }

    /// Runs the full per-request contract (spec.md §4.6), bounded by the
    /// configured request deadline (spec.md §5 "Cancellation and timeouts").
    pub async fn dispatch(
        &self,
        tenant_id: &str,
        user_id: &str,
        session_id: Option<String>,
        message: &str,
        auth_header_token: Option<String>,
    ) -> Result<ChatResponse, AppError> {
        let deadline = Duration::from_secs(self.config.limits.request_deadline_secs);
        match tokio::time::timeout(
            deadline,
            self.dispatch_inner(tenant_id, user_id, session_id, message, auth_header_token),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::Internal("request deadline exceeded".to_string())),
        }
    }

    async fn dispatch_inner(
        &self,
        tenant_id: &str,
        user_id: &str,
        session_id: Option<String>,
        message: &str,
        auth_header_token: Option<String>,
    ) -> Result<ChatResponse, AppError> {
        self.verify_tenant_active(tenant_id)?;
        let bearer_token = self.resolve_bearer_token(auth_header_token)?;

        let session = self.resolve_session_and_persist_user_message(tenant_id, user_id, session_id, message)?;

        // Per-session serialization (spec.md §5 "Per-session serialization").
        let lock = self
            .session_locks
            .entry(session.id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let acquire_timeout = Duration::from_millis(self.config.limits.session_lock_timeout_ms);
        let _guard = tokio::time::timeout(acquire_timeout, lock.lock())
            .await
            .map_err(|_| AppError::SessionBusy)?;

        let history = self.memory.history(&session.id, self.config.limits.max_history_messages as i64, false);
        let language = supervisor::detect_language(message);
        let client = self.llm_manager.get_client(tenant_id).await?;

        let outcome = self.supervisor.route(tenant_id, client.as_ref(), history, message).await?;

        let (text, agent_name, intent, metadata) = match outcome {
            RouteOutcome::Agent(agent_spec) => {
                let ctx = AgentContext {
                    agent: &agent_spec,
                    tenant_id: tenant_id.to_string(),
                    session_id: session.id.clone(),
                    user_text: message.to_string(),
                    bearer_token,
                    language,
                };
                let strategy = self.handler_registry.resolve(&agent_spec.handler_class);
                let result = strategy.invoke(ctx, &self.executor_deps).await?;

                let metadata = models::AssistantMetadata {
                    agent: Some(agent_spec.name.clone()),
                    intent: None,
                    tool_calls: result.tool_calls_made,
                    extracted_entities: result.entities_extracted.into_iter().collect(),
                    llm_model: Some(result.llm_model),
                    duration_ms: Some(result.duration_ms),
                    overflow: result.overflow,
                };
                (result.text, Some(agent_spec.name), None, metadata)
            }
            RouteOutcome::MultiIntent => {
                let text = supervisor::multi_intent_message(&language);
                let metadata = models::AssistantMetadata {
                    intent: Some("multi_intent".to_string()),
                    ..Default::default()
                };
                (text, None, Some("multi_intent".to_string()), metadata)
            }
            RouteOutcome::Unclear => {
                let text = supervisor::unclear_message(&language);
                let metadata = models::AssistantMetadata {
                    intent: Some("unclear".to_string()),
                    ..Default::default()
                };
                (text, None, Some("unclear".to_string()), metadata)
            }
        };

        let metadata_json = serde_json::to_string(&metadata).unwrap_or_else(|_| "{}".to_string());
        let message_id = self.persist_message(&session.id, "assistant", &text, &metadata_json)?;

        Ok(ChatResponse {
            session_id: session.id,
            message_id,
            text,
            agent: agent_name,
            intent,
            metadata,
        })
    }

    fn verify_tenant_active(&self, tenant_id: &str) -> Result<(), AppError> {
        let mut conn = self.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;
        let tenant = schema::tenants::table
            .filter(schema::tenants::id.eq(tenant_id))
            .select(models::Tenant::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::StoreError(e.to_string()))?
            .ok_or(AppError::TenantUnknown)?;
        if !tenant.is_active() {
            return Err(AppError::TenantInactive);
        }
        Ok(())
    }

    /// Resolves the caller's bearer token: the request's own header, or the
    /// configured test token when auth is disabled (spec.md §4.6 step 2).
    fn resolve_bearer_token(&self, auth_header_token: Option<String>) -> Result<String, AppError> {
        if let Some(token) = auth_header_token {
            return Ok(token);
        }
        if self.config.security.disable_auth {
            return Ok(self.config.security.test_bearer_token.clone());
        }
        Err(AppError::Unauthorized)
    }

    /// Resolves or creates the session and persists the inbound user message,
    /// verifying tenant ownership when a session id was supplied (spec.md
    /// §4.6 steps 3-4). The acquire-or-create and the user-message insert run
    /// inside one transaction (spec.md §5 "Transactions"): a crash between
    /// the two would otherwise leave a session with no user message.
    fn resolve_session_and_persist_user_message(
        &self,
        tenant_id: &str,
        user_id: &str,
        session_id: Option<String>,
        message: &str,
    ) -> Result<models::Session, AppError> {
        let mut conn = self.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;

        conn.transaction(|conn| {
            let session = if let Some(id) = session_id {
                let existing = schema::sessions::table
                    .filter(schema::sessions::id.eq(&id))
                    .select(models::Session::as_select())
                    .first(conn)
                    .optional()?;

                match existing {
                    Some(session) if session.tenant_id == tenant_id => {
                        let now = chrono::Utc::now().to_rfc3339();
                        diesel::update(schema::sessions::table.filter(schema::sessions::id.eq(&session.id)))
                            .set(schema::sessions::last_activity_at.eq(&now))
                            .execute(conn)?;
                        Some(models::Session { last_activity_at: now, ..session })
                    }
                    Some(_) => return Err(diesel::result::Error::RollbackTransaction),
                    None => None,
                }
            } else {
                None
            };

            let session = match session {
                Some(session) => session,
                None => {
                    let now = chrono::Utc::now().to_rfc3339();
                    let new_id = Uuid::new_v4().to_string();
                    let new_session = models::Session {
                        thread_id: format!("tenant:{tenant_id}__user:{user_id}__session:{new_id}"),
                        id: new_id,
                        tenant_id: tenant_id.to_string(),
                        user_id: user_id.to_string(),
                        last_agent: None,
                        created_at: now.clone(),
                        last_activity_at: now,
                    };
                    diesel::insert_into(schema::sessions::table)
                        .values(&new_session)
                        .execute(conn)?;
                    new_session
                }
            };

            let user_message = models::Message {
                id: Uuid::new_v4().to_string(),
                session_id: session.id.clone(),
                role: "user".to_string(),
                text: message.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
                metadata: "{}".to_string(),
            };
            diesel::insert_into(schema::messages::table)
                .values(&user_message)
                .execute(conn)?;

            Ok(session)
        })
        .map_err(|e| match e {
            diesel::result::Error::RollbackTransaction => AppError::TenantMismatch,
            other => AppError::StoreError(other.to_string()),
        })
    }

    /// Inserts the assistant's reply (spec.md §4.6 step 6) as its own
    /// transaction, separate from the session-acquire + user-message
    /// transaction above (spec.md §5 "Transactions").
    fn persist_message(&self, session_id: &str, role: &str, text: &str, metadata_json: &str) -> Result<String, AppError> {
        let mut conn = self.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;
        let message = models::Message {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role: role.to_string(),
            text: text.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            metadata: metadata_json.to_string(),
        };
        diesel::insert_into(schema::messages::table)
            .values(&message)
            .execute(&mut conn)
            .map_err(|e| AppError::StoreError(e.to_string()))?;
        Ok(message.id)
    }
}

/// Paginated session summary for `GET /api/{tenant_id}/sessions` (spec.md §6).
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
    pub last_activity_at: String,
}

impl ChatOrchestrator {
    pub fn list_sessions(
        &self,
        tenant_id: &str,
        user_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SessionSummary>, i64), AppError> {
        let mut conn = self.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;

        let mut query = schema::sessions::table
            .filter(schema::sessions::tenant_id.eq(tenant_id))
            .into_boxed();
        if let Some(uid) = user_id {
            query = query.filter(schema::sessions::user_id.eq(uid));
        }

        let mut count_query = schema::sessions::table
            .filter(schema::sessions::tenant_id.eq(tenant_id))
            .into_boxed();
        if let Some(uid) = user_id {
            count_query = count_query.filter(schema::sessions::user_id.eq(uid));
        }
        let total: i64 = count_query.count().get_result(&mut conn).map_err(|e| AppError::StoreError(e.to_string()))?;

        let rows = query
            .order(schema::sessions::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(models::Session::as_select())
            .load::<models::Session>(&mut conn)
            .map_err(|e| AppError::StoreError(e.to_string()))?;

        let summaries = rows
            .into_iter()
            .map(|s| SessionSummary {
                id: s.id,
                user_id: s.user_id,
                created_at: s.created_at,
                last_activity_at: s.last_activity_at,
            })
            .collect();

        Ok((summaries, total))
    }

    pub fn get_session_with_messages(
        &self,
        tenant_id: &str,
        session_id: &str,
    ) -> Result<(models::Session, Vec<models::Message>), AppError> {
        let mut conn = self.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;

        let session = schema::sessions::table
            .filter(schema::sessions::id.eq(session_id))
            .select(models::Session::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::StoreError(e.to_string()))?
            .ok_or(AppError::TenantUnknown)?;

        if session.tenant_id != tenant_id {
            return Err(AppError::TenantMismatch);
        }

        let messages = schema::messages::table
            .filter(schema::messages::session_id.eq(session_id))
            .order(schema::messages::created_at.asc())
            .select(models::Message::as_select())
            .load::<models::Message>(&mut conn)
            .map_err(|e| AppError::StoreError(e.to_string()))?;

        Ok((session, messages))
    }
}

