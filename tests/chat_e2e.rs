//! End-to-end coverage of the HTTP surface (spec.md §8): a real axum router
//! backed by a real (temp-file) SQLite store, with the LLM provider's HTTP
//! transport pointed at an in-process mock server via
//! `LlmProviderModel::base_url_override` rather than a trait-level fake, so
//! the test exercises the exact wire path `HttpChatClient` uses in
//! production.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use diesel::prelude::*;
use serde_json::{json, Value};

use switchboard::agent::handler_registry::ExecutorDeps;
use switchboard::agent::HandlerRegistry;
use switchboard::cache::PermissionCache;
use switchboard::config::AppConfig;
use switchboard::db::{self, models, schema, DbPool};
use switchboard::http::{build_router, AppState};
use switchboard::llm::LLMClientManager;
use switchboard::memory::ConversationMemory;
use switchboard::orchestrator::ChatOrchestrator;
use switchboard::tools::ToolRegistry;

type Script = Arc<Mutex<VecDeque<Value>>>;

/// A canned `/chat/completions`-shaped response: `content` plus any
/// proposed tool calls (name, JSON arguments).
fn completion(content: &str, tool_calls: Vec<(&str, Value)>) -> Value {
    json!({
        "choices": [{
            "message": {
                "content": content,
                "tool_calls": tool_calls.into_iter().enumerate().map(|(i, (name, args))| json!({
                    "id": format!("call-{i}"),
                    "function": { "name": name, "arguments": args.to_string() },
                })).collect::<Vec<_>>(),
            }
        }]
    })
}

async fn mock_complete(State(script): State<Script>, Json(_body): Json<Value>) -> Json<Value> {
    let mut guard = script.lock().unwrap();
    let response = guard.pop_front().unwrap_or_else(|| completion("(mock script exhausted)", vec![]));
    Json(response)
}

/// Spawns `app` on a loopback port and returns its base URL. The listener
/// task runs for the lifetime of the test process; there is no explicit
/// shutdown since each test binds its own ephemeral port.
async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

struct TestApp {
    base_url: String,
    pool: DbPool,
    script: Script,
    /// Keeps the backing SQLite file alive for the test's duration.
    _db_dir: tempfile::TempDir,
}

/// Builds a full server (real router, real SQLite store, real
/// `ChatOrchestrator`) with one tenant (`tenant-1`) bound to one LLM model
/// whose `base_url_override` points at an in-process mock completions
/// endpoint. Callers seed agents/tools/grants on `pool` before driving
/// requests, and push scripted completions onto `script` in call order.
async fn build_app() -> TestApp {
    let db_dir = tempfile::tempdir().expect("tempdir");
    let db_path = db_dir.path().join("switchboard.db");
    let pool = db::init(db_path.to_str().expect("utf8 path")).expect("db init");

    let script: Script = Arc::new(Mutex::new(VecDeque::new()));
    let mock_router = Router::new().route("/v1/chat/completions", post(mock_complete)).with_state(script.clone());
    let mock_base = spawn(mock_router).await;

    {
        let mut conn = pool.get().expect("conn");

        diesel::insert_into(schema::tenants::table)
            .values(&models::Tenant { id: "tenant-1".to_string(), status: "active".to_string() })
            .execute(&mut conn)
            .expect("seed tenant");

        let (ciphertext, nonce) = switchboard::crypto::encrypt("test-encryption-secret", "sk-test-key").expect("encrypt");
        diesel::insert_into(schema::llm_provider_models::table)
            .values(&models::LlmProviderModel {
                id: "model-1".to_string(),
                provider_tag: "openai".to_string(),
                model_name: "gpt-test".to_string(),
                context_window: 8192,
                cost_per_input_token: 0.0,
                cost_per_output_token: 0.0,
                active: 1,
                base_url_override: Some(format!("{mock_base}/v1/chat/completions")),
            })
            .execute(&mut conn)
            .expect("seed model");

        diesel::insert_into(schema::tenant_llm_bindings::table)
            .values(&models::TenantLlmBinding {
                tenant_id: "tenant-1".to_string(),
                llm_model_id: "model-1".to_string(),
                api_key_ciphertext: ciphertext,
                api_key_nonce: nonce,
                rpm_hint: None,
                tpm_hint: None,
            })
            .execute(&mut conn)
            .expect("seed binding");
    }

    let mut config = AppConfig::default();
    config.security.encryption_key = Some("test-encryption-secret".to_string());
    config.security.disable_auth = true;
    let config = Arc::new(config);

    let llm_manager = Arc::new(LLMClientManager::new(pool.clone(), config.security.encryption_key.clone()));
    let tool_registry = Arc::new(ToolRegistry::new(pool.clone(), config.limits.tool_priority_limit, "http://unused.invalid/rag".to_string()));
    let memory = Arc::new(ConversationMemory::new(pool.clone()));
    let permission_cache = Arc::new(PermissionCache::new(config.limits.permission_cache_ttl_secs));
    let handler_registry = Arc::new(HandlerRegistry::new());
    let executor_deps = Arc::new(ExecutorDeps {
        llm_manager: llm_manager.clone(),
        tool_registry,
        memory: memory.clone(),
        permission_cache: permission_cache.clone(),
        config: config.clone(),
    });
    let orchestrator = Arc::new(ChatOrchestrator::new(
        pool.clone(),
        config.clone(),
        handler_registry,
        executor_deps,
        memory,
        llm_manager,
    ));

    let state = AppState { orchestrator, config, pool: pool.clone(), permission_cache };
    let base_url = spawn(build_router(state)).await;

    TestApp { base_url, pool, script, _db_dir: db_dir }
}

/// Seeds an agent with no tools, granted to `tenant-1`.
fn seed_toolless_agent(pool: &DbPool, agent_id: &str, name: &str) {
    let mut conn = pool.get().expect("conn");
    diesel::insert_into(schema::agent_specs::table)
        .values(&models::AgentSpec {
            id: agent_id.to_string(),
            name: name.to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            llm_model_id: "model-1".to_string(),
            handler_class: "generic".to_string(),
            active: 1,
        })
        .execute(&mut conn)
        .expect("seed agent");
    diesel::insert_into(schema::tenant_agent_grants::table)
        .values(&models::TenantAgentGrant {
            tenant_id: "tenant-1".to_string(),
            agent_id: agent_id.to_string(),
            enabled: 1,
        })
        .execute(&mut conn)
        .expect("seed grant");
}

fn push_script(script: &Script, responses: Vec<Value>) {
    let mut guard = script.lock().unwrap();
    guard.extend(responses);
}

fn chat_body(message: &str, user_id: &str, session_id: Option<&str>) -> Value {
    json!({ "message": message, "user_id": user_id, "session_id": session_id })
}

#[tokio::test]
async fn unknown_tenant_returns_404() {
    let app = build_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/ghost-tenant/test/chat", app.base_url))
        .json(&chat_body("hello", "user-1", None))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["code"], "tenant_unknown");
}

#[tokio::test]
async fn clear_routing_invokes_the_single_authorized_agent() {
    let app = build_app().await;
    seed_toolless_agent(&app.pool, "agent-billing", "AgentBilling");

    push_script(
        &app.script,
        vec![
            completion("AgentBilling", vec![]),
            completion("Your balance is $42.", vec![]),
        ],
    );

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/tenant-1/test/chat", app.base_url))
        .json(&chat_body("What do I owe?", "user-1", None))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["agent"], "AgentBilling");
    assert_eq!(body["response"], "Your balance is $42.");
    assert!(body["metadata"]["tool_calls"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn tool_without_a_tenant_grant_is_never_offered() {
    let app = build_app().await;
    seed_toolless_agent(&app.pool, "agent-lookup", "AgentLookup");

    {
        let mut conn = app.pool.get().expect("conn");
        diesel::insert_into(schema::tool_specs::table)
            .values(&models::ToolSpec {
                id: "tool-lookup".to_string(),
                name: "lookup".to_string(),
                base_kind: "HTTP_GET".to_string(),
                endpoint_template: Some("https://example.invalid/lookup/{id}".to_string()),
                static_headers: "{}".to_string(),
                timeout_secs: 10,
                input_schema: json!({"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]}).to_string(),
                output_format: "json".to_string(),
                active: 1,
            })
            .execute(&mut conn)
            .expect("seed tool");
        diesel::insert_into(schema::agent_tools::table)
            .values(&models::AgentTool { agent_id: "agent-lookup".to_string(), tool_id: "tool-lookup".to_string(), priority: 0 })
            .execute(&mut conn)
            .expect("seed agent_tool");
        // Deliberately no `tenant_tool_grants` row: the tool exists and is
        // attached to the agent, but this tenant was never granted it.
    }

    // Only two completions are scripted: classification, then the direct
    // answer. If the (ungranted) tool were mistakenly offered, the loop
    // would request a third completion and the handler would see the
    // script's exhausted-fallback content instead.
    push_script(
        &app.script,
        vec![
            completion("AgentLookup", vec![]),
            completion("I don't have that information right now.", vec![]),
        ],
    );

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/tenant-1/test/chat", app.base_url))
        .json(&chat_body("Look up account 42", "user-1", None))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["response"], "I don't have that information right now.");
    assert!(body["metadata"]["tool_calls"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn multi_intent_message_short_circuits_without_invoking_an_agent() {
    let app = build_app().await;
    seed_toolless_agent(&app.pool, "agent-billing", "AgentBilling");

    push_script(&app.script, vec![completion("MULTI_INTENT", vec![])]);

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/tenant-1/test/chat", app.base_url))
        .json(&chat_body("Pay my bill and also cancel my account", "user-1", None))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["intent"], "multi_intent");
    assert!(body["agent"].is_null());
    assert!(body["response"].as_str().unwrap().contains("one thing at a time"));
}

#[tokio::test]
async fn invalid_tool_arguments_surface_as_a_tool_error_not_a_request_failure() {
    let app = build_app().await;
    seed_toolless_agent(&app.pool, "agent-lookup", "AgentLookup");

    {
        let mut conn = app.pool.get().expect("conn");
        diesel::insert_into(schema::tool_specs::table)
            .values(&models::ToolSpec {
                id: "tool-lookup".to_string(),
                name: "lookup".to_string(),
                base_kind: "HTTP_GET".to_string(),
                endpoint_template: Some("https://example.invalid/lookup/{code}".to_string()),
                static_headers: "{}".to_string(),
                timeout_secs: 10,
                input_schema: json!({
                    "type": "object",
                    "properties": { "code": { "type": "string", "pattern": "^[0-9]{6}$" } },
                    "required": ["code"],
                }).to_string(),
                output_format: "json".to_string(),
                active: 1,
            })
            .execute(&mut conn)
            .expect("seed tool");
        diesel::insert_into(schema::agent_tools::table)
            .values(&models::AgentTool { agent_id: "agent-lookup".to_string(), tool_id: "tool-lookup".to_string(), priority: 0 })
            .execute(&mut conn)
            .expect("seed agent_tool");
        diesel::insert_into(schema::tenant_tool_grants::table)
            .values(&models::TenantToolGrant { tenant_id: "tenant-1".to_string(), tool_id: "tool-lookup".to_string(), enabled: 1 })
            .execute(&mut conn)
            .expect("seed grant");
    }

    push_script(
        &app.script,
        vec![
            completion("AgentLookup", vec![]),
            // Advisory entity extraction: the tool's schema has a required
            // field, so the executor asks the model for it before entering
            // the tool loop. Its output isn't asserted on here.
            completion("{}", vec![]),
            completion("", vec![("lookup", json!({"code": "not-numeric"}))]),
            completion("I couldn't validate that code, could you double check it?", vec![]),
        ],
    );

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/tenant-1/test/chat", app.base_url))
        .json(&chat_body("Look up code abc", "user-1", None))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["response"], "I couldn't validate that code, could you double check it?");
    assert_eq!(body["metadata"]["tool_calls"][0], "lookup");
}

#[tokio::test]
async fn conversation_memory_persists_across_turns_in_the_same_session() {
    let app = build_app().await;
    seed_toolless_agent(&app.pool, "agent-billing", "AgentBilling");

    push_script(
        &app.script,
        vec![
            completion("AgentBilling", vec![]),
            completion("Hi, how can I help?", vec![]),
            completion("AgentBilling", vec![]),
            completion("Your balance is still $42.", vec![]),
        ],
    );

    let client = reqwest::Client::new();

    let first = client
        .post(format!("{}/api/tenant-1/test/chat", app.base_url))
        .json(&chat_body("Hello", "user-1", None))
        .send()
        .await
        .expect("first request")
        .json::<Value>()
        .await
        .expect("first json");
    let session_id = first["session_id"].as_str().expect("session id").to_string();

    let second = client
        .post(format!("{}/api/tenant-1/test/chat", app.base_url))
        .json(&chat_body("What do I owe again?", "user-1", Some(&session_id)))
        .send()
        .await
        .expect("second request")
        .json::<Value>()
        .await
        .expect("second json");
    assert_eq!(second["session_id"], session_id);
    assert_eq!(second["response"], "Your balance is still $42.");

    let history = client
        .get(format!("{}/api/tenant-1/sessions/{session_id}", app.base_url))
        .header("Authorization", "Bearer test-token")
        .send()
        .await
        .expect("history request");
    assert_eq!(history.status(), reqwest::StatusCode::OK);
    let history_body: Value = history.json().await.expect("history json");
    let messages = history_body["messages"].as_array().expect("messages array");
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[2]["role"], "user");
    assert_eq!(messages[3]["role"], "assistant");
}
