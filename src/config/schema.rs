//! Application configuration.
//!
//! Mirrors `~/.mesoclaw/config.toml`'s section-per-concern layout: each
//! substructure implements `Default` and every field is `#[serde(default)]`
//! so a partial or missing file still produces a usable config.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub security: SecurityConfig,
    pub limits: LimitsConfig,
    pub http: HttpConfig,
    pub tools: ToolsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            security: SecurityConfig::default(),
            limits: LimitsConfig::default(),
            http: HttpConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `DatabaseURL` — a SQLite file path or `:memory:`.
    pub database_url: String,
    /// `CacheURL` — reserved for a future out-of-process cache; unused by
    /// the in-process `PermissionCache` but kept so the env override and
    /// config shape match spec.md §6 verbatim.
    pub cache_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "switchboard.db".to_string(),
            cache_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// `EncryptionKey` — 32-byte symmetric key (hex or base64) for API-key
    /// ciphertext. No default: startup fails closed if unset in production,
    /// but tests may supply a fixed key.
    pub encryption_key: Option<String>,
    /// `JWTPublicKey` — out of core; kept as a pass-through hook.
    pub jwt_public_key: Option<String>,
    /// `DisableAuth` — enables `/test/chat` and bypasses bearer validation.
    pub disable_auth: bool,
    /// `TestBearerToken` — bearer forwarded to outbound tool calls when auth
    /// is disabled.
    pub test_bearer_token: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encryption_key: None,
            jwt_public_key: None,
            disable_auth: false,
            test_bearer_token: "test-token".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_rounds: u32,
    pub max_history_messages: usize,
    pub tool_priority_limit: usize,
    pub permission_cache_ttl_secs: u64,
    pub session_lock_timeout_ms: u64,
    pub default_tool_timeout_secs: u64,
    pub request_deadline_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_rounds: 4,
            max_history_messages: 50,
            tool_priority_limit: 5,
            permission_cache_ttl_secs: 3600,
            session_lock_timeout_ms: 5_000,
            default_tool_timeout_secs: 30,
            request_deadline_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// `ListenAddr` — bind address for the HTTP gateway.
    pub listen_addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Endpoint the `RAG` tool kind delegates to, per `{tenant_id, query_text,
    /// top_k}` (spec.md §4.2-ext, SPEC_FULL.md §4.2).
    pub rag_endpoint: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            rag_endpoint: "http://localhost:8090/internal/rag/query".to_string(),
        }
    }
}
