//! Config loading: TOML file, falling back to defaults, then environment
//! overrides. Grounded on `config/loader.rs`'s `load_config` /
//! `apply_env_overrides` split.

use std::path::Path;

use super::schema::AppConfig;

/// Load config from `path`, falling back to `AppConfig::default()` if the
/// file does not exist. Parse errors are propagated.
pub fn load_config(path: &Path) -> Result<AppConfig, String> {
    let config = match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).map_err(|e| format!("invalid config TOML: {e}"))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(e) => return Err(format!("failed to read config file: {e}")),
    };
    Ok(apply_env_overrides(config))
}

/// Load from `SWITCHBOARD_CONFIG` if set, else `./switchboard.toml`, then
/// apply environment overrides.
pub fn load_default_config() -> Result<AppConfig, String> {
    let path = std::env::var("SWITCHBOARD_CONFIG").unwrap_or_else(|_| "switchboard.toml".to_string());
    load_config(Path::new(&path))
}

fn apply_env_overrides(mut config: AppConfig) -> AppConfig {
    if let Ok(v) = std::env::var("DatabaseURL") {
        config.store.database_url = v;
    }
    if let Ok(v) = std::env::var("CacheURL") {
        config.store.cache_url = Some(v);
    }
    if let Ok(v) = std::env::var("EncryptionKey") {
        config.security.encryption_key = Some(v);
    }
    if let Ok(v) = std::env::var("JWTPublicKey") {
        config.security.jwt_public_key = Some(v);
    }
    if let Ok(v) = std::env::var("DisableAuth") {
        config.security.disable_auth = v == "true" || v == "1";
    }
    if let Ok(v) = std::env::var("TestBearerToken") {
        config.security.test_bearer_token = v;
    }
    if let Ok(v) = std::env::var("MaxRounds") {
        if let Ok(n) = v.parse() {
            config.limits.max_rounds = n;
        }
    }
    if let Ok(v) = std::env::var("MaxHistoryMessages") {
        if let Ok(n) = v.parse() {
            config.limits.max_history_messages = n;
        }
    }
    if let Ok(v) = std::env::var("ToolPriorityLimit") {
        if let Ok(n) = v.parse() {
            config.limits.tool_priority_limit = n;
        }
    }
    if let Ok(v) = std::env::var("ListenAddr") {
        config.http.listen_addr = v;
    }
    if let Ok(v) = std::env::var("RagEndpoint") {
        config.tools.rag_endpoint = v;
    }
    config
}
