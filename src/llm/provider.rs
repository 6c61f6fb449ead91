//! The `ChatClient` abstraction and its OpenAI-compatible HTTP
//! implementation. Grounded on `ai/provider.rs`'s `LLMProvider` trait.

use async_trait::async_trait;
use std::time::Duration;

use super::types::{CompletionRequest, CompletionResponse, ProposedToolCall};
use crate::error::AppError;

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AppError>;

    fn model_tag(&self) -> &str;
}

/// Which wire dialect to speak. All four provider tags in spec.md §4.1 are
/// reached through one HTTP shape (an OpenAI-compatible `/chat/completions`
/// surface or a thin variant); only the base URL and auth header differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderTag {
    OpenAiCompatible,
    Anthropic,
    Gemini,
    OpenRouter,
}

impl ProviderTag {
    pub fn parse(tag: &str) -> Result<Self, AppError> {
        match tag {
            "openai" | "openai-compatible" => Ok(Self::OpenAiCompatible),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            "openrouter" => Ok(Self::OpenRouter),
            other => Err(AppError::ProviderUnknown(other.to_string())),
        }
    }

    fn base_url(&self) -> &'static str {
        match self {
            ProviderTag::OpenAiCompatible => "https://api.openai.com/v1/chat/completions",
            ProviderTag::Anthropic => "https://api.anthropic.com/v1/messages",
            ProviderTag::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
            ProviderTag::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
        }
    }
}

/// A live provider client bound to one tenant's decrypted API key.
///
/// The plaintext key lives only in this struct's `api_key` field and is
/// never placed in logs, errors, metrics, or responses (spec.md §4.1).
pub struct HttpChatClient {
    http: reqwest::Client,
    tag: ProviderTag,
    api_key: String,
    model: String,
    base_url_override: Option<String>,
}

impl HttpChatClient {
    pub fn new(
        tag: ProviderTag,
        api_key: String,
        model: String,
        request_timeout: Duration,
        base_url_override: Option<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, tag, api_key, model, base_url_override }
    }

    fn base_url(&self) -> &str {
        self.base_url_override.as_deref().unwrap_or_else(|| self.tag.base_url())
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AppError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": request.messages.iter().map(|m| serde_json::json!({
                "role": match m.role {
                    super::types::MessageRole::System => "system",
                    super::types::MessageRole::User => "user",
                    super::types::MessageRole::Assistant => "assistant",
                    super::types::MessageRole::Tool => "tool",
                },
                "content": m.content,
            })).collect::<Vec<_>>(),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "tools": request.tools.iter().map(|t| serde_json::json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
            })).collect::<Vec<_>>(),
        });

        let response = self
            .http
            .post(self.base_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LlmTransportError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::LlmAuthError);
        }
        if !response.status().is_success() {
            return Err(AppError::LlmTransportError(format!(
                "provider returned status {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::LlmTransportError(e.to_string()))?;

        parse_openai_like_response(&payload, &self.model)
    }

    fn model_tag(&self) -> &str {
        &self.model
    }
}

fn parse_openai_like_response(
    payload: &serde_json::Value,
    model: &str,
) -> Result<CompletionResponse, AppError> {
    let message = payload
        .pointer("/choices/0/message")
        .ok_or_else(|| AppError::LlmTransportError("malformed provider response".to_string()))?;

    let content = message.get("content").and_then(|v| v.as_str()).unwrap_or("").to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(|v| v.as_array())
        .map(|calls| {
            calls
                .iter()
                .filter_map(|c| {
                    let call_id = c.get("id")?.as_str()?.to_string();
                    let name = c.pointer("/function/name")?.as_str()?.to_string();
                    let args_str = c.pointer("/function/arguments")?.as_str()?;
                    let arguments = serde_json::from_str(args_str).unwrap_or(serde_json::Value::Null);
                    Some(ProposedToolCall { call_id, name, arguments })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(CompletionResponse { content, tool_calls, model: model.to_string() })
}
