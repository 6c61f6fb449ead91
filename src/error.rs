//! Central error taxonomy (spec.md §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("tenant not found")]
    TenantUnknown,
    #[error("tenant is inactive")]
    TenantInactive,
    #[error("missing or invalid bearer token")]
    Unauthorized,
    #[error("session does not belong to tenant")]
    TenantMismatch,
    #[error("session is busy")]
    SessionBusy,
    #[error("no LLM binding configured for tenant")]
    ConfigMissing,
    #[error("failed to decrypt stored API key")]
    ConfigDecryptFailure,
    #[error("unrecognized LLM provider tag: {0}")]
    ProviderUnknown(String),
    #[error("LLM transport error: {0}")]
    LlmTransportError(String),
    #[error("LLM authentication error")]
    LlmAuthError,
    #[error("store error: {0}")]
    StoreError(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::TenantUnknown => "tenant_unknown",
            AppError::TenantInactive => "tenant_inactive",
            AppError::Unauthorized => "unauthorized",
            AppError::TenantMismatch => "tenant_mismatch",
            AppError::SessionBusy => "session_busy",
            AppError::ConfigMissing => "config_missing",
            AppError::ConfigDecryptFailure => "config_decrypt_failure",
            AppError::ProviderUnknown(_) => "provider_unknown",
            AppError::LlmTransportError(_) => "llm_transport_error",
            AppError::LlmAuthError => "llm_auth_error",
            AppError::StoreError(_) => "store_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::TenantUnknown => StatusCode::NOT_FOUND,
            AppError::TenantInactive => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::TenantMismatch => StatusCode::FORBIDDEN,
            AppError::SessionBusy => StatusCode::CONFLICT,
            AppError::ConfigMissing | AppError::ConfigDecryptFailure | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ProviderUnknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::LlmTransportError(_) => StatusCode::BAD_GATEWAY,
            AppError::LlmAuthError => StatusCode::UNAUTHORIZED,
            AppError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "status": "error",
            "code": self.error_code(),
        }));
        (status, body).into_response()
    }
}
