use crate::engine::LimitBreach;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the deal engine. Every variant carries a stable kind
/// string on the wire; multi-step mutations roll back entirely, so no error
/// ever leaves partial state visible.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Limit exceeded: {}", .0.reason)]
    LimitExceeded(Box<LimitBreach>),
    #[error("Permission denied: {0}")]
    Permission(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Deal number generation exhausted after {attempts} attempts")]
    NumberGenerationExhausted { attempts: u32 },
    #[error("Ledger imbalance for deal {deal_number}: debits {debits} != credits {credits}")]
    LedgerImbalance {
        deal_number: String,
        debits: String,
        credits: String,
    },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind tag.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Validation(_) => "validation",
            AppError::LimitExceeded(_) => "limit_exceeded",
            AppError::Permission(_) => "permission",
            AppError::NotFound(_) => "not_found",
            AppError::NumberGenerationExhausted { .. } => "number_generation_exhausted",
            AppError::LedgerImbalance { .. } => "ledger_imbalance",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Config(_) | AppError::Internal(_) | AppError::LedgerImbalance { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::LimitExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Permission(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NumberGenerationExhausted { .. } | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
        };

        let body = match &self {
            AppError::LimitExceeded(breach) => Json(json!({
                "kind": self.kind(),
                "error": self.to_string(),
                "limit": breach,
            })),
            _ => Json(json!({
                "kind": self.kind(),
                "error": self.to_string(),
            })),
        };

        (status, body).into_response()
    }
}
