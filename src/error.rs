//! Unified error taxonomy for the API. Every failure surfaces as a
//! structured `{"detail": ...}` body with a human-readable message.

use actix_web::http::header::WWW_AUTHENTICATE;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A referenced entity is absent.
    #[error("{0}")]
    NotFound(String),
    /// A uniqueness constraint would be violated.
    #[error("{0}")]
    Conflict(String),
    /// Malformed request content (bad credentials, invalid reset token, ...).
    #[error("{0}")]
    BadRequest(String),
    /// Bearer token missing, invalid or expired.
    #[error("{0}")]
    Authentication(String),
    /// Valid identity, wrong role.
    #[error("{0}")]
    Authorization(String),
    #[error("erro de persistência: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// The 401 raised whenever a bearer token cannot be validated.
    pub fn credentials() -> Self {
        ApiError::Authentication(
            "Não foi possível validar as credenciais. Tente fazer login novamente.".to_string(),
        )
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) | ApiError::Authorization(_) => StatusCode::UNAUTHORIZED,
            ApiError::Persistence(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let detail = match self {
            // The storage error itself must not leak to the caller.
            ApiError::Persistence(err) => {
                error!("persistence failure: {err}");
                "Erro interno ao acessar o banco de dados.".to_string()
            }
            ApiError::Internal(message) => {
                error!("internal failure: {message}");
                "Erro interno do servidor.".to_string()
            }
            other => other.to_string(),
        };

        let mut response = HttpResponse::build(self.status_code());
        if matches!(self, ApiError::Authentication(_)) {
            response.insert_header((WWW_AUTHENTICATE, "Bearer"));
        }
        response.json(json!({ "detail": detail }))
    }
}
