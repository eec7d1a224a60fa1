use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("not logged in: {0}")]
    NotLogin(String),
    #[error("credential expired: {0}")]
    Expired(String),
    #[error("invalid credential: {0}")]
    Invalid(String),
    #[error("not authorized: {0}")]
    NotAuth(String),
    #[error("remote service unreachable: {0}")]
    Connect(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn not_login(message: impl Into<String>) -> Self {
        Self::NotLogin(message.into())
    }

    pub fn expired(message: impl Into<String>) -> Self {
        Self::Expired(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn not_auth(message: impl Into<String>) -> Self {
        Self::NotAuth(message.into())
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable wire code embedded in every rejection body.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::NotLogin(_) => "NOT_LOGIN",
            GatewayError::Expired(_) => "EXPIRED",
            GatewayError::Invalid(_) => "INVALID",
            GatewayError::NotAuth(_) => "NOT_AUTH",
            GatewayError::Connect(_) => "CONNECT",
            GatewayError::Configuration(_) => "CONFIGURATION",
            GatewayError::Internal(_) => "INTERNAL",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // Credential failures are 401, authorization failures 403. Remote
        // connectivity failures fail closed as 401.
        let status = match self {
            GatewayError::NotLogin(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Expired(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Invalid(_) => StatusCode::UNAUTHORIZED,
            GatewayError::NotAuth(_) => StatusCode::FORBIDDEN,
            GatewayError::Connect(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for GatewayError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}
