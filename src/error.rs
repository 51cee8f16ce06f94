use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Every failure a wallet operation can report.
///
/// `Validation`, `NotFound` and `InsufficientFunds` are expected business
/// outcomes. `Persistence` is opaque to the caller; any writes that were
/// already applied before it was raised stay applied.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Insufficient balance")]
    InsufficientFunds,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type WalletResult<T> = Result<T, WalletError>;

impl WalletError {
    /// Stable machine-checkable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::Validation(_) => "VALIDATION_ERROR",
            WalletError::NotFound(_) => "NOT_FOUND",
            WalletError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            WalletError::Unauthorized(_) => "UNAUTHORIZED",
            WalletError::Unauthenticated(_) => "UNAUTHENTICATED",
            WalletError::Conflict(_) => "CONFLICT",
            WalletError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WalletError::Validation(_)
            | WalletError::InsufficientFunds
            | WalletError::Conflict(_) => StatusCode::BAD_REQUEST,
            WalletError::NotFound(_) => StatusCode::NOT_FOUND,
            WalletError::Unauthorized(_) => StatusCode::FORBIDDEN,
            WalletError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            WalletError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: &str) -> Self {
        WalletError::NotFound(format!("{} not found", what))
    }
}

impl From<sqlx::Error> for WalletError {
    fn from(e: sqlx::Error) -> Self {
        WalletError::Persistence(e.to_string())
    }
}

impl From<bcrypt::BcryptError> for WalletError {
    fn from(e: bcrypt::BcryptError) -> Self {
        WalletError::Persistence(format!("password hashing failed: {}", e))
    }
}

impl IntoResponse for WalletError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Storage details stay in the logs.
            WalletError::Persistence(detail) => {
                tracing::error!("Persistence failure: {}", detail);
                "Server error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "success": false,
            "code": self.code(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}
