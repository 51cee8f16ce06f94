pub mod auth;
pub mod autopayments;
pub mod bank_accounts;
pub mod bills;
pub mod loads;
pub mod transfers;
pub mod users;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::Json,
};
use serde::Serialize;

use crate::error::WalletError;

/// Body of every successful response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            count: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn list(items: Vec<T>) -> Self {
        Self {
            success: true,
            message: None,
            count: Some(items.len()),
            data: Some(items),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            count: None,
            data: None,
        }
    }
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), WalletError>;

pub fn ok<T: Serialize>(response: ApiResponse<T>) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(response)))
}

pub fn created<T: Serialize>(response: ApiResponse<T>) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(response)))
}

/// Unwraps a JSON body, reporting malformed input as a validation failure.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, WalletError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| WalletError::Validation(format!("Validation failed: {}", rejection.body_text())))
}

pub async fn health_check() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("Server is running"))
}
