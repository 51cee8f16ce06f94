use axum::{extract::{rejection::JsonRejection, State}, response::Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{body, created, ok, ApiResponse, ApiResult};
use crate::error::WalletError;
use crate::middleware::auth::Claims;
use crate::models::{BankAccountDetails, User};
use crate::services::accounts::{BankAccountInput, Registration};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountPayload {
    #[serde(default)]
    pub bank_id: String,
    #[serde(default)]
    pub account_title: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub iban: Option<String>,
}

impl From<BankAccountPayload> for BankAccountInput {
    fn from(payload: BankAccountPayload) -> Self {
        Self {
            bank: payload.bank_id,
            account_title: payload.account_title,
            account_number: payload.account_number,
            iban: payload.iban,
        }
    }
}

/// Bank accounts arrive either as a JSON array or as a JSON-encoded string
/// (form clients send the latter).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BankAccountsPayload {
    List(Vec<BankAccountPayload>),
    Encoded(String),
}

impl BankAccountsPayload {
    fn into_inputs(self) -> Result<Vec<BankAccountInput>, WalletError> {
        let payloads = match self {
            BankAccountsPayload::List(list) => list,
            BankAccountsPayload::Encoded(raw) if raw.trim().is_empty() => Vec::new(),
            BankAccountsPayload::Encoded(raw) => serde_json::from_str(raw.trim()).map_err(|e| {
                WalletError::Validation(format!(
                    "Invalid bankAccounts format. Must be a valid JSON array. ({})",
                    e
                ))
            })?,
        };
        Ok(payloads.into_iter().map(BankAccountInput::from).collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub cnic: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub bank_accounts: Option<BankAccountsPayload>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: User,
    pub bank_accounts: Vec<BankAccountDetails>,
    pub token: String,
}

pub fn generate_jwt_token(
    user_id: &Uuid,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, WalletError> {
    let exp = (Utc::now() + Duration::seconds(expiration_secs as i64)).timestamp() as usize;
    let claims = Claims {
        user_id: user_id.to_string(),
        exp,
    };

    let header = Header::new(Algorithm::HS256);
    let encoding_key = EncodingKey::from_secret(secret.as_ref());
    encode(&header, &claims, &encoding_key)
        .map_err(|e| WalletError::Persistence(format!("token encoding failed: {}", e)))
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let req = body(payload)?;
    let bank_accounts = match req.bank_accounts {
        Some(accounts) => accounts.into_inputs()?,
        None => Vec::new(),
    };

    let (user, bank_accounts) = state
        .accounts
        .register(Registration {
            name: req.name,
            email: req.email,
            password: req.password,
            phone: req.phone,
            cnic: req.cnic,
            picture: req.picture,
            bank_accounts,
        })
        .await?;

    let token = generate_jwt_token(&user.id, &state.config.jwt_secret, state.config.jwt_expiration)?;
    created(ApiResponse::data(AuthResponse {
        user,
        bank_accounts,
        token,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let req = body(payload)?;
    if req.email.trim().is_empty() {
        return Err(WalletError::Validation("Please provide a valid email".to_string()));
    }
    if req.password.is_empty() {
        return Err(WalletError::Validation("Password is required".to_string()));
    }

    let user = state.accounts.login(&req.email, &req.password).await?;
    let bank_accounts = state.accounts.active_bank_accounts(user.id).await?;
    let token = generate_jwt_token(&user.id, &state.config.jwt_secret, state.config.jwt_expiration)?;

    tracing::info!("User {} logged in", user.id);
    ok(ApiResponse::data(AuthResponse {
        user,
        bank_accounts,
        token,
    }))
}
