use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
    Extension,
};
use serde::Deserialize;

use super::{body, created, ok, ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{ids::parse_uuid, BankAccountDetails, BankSummary};
use crate::services::accounts::{BankAccountUpdate, NewBankAccount};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBankAccountBody {
    /// Bank id, code or name.
    #[serde(default)]
    pub bank_id: String,
    #[serde(default)]
    pub account_title: String,
    #[serde(default)]
    pub account_number: String,
    pub iban: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBankAccountBody {
    pub account_title: Option<String>,
    pub account_number: Option<String>,
    pub iban: Option<String>,
    pub is_default: Option<bool>,
}

pub async fn get_banks(State(state): State<AppState>) -> ApiResult<Vec<BankSummary>> {
    let banks = state.accounts.list_banks().await?;
    ok(ApiResponse::list(banks))
}

pub async fn add_bank_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<AddBankAccountBody>, JsonRejection>,
) -> ApiResult<BankAccountDetails> {
    let req = body(payload)?;
    let account = state
        .accounts
        .add_bank_account(
            auth.user_id,
            NewBankAccount {
                bank: req.bank_id,
                account_title: req.account_title,
                account_number: req.account_number,
                iban: req.iban,
                is_default: req.is_default,
            },
        )
        .await?;
    created(ApiResponse::data(account).with_message("Bank account added successfully"))
}

/// `GET /api/bank/accounts/:id`, where the id is the owner's user id.
pub async fn get_user_bank_accounts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<BankAccountDetails>> {
    let user_id = parse_uuid(&user_id, "user ID")?;
    let accounts = state.accounts.list_bank_accounts(auth.user_id, user_id).await?;
    ok(ApiResponse::list(accounts))
}

pub async fn update_bank_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBankAccountBody>, JsonRejection>,
) -> ApiResult<BankAccountDetails> {
    let account_id = parse_uuid(&id, "bank account ID")?;
    let req = body(payload)?;
    let account = state
        .accounts
        .update_bank_account(
            auth.user_id,
            account_id,
            BankAccountUpdate {
                account_title: req.account_title,
                account_number: req.account_number,
                iban: req.iban,
                is_default: req.is_default,
            },
        )
        .await?;
    ok(ApiResponse::data(account).with_message("Bank account updated successfully"))
}

pub async fn delete_bank_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let account_id = parse_uuid(&id, "bank account ID")?;
    state.accounts.delete_bank_account(auth.user_id, account_id).await?;
    ok(ApiResponse::message("Bank account deleted successfully"))
}
