use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    Extension,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{body, ok, ApiResponse, ApiResult};
use crate::error::WalletError;
use crate::middleware::AuthUser;
use crate::models::{BankAccountDetails, ReceiverType, Transaction};
use crate::services::mutation::{LedgerRecord, MutationRequest, TransferRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferBody {
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub receiver_identifier: String,
    /// Sender's bank account id, or a bank code/name.
    #[serde(default)]
    pub bank_account_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_bank_account: Option<BankAccountDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_bank_account: Option<BankAccountDetails>,
}

async fn transfer_as(
    state: AppState,
    auth: AuthUser,
    receiver_type: ReceiverType,
    payload: Result<Json<TransferBody>, JsonRejection>,
) -> ApiResult<TransferResponse> {
    let req = body(payload)?;
    let outcome = state
        .mutation
        .attempt_mutation(MutationRequest::Transfer(TransferRequest {
            sender_id: auth.user_id,
            receiver_type,
            receiver_identifier: req.receiver_identifier,
            amount: req.amount,
            sender_bank_account: req.bank_account_id,
        }))
        .await?;

    let LedgerRecord::Transaction(transaction) = outcome.record else {
        return Err(WalletError::Persistence(
            "transfer produced a non-transaction record".to_string(),
        ));
    };

    let sender_bank_account = match outcome.sender_bank_account {
        Some(account) => state.accounts.with_bank_details(vec![account]).await?.pop(),
        None => None,
    };
    let receiver_bank_account = match outcome.receiver_bank_account {
        Some(account) => state.accounts.with_bank_details(vec![account]).await?.pop(),
        None => None,
    };

    ok(ApiResponse::data(TransferResponse {
        transaction,
        sender_bank_account,
        receiver_bank_account,
    })
    .with_message("Transfer completed successfully"))
}

pub async fn transfer_to_jazzcash(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<TransferBody>, JsonRejection>,
) -> ApiResult<TransferResponse> {
    transfer_as(state, auth, ReceiverType::JazzCash, payload).await
}

pub async fn transfer_to_bank(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<TransferBody>, JsonRejection>,
) -> ApiResult<TransferResponse> {
    transfer_as(state, auth, ReceiverType::Bank, payload).await
}

pub async fn transfer_to_cnic(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<TransferBody>, JsonRejection>,
) -> ApiResult<TransferResponse> {
    transfer_as(state, auth, ReceiverType::Cnic, payload).await
}

pub async fn transfer_to_other_wallet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<TransferBody>, JsonRejection>,
) -> ApiResult<TransferResponse> {
    transfer_as(state, auth, ReceiverType::OtherWallet, payload).await
}
