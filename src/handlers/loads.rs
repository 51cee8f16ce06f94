use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    Extension,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{body, ok, ApiResponse, ApiResult};
use crate::error::WalletError;
use crate::middleware::AuthUser;
use crate::models::{Load, LoadType, Operator};
use crate::services::mutation::{LedgerRecord, LoadPurchaseRequest, MutationRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBody {
    #[serde(default)]
    pub mobile_number: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub package_name: Option<String>,
}

async fn load_as(
    state: AppState,
    auth: AuthUser,
    load_type: LoadType,
    payload: Result<Json<LoadBody>, JsonRejection>,
) -> ApiResult<Load> {
    let req = body(payload)?;
    let operator: Operator = req.operator.trim().parse()?;

    let outcome = state
        .mutation
        .attempt_mutation(MutationRequest::PurchaseLoad(LoadPurchaseRequest {
            user_id: auth.user_id,
            load_type,
            mobile_number: req.mobile_number,
            operator,
            amount: req.amount,
            package_name: req.package_name,
        }))
        .await?;

    match outcome.record {
        LedgerRecord::Load(load) => {
            ok(ApiResponse::data(load).with_message("Load processed successfully"))
        }
        _ => Err(WalletError::Persistence(
            "load purchase produced a non-load record".to_string(),
        )),
    }
}

pub async fn prepaid_load(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<LoadBody>, JsonRejection>,
) -> ApiResult<Load> {
    load_as(state, auth, LoadType::Prepaid, payload).await
}

pub async fn postpaid_load(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<LoadBody>, JsonRejection>,
) -> ApiResult<Load> {
    load_as(state, auth, LoadType::Postpaid, payload).await
}

pub async fn package_load(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<LoadBody>, JsonRejection>,
) -> ApiResult<Load> {
    load_as(state, auth, LoadType::Package, payload).await
}
