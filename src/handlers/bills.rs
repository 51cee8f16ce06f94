use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
    Extension,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{body, ok, ApiResponse, ApiResult};
use crate::error::WalletError;
use crate::middleware::AuthUser;
use crate::models::{ids::parse_uuid, Bill, BillCategory};
use crate::services::accounts::ensure_owner;
use crate::services::mutation::{BillPaymentRequest, LedgerRecord, MutationRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayBillBody {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub consumer_number: String,
    #[serde(default)]
    pub amount: Decimal,
}

pub async fn pay_bill(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<PayBillBody>, JsonRejection>,
) -> ApiResult<Bill> {
    let req = body(payload)?;
    let category: BillCategory = req.category.trim().parse()?;

    let outcome = state
        .mutation
        .attempt_mutation(MutationRequest::PayBill(BillPaymentRequest {
            user_id: auth.user_id,
            category,
            company_name: req.company_name,
            consumer_number: req.consumer_number,
            amount: req.amount,
        }))
        .await?;

    match outcome.record {
        LedgerRecord::Bill(bill) => {
            ok(ApiResponse::data(bill).with_message("Bill paid successfully"))
        }
        _ => Err(WalletError::Persistence(
            "bill payment produced a non-bill record".to_string(),
        )),
    }
}

pub async fn get_user_bills(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<Bill>> {
    let user_id = parse_uuid(&user_id, "user ID")?;
    ensure_owner(auth.user_id, user_id, "view these bills")?;
    let bills = state.store.list_bills(user_id).await?;
    ok(ApiResponse::list(bills))
}
