use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
    Extension,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{body, created, ok, ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{ids::parse_uuid, Autopayment};
use crate::services::accounts::ensure_owner;
use crate::services::autopayment::AutopaymentDraft;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAutopaymentBody {
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub schedule: String,
    pub bill_id: Option<String>,
    pub receiver_id: Option<String>,
    pub receiver_type: Option<String>,
    pub mobile_number: Option<String>,
    pub operator: Option<String>,
    pub package_name: Option<String>,
}

pub async fn create_autopayment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<CreateAutopaymentBody>, JsonRejection>,
) -> ApiResult<Autopayment> {
    let req = body(payload)?;
    let bill_id = req
        .bill_id
        .as_deref()
        .map(|id| parse_uuid(id, "bill ID"))
        .transpose()?;
    let receiver_id = req
        .receiver_id
        .as_deref()
        .map(|id| parse_uuid(id, "receiver ID"))
        .transpose()?;

    let draft = AutopaymentDraft {
        amount: req.amount,
        kind: req.kind,
        schedule: req.schedule,
        bill_id,
        receiver_id,
        receiver_type: req.receiver_type,
        mobile_number: req.mobile_number,
        operator: req.operator,
        package_name: req.package_name,
    };
    let autopayment = state.autopayments.create(auth.user_id, &draft).await?;
    created(ApiResponse::data(autopayment).with_message("Autopayment created successfully"))
}

pub async fn get_user_autopayments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<Autopayment>> {
    let user_id = parse_uuid(&user_id, "user ID")?;
    ensure_owner(auth.user_id, user_id, "view these autopayments")?;
    let autopayments = state.autopayments.list(user_id).await?;
    ok(ApiResponse::list(autopayments))
}
