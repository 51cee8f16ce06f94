use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
    Extension,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{body, ok, ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{ids::parse_uuid, BankAccountDetails, User, UserId};
use crate::services::accounts::ProfileUpdate;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    #[serde(flatten)]
    pub user: User,
    pub bank_accounts: Vec<BankAccountDetails>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub balance: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub picture: Option<String>,
}

pub async fn get_all_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let users = state.accounts.list_users().await?;
    ok(ApiResponse::list(users))
}

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<CurrentUserResponse> {
    let user = state.accounts.get_user(auth.user_id).await?;
    let bank_accounts = state.accounts.active_bank_accounts(user.id).await?;
    ok(ApiResponse::data(CurrentUserResponse { user, bank_accounts }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<User> {
    let user_id = parse_uuid(&id, "user ID")?;
    let req = body(payload)?;
    let user = state
        .accounts
        .update_profile(
            auth.user_id,
            user_id,
            ProfileUpdate {
                name: req.name,
                email: req.email,
                phone: req.phone,
                picture: req.picture,
            },
        )
        .await?;
    ok(ApiResponse::data(user))
}

pub async fn get_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<BalanceResponse> {
    let user_id = parse_uuid(&id, "user ID")?;
    let user = state.accounts.balance(auth.user_id, user_id).await?;
    ok(ApiResponse::data(BalanceResponse {
        user_id: user.id,
        name: user.name,
        email: user.email,
        balance: user.balance,
    }))
}
