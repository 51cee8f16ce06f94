use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WalletError;
use crate::AppState;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub exp: usize,
}

/// The caller behind a valid bearer token, attached to request extensions.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Routes reachable without a token.
const PUBLIC_PATHS: &[&str] = &[
    "/api/health",
    "/api/auth/register",
    "/api/auth/login",
    "/api/users/all",
    "/api/bank/banks",
];

fn declined(message: &str) -> Response {
    WalletError::Unauthenticated(message.to_string()).into_response()
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if PUBLIC_PATHS.contains(&path) {
        return next.run(req).await;
    }

    let token = match req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token.trim(),
        None => return declined("Not authorized, no token"),
    };

    let decoding_key = DecodingKey::from_secret(state.config.jwt_secret.as_ref());
    let validation = Validation::new(Algorithm::HS256);
    let claims = match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::warn!("Rejected token on {}: {}", path, e);
            return declined("Not authorized, token failed");
        }
    };

    let user_id = match Uuid::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return declined("Not authorized, token failed"),
    };

    // Tokens outlive deleted users in the store backends we run against.
    match state.store.get_user(user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return declined("Not authorized, user not found"),
        Err(e) => return e.into_response(),
    }

    req.extensions_mut().insert(AuthUser { user_id });
    next.run(req).await
}
