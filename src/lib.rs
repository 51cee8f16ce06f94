// Library root - the server binary, the autopayment CLI and the tests all build on it.

pub mod background;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

pub use config::{Config, LedgerMode, StorageBackend};
pub use error::{WalletError, WalletResult};

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use services::{AccountService, AutopaymentEngine, MutationEngine};
use store::{DynStore, InMemoryStore, PgStore};

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: Arc<Config>,
    pub mutation: MutationEngine,
    pub autopayments: AutopaymentEngine,
    pub accounts: AccountService,
}

impl AppState {
    pub fn new(store: DynStore, config: Arc<Config>) -> Self {
        let mutation = MutationEngine::new(store.clone(), config.ledger_mode);
        Self {
            autopayments: AutopaymentEngine::new(store.clone(), mutation.clone()),
            accounts: AccountService::new(store.clone(), config.clone()),
            mutation,
            store,
            config,
        }
    }
}

/// Opens the configured backend. Postgres pools are migrated before use.
pub async fn open_store(config: &Config) -> anyhow::Result<DynStore> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = database::new_pool(&config.database_url).await?;
            tracing::info!("Database connection pool created");
            database::run_migrations(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; nothing survives a restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/users/all", get(handlers::users::get_all_users))
        .route("/api/users/me", get(handlers::users::get_current_user))
        .route("/api/users/:id", put(handlers::users::update_profile))
        .route("/api/users/:id/balance", get(handlers::users::get_balance))
        .route("/api/transfer/jazzcash", post(handlers::transfers::transfer_to_jazzcash))
        .route("/api/transfer/bank", post(handlers::transfers::transfer_to_bank))
        .route("/api/transfer/cnic", post(handlers::transfers::transfer_to_cnic))
        .route("/api/transfer/otherwallet", post(handlers::transfers::transfer_to_other_wallet))
        .route("/api/bills/pay", post(handlers::bills::pay_bill))
        .route("/api/bills/:user_id", get(handlers::bills::get_user_bills))
        .route("/api/load/prepaid", post(handlers::loads::prepaid_load))
        .route("/api/load/postpaid", post(handlers::loads::postpaid_load))
        .route("/api/load/package", post(handlers::loads::package_load))
        .route("/api/autopayments/create", post(handlers::autopayments::create_autopayment))
        .route("/api/autopayments/:user_id", get(handlers::autopayments::get_user_autopayments))
        .route("/api/bank/banks", get(handlers::bank_accounts::get_banks))
        .route("/api/bank/accounts", post(handlers::bank_accounts::add_bank_account))
        // GET takes the owner's user id; PUT and DELETE take the account id.
        .route(
            "/api/bank/accounts/:id",
            get(handlers::bank_accounts::get_user_bank_accounts)
                .put(handlers::bank_accounts::update_bank_account)
                .delete(handlers::bank_accounts::delete_bank_account),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
