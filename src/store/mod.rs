//! Persistence for every ledger record, behind one async trait so the
//! server can run on Postgres and tests on the in-process store.
//!
//! Balance changes never go through ad-hoc setters: they are expressed as
//! [`LedgerWrite`]s and applied either one at a time ([`LedgerStore::apply`])
//! or all-or-nothing ([`LedgerStore::apply_batch`]).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::error::WalletResult;
use crate::models::{
    Autopayment, AutopaymentId, Bank, BankAccount, BankAccountId, BankId, Bill, BillId, Load,
    Transaction, TransactionId, TransactionStatus, User, UserId,
};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

pub type DynStore = Arc<dyn LedgerStore>;

/// One write produced by a balance mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerWrite {
    InsertTransaction(Transaction),
    SetTransactionStatus {
        id: TransactionId,
        status: TransactionStatus,
        at: DateTime<Utc>,
    },
    InsertBill(Bill),
    MarkBillPaid {
        id: BillId,
        paid_at: DateTime<Utc>,
    },
    InsertLoad(Load),
    SetWalletBalance {
        user_id: UserId,
        balance: Decimal,
        at: DateTime<Utc>,
    },
    SetBankAccountBalance {
        account_id: BankAccountId,
        balance: Decimal,
        at: DateTime<Utc>,
    },
    RescheduleAutopayment {
        id: AutopaymentId,
        next_run: DateTime<Utc>,
        at: DateTime<Utc>,
    },
}

impl LedgerWrite {
    pub fn label(&self) -> &'static str {
        match self {
            LedgerWrite::InsertTransaction(_) => "insert_transaction",
            LedgerWrite::SetTransactionStatus { .. } => "set_transaction_status",
            LedgerWrite::InsertBill(_) => "insert_bill",
            LedgerWrite::MarkBillPaid { .. } => "mark_bill_paid",
            LedgerWrite::InsertLoad(_) => "insert_load",
            LedgerWrite::SetWalletBalance { .. } => "set_wallet_balance",
            LedgerWrite::SetBankAccountBalance { .. } => "set_bank_account_balance",
            LedgerWrite::RescheduleAutopayment { .. } => "reschedule_autopayment",
        }
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    // Users
    async fn insert_user(&self, user: &User) -> WalletResult<()>;
    async fn get_user(&self, id: UserId) -> WalletResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> WalletResult<Option<User>>;
    async fn find_user_by_phone(&self, phone: &str) -> WalletResult<Option<User>>;
    async fn find_user_by_cnic(&self, cnic: &str) -> WalletResult<Option<User>>;
    async fn list_users(&self) -> WalletResult<Vec<User>>;
    /// Persists name, email, phone and picture. Balance is left alone.
    async fn update_profile(&self, user: &User) -> WalletResult<()>;

    // Bank catalog
    async fn count_banks(&self) -> WalletResult<i64>;
    async fn insert_banks(&self, banks: &[Bank]) -> WalletResult<()>;
    async fn get_bank(&self, id: BankId) -> WalletResult<Option<Bank>>;
    /// Active banks ordered by name.
    async fn list_active_banks(&self) -> WalletResult<Vec<Bank>>;

    // Bank accounts
    async fn insert_bank_account(&self, account: &BankAccount) -> WalletResult<()>;
    async fn get_bank_account(&self, id: BankAccountId) -> WalletResult<Option<BankAccount>>;
    /// Persists title, number, IBAN, default and active flags. Balance is left alone.
    async fn update_bank_account(&self, account: &BankAccount) -> WalletResult<()>;
    async fn clear_default_bank_accounts(&self, user_id: UserId) -> WalletResult<()>;
    async fn count_default_bank_accounts(&self, user_id: UserId) -> WalletResult<i64>;
    /// Default account first, then newest first.
    async fn list_bank_accounts(
        &self,
        user_id: UserId,
        active_only: bool,
    ) -> WalletResult<Vec<BankAccount>>;
    async fn find_active_bank_account_by_number(
        &self,
        identifier: &str,
    ) -> WalletResult<Option<BankAccount>>;
    /// The owner's active account at `bank_id`, preferring the default one.
    async fn find_active_bank_account_for_bank(
        &self,
        user_id: UserId,
        bank_id: BankId,
    ) -> WalletResult<Option<BankAccount>>;

    // Ledger records
    async fn get_transaction(&self, id: TransactionId) -> WalletResult<Option<Transaction>>;
    async fn list_transactions_by_sender(&self, user_id: UserId) -> WalletResult<Vec<Transaction>>;
    async fn get_bill(&self, id: BillId) -> WalletResult<Option<Bill>>;
    /// Newest first.
    async fn list_bills(&self, user_id: UserId) -> WalletResult<Vec<Bill>>;
    async fn list_loads(&self, user_id: UserId) -> WalletResult<Vec<Load>>;

    // Autopayments
    async fn insert_autopayment(&self, autopayment: &Autopayment) -> WalletResult<()>;
    async fn get_autopayment(&self, id: AutopaymentId) -> WalletResult<Option<Autopayment>>;
    /// Newest first.
    async fn list_autopayments(&self, user_id: UserId) -> WalletResult<Vec<Autopayment>>;
    /// Active autopayments with `next_run <= now`.
    async fn due_autopayments(&self, now: DateTime<Utc>) -> WalletResult<Vec<Autopayment>>;

    /// Applies a single write as its own persistence call.
    async fn apply(&self, write: &LedgerWrite) -> WalletResult<()>;
    /// Applies every write or none of them.
    async fn apply_batch(&self, writes: &[LedgerWrite]) -> WalletResult<()>;
}
