//! Ledger records and the closed tag sets they use. Money is `rust_decimal::Decimal`,
//! timestamps are `DateTime<Utc>`.

pub mod autopayment;
pub mod bank;
pub mod bill;
pub mod ids;
pub mod load;
pub mod transaction;
pub mod user;

pub use autopayment::{Autopayment, AutopaymentTarget, AutopaymentType, Schedule};
pub use bank::{Bank, BankAccount, BankAccountDetails, BankSummary, PAKISTANI_BANKS};
pub use bill::{Bill, BillCategory, BillStatus};
pub use ids::{AutopaymentId, BankAccountId, BankId, BillId, LoadId, TransactionId, UserId};
pub use load::{Load, LoadStatus, LoadType, Operator};
pub use transaction::{ReceiverType, Transaction, TransactionStatus};
pub use user::User;

use crate::error::WalletError;

/// Error for a string that is not one of a closed set of tags.
pub(crate) fn invalid_tag(kind: &str, value: &str, allowed: &[&str]) -> WalletError {
    WalletError::Validation(format!(
        "Invalid {} '{}': must be one of {}",
        kind,
        value,
        allowed.join(", ")
    ))
}
