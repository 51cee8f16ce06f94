//! Ledger record identifiers. All are v4 UUIDs generated on insert.

use uuid::Uuid;

use crate::error::WalletError;

pub type UserId = Uuid;
pub type BankId = Uuid;
pub type BankAccountId = Uuid;
pub type TransactionId = Uuid;
pub type BillId = Uuid;
pub type LoadId = Uuid;
pub type AutopaymentId = Uuid;

/// Parses a path or body id; a malformed one is a 400, not a 404.
pub fn parse_uuid(id: &str, name: &str) -> Result<Uuid, WalletError> {
    Uuid::parse_str(id.trim()).map_err(|e| WalletError::Validation(format!("Invalid {}: {}", name, e)))
}
