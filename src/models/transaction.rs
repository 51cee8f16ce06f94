use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ids::{TransactionId, UserId};
use super::invalid_tag;
use crate::error::WalletError;

/// How the receiver of a transfer was addressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiverType {
    JazzCash,
    Bank,
    #[serde(rename = "CNIC")]
    Cnic,
    OtherWallet,
}

impl ReceiverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiverType::JazzCash => "JazzCash",
            ReceiverType::Bank => "Bank",
            ReceiverType::Cnic => "CNIC",
            ReceiverType::OtherWallet => "OtherWallet",
        }
    }
}

impl FromStr for ReceiverType {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JazzCash" => Ok(ReceiverType::JazzCash),
            "Bank" => Ok(ReceiverType::Bank),
            "CNIC" => Ok(ReceiverType::Cnic),
            "OtherWallet" => Ok(ReceiverType::OtherWallet),
            other => Err(invalid_tag(
                "receiver type",
                other,
                &["JazzCash", "Bank", "CNIC", "OtherWallet"],
            )),
        }
    }
}

impl std::fmt::Display for ReceiverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Completed => "Completed",
            TransactionStatus::Failed => "Failed",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(TransactionStatus::Pending),
            "Completed" => Ok(TransactionStatus::Completed),
            "Failed" => Ok(TransactionStatus::Failed),
            other => Err(invalid_tag(
                "transaction status",
                other,
                &["Pending", "Completed", "Failed"],
            )),
        }
    }
}

/// Audit record of a wallet-to-wallet or bank transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub sender_id: UserId,
    pub receiver_id: Option<UserId>,
    pub receiver_type: ReceiverType,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        sender_id: UserId,
        receiver_id: Option<UserId>,
        receiver_type: ReceiverType,
        amount: Decimal,
        status: TransactionStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new_v4(),
            sender_id,
            receiver_id,
            receiver_type,
            amount,
            status,
            created_at: now,
            updated_at: now,
        }
    }
}
