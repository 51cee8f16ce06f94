use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ids::{BillId, UserId};
use super::invalid_tag;
use crate::error::WalletError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillCategory {
    Electricity,
    Gas,
    Water,
    Internet,
    Telephone,
}

impl BillCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillCategory::Electricity => "Electricity",
            BillCategory::Gas => "Gas",
            BillCategory::Water => "Water",
            BillCategory::Internet => "Internet",
            BillCategory::Telephone => "Telephone",
        }
    }
}

impl FromStr for BillCategory {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Electricity" => Ok(BillCategory::Electricity),
            "Gas" => Ok(BillCategory::Gas),
            "Water" => Ok(BillCategory::Water),
            "Internet" => Ok(BillCategory::Internet),
            "Telephone" => Ok(BillCategory::Telephone),
            other => Err(invalid_tag(
                "bill category",
                other,
                &["Electricity", "Gas", "Water", "Internet", "Telephone"],
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillStatus {
    Pending,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pending => "Pending",
            BillStatus::Paid => "Paid",
        }
    }
}

impl FromStr for BillStatus {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(BillStatus::Pending),
            "Paid" => Ok(BillStatus::Paid),
            other => Err(invalid_tag("bill status", other, &["Pending", "Paid"])),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: BillId,
    pub user_id: UserId,
    pub category: BillCategory,
    pub company_name: String,
    pub consumer_number: String,
    pub amount: Decimal,
    pub status: BillStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    pub fn pending(
        user_id: UserId,
        category: BillCategory,
        company_name: &str,
        consumer_number: &str,
        amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: BillId::new_v4(),
            user_id,
            category,
            company_name: company_name.trim().to_string(),
            consumer_number: consumer_number.trim().to_string(),
            amount,
            status: BillStatus::Pending,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
