use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ids::{LoadId, UserId};
use super::invalid_tag;
use crate::error::WalletError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadType {
    Prepaid,
    Postpaid,
    Package,
}

impl LoadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadType::Prepaid => "Prepaid",
            LoadType::Postpaid => "Postpaid",
            LoadType::Package => "Package",
        }
    }
}

impl FromStr for LoadType {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Prepaid" => Ok(LoadType::Prepaid),
            "Postpaid" => Ok(LoadType::Postpaid),
            "Package" => Ok(LoadType::Package),
            other => Err(invalid_tag(
                "load type",
                other,
                &["Prepaid", "Postpaid", "Package"],
            )),
        }
    }
}

/// Mobile network operators airtime can be bought for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Jazz,
    Zong,
    Telenor,
    Ufone,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Jazz => "Jazz",
            Operator::Zong => "Zong",
            Operator::Telenor => "Telenor",
            Operator::Ufone => "Ufone",
        }
    }
}

impl FromStr for Operator {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Jazz" => Ok(Operator::Jazz),
            "Zong" => Ok(Operator::Zong),
            "Telenor" => Ok(Operator::Telenor),
            "Ufone" => Ok(Operator::Ufone),
            other => Err(invalid_tag(
                "operator",
                other,
                &["Jazz", "Zong", "Telenor", "Ufone"],
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadStatus {
    Successful,
    Failed,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Successful => "Successful",
            LoadStatus::Failed => "Failed",
        }
    }
}

impl FromStr for LoadStatus {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Successful" => Ok(LoadStatus::Successful),
            "Failed" => Ok(LoadStatus::Failed),
            other => Err(invalid_tag("load status", other, &["Successful", "Failed"])),
        }
    }
}

/// Airtime or package purchase. There is no carrier confirmation step, so
/// loads are recorded as `Successful` straight away.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Load {
    pub id: LoadId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub load_type: LoadType,
    pub mobile_number: String,
    pub operator: Operator,
    pub amount: Decimal,
    pub package_name: Option<String>,
    pub status: LoadStatus,
    pub created_at: DateTime<Utc>,
}

impl Load {
    pub fn successful(
        user_id: UserId,
        load_type: LoadType,
        mobile_number: &str,
        operator: Operator,
        amount: Decimal,
        package_name: Option<&str>,
    ) -> Self {
        Self {
            id: LoadId::new_v4(),
            user_id,
            load_type,
            mobile_number: mobile_number.trim().to_string(),
            operator,
            amount,
            // Only packages carry a name.
            package_name: match load_type {
                LoadType::Package => package_name.map(|p| p.trim().to_string()),
                _ => None,
            },
            status: LoadStatus::Successful,
            created_at: Utc::now(),
        }
    }
}
