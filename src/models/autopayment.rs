use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ids::{AutopaymentId, BillId, UserId};
use super::invalid_tag;
use super::load::{LoadType, Operator};
use super::transaction::ReceiverType;
use crate::error::WalletError;

/// Payment-kind tag of a recurring instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutopaymentType {
    Bill,
    Transfer,
    Prepaid,
    Postpaid,
    Package,
}

impl AutopaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutopaymentType::Bill => "bill",
            AutopaymentType::Transfer => "transfer",
            AutopaymentType::Prepaid => "prepaid",
            AutopaymentType::Postpaid => "postpaid",
            AutopaymentType::Package => "package",
        }
    }
}

impl FromStr for AutopaymentType {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bill" => Ok(AutopaymentType::Bill),
            "transfer" => Ok(AutopaymentType::Transfer),
            "prepaid" => Ok(AutopaymentType::Prepaid),
            "postpaid" => Ok(AutopaymentType::Postpaid),
            "package" => Ok(AutopaymentType::Package),
            other => Err(invalid_tag(
                "autopayment type",
                other,
                &["bill", "transfer", "prepaid", "postpaid", "package"],
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    Daily,
    Weekly,
    Monthly,
}

impl Schedule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Schedule::Daily => "daily",
            Schedule::Weekly => "weekly",
            Schedule::Monthly => "monthly",
        }
    }

    /// The run after `from`. Monthly steps by calendar month and lands on the
    /// last day of the month when the day does not exist there (Jan 31 -> Feb 28).
    pub fn next_after(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Schedule::Daily => from + Duration::days(1),
            Schedule::Weekly => from + Duration::days(7),
            Schedule::Monthly => from
                .checked_add_months(Months::new(1))
                .unwrap_or_else(|| from + Duration::days(30)),
        }
    }
}

impl FromStr for Schedule {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Schedule::Daily),
            "weekly" => Ok(Schedule::Weekly),
            "monthly" => Ok(Schedule::Monthly),
            other => Err(invalid_tag(
                "schedule",
                other,
                &["daily", "weekly", "monthly"],
            )),
        }
    }
}

/// What an autopayment pays for. Set at creation and never changed by the
/// scheduled engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AutopaymentTarget {
    #[serde(rename_all = "camelCase")]
    Bill { bill_id: BillId },
    #[serde(rename_all = "camelCase")]
    Transfer {
        receiver_id: UserId,
        receiver_type: ReceiverType,
    },
    #[serde(rename_all = "camelCase")]
    Prepaid {
        mobile_number: String,
        operator: Operator,
    },
    #[serde(rename_all = "camelCase")]
    Postpaid {
        mobile_number: String,
        operator: Operator,
    },
    #[serde(rename_all = "camelCase")]
    Package {
        mobile_number: String,
        operator: Operator,
        package_name: String,
    },
}

impl AutopaymentTarget {
    pub fn kind(&self) -> AutopaymentType {
        match self {
            AutopaymentTarget::Bill { .. } => AutopaymentType::Bill,
            AutopaymentTarget::Transfer { .. } => AutopaymentType::Transfer,
            AutopaymentTarget::Prepaid { .. } => AutopaymentType::Prepaid,
            AutopaymentTarget::Postpaid { .. } => AutopaymentType::Postpaid,
            AutopaymentTarget::Package { .. } => AutopaymentType::Package,
        }
    }

    /// Load type for the airtime kinds, `None` for bills and transfers.
    pub fn load_type(&self) -> Option<LoadType> {
        match self {
            AutopaymentTarget::Prepaid { .. } => Some(LoadType::Prepaid),
            AutopaymentTarget::Postpaid { .. } => Some(LoadType::Postpaid),
            AutopaymentTarget::Package { .. } => Some(LoadType::Package),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Autopayment {
    pub id: AutopaymentId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub schedule: Schedule,
    pub next_run: DateTime<Utc>,
    pub is_active: bool,
    #[serde(flatten)]
    pub target: AutopaymentTarget,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Autopayment {
    /// A new active instruction whose first run is one period from `now`.
    pub fn new(
        user_id: UserId,
        amount: Decimal,
        schedule: Schedule,
        target: AutopaymentTarget,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AutopaymentId::new_v4(),
            user_id,
            amount,
            schedule,
            next_run: schedule.next_after(now),
            is_active: true,
            target,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> AutopaymentType {
        self.target.kind()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_run <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn daily_and_weekly_add_whole_days() {
        let from = Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap();
        assert_eq!(
            Schedule::Daily.next_after(from),
            Utc.with_ymd_and_hms(2024, 3, 11, 8, 30, 0).unwrap()
        );
        assert_eq!(
            Schedule::Weekly.next_after(from),
            Utc.with_ymd_and_hms(2024, 3, 17, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        let from = Utc.with_ymd_and_hms(2023, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(
            Schedule::Monthly.next_after(from),
            Utc.with_ymd_and_hms(2023, 2, 28, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn unknown_schedule_tag_is_a_validation_error() {
        let err = "yearly".parse::<Schedule>().unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));
        assert!(err.to_string().contains("yearly"));
    }

    #[test]
    fn target_serializes_flat_with_type_tag() {
        let ap = Autopayment::new(
            UserId::new_v4(),
            Decimal::from(50),
            Schedule::Weekly,
            AutopaymentTarget::Package {
                mobile_number: "03001234567".into(),
                operator: Operator::Zong,
                package_name: "Weekly Max".into(),
            },
            Utc::now(),
        );
        let json = serde_json::to_value(&ap).unwrap();
        assert_eq!(json["type"], "package");
        assert_eq!(json["packageName"], "Weekly Max");
        assert_eq!(json["operator"], "Zong");
        assert_eq!(json["schedule"], "weekly");
    }
}
