use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::ids::UserId;

/// A registered wallet holder. `balance` is the wallet balance, distinct from
/// any linked bank account's own balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: String,
    pub cnic: String,
    pub picture: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: String,
        email: String,
        password_hash: String,
        phone: String,
        cnic: String,
        picture: Option<String>,
        balance: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new_v4(),
            name,
            email,
            password_hash,
            phone,
            cnic,
            picture: picture.unwrap_or_default(),
            balance,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_afford(&self, amount: Decimal) -> bool {
        amount <= self.balance
    }
}
