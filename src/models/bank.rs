use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::ids::{BankAccountId, BankId, UserId};

/// Reference catalog seeded on first start. Codes are stored uppercase.
pub const PAKISTANI_BANKS: &[(&str, &str)] = &[
    ("Allied Bank Limited", "ABL"),
    ("Askari Bank", "AKBL"),
    ("Bank Al Habib", "BAH"),
    ("Bank Alfalah", "BAFL"),
    ("Bank of Khyber", "BOK"),
    ("Bank of Punjab", "BOP"),
    ("Faysal Bank", "FBL"),
    ("Habib Bank Limited", "HBL"),
    ("JS Bank", "JSBL"),
    ("MCB Bank", "MCB"),
    ("Meezan Bank", "MEBL"),
    ("National Bank of Pakistan", "NBP"),
    ("Sindh Bank", "SBL"),
    ("Soneri Bank", "SNBL"),
    ("Standard Chartered Bank", "SCB"),
    ("Summit Bank", "SMBL"),
    ("United Bank Limited", "UBL"),
    ("Albaraka Bank", "ABP"),
    ("Dubai Islamic Bank", "DIB"),
    ("Bank Islami", "BIPL"),
    ("First Women Bank", "FWB"),
    ("Industrial and Commercial Bank of China", "ICBC"),
    ("Samba Bank", "SAMB"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bank {
    pub id: BankId,
    pub name: String,
    pub code: String,
    pub is_active: bool,
}

impl Bank {
    pub fn new(name: &str, code: &str) -> Self {
        Self {
            id: BankId::new_v4(),
            name: name.to_string(),
            code: code.to_uppercase(),
            is_active: true,
        }
    }
}

/// Name and code of a bank, attached to bank accounts in responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankSummary {
    pub id: BankId,
    pub name: String,
    pub code: String,
}

impl From<&Bank> for BankSummary {
    fn from(bank: &Bank) -> Self {
        Self {
            id: bank.id,
            name: bank.name.clone(),
            code: bank.code.clone(),
        }
    }
}

/// A bank account linked to a wallet holder. Holds its own balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: BankAccountId,
    pub user_id: UserId,
    pub bank_id: BankId,
    pub account_title: String,
    pub account_number: String,
    pub iban: String,
    pub balance: Decimal,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BankAccount {
    pub fn new(
        user_id: UserId,
        bank_id: BankId,
        account_title: &str,
        account_number: &str,
        iban: Option<&str>,
        is_default: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: BankAccountId::new_v4(),
            user_id,
            bank_id,
            account_title: account_title.trim().to_string(),
            account_number: account_number.trim().to_string(),
            iban: iban.map(|s| s.trim().to_string()).unwrap_or_default(),
            balance: Decimal::ZERO,
            is_default,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when `identifier` is this account's number or its (non-empty) IBAN.
    pub fn matches_number_or_iban(&self, identifier: &str) -> bool {
        self.account_number == identifier || (!self.iban.is_empty() && self.iban == identifier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountDetails {
    #[serde(flatten)]
    pub account: BankAccount,
    pub bank: Option<BankSummary>,
}
