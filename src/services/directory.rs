//! Lookup of human-supplied identifiers (phone, CNIC, account number, bank
//! code or name) to stored records. Every resolver returns `Ok(None)` when
//! nothing matches; callers decide whether that is a 404 or a 400.

use uuid::Uuid;

use crate::error::WalletResult;
use crate::models::{Bank, BankAccount, ReceiverType, User, UserId};
use crate::store::DynStore;

/// Lowercases and strips all whitespace, so "Meezan Bank" and "meezanbank"
/// compare equal.
pub fn normalize_bank_name(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Fuzzy match used as the last resolution step: either normalized name
/// contains the other, or the bank code equals the normalized input.
fn fuzzy_matches(bank: &Bank, normalized_input: &str) -> bool {
    if normalized_input.is_empty() {
        return false;
    }
    let name = normalize_bank_name(&bank.name);
    name.contains(normalized_input)
        || normalized_input.contains(name.as_str())
        || bank.code.to_lowercase() == normalized_input
}

/// Picks a bank by code, then by fuzzy name, from an already ordered catalog.
fn pick_by_code_or_name<'a>(banks: &'a [Bank], identifier: &str) -> Option<&'a Bank> {
    let trimmed = identifier.trim();
    if let Some(bank) = banks.iter().find(|b| b.code.eq_ignore_ascii_case(trimmed)) {
        return Some(bank);
    }
    let normalized = normalize_bank_name(trimmed);
    banks.iter().find(|b| fuzzy_matches(b, &normalized))
}

#[derive(Clone)]
pub struct DirectoryResolver {
    store: DynStore,
}

impl DirectoryResolver {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    /// Resolves a bank by id, then code (case-insensitive), then fuzzy name.
    /// Ties are broken by catalog order, which is by name.
    pub async fn resolve_bank(&self, identifier: &str) -> WalletResult<Option<Bank>> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        if let Ok(id) = Uuid::parse_str(trimmed) {
            if let Some(bank) = self.store.get_bank(id).await? {
                return Ok(Some(bank));
            }
        }

        let banks = self.store.list_active_banks().await?;
        Ok(pick_by_code_or_name(&banks, trimmed).cloned())
    }

    /// Phone lookup for JazzCash and other wallets, CNIC lookup for CNIC.
    /// Bank transfers go through [`Self::resolve_receiver_bank_account`].
    pub async fn resolve_wallet_receiver(
        &self,
        receiver_type: ReceiverType,
        identifier: &str,
    ) -> WalletResult<Option<User>> {
        let identifier = identifier.trim();
        match receiver_type {
            ReceiverType::JazzCash | ReceiverType::OtherWallet => {
                self.store.find_user_by_phone(identifier).await
            }
            ReceiverType::Cnic => self.store.find_user_by_cnic(identifier).await,
            ReceiverType::Bank => Ok(None),
        }
    }

    /// Active account whose number or IBAN equals `identifier`. `None` means
    /// the transfer leaves the system.
    pub async fn resolve_receiver_bank_account(
        &self,
        identifier: &str,
    ) -> WalletResult<Option<BankAccount>> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }
        self.store.find_active_bank_account_by_number(identifier).await
    }

    /// The sender's account named either by account id or by a bank
    /// identifier. For a bank, the default account at that bank wins.
    pub async fn resolve_sender_bank_account(
        &self,
        sender_id: UserId,
        identifier: &str,
    ) -> WalletResult<Option<BankAccount>> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }

        if let Ok(id) = Uuid::parse_str(identifier) {
            if let Some(account) = self.store.get_bank_account(id).await? {
                if account.user_id == sender_id && account.is_active {
                    return Ok(Some(account));
                }
            }
        }

        let banks = self.store.list_active_banks().await?;
        match pick_by_code_or_name(&banks, identifier) {
            Some(bank) => {
                self.store
                    .find_active_bank_account_for_bank(sender_id, bank.id)
                    .await
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Bank> {
        let mut banks = vec![
            Bank::new("Meezan Bank", "MEBL"),
            Bank::new("Habib Bank Limited", "HBL"),
            Bank::new("Bank Alfalah", "BAFL"),
            Bank::new("United Bank Limited", "UBL"),
        ];
        banks.sort_by(|a, b| a.name.cmp(&b.name));
        banks
    }

    #[test]
    fn normalize_strips_whitespace_and_case() {
        assert_eq!(normalize_bank_name("  Meezan \t Bank "), "meezanbank");
        assert_eq!(normalize_bank_name("HBL"), "hbl");
    }

    #[test]
    fn code_match_is_case_insensitive() {
        let banks = catalog();
        assert_eq!(pick_by_code_or_name(&banks, "mebl").map(|b| b.code.as_str()), Some("MEBL"));
        assert_eq!(pick_by_code_or_name(&banks, "UBL").map(|b| b.code.as_str()), Some("UBL"));
    }

    #[test]
    fn fuzzy_name_matches_in_both_directions() {
        let banks = catalog();
        assert_eq!(
            pick_by_code_or_name(&banks, "meezan").map(|b| b.code.as_str()),
            Some("MEBL")
        );
        assert_eq!(
            pick_by_code_or_name(&banks, "Meezan Bank Karachi Branch").map(|b| b.code.as_str()),
            Some("MEBL")
        );
    }

    #[test]
    fn ambiguous_fuzzy_input_takes_first_bank_by_name() {
        // "bank" is contained in every name with "Bank" in it.
        let banks = catalog();
        assert_eq!(
            pick_by_code_or_name(&banks, "bank").map(|b| b.name.as_str()),
            Some("Bank Alfalah")
        );
    }

    #[test]
    fn unknown_and_blank_inputs_do_not_resolve() {
        let banks = catalog();
        assert!(pick_by_code_or_name(&banks, "NotABank").is_none());
        assert!(pick_by_code_or_name(&banks, "   ").is_none());
    }
}
