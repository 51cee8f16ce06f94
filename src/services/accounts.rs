//! Registration, login, profile and bank-account management.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use super::directory::DirectoryResolver;
use crate::config::Config;
use crate::error::{WalletError, WalletResult};
use crate::models::{
    Bank, BankAccount, BankAccountDetails, BankAccountId, BankId, BankSummary, User, UserId,
};
use crate::store::DynStore;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Rejects `actor` acting on a resource that belongs to `owner`.
pub fn ensure_owner(actor: UserId, owner: UserId, action: &str) -> WalletResult<()> {
    if actor != owner {
        return Err(WalletError::Unauthorized(format!("Not authorized to {}", action)));
    }
    Ok(())
}

/// Loose shape check: one `@`, something before it, a dot in the domain.
pub fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
        }
        None => false,
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required<'a>(value: &'a str, message: &str) -> WalletResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WalletError::Validation(message.to_string()));
    }
    Ok(trimmed)
}

/// A bank account supplied at registration. `bank` may be a bank id, code
/// or name.
#[derive(Debug, Clone, Default)]
pub struct BankAccountInput {
    pub bank: String,
    pub account_title: String,
    pub account_number: String,
    pub iban: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub cnic: String,
    pub picture: Option<String>,
    pub bank_accounts: Vec<BankAccountInput>,
}

/// Fields left as `None` (or blank) keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewBankAccount {
    pub bank: String,
    pub account_title: String,
    pub account_number: String,
    pub iban: Option<String>,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BankAccountUpdate {
    pub account_title: Option<String>,
    pub account_number: Option<String>,
    pub iban: Option<String>,
    pub is_default: Option<bool>,
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct AccountService {
    store: DynStore,
    directory: DirectoryResolver,
    config: Arc<Config>,
}

impl AccountService {
    pub fn new(store: DynStore, config: Arc<Config>) -> Self {
        Self {
            directory: DirectoryResolver::new(store.clone()),
            store,
            config,
        }
    }

    /// Creates a wallet with the configured starting balance and links the
    /// given bank accounts; the first one becomes the default. Every bank is
    /// resolved before anything is written.
    pub async fn register(
        &self,
        registration: Registration,
    ) -> WalletResult<(User, Vec<BankAccountDetails>)> {
        let name = required(&registration.name, "Name is required")?;
        let phone = required(&registration.phone, "Phone number is required")?;
        let cnic = required(&registration.cnic, "CNIC is required")?;
        let email = normalize_email(&registration.email);
        if !looks_like_email(&email) {
            return Err(WalletError::Validation(
                "Please provide a valid email".to_string(),
            ));
        }
        if registration.password.len() < MIN_PASSWORD_LEN {
            return Err(WalletError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self.store.find_user_by_email(&email).await?.is_some()
            || self.store.find_user_by_phone(phone).await?.is_some()
            || self.store.find_user_by_cnic(cnic).await?.is_some()
        {
            return Err(WalletError::Conflict(
                "User already exists with this email, phone, or CNIC".to_string(),
            ));
        }

        let mut linked: Vec<(Bank, &BankAccountInput)> = Vec::new();
        for (i, input) in registration.bank_accounts.iter().enumerate() {
            if input.bank.trim().is_empty()
                || input.account_title.trim().is_empty()
                || input.account_number.trim().is_empty()
            {
                return Err(WalletError::Validation(format!(
                    "Bank account {} is missing required fields (bankId, accountTitle, or accountNumber)",
                    i + 1
                )));
            }
            match self.directory.resolve_bank(&input.bank).await? {
                Some(bank) if bank.is_active => linked.push((bank, input)),
                _ => {
                    return Err(WalletError::Validation(format!(
                        "Bank account {}: Bank not found or inactive. Please provide a valid bank ID, code (e.g., \"MEBL\"), or name (e.g., \"Meezan Bank\").",
                        i + 1
                    )))
                }
            }
        }

        let password_hash = bcrypt::hash(&registration.password, self.config.bcrypt_cost)?;
        let user = User::new(
            name.to_string(),
            email,
            password_hash,
            phone.to_string(),
            cnic.to_string(),
            filled(&registration.picture).map(str::to_string),
            self.config.starting_balance,
        );
        self.store.insert_user(&user).await?;

        let mut details = Vec::with_capacity(linked.len());
        for (i, (bank, input)) in linked.iter().enumerate() {
            let account = BankAccount::new(
                user.id,
                bank.id,
                &input.account_title,
                &input.account_number,
                filled(&input.iban),
                i == 0,
            );
            self.store.insert_bank_account(&account).await?;
            details.push(BankAccountDetails {
                account,
                bank: Some(BankSummary::from(bank)),
            });
        }

        tracing::info!(
            "Registered user {} with {} bank account(s)",
            user.id,
            details.len()
        );
        Ok((user, details))
    }

    /// Checks credentials. Unknown email and wrong password are reported
    /// the same way.
    pub async fn login(&self, email: &str, password: &str) -> WalletResult<User> {
        let invalid = || WalletError::Unauthenticated("Invalid credentials".to_string());

        let Some(user) = self.store.find_user_by_email(&normalize_email(email)).await? else {
            tracing::warn!("Login failed: unknown email");
            return Err(invalid());
        };
        if !bcrypt::verify(password, &user.password_hash)? {
            tracing::warn!("Login failed: wrong password for {}", user.id);
            return Err(invalid());
        }
        Ok(user)
    }

    pub async fn get_user(&self, user_id: UserId) -> WalletResult<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| WalletError::not_found("User"))
    }

    pub async fn list_users(&self) -> WalletResult<Vec<User>> {
        self.store.list_users().await
    }

    pub async fn balance(&self, actor: UserId, user_id: UserId) -> WalletResult<User> {
        ensure_owner(actor, user_id, "view this balance")?;
        self.get_user(user_id).await
    }

    pub async fn update_profile(
        &self,
        actor: UserId,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> WalletResult<User> {
        ensure_owner(actor, user_id, "update this profile")?;
        let mut user = self.get_user(user_id).await?;

        if let Some(name) = filled(&update.name) {
            user.name = name.to_string();
        }
        if let Some(email) = filled(&update.email) {
            let email = normalize_email(email);
            if !looks_like_email(&email) {
                return Err(WalletError::Validation(
                    "Please provide a valid email".to_string(),
                ));
            }
            user.email = email;
        }
        if let Some(phone) = filled(&update.phone) {
            user.phone = phone.to_string();
        }
        if let Some(picture) = filled(&update.picture) {
            user.picture = picture.to_string();
        }
        user.updated_at = Utc::now();

        self.store.update_profile(&user).await?;
        Ok(user)
    }

    pub async fn list_banks(&self) -> WalletResult<Vec<BankSummary>> {
        let banks = self.store.list_active_banks().await?;
        Ok(banks.iter().map(BankSummary::from).collect())
    }

    /// Attaches bank name and code to each account.
    pub async fn with_bank_details(
        &self,
        accounts: Vec<BankAccount>,
    ) -> WalletResult<Vec<BankAccountDetails>> {
        let mut banks: HashMap<BankId, Option<BankSummary>> = HashMap::new();
        let mut details = Vec::with_capacity(accounts.len());
        for account in accounts {
            if !banks.contains_key(&account.bank_id) {
                let bank = self.store.get_bank(account.bank_id).await?;
                banks.insert(account.bank_id, bank.as_ref().map(BankSummary::from));
            }
            let bank = banks.get(&account.bank_id).cloned().flatten();
            details.push(BankAccountDetails { account, bank });
        }
        Ok(details)
    }

    /// Active accounts of `user_id`, default first.
    pub async fn active_bank_accounts(&self, user_id: UserId) -> WalletResult<Vec<BankAccountDetails>> {
        let accounts = self.store.list_bank_accounts(user_id, true).await?;
        self.with_bank_details(accounts).await
    }

    pub async fn list_bank_accounts(
        &self,
        actor: UserId,
        user_id: UserId,
    ) -> WalletResult<Vec<BankAccountDetails>> {
        ensure_owner(actor, user_id, "view these bank accounts")?;
        self.active_bank_accounts(user_id).await
    }

    /// Links a new account. Flagging it default clears the owner's other
    /// defaults; an owner without a default gets this one as default anyway.
    pub async fn add_bank_account(
        &self,
        actor: UserId,
        new_account: NewBankAccount,
    ) -> WalletResult<BankAccountDetails> {
        let title = required(&new_account.account_title, "Account title is required")?;
        let number = required(&new_account.account_number, "Account number is required")?;

        let bank = match self.directory.resolve_bank(&new_account.bank).await? {
            Some(bank) if bank.is_active => bank,
            _ => return Err(WalletError::NotFound("Bank not found or inactive".to_string())),
        };

        if new_account.is_default {
            self.store.clear_default_bank_accounts(actor).await?;
        }
        let existing_defaults = self.store.count_default_bank_accounts(actor).await?;
        let is_default = new_account.is_default || existing_defaults == 0;

        let account = BankAccount::new(
            actor,
            bank.id,
            title,
            number,
            filled(&new_account.iban),
            is_default,
        );
        self.store.insert_bank_account(&account).await?;

        Ok(BankAccountDetails {
            account,
            bank: Some(BankSummary::from(&bank)),
        })
    }

    async fn owned_account(&self, actor: UserId, id: BankAccountId) -> WalletResult<BankAccount> {
        match self.store.get_bank_account(id).await? {
            Some(account) if account.user_id == actor => Ok(account),
            _ => Err(WalletError::not_found("Bank account")),
        }
    }

    pub async fn update_bank_account(
        &self,
        actor: UserId,
        id: BankAccountId,
        update: BankAccountUpdate,
    ) -> WalletResult<BankAccountDetails> {
        let mut account = self.owned_account(actor, id).await?;

        if update.is_default == Some(true) && !account.is_default {
            self.store.clear_default_bank_accounts(actor).await?;
        }
        if let Some(title) = filled(&update.account_title) {
            account.account_title = title.to_string();
        }
        if let Some(number) = filled(&update.account_number) {
            account.account_number = number.to_string();
        }
        if let Some(iban) = &update.iban {
            account.iban = iban.trim().to_string();
        }
        if let Some(is_default) = update.is_default {
            account.is_default = is_default;
        }
        account.updated_at = Utc::now();

        self.store.update_bank_account(&account).await?;
        let mut details = self.with_bank_details(vec![account]).await?;
        details
            .pop()
            .ok_or_else(|| WalletError::not_found("Bank account"))
    }

    /// Soft delete: the account stays stored with `is_active = false`.
    pub async fn delete_bank_account(&self, actor: UserId, id: BankAccountId) -> WalletResult<()> {
        let mut account = self.owned_account(actor, id).await?;
        account.is_active = false;
        account.updated_at = Utc::now();
        self.store.update_bank_account(&account).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("ali@example.com"));
        assert!(looks_like_email("a.b+c@mail.example.pk"));
        assert!(!looks_like_email("ali@example"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ali@@example.com"));
        assert!(!looks_like_email("ali @example.com"));
        assert!(!looks_like_email("ali.example.com"));
    }

    #[test]
    fn only_the_owner_passes() {
        let me = UserId::new_v4();
        assert!(ensure_owner(me, me, "view this balance").is_ok());
        let err = ensure_owner(me, UserId::new_v4(), "view this balance").unwrap_err();
        assert_eq!(err.to_string(), "Not authorized to view this balance");
    }
}
