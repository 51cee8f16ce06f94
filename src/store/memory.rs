use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{LedgerStore, LedgerWrite};
use crate::error::{WalletError, WalletResult};
use crate::models::{
    Autopayment, AutopaymentId, Bank, BankAccount, BankAccountId, BankId, Bill, BillId,
    BillStatus, Load, LoadId, Transaction, TransactionId, User, UserId,
};

#[derive(Default, Clone)]
struct Tables {
    users: HashMap<UserId, User>,
    banks: HashMap<BankId, Bank>,
    bank_accounts: HashMap<BankAccountId, BankAccount>,
    transactions: HashMap<TransactionId, Transaction>,
    bills: HashMap<BillId, Bill>,
    loads: HashMap<LoadId, Load>,
    autopayments: HashMap<AutopaymentId, Autopayment>,
}

impl Tables {
    fn apply(&mut self, write: &LedgerWrite) -> WalletResult<()> {
        match write {
            LedgerWrite::InsertTransaction(tx) => {
                self.transactions.insert(tx.id, tx.clone());
            }
            LedgerWrite::SetTransactionStatus { id, status, at } => {
                let tx = self
                    .transactions
                    .get_mut(id)
                    .ok_or_else(|| missing("transaction", id))?;
                tx.status = *status;
                tx.updated_at = *at;
            }
            LedgerWrite::InsertBill(bill) => {
                self.bills.insert(bill.id, bill.clone());
            }
            LedgerWrite::MarkBillPaid { id, paid_at } => {
                let bill = self.bills.get_mut(id).ok_or_else(|| missing("bill", id))?;
                bill.status = BillStatus::Paid;
                bill.paid_at = Some(*paid_at);
                bill.updated_at = *paid_at;
            }
            LedgerWrite::InsertLoad(load) => {
                self.loads.insert(load.id, load.clone());
            }
            LedgerWrite::SetWalletBalance { user_id, balance, at } => {
                let user = self
                    .users
                    .get_mut(user_id)
                    .ok_or_else(|| missing("user", user_id))?;
                user.balance = *balance;
                user.updated_at = *at;
            }
            LedgerWrite::SetBankAccountBalance {
                account_id,
                balance,
                at,
            } => {
                let account = self
                    .bank_accounts
                    .get_mut(account_id)
                    .ok_or_else(|| missing("bank account", account_id))?;
                account.balance = *balance;
                account.updated_at = *at;
            }
            LedgerWrite::RescheduleAutopayment { id, next_run, at } => {
                let autopayment = self
                    .autopayments
                    .get_mut(id)
                    .ok_or_else(|| missing("autopayment", id))?;
                autopayment.next_run = *next_run;
                autopayment.updated_at = *at;
            }
        }
        Ok(())
    }
}

fn missing(what: &str, id: &uuid::Uuid) -> WalletError {
    WalletError::Persistence(format!("{} {} does not exist", what, id))
}

/// Process-local store backed by hash maps behind one `tokio::sync::RwLock`.
///
/// Used by the test suite and by `STORAGE_BACKEND=memory` development runs.
/// Cloning shares the same underlying tables.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(mut items: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> WalletResult<()> {
        let mut tables = self.tables.write().await;
        let taken = tables.users.values().any(|u| {
            u.email == user.email || u.phone == user.phone || u.cnic == user.cnic
        });
        if taken {
            return Err(WalletError::Conflict(
                "User already exists with this email, phone, or CNIC".to_string(),
            ));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> WalletResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> WalletResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_phone(&self, phone: &str) -> WalletResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.phone == phone).cloned())
    }

    async fn find_user_by_cnic(&self, cnic: &str) -> WalletResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.cnic == cnic).cloned())
    }

    async fn list_users(&self) -> WalletResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn update_profile(&self, user: &User) -> WalletResult<()> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.id != user.id && (u.email == user.email || u.phone == user.phone));
        if taken {
            return Err(WalletError::Conflict(
                "Email or phone is already in use".to_string(),
            ));
        }
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| missing("user", &user.id))?;
        stored.name = user.name.clone();
        stored.email = user.email.clone();
        stored.phone = user.phone.clone();
        stored.picture = user.picture.clone();
        stored.updated_at = user.updated_at;
        Ok(())
    }

    async fn count_banks(&self) -> WalletResult<i64> {
        Ok(self.tables.read().await.banks.len() as i64)
    }

    async fn insert_banks(&self, banks: &[Bank]) -> WalletResult<()> {
        let mut tables = self.tables.write().await;
        for bank in banks {
            tables.banks.insert(bank.id, bank.clone());
        }
        Ok(())
    }

    async fn get_bank(&self, id: BankId) -> WalletResult<Option<Bank>> {
        Ok(self.tables.read().await.banks.get(&id).cloned())
    }

    async fn list_active_banks(&self) -> WalletResult<Vec<Bank>> {
        let tables = self.tables.read().await;
        let mut banks: Vec<Bank> = tables
            .banks
            .values()
            .filter(|b| b.is_active)
            .cloned()
            .collect();
        banks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(banks)
    }

    async fn insert_bank_account(&self, account: &BankAccount) -> WalletResult<()> {
        let mut tables = self.tables.write().await;
        tables.bank_accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn get_bank_account(&self, id: BankAccountId) -> WalletResult<Option<BankAccount>> {
        Ok(self.tables.read().await.bank_accounts.get(&id).cloned())
    }

    async fn update_bank_account(&self, account: &BankAccount) -> WalletResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .bank_accounts
            .get_mut(&account.id)
            .ok_or_else(|| missing("bank account", &account.id))?;
        stored.account_title = account.account_title.clone();
        stored.account_number = account.account_number.clone();
        stored.iban = account.iban.clone();
        stored.is_default = account.is_default;
        stored.is_active = account.is_active;
        stored.updated_at = account.updated_at;
        Ok(())
    }

    async fn clear_default_bank_accounts(&self, user_id: UserId) -> WalletResult<()> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        for account in tables
            .bank_accounts
            .values_mut()
            .filter(|a| a.user_id == user_id && a.is_default)
        {
            account.is_default = false;
            account.updated_at = now;
        }
        Ok(())
    }

    async fn count_default_bank_accounts(&self, user_id: UserId) -> WalletResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .bank_accounts
            .values()
            .filter(|a| a.user_id == user_id && a.is_default)
            .count() as i64)
    }

    async fn list_bank_accounts(
        &self,
        user_id: UserId,
        active_only: bool,
    ) -> WalletResult<Vec<BankAccount>> {
        let tables = self.tables.read().await;
        let mut accounts: Vec<BankAccount> = tables
            .bank_accounts
            .values()
            .filter(|a| a.user_id == user_id && (a.is_active || !active_only))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(accounts)
    }

    async fn find_active_bank_account_by_number(
        &self,
        identifier: &str,
    ) -> WalletResult<Option<BankAccount>> {
        let tables = self.tables.read().await;
        let mut candidates: Vec<&BankAccount> = tables
            .bank_accounts
            .values()
            .filter(|a| a.is_active && a.matches_number_or_iban(identifier))
            .collect();
        // Oldest first, like an unordered scan of an insertion-ordered collection.
        candidates.sort_by_key(|a| a.created_at);
        Ok(candidates.first().map(|a| (*a).clone()))
    }

    async fn find_active_bank_account_for_bank(
        &self,
        user_id: UserId,
        bank_id: BankId,
    ) -> WalletResult<Option<BankAccount>> {
        let tables = self.tables.read().await;
        let mut candidates: Vec<&BankAccount> = tables
            .bank_accounts
            .values()
            .filter(|a| a.user_id == user_id && a.bank_id == bank_id && a.is_active)
            .collect();
        candidates.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(candidates.first().map(|a| (*a).clone()))
    }

    async fn get_transaction(&self, id: TransactionId) -> WalletResult<Option<Transaction>> {
        Ok(self.tables.read().await.transactions.get(&id).cloned())
    }

    async fn list_transactions_by_sender(&self, user_id: UserId) -> WalletResult<Vec<Transaction>> {
        let tables = self.tables.read().await;
        let items: Vec<Transaction> = tables
            .transactions
            .values()
            .filter(|t| t.sender_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |t| t.created_at))
    }

    async fn get_bill(&self, id: BillId) -> WalletResult<Option<Bill>> {
        Ok(self.tables.read().await.bills.get(&id).cloned())
    }

    async fn list_bills(&self, user_id: UserId) -> WalletResult<Vec<Bill>> {
        let tables = self.tables.read().await;
        let items: Vec<Bill> = tables
            .bills
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |b| b.created_at))
    }

    async fn list_loads(&self, user_id: UserId) -> WalletResult<Vec<Load>> {
        let tables = self.tables.read().await;
        let items: Vec<Load> = tables
            .loads
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |l| l.created_at))
    }

    async fn insert_autopayment(&self, autopayment: &Autopayment) -> WalletResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .autopayments
            .insert(autopayment.id, autopayment.clone());
        Ok(())
    }

    async fn get_autopayment(&self, id: AutopaymentId) -> WalletResult<Option<Autopayment>> {
        Ok(self.tables.read().await.autopayments.get(&id).cloned())
    }

    async fn list_autopayments(&self, user_id: UserId) -> WalletResult<Vec<Autopayment>> {
        let tables = self.tables.read().await;
        let items: Vec<Autopayment> = tables
            .autopayments
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |a| a.created_at))
    }

    async fn due_autopayments(&self, now: DateTime<Utc>) -> WalletResult<Vec<Autopayment>> {
        let tables = self.tables.read().await;
        let mut due: Vec<Autopayment> = tables
            .autopayments
            .values()
            .filter(|a| a.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|a| a.next_run);
        Ok(due)
    }

    async fn apply(&self, write: &LedgerWrite) -> WalletResult<()> {
        self.tables.write().await.apply(write)
    }

    async fn apply_batch(&self, writes: &[LedgerWrite]) -> WalletResult<()> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        for write in writes {
            staged.apply(write)?;
        }
        *tables = staged;
        Ok(())
    }
}
