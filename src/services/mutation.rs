//! Balance mutations: wallet transfers, bill payments and airtime loads.
//!
//! Every mutation reads its balances once, checks funds against that
//! snapshot and then writes the new values through a [`LedgerTransaction`].
//! Nothing guards the window between the read and the writes, so two
//! concurrent debits of the same wallet can both pass the check.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::directory::DirectoryResolver;
use super::ledger::LedgerTransaction;
use crate::config::LedgerMode;
use crate::error::{WalletError, WalletResult};
use crate::models::{
    BankAccount, Bill, BillCategory, BillStatus, Load, LoadType, Operator, ReceiverType,
    Transaction, TransactionStatus, User, UserId,
};
use crate::store::{DynStore, LedgerWrite};

pub const MIN_AMOUNT: Decimal = dec!(0.01);

/// Balances are stored with two decimal places, so finer amounts are refused.
pub fn validate_amount(amount: Decimal) -> WalletResult<()> {
    if amount < MIN_AMOUNT {
        return Err(WalletError::Validation(
            "Amount must be at least 0.01".to_string(),
        ));
    }
    if amount.normalize().scale() > 2 {
        return Err(WalletError::Validation(
            "Amount can have at most 2 decimal places".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub sender_id: UserId,
    pub receiver_type: ReceiverType,
    /// Phone, CNIC, or account number / IBAN depending on `receiver_type`.
    pub receiver_identifier: String,
    pub amount: Decimal,
    /// Sender's account id or a bank code/name. Only used for bank transfers.
    pub sender_bank_account: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BillPaymentRequest {
    pub user_id: UserId,
    pub category: BillCategory,
    pub company_name: String,
    pub consumer_number: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct LoadPurchaseRequest {
    pub user_id: UserId,
    pub load_type: LoadType,
    pub mobile_number: String,
    pub operator: Operator,
    pub amount: Decimal,
    pub package_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum MutationRequest {
    Transfer(TransferRequest),
    PayBill(BillPaymentRequest),
    PurchaseLoad(LoadPurchaseRequest),
}

/// The audit record a mutation leaves behind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LedgerRecord {
    Transaction(Transaction),
    Bill(Bill),
    Load(Load),
}

#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub record: LedgerRecord,
    pub new_source_balance: Decimal,
    /// Receiver's wallet balance after credit. `None` when no wallet was credited.
    pub new_destination_balance: Option<Decimal>,
    pub sender_bank_account: Option<BankAccount>,
    /// Receiving account with its credited balance, for internal bank transfers.
    pub receiver_bank_account: Option<BankAccount>,
}

impl MutationOutcome {
    fn new(record: LedgerRecord, new_source_balance: Decimal) -> Self {
        Self {
            record,
            new_source_balance,
            new_destination_balance: None,
            sender_bank_account: None,
            receiver_bank_account: None,
        }
    }
}

#[derive(Clone)]
pub struct MutationEngine {
    store: DynStore,
    directory: DirectoryResolver,
    mode: LedgerMode,
}

impl MutationEngine {
    pub fn new(store: DynStore, mode: LedgerMode) -> Self {
        Self {
            directory: DirectoryResolver::new(store.clone()),
            store,
            mode,
        }
    }

    pub fn begin(&self) -> LedgerTransaction {
        LedgerTransaction::begin(self.store.clone(), self.mode)
    }

    pub async fn attempt_mutation(&self, request: MutationRequest) -> WalletResult<MutationOutcome> {
        match request {
            MutationRequest::Transfer(req) => self.transfer(req).await,
            MutationRequest::PayBill(req) => self.pay_bill(req).await,
            MutationRequest::PurchaseLoad(req) => self.purchase_load(req).await,
        }
    }

    async fn load_user(&self, id: UserId, what: &str) -> WalletResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| WalletError::not_found(what))
    }

    pub async fn transfer(&self, req: TransferRequest) -> WalletResult<MutationOutcome> {
        validate_amount(req.amount)?;
        let identifier = req.receiver_identifier.trim();
        if identifier.is_empty() {
            return Err(WalletError::Validation(
                "Receiver identifier is required".to_string(),
            ));
        }

        let sender = self.load_user(req.sender_id, "Sender").await?;
        if !sender.can_afford(req.amount) {
            return Err(WalletError::InsufficientFunds);
        }

        let (receiver, receiver_account) = match req.receiver_type {
            ReceiverType::Bank => {
                match self.directory.resolve_receiver_bank_account(identifier).await? {
                    Some(account) => (self.store.get_user(account.user_id).await?, Some(account)),
                    None => (None, None),
                }
            }
            wallet => {
                let receiver = self
                    .directory
                    .resolve_wallet_receiver(wallet, identifier)
                    .await?
                    .ok_or_else(|| WalletError::not_found("Receiver"))?;
                (Some(receiver), None)
            }
        };

        let sender_account = match (req.receiver_type, req.sender_bank_account.as_deref()) {
            (ReceiverType::Bank, Some(account)) if !account.trim().is_empty() => Some(
                self.directory
                    .resolve_sender_bank_account(sender.id, account)
                    .await?
                    .ok_or_else(|| {
                        WalletError::Validation("Sender bank account not found".to_string())
                    })?,
            ),
            _ => None,
        };

        let mut transaction = Transaction::new(
            sender.id,
            receiver.as_ref().map(|r| r.id),
            req.receiver_type,
            req.amount,
            TransactionStatus::Pending,
        );
        let now = Utc::now();
        let mut writes = vec![LedgerWrite::InsertTransaction(transaction.clone())];

        let new_source_balance = sender.balance - req.amount;
        writes.push(LedgerWrite::SetWalletBalance {
            user_id: sender.id,
            balance: new_source_balance,
            at: now,
        });

        // Internal bank transfers credit the receiving account and the
        // owner's wallet alike.
        let mut receiver_account = receiver_account;
        if let Some(account) = receiver_account.as_mut() {
            account.balance += req.amount;
            account.updated_at = now;
            writes.push(LedgerWrite::SetBankAccountBalance {
                account_id: account.id,
                balance: account.balance,
                at: now,
            });
        }

        let mut new_destination_balance = None;
        if let Some(receiver) = &receiver {
            let credited = receiver.balance + req.amount;
            writes.push(LedgerWrite::SetWalletBalance {
                user_id: receiver.id,
                balance: credited,
                at: now,
            });
            new_destination_balance = Some(credited);
        }

        writes.push(LedgerWrite::SetTransactionStatus {
            id: transaction.id,
            status: TransactionStatus::Completed,
            at: now,
        });
        self.begin().write_all(writes).await?;

        transaction.status = TransactionStatus::Completed;
        transaction.updated_at = now;

        tracing::info!(
            "Transfer {} of {} from {} via {} completed{}",
            transaction.id,
            transaction.amount,
            sender.id,
            transaction.receiver_type,
            if receiver.is_none() { " (external)" } else { "" }
        );

        Ok(MutationOutcome {
            record: LedgerRecord::Transaction(transaction),
            new_source_balance,
            new_destination_balance,
            sender_bank_account: sender_account,
            receiver_bank_account: receiver_account,
        })
    }

    pub async fn pay_bill(&self, req: BillPaymentRequest) -> WalletResult<MutationOutcome> {
        validate_amount(req.amount)?;
        if req.company_name.trim().is_empty() || req.consumer_number.trim().is_empty() {
            return Err(WalletError::Validation(
                "Company name and consumer number are required".to_string(),
            ));
        }

        let user = self.load_user(req.user_id, "User").await?;
        if !user.can_afford(req.amount) {
            return Err(WalletError::InsufficientFunds);
        }

        let mut bill = Bill::pending(
            user.id,
            req.category,
            &req.company_name,
            &req.consumer_number,
            req.amount,
        );
        let now = Utc::now();
        let new_balance = user.balance - req.amount;

        self.begin()
            .write_all(vec![
                LedgerWrite::InsertBill(bill.clone()),
                LedgerWrite::SetWalletBalance {
                    user_id: user.id,
                    balance: new_balance,
                    at: now,
                },
                LedgerWrite::MarkBillPaid {
                    id: bill.id,
                    paid_at: now,
                },
            ])
            .await?;

        bill.status = BillStatus::Paid;
        bill.paid_at = Some(now);
        bill.updated_at = now;

        Ok(MutationOutcome::new(LedgerRecord::Bill(bill), new_balance))
    }

    pub async fn purchase_load(&self, req: LoadPurchaseRequest) -> WalletResult<MutationOutcome> {
        validate_amount(req.amount)?;
        if req.mobile_number.trim().is_empty() {
            return Err(WalletError::Validation("Mobile number is required".to_string()));
        }
        let package_name = req
            .package_name
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        if req.load_type == LoadType::Package && package_name.is_none() {
            return Err(WalletError::Validation("Package name is required".to_string()));
        }

        let user = self.load_user(req.user_id, "User").await?;
        if !user.can_afford(req.amount) {
            return Err(WalletError::InsufficientFunds);
        }

        let load = Load::successful(
            user.id,
            req.load_type,
            &req.mobile_number,
            req.operator,
            req.amount,
            package_name,
        );
        let new_balance = user.balance - req.amount;

        self.begin()
            .write_all(vec![
                LedgerWrite::InsertLoad(load.clone()),
                LedgerWrite::SetWalletBalance {
                    user_id: user.id,
                    balance: new_balance,
                    at: Utc::now(),
                },
            ])
            .await?;

        Ok(MutationOutcome::new(LedgerRecord::Load(load), new_balance))
    }
}
