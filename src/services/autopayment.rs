//! Recurring payments: creation of autopayment instructions and the tick
//! that replays due ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use super::ledger::LedgerTransaction;
use super::mutation::{validate_amount, MutationEngine};
use crate::error::{WalletError, WalletResult};
use crate::models::{
    Autopayment, AutopaymentTarget, AutopaymentType, BillId, BillStatus, Load, LoadType,
    Operator, ReceiverType, Schedule, Transaction, TransactionStatus, User, UserId,
};
use crate::store::{DynStore, LedgerWrite};

/// Source of the autopayments a tick should process.
#[async_trait]
pub trait DueItemScanner: Send + Sync {
    async fn due_items(&self, now: DateTime<Utc>) -> WalletResult<Vec<Autopayment>>;
}

/// Active autopayments with `next_run <= now`, straight from the store.
pub struct StoreScanner {
    store: DynStore,
}

impl StoreScanner {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DueItemScanner for StoreScanner {
    async fn due_items(&self, now: DateTime<Utc>) -> WalletResult<Vec<Autopayment>> {
        self.store.due_autopayments(now).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub scanned: usize,
    /// Items that moved money.
    pub executed: usize,
    /// Items whose next run was advanced, with or without a payment.
    pub rescheduled: usize,
    pub skipped_insufficient_funds: usize,
    pub skipped_missing_owner: usize,
    pub failed: usize,
}

enum ItemOutcome {
    Paid,
    NothingToPay,
    MissingOwner,
    InsufficientFunds,
}

/// Raw creation fields, as they arrive from a client.
#[derive(Debug, Clone, Default)]
pub struct AutopaymentDraft {
    pub amount: Decimal,
    pub kind: String,
    pub schedule: String,
    pub bill_id: Option<BillId>,
    pub receiver_id: Option<UserId>,
    pub receiver_type: Option<String>,
    pub mobile_number: Option<String>,
    pub operator: Option<String>,
    pub package_name: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AutopaymentDraft {
    /// Builds the typed target for `kind`, ignoring fields other kinds use.
    pub fn target(&self) -> WalletResult<AutopaymentTarget> {
        let kind: AutopaymentType = self.kind.trim().parse()?;
        match kind {
            AutopaymentType::Bill => Ok(AutopaymentTarget::Bill {
                bill_id: self.bill_id.ok_or_else(|| {
                    WalletError::Validation("Bill ID is required for bill autopayments".to_string())
                })?,
            }),
            AutopaymentType::Transfer => Ok(AutopaymentTarget::Transfer {
                receiver_id: self.receiver_id.ok_or_else(|| {
                    WalletError::Validation(
                        "Receiver ID is required for transfer autopayments".to_string(),
                    )
                })?,
                receiver_type: match non_blank(&self.receiver_type) {
                    Some(raw) => raw.parse()?,
                    None => ReceiverType::JazzCash,
                },
            }),
            AutopaymentType::Prepaid | AutopaymentType::Postpaid | AutopaymentType::Package => {
                let (mobile_number, operator) =
                    match (non_blank(&self.mobile_number), non_blank(&self.operator)) {
                        (Some(mobile), Some(operator)) => {
                            (mobile.to_string(), operator.parse::<Operator>()?)
                        }
                        _ => {
                            return Err(WalletError::Validation(
                                "Mobile number and operator are required for load autopayments"
                                    .to_string(),
                            ))
                        }
                    };
                Ok(match kind {
                    AutopaymentType::Prepaid => AutopaymentTarget::Prepaid {
                        mobile_number,
                        operator,
                    },
                    AutopaymentType::Postpaid => AutopaymentTarget::Postpaid {
                        mobile_number,
                        operator,
                    },
                    _ => AutopaymentTarget::Package {
                        mobile_number,
                        operator,
                        package_name: non_blank(&self.package_name)
                            .ok_or_else(|| {
                                WalletError::Validation(
                                    "Package name is required for package autopayments"
                                        .to_string(),
                                )
                            })?
                            .to_string(),
                    },
                })
            }
        }
    }
}

#[derive(Clone)]
pub struct AutopaymentEngine {
    store: DynStore,
    mutation: MutationEngine,
    scanner: Arc<dyn DueItemScanner>,
}

impl AutopaymentEngine {
    pub fn new(store: DynStore, mutation: MutationEngine) -> Self {
        Self {
            scanner: Arc::new(StoreScanner::new(store.clone())),
            store,
            mutation,
        }
    }

    pub fn with_scanner(mut self, scanner: Arc<dyn DueItemScanner>) -> Self {
        self.scanner = scanner;
        self
    }

    /// Stores a new instruction for `user_id`. Its first run is one period
    /// from now.
    pub async fn create(&self, user_id: UserId, draft: &AutopaymentDraft) -> WalletResult<Autopayment> {
        validate_amount(draft.amount)?;
        let schedule: Schedule = draft.schedule.trim().parse()?;
        let target = draft.target()?;

        if self.store.get_user(user_id).await?.is_none() {
            return Err(WalletError::not_found("User"));
        }

        let autopayment = Autopayment::new(user_id, draft.amount, schedule, target, Utc::now());
        self.store.insert_autopayment(&autopayment).await?;

        tracing::info!(
            "Autopayment {} ({}, {}) created for {}; first run at {}",
            autopayment.id,
            autopayment.kind().as_str(),
            autopayment.schedule.as_str(),
            user_id,
            autopayment.next_run
        );
        Ok(autopayment)
    }

    pub async fn list(&self, user_id: UserId) -> WalletResult<Vec<Autopayment>> {
        self.store.list_autopayments(user_id).await
    }

    /// Processes every item due at `now`. One item failing does not stop
    /// the scan.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> WalletResult<TickReport> {
        let due = self.scanner.due_items(now).await?;
        let mut report = TickReport {
            scanned: due.len(),
            ..Default::default()
        };

        for item in &due {
            match self.process(item, now).await {
                Ok(ItemOutcome::Paid) => {
                    report.executed += 1;
                    report.rescheduled += 1;
                }
                Ok(ItemOutcome::NothingToPay) => report.rescheduled += 1,
                Ok(ItemOutcome::MissingOwner) => report.skipped_missing_owner += 1,
                Ok(ItemOutcome::InsufficientFunds) => report.skipped_insufficient_funds += 1,
                Err(e) => {
                    tracing::error!("Error processing autopayment {}: {}", item.id, e);
                    report.failed += 1;
                }
            }
        }

        if report.scanned > 0 {
            tracing::info!(
                "Autopayment tick: scanned={} executed={} rescheduled={} insufficient={} missing_owner={} failed={}",
                report.scanned,
                report.executed,
                report.rescheduled,
                report.skipped_insufficient_funds,
                report.skipped_missing_owner,
                report.failed
            );
        }
        Ok(report)
    }

    async fn process(&self, item: &Autopayment, now: DateTime<Utc>) -> WalletResult<ItemOutcome> {
        let Some(owner) = self.store.get_user(item.user_id).await? else {
            tracing::warn!("User not found for autopayment {}", item.id);
            return Ok(ItemOutcome::MissingOwner);
        };

        // Retried on the next tick; next_run stays put.
        if !owner.can_afford(item.amount) {
            tracing::warn!("Insufficient balance for autopayment {}", item.id);
            return Ok(ItemOutcome::InsufficientFunds);
        }

        let mut ledger = self.mutation.begin();
        let paid = match &item.target {
            AutopaymentTarget::Bill { bill_id } => {
                self.stage_bill(&mut ledger, &owner, item, *bill_id, now).await?
            }
            AutopaymentTarget::Transfer {
                receiver_id,
                receiver_type,
            } => {
                self.stage_transfer(&mut ledger, &owner, item, *receiver_id, *receiver_type, now)
                    .await?
            }
            AutopaymentTarget::Prepaid {
                mobile_number,
                operator,
            } => {
                stage_load(&mut ledger, &owner, item, LoadType::Prepaid, mobile_number, *operator, None, now)
                    .await?
            }
            AutopaymentTarget::Postpaid {
                mobile_number,
                operator,
            } => {
                stage_load(&mut ledger, &owner, item, LoadType::Postpaid, mobile_number, *operator, None, now)
                    .await?
            }
            AutopaymentTarget::Package {
                mobile_number,
                operator,
                package_name,
            } => {
                stage_load(
                    &mut ledger,
                    &owner,
                    item,
                    LoadType::Package,
                    mobile_number,
                    *operator,
                    Some(package_name.as_str()),
                    now,
                )
                .await?
            }
        };

        ledger
            .write(LedgerWrite::RescheduleAutopayment {
                id: item.id,
                next_run: item.schedule.next_after(now),
                at: now,
            })
            .await?;
        ledger.commit().await?;

        Ok(if paid {
            ItemOutcome::Paid
        } else {
            ItemOutcome::NothingToPay
        })
    }

    /// Pays the bill only while it is still pending.
    async fn stage_bill(
        &self,
        ledger: &mut LedgerTransaction,
        owner: &User,
        item: &Autopayment,
        bill_id: BillId,
        now: DateTime<Utc>,
    ) -> WalletResult<bool> {
        match self.store.get_bill(bill_id).await? {
            Some(bill) if bill.status == BillStatus::Pending => {
                ledger
                    .write(LedgerWrite::SetWalletBalance {
                        user_id: owner.id,
                        balance: owner.balance - item.amount,
                        at: now,
                    })
                    .await?;
                ledger
                    .write(LedgerWrite::MarkBillPaid {
                        id: bill.id,
                        paid_at: now,
                    })
                    .await?;
                tracing::info!("Bill {} paid via autopayment {}", bill.id, item.id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn stage_transfer(
        &self,
        ledger: &mut LedgerTransaction,
        owner: &User,
        item: &Autopayment,
        receiver_id: UserId,
        receiver_type: ReceiverType,
        now: DateTime<Utc>,
    ) -> WalletResult<bool> {
        let Some(receiver) = self.store.get_user(receiver_id).await? else {
            tracing::warn!(
                "Receiver {} not found for autopayment {}",
                receiver_id,
                item.id
            );
            return Ok(false);
        };

        let transaction = Transaction::new(
            owner.id,
            Some(receiver.id),
            receiver_type,
            item.amount,
            TransactionStatus::Completed,
        );
        ledger
            .write(LedgerWrite::InsertTransaction(transaction))
            .await?;
        ledger
            .write(LedgerWrite::SetWalletBalance {
                user_id: owner.id,
                balance: owner.balance - item.amount,
                at: now,
            })
            .await?;
        ledger
            .write(LedgerWrite::SetWalletBalance {
                user_id: receiver.id,
                balance: receiver.balance + item.amount,
                at: now,
            })
            .await?;
        tracing::info!("Transfer completed via autopayment {}", item.id);
        Ok(true)
    }
}

#[allow(clippy::too_many_arguments)]
async fn stage_load(
    ledger: &mut LedgerTransaction,
    owner: &User,
    item: &Autopayment,
    load_type: LoadType,
    mobile_number: &str,
    operator: Operator,
    package_name: Option<&str>,
    now: DateTime<Utc>,
) -> WalletResult<bool> {
    let load = Load::successful(
        owner.id,
        load_type,
        mobile_number,
        operator,
        item.amount,
        package_name,
    );
    ledger.write(LedgerWrite::InsertLoad(load)).await?;
    ledger
        .write(LedgerWrite::SetWalletBalance {
            user_id: owner.id,
            balance: owner.balance - item.amount,
            at: now,
        })
        .await?;
    tracing::info!(
        "Load {} processed via autopayment {} for {}",
        load_type.as_str(),
        item.id,
        mobile_number
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn draft(kind: &str) -> AutopaymentDraft {
        AutopaymentDraft {
            amount: dec!(50),
            kind: kind.to_string(),
            schedule: "daily".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn load_kinds_need_mobile_and_operator() {
        let err = draft("prepaid").target().unwrap_err();
        assert!(err.to_string().contains("Mobile number and operator"));

        let mut package = draft("package");
        package.mobile_number = Some("03001234567".into());
        package.operator = Some("Zong".into());
        let err = package.target().unwrap_err();
        assert!(err.to_string().contains("Package name"));

        package.package_name = Some("Weekly Mega".into());
        assert_eq!(
            package.target().unwrap(),
            AutopaymentTarget::Package {
                mobile_number: "03001234567".into(),
                operator: Operator::Zong,
                package_name: "Weekly Mega".into(),
            }
        );
    }

    #[test]
    fn transfer_receiver_type_defaults_to_jazzcash() {
        let receiver = Uuid::new_v4();
        let mut transfer = draft("transfer");
        transfer.receiver_id = Some(receiver);
        assert_eq!(
            transfer.target().unwrap(),
            AutopaymentTarget::Transfer {
                receiver_id: receiver,
                receiver_type: ReceiverType::JazzCash,
            }
        );
    }

    #[test]
    fn unknown_kind_is_a_validation_error() {
        assert!(matches!(
            draft("lottery").target(),
            Err(WalletError::Validation(_))
        ));
    }
}
