// Failure behaviour of sequential and atomic ledger modes


use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;
use test_helpers::*;
use wallet_api::error::WalletError;
use wallet_api::models::{BillCategory, ReceiverType, TransactionStatus};
use wallet_api::services::mutation::{BillPaymentRequest, TransferRequest};
use wallet_api::services::LedgerTransaction;
use wallet_api::store::{InMemoryStore, LedgerStore, LedgerWrite};
use wallet_api::LedgerMode;

fn transfer_to(sender_id: uuid::Uuid, phone: &str) -> TransferRequest {
    TransferRequest {
        sender_id,
        receiver_type: ReceiverType::JazzCash,
        receiver_identifier: phone.to_string(),
        amount: dec!(100),
        sender_bank_account: None,
    }
}

#[tokio::test]
async fn test_sequential_failure_keeps_partial_writes() {
    let inner = InMemoryStore::new();
    let faulty = FaultyStore::new(inner.clone(), "set_transaction_status");
    let state = setup_state_with(Arc::new(faulty), LedgerMode::Sequential).await;

    let ali = create_test_user(&inner, "Ali", "03001111111", "35202-1111111-1", dec!(1000)).await;
    let sara = create_test_user(&inner, "Sara", "03002222222", "35202-2222222-2", dec!(0)).await;

    let err = state
        .mutation
        .transfer(transfer_to(ali.id, "03002222222"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Persistence(_)));

    // Debit and credit landed; the record never reached Completed.
    assert_eq!(balance_of(&inner, ali.id).await, dec!(900));
    assert_eq!(balance_of(&inner, sara.id).await, dec!(100));
    let txs = inner.list_transactions_by_sender(ali.id).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].status, TransactionStatus::Pending);
}

#[tokio::test]
async fn test_atomic_failure_leaves_no_partial_state() {
    let inner = InMemoryStore::new();
    let faulty = FaultyStore::new(inner.clone(), "set_transaction_status");
    let state = setup_state_with(Arc::new(faulty.clone()), LedgerMode::Atomic).await;

    let ali = create_test_user(&inner, "Ali", "03001111111", "35202-1111111-1", dec!(1000)).await;
    let sara = create_test_user(&inner, "Sara", "03002222222", "35202-2222222-2", dec!(0)).await;

    let err = state
        .mutation
        .transfer(transfer_to(ali.id, "03002222222"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Persistence(_)));

    assert_eq!(balance_of(&inner, ali.id).await, dec!(1000));
    assert_eq!(balance_of(&inner, sara.id).await, dec!(0));
    assert!(inner.list_transactions_by_sender(ali.id).await.unwrap().is_empty());

    // Same request succeeds once the store recovers.
    faulty.disarm();
    state
        .mutation
        .transfer(transfer_to(ali.id, "03002222222"))
        .await
        .unwrap();
    assert_eq!(balance_of(&inner, ali.id).await, dec!(900));
    assert_eq!(balance_of(&inner, sara.id).await, dec!(100));
}

#[tokio::test]
async fn test_sequential_bill_payment_stays_pending_when_flip_fails() {
    let inner = InMemoryStore::new();
    let faulty = FaultyStore::new(inner.clone(), "mark_bill_paid");
    let state = setup_state_with(Arc::new(faulty), LedgerMode::Sequential).await;
    let ali = create_test_user(&inner, "Ali", "03001111111", "35202-1111111-1", dec!(500)).await;

    let result = state
        .mutation
        .pay_bill(BillPaymentRequest {
            user_id: ali.id,
            category: BillCategory::Gas,
            company_name: "SNGPL".to_string(),
            consumer_number: "998877".to_string(),
            amount: dec!(120),
        })
        .await;
    assert!(result.is_err());

    let bills = inner.list_bills(ali.id).await.unwrap();
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].paid_at, None);
    assert_eq!(balance_of(&inner, ali.id).await, dec!(380));
}

#[tokio::test]
async fn test_atomic_rollback_discards_staged_writes() {
    let (state, store) = setup_state(LedgerMode::Atomic).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(500)).await;

    let mut ledger = LedgerTransaction::begin(state.store.clone(), LedgerMode::Atomic);
    ledger
        .write(LedgerWrite::SetWalletBalance {
            user_id: ali.id,
            balance: dec!(0),
            at: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(ledger.rollback(), 1);
    assert_eq!(balance_of(&store, ali.id).await, dec!(500));
}

#[tokio::test]
async fn test_write_all_stops_at_first_failed_write() {
    let inner = InMemoryStore::new();
    let faulty = FaultyStore::new(inner.clone(), "set_transaction_status");
    let state = setup_state_with(Arc::new(faulty), LedgerMode::Sequential).await;
    let ali = create_test_user(&inner, "Ali", "03001111111", "35202-1111111-1", dec!(500)).await;
    let now = Utc::now();

    let err = LedgerTransaction::begin(state.store.clone(), LedgerMode::Sequential)
        .write_all(vec![
            LedgerWrite::SetWalletBalance {
                user_id: ali.id,
                balance: dec!(400),
                at: now,
            },
            LedgerWrite::SetTransactionStatus {
                id: uuid::Uuid::new_v4(),
                status: TransactionStatus::Completed,
                at: now,
            },
            LedgerWrite::SetWalletBalance {
                user_id: ali.id,
                balance: dec!(300),
                at: now,
            },
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Persistence(_)));

    // The write before the failure stays; the one after never runs.
    assert_eq!(balance_of(&inner, ali.id).await, dec!(400));
}
