// Wallet and bank transfers through the mutation engine


use rust_decimal_macros::dec;
use test_helpers::*;
use wallet_api::error::WalletError;
use wallet_api::models::{ReceiverType, TransactionStatus};
use wallet_api::services::mutation::{LedgerRecord, MutationRequest, TransferRequest};
use wallet_api::store::LedgerStore;
use wallet_api::LedgerMode;

fn transfer(
    sender_id: uuid::Uuid,
    receiver_type: ReceiverType,
    identifier: &str,
    amount: rust_decimal::Decimal,
) -> TransferRequest {
    TransferRequest {
        sender_id,
        receiver_type,
        receiver_identifier: identifier.to_string(),
        amount,
        sender_bank_account: None,
    }
}

#[tokio::test]
async fn test_internal_transfer_conserves_funds() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(1000)).await;
    let sara = create_test_user(&store, "Sara", "03002222222", "35202-2222222-2", dec!(250)).await;

    let outcome = state
        .mutation
        .attempt_mutation(MutationRequest::Transfer(transfer(
            ali.id,
            ReceiverType::JazzCash,
            "03002222222",
            dec!(300.50),
        )))
        .await
        .unwrap();

    assert_eq!(outcome.new_source_balance, dec!(699.50));
    assert_eq!(outcome.new_destination_balance, Some(dec!(550.50)));

    let ali_after = balance_of(&store, ali.id).await;
    let sara_after = balance_of(&store, sara.id).await;
    assert_eq!(ali_after, dec!(699.50));
    assert_eq!(sara_after, dec!(550.50));
    assert_eq!(ali_after + sara_after, dec!(1250));

    let LedgerRecord::Transaction(tx) = outcome.record else {
        panic!("expected a transaction record");
    };
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(tx.receiver_id, Some(sara.id));

    let stored = store.get_transaction(tx.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn test_insufficient_funds_leaves_no_trace() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(100)).await;
    let sara = create_test_user(&store, "Sara", "03002222222", "35202-2222222-2", dec!(0)).await;

    let err = state
        .mutation
        .transfer(transfer(ali.id, ReceiverType::JazzCash, "03002222222", dec!(100.01)))
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::InsufficientFunds));
    assert_eq!(balance_of(&store, ali.id).await, dec!(100));
    assert_eq!(balance_of(&store, sara.id).await, dec!(0));
    assert!(store.list_transactions_by_sender(ali.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cnic_transfer_finds_receiver_by_cnic() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(500)).await;
    let sara = create_test_user(&store, "Sara", "03002222222", "35202-2222222-2", dec!(0)).await;

    state
        .mutation
        .transfer(transfer(ali.id, ReceiverType::Cnic, " 35202-2222222-2 ", dec!(200)))
        .await
        .unwrap();

    assert_eq!(balance_of(&store, sara.id).await, dec!(200));
}

#[tokio::test]
async fn test_unknown_wallet_receiver_is_not_found() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(500)).await;

    let err = state
        .mutation
        .transfer(transfer(ali.id, ReceiverType::OtherWallet, "03009999999", dec!(10)))
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::NotFound(ref m) if m == "Receiver not found"));
    assert_eq!(balance_of(&store, ali.id).await, dec!(500));
    assert!(store.list_transactions_by_sender(ali.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_external_bank_transfer_only_debits() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(1000)).await;

    let outcome = state
        .mutation
        .transfer(transfer(ali.id, ReceiverType::Bank, "0000-OUTSIDE-42", dec!(400)))
        .await
        .unwrap();

    assert_eq!(balance_of(&store, ali.id).await, dec!(600));
    assert_eq!(outcome.new_destination_balance, None);
    assert!(outcome.receiver_bank_account.is_none());

    let LedgerRecord::Transaction(tx) = outcome.record else {
        panic!("expected a transaction record");
    };
    assert_eq!(tx.receiver_id, None);
    assert_eq!(tx.receiver_type, ReceiverType::Bank);
    assert_eq!(tx.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn test_internal_bank_transfer_credits_account_and_wallet() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(1000)).await;
    let sara = create_test_user(&store, "Sara", "03002222222", "35202-2222222-2", dec!(100)).await;
    let account = create_test_bank_account(&store, sara.id, "MEBL", "0101-555", true).await;

    let outcome = state
        .mutation
        .transfer(transfer(ali.id, ReceiverType::Bank, "0101-555", dec!(250)))
        .await
        .unwrap();

    // The receiving account and the owner's wallet are both credited.
    assert_eq!(balance_of(&store, ali.id).await, dec!(750));
    assert_eq!(balance_of(&store, sara.id).await, dec!(350));
    let stored = store.get_bank_account(account.id).await.unwrap().unwrap();
    assert_eq!(stored.balance, dec!(250));
    assert_eq!(
        outcome.receiver_bank_account.map(|a| a.balance),
        Some(dec!(250))
    );
}

#[tokio::test]
async fn test_internal_bank_transfer_matches_iban() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(1000)).await;
    let sara = create_test_user(&store, "Sara", "03002222222", "35202-2222222-2", dec!(0)).await;
    create_test_bank_account(&store, sara.id, "HBL", "777", true).await;

    state
        .mutation
        .transfer(transfer(ali.id, ReceiverType::Bank, "PK00TEST777", dec!(10)))
        .await
        .unwrap();

    assert_eq!(balance_of(&store, sara.id).await, dec!(10));
}

#[tokio::test]
async fn test_sender_bank_account_resolved_by_bank_code() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(1000)).await;
    create_test_bank_account(&store, ali.id, "HBL", "111", false).await;
    let default_hbl = create_test_bank_account(&store, ali.id, "HBL", "222", true).await;

    let mut req = transfer(ali.id, ReceiverType::Bank, "EXTERNAL-1", dec!(10));
    req.sender_bank_account = Some("hbl".to_string());
    let outcome = state.mutation.transfer(req).await.unwrap();

    assert_eq!(outcome.sender_bank_account.map(|a| a.id), Some(default_hbl.id));
}

#[tokio::test]
async fn test_unknown_sender_bank_account_is_a_validation_error() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(1000)).await;
    create_test_bank_account(&store, ali.id, "HBL", "111", true).await;

    let mut req = transfer(ali.id, ReceiverType::Bank, "EXTERNAL-1", dec!(10));
    req.sender_bank_account = Some("Meezan Bank".to_string());
    let err = state.mutation.transfer(req).await.unwrap_err();

    assert!(matches!(err, WalletError::Validation(_)));
    assert_eq!(balance_of(&store, ali.id).await, dec!(1000));
}

#[tokio::test]
async fn test_amount_below_minimum_is_rejected() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(1000)).await;
    create_test_user(&store, "Sara", "03002222222", "35202-2222222-2", dec!(0)).await;

    let err = state
        .mutation
        .transfer(transfer(ali.id, ReceiverType::JazzCash, "03002222222", dec!(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Validation(_)));
}
