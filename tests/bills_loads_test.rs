// Bill payments and airtime loads


use rust_decimal_macros::dec;
use test_helpers::*;
use wallet_api::error::WalletError;
use wallet_api::models::{BillCategory, BillStatus, LoadStatus, LoadType, Operator};
use wallet_api::services::mutation::{
    BillPaymentRequest, LedgerRecord, LoadPurchaseRequest, MutationRequest,
};
use wallet_api::store::LedgerStore;
use wallet_api::LedgerMode;

fn electricity_bill(user_id: uuid::Uuid, amount: rust_decimal::Decimal) -> BillPaymentRequest {
    BillPaymentRequest {
        user_id,
        category: BillCategory::Electricity,
        company_name: "LESCO".to_string(),
        consumer_number: "04 11111 2222222".to_string(),
        amount,
    }
}

fn prepaid(user_id: uuid::Uuid, amount: rust_decimal::Decimal) -> LoadPurchaseRequest {
    LoadPurchaseRequest {
        user_id,
        load_type: LoadType::Prepaid,
        mobile_number: "03005555555".to_string(),
        operator: Operator::Jazz,
        amount,
        package_name: Some("ignored for prepaid".to_string()),
    }
}

#[tokio::test]
async fn test_bill_goes_from_pending_to_paid_once() {
    for mode in [LedgerMode::Sequential, LedgerMode::Atomic] {
        let (state, store) = setup_state(mode).await;
        let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(1000)).await;

        let outcome = state
            .mutation
            .attempt_mutation(MutationRequest::PayBill(electricity_bill(ali.id, dec!(2450.75))))
            .await
            .unwrap_err();
        assert!(matches!(outcome, WalletError::InsufficientFunds));
        assert!(store.list_bills(ali.id).await.unwrap().is_empty());

        let outcome = state
            .mutation
            .pay_bill(electricity_bill(ali.id, dec!(450.75)))
            .await
            .unwrap();
        let LedgerRecord::Bill(bill) = outcome.record else {
            panic!("expected a bill record");
        };
        assert_eq!(bill.status, BillStatus::Paid);
        assert!(bill.paid_at.is_some());

        let stored = store.get_bill(bill.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BillStatus::Paid);
        assert_eq!(stored.paid_at, bill.paid_at);
        assert_eq!(balance_of(&store, ali.id).await, dec!(549.25));
    }
}

#[tokio::test]
async fn test_bill_requires_company_and_consumer_number() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(1000)).await;

    let mut req = electricity_bill(ali.id, dec!(10));
    req.consumer_number = "   ".to_string();
    let err = state.mutation.pay_bill(req).await.unwrap_err();
    assert!(matches!(err, WalletError::Validation(_)));
}

#[tokio::test]
async fn test_prepaid_load_debits_and_drops_package_name() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(300)).await;

    let outcome = state.mutation.purchase_load(prepaid(ali.id, dec!(100))).await.unwrap();
    let LedgerRecord::Load(load) = outcome.record else {
        panic!("expected a load record");
    };
    assert_eq!(load.status, LoadStatus::Successful);
    assert_eq!(load.package_name, None);
    assert_eq!(outcome.new_source_balance, dec!(200));
    assert_eq!(balance_of(&store, ali.id).await, dec!(200));
    assert_eq!(store.list_loads(ali.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_package_load_needs_package_name() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(300)).await;

    let mut req = prepaid(ali.id, dec!(50));
    req.load_type = LoadType::Package;
    req.package_name = None;
    let err = state.mutation.purchase_load(req.clone()).await.unwrap_err();
    assert!(matches!(err, WalletError::Validation(_)));

    req.package_name = Some("Monthly Super".to_string());
    let outcome = state.mutation.purchase_load(req).await.unwrap();
    let LedgerRecord::Load(load) = outcome.record else {
        panic!("expected a load record");
    };
    assert_eq!(load.package_name.as_deref(), Some("Monthly Super"));
    assert_eq!(balance_of(&store, ali.id).await, dec!(250));
}

#[tokio::test]
async fn test_load_beyond_balance_is_refused() {
    let (state, store) = setup_state(LedgerMode::Atomic).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(20)).await;

    let err = state.mutation.purchase_load(prepaid(ali.id, dec!(20.01))).await.unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds));
    assert!(store.list_loads(ali.id).await.unwrap().is_empty());
    assert_eq!(balance_of(&store, ali.id).await, dec!(20));
}
