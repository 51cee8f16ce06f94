// Registration, login, bank accounts and bank lookup


use rust_decimal_macros::dec;
use test_helpers::*;
use wallet_api::error::WalletError;
use wallet_api::services::accounts::{
    BankAccountInput, BankAccountUpdate, NewBankAccount, ProfileUpdate, Registration,
};
use wallet_api::services::DirectoryResolver;
use wallet_api::store::LedgerStore;
use wallet_api::LedgerMode;

fn registration(email: &str, phone: &str, cnic: &str) -> Registration {
    Registration {
        name: "Ayesha Khan".to_string(),
        email: email.to_string(),
        password: "secret123".to_string(),
        phone: phone.to_string(),
        cnic: cnic.to_string(),
        picture: None,
        bank_accounts: Vec::new(),
    }
}

fn linked(bank: &str, number: &str) -> BankAccountInput {
    BankAccountInput {
        bank: bank.to_string(),
        account_title: "Ayesha Khan".to_string(),
        account_number: number.to_string(),
        iban: None,
    }
}

#[tokio::test]
async fn test_register_links_banks_by_code_and_name() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;

    let mut reg = registration("Ayesha@Example.com", "03331234567", "42101-1234567-1");
    reg.bank_accounts = vec![linked("MEBL", "0101"), linked("habib bank limited", "0202")];
    let (user, accounts) = state.accounts.register(reg).await.unwrap();

    assert_eq!(user.email, "ayesha@example.com");
    assert_eq!(user.balance, dec!(1000));
    assert_ne!(user.password_hash, "secret123");

    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].bank.as_ref().map(|b| b.code.as_str()), Some("MEBL"));
    assert_eq!(accounts[1].bank.as_ref().map(|b| b.code.as_str()), Some("HBL"));
    assert!(accounts[0].account.is_default);
    assert!(!accounts[1].account.is_default);
    assert_eq!(store.count_default_bank_accounts(user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_bank_aborts_registration() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;

    let mut reg = registration("ayesha@example.com", "03331234567", "42101-1234567-1");
    reg.bank_accounts = vec![linked("MEBL", "0101"), linked("NotABank", "0202")];
    let err = state.accounts.register(reg).await.unwrap_err();

    assert!(matches!(err, WalletError::Validation(ref m) if m.starts_with("Bank account 2")));
    assert!(store.find_user_by_email("ayesha@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_identity_is_a_conflict() {
    let (state, _store) = setup_state(LedgerMode::Sequential).await;
    state
        .accounts
        .register(registration("ayesha@example.com", "03331234567", "42101-1234567-1"))
        .await
        .unwrap();

    // Same phone, different email and CNIC.
    let err = state
        .accounts
        .register(registration("other@example.com", "03331234567", "42101-7654321-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Conflict(_)));
}

#[tokio::test]
async fn test_registration_field_checks() {
    let (state, _store) = setup_state(LedgerMode::Sequential).await;

    let mut reg = registration("not-an-email", "03331234567", "42101-1234567-1");
    assert!(matches!(
        state.accounts.register(reg.clone()).await,
        Err(WalletError::Validation(_))
    ));

    reg.email = "ayesha@example.com".to_string();
    reg.password = "12345".to_string();
    assert!(matches!(
        state.accounts.register(reg).await,
        Err(WalletError::Validation(_))
    ));
}

#[tokio::test]
async fn test_login_checks_password() {
    let (state, _store) = setup_state(LedgerMode::Sequential).await;
    let (user, _) = state
        .accounts
        .register(registration("ayesha@example.com", "03331234567", "42101-1234567-1"))
        .await
        .unwrap();

    let logged_in = state
        .accounts
        .login(" AYESHA@example.com ", "secret123")
        .await
        .unwrap();
    assert_eq!(logged_in.id, user.id);

    let err = state
        .accounts
        .login("ayesha@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Unauthenticated(ref m) if m == "Invalid credentials"));

    let err = state
        .accounts
        .login("nobody@example.com", "secret123")
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_profile_update_is_owner_only() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(0)).await;
    let sara = create_test_user(&store, "Sara", "03002222222", "35202-2222222-2", dec!(0)).await;

    let update = ProfileUpdate {
        name: Some("Ali Raza".to_string()),
        ..Default::default()
    };
    let err = state
        .accounts
        .update_profile(sara.id, ali.id, update.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Unauthorized(_)));

    let updated = state.accounts.update_profile(ali.id, ali.id, update).await.unwrap();
    assert_eq!(updated.name, "Ali Raza");
    assert_eq!(updated.phone, "03001111111");
    assert_eq!(store.get_user(ali.id).await.unwrap().unwrap().name, "Ali Raza");
}

#[tokio::test]
async fn test_profile_update_cannot_take_another_users_phone_or_email() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(0)).await;
    let bilal = create_test_user(&store, "Bilal", "03002222222", "35202-2222222-2", dec!(0)).await;

    let err = state
        .accounts
        .update_profile(
            ali.id,
            ali.id,
            ProfileUpdate {
                phone: Some(bilal.phone.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Conflict(_)));

    let err = state
        .accounts
        .update_profile(
            ali.id,
            ali.id,
            ProfileUpdate {
                email: Some(bilal.email.to_uppercase()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Conflict(_)));

    let owner = store.find_user_by_phone("03002222222").await.unwrap().unwrap();
    assert_eq!(owner.id, bilal.id);
    assert_eq!(store.get_user(ali.id).await.unwrap().unwrap().phone, "03001111111");

    // Resubmitting one's own phone and email is not a clash.
    let updated = state
        .accounts
        .update_profile(
            ali.id,
            ali.id,
            ProfileUpdate {
                email: Some(ali.email.clone()),
                phone: Some(ali.phone.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.phone, "03001111111");
}

#[tokio::test]
async fn test_single_default_bank_account() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(0)).await;

    // First account is made default even when not asked.
    let first = state
        .accounts
        .add_bank_account(
            ali.id,
            NewBankAccount {
                bank: "UBL".to_string(),
                account_title: "Ali".to_string(),
                account_number: "1001".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(first.account.is_default);

    let second = state
        .accounts
        .add_bank_account(
            ali.id,
            NewBankAccount {
                bank: "Meezan Bank".to_string(),
                account_title: "Ali".to_string(),
                account_number: "2002".to_string(),
                is_default: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(second.account.is_default);

    let first_now = store.get_bank_account(first.account.id).await.unwrap().unwrap();
    assert!(!first_now.is_default);
    assert_eq!(store.count_default_bank_accounts(ali.id).await.unwrap(), 1);

    // Promoting the first one back demotes the second.
    state
        .accounts
        .update_bank_account(
            ali.id,
            first.account.id,
            BankAccountUpdate {
                is_default: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let listed = state.accounts.list_bank_accounts(ali.id, ali.id).await.unwrap();
    assert_eq!(listed[0].account.id, first.account.id);
    assert_eq!(store.count_default_bank_accounts(ali.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_add_bank_account_with_unknown_bank() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(0)).await;

    let err = state
        .accounts
        .add_bank_account(
            ali.id,
            NewBankAccount {
                bank: "NotABank".to_string(),
                account_title: "Ali".to_string(),
                account_number: "1001".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NotFound(_)));
}

#[tokio::test]
async fn test_deleted_account_is_hidden_but_kept() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let ali = create_test_user(&store, "Ali", "03001111111", "35202-1111111-1", dec!(0)).await;
    let sara = create_test_user(&store, "Sara", "03002222222", "35202-2222222-2", dec!(0)).await;
    let account = create_test_bank_account(&store, ali.id, "NBP", "3003", true).await;

    let err = state
        .accounts
        .delete_bank_account(sara.id, account.id)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NotFound(_)));

    state.accounts.delete_bank_account(ali.id, account.id).await.unwrap();

    assert!(state
        .accounts
        .list_bank_accounts(ali.id, ali.id)
        .await
        .unwrap()
        .is_empty());
    let stored = store.get_bank_account(account.id).await.unwrap().unwrap();
    assert!(!stored.is_active);
    assert!(store
        .find_active_bank_account_by_number("3003")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_bank_resolution_precedence() {
    let (state, store) = setup_state(LedgerMode::Sequential).await;
    let resolver = DirectoryResolver::new(state.store.clone());
    let meezan = bank_by_code(&store, "MEBL").await;

    for identifier in ["MEBL", "mebl", " Meezan Bank ", "meezan"] {
        let bank = resolver.resolve_bank(identifier).await.unwrap();
        assert_eq!(bank.map(|b| b.id), Some(meezan.id), "identifier {:?}", identifier);
    }

    let by_id = resolver.resolve_bank(&meezan.id.to_string()).await.unwrap();
    assert_eq!(by_id.map(|b| b.code), Some("MEBL".to_string()));

    assert!(resolver.resolve_bank("NotABank").await.unwrap().is_none());
    assert!(resolver.resolve_bank("").await.unwrap().is_none());
}
