use dealdesk::config::Config;
use dealdesk::db::init_db;
use dealdesk::domain::{CounterpartyType, Currency, DealStatus, Decimal, ProductType, Role};
use dealdesk::engine::CounterpartyLimits;
use dealdesk::lifecycle::{DealService, NewTransaction, TransactionPatch};
use dealdesk::{AppError, ApprovalLevel, Principal, Repository};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;

fn test_config(db_path: &str) -> Config {
    Config {
        port: 0,
        database_path: db_path.to_string(),
        default_currency: "LKR".to_string(),
        recent_deals_limit: 10,
    }
}

async fn setup() -> (Arc<Repository>, DealService, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let service = DealService::new(repo.clone(), &test_config(&db_path));
    (repo, service, temp_dir)
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn user() -> Principal {
    Principal::new("dealer1", Role::User)
}

fn authorizer() -> Principal {
    Principal::new("auth1", Role::Authorizer)
}

fn new_transaction(amount: &str) -> NewTransaction {
    NewTransaction {
        amount: Some(dec(amount)),
        description: Some("FD placement".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_transaction_posts_balanced_ledger_pair() {
    let (repo, service, _temp) = setup().await;

    let deal = service
        .create_transaction(new_transaction("250000.50"), &user())
        .await
        .expect("create failed");

    assert_eq!(deal.status, DealStatus::Pending);
    assert_eq!(deal.current_approval_level, ApprovalLevel::FrontOffice);
    assert_eq!(deal.submitted_by, "dealer1");
    assert!(deal.deal_number.as_str().len() >= 12);

    let entries = repo
        .ledger_entries_for_deal(deal.deal_number.as_str())
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);

    let (debits, credits) = repo
        .deal_posting_totals(deal.deal_number.as_str())
        .await
        .unwrap();
    assert_eq!(debits, credits);
    assert_eq!(debits, dec("250000.50"));
}

#[tokio::test]
async fn test_negative_amount_posts_expense_pair() {
    let (repo, service, _temp) = setup().await;

    let deal = service
        .create_transaction(new_transaction("-1200"), &user())
        .await
        .expect("create failed");

    let entries = repo
        .ledger_entries_for_deal(deal.deal_number.as_str())
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    // Expense pair: debit 9001, credit 1001, both at magnitude.
    let debit = entries.iter().find(|e| e.debit_amount.is_positive()).unwrap();
    let credit = entries.iter().find(|e| e.credit_amount.is_positive()).unwrap();
    assert_eq!(debit.account_code.as_ref().unwrap().as_str(), "9001");
    assert_eq!(credit.account_code.as_ref().unwrap().as_str(), "1001");
    assert_eq!(debit.debit_amount, dec("1200"));
}

#[tokio::test]
async fn test_create_adjusts_source_account_balance() {
    let (repo, service, _temp) = setup().await;
    let account_id = repo.create_account("Desk float", dec("1000")).await.unwrap();

    let input = NewTransaction {
        source_account_id: Some(account_id),
        ..new_transaction("500")
    };
    service.create_transaction(input, &user()).await.unwrap();

    assert_eq!(
        repo.account_balance(account_id).await.unwrap(),
        Some(dec("1500"))
    );
}

#[tokio::test]
async fn test_missing_amount_is_validation_error() {
    let (_repo, service, _temp) = setup().await;

    let result = service
        .create_transaction(NewTransaction::default(), &user())
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_limit_denial_aborts_creation_entirely() {
    let (repo, service, _temp) = setup().await;

    let lkr = Currency::new("LKR".to_string());
    repo.upsert_counterparty_limits(
        7,
        CounterpartyType::Individual,
        &lkr,
        &CounterpartyLimits {
            product_transaction_limit: dec("1000000"),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    // Existing exposure: 900,000.
    let seed = NewTransaction {
        counterparty_id: Some(7),
        counterparty_type: Some("individual".to_string()),
        ..new_transaction("900000")
    };
    service.create_transaction(seed, &user()).await.unwrap();

    // A further 200,000 breaches by exactly 100,000.
    let breach = NewTransaction {
        counterparty_id: Some(7),
        counterparty_type: Some("individual".to_string()),
        ..new_transaction("200000")
    };
    let result = service.create_transaction(breach, &user()).await;
    match result {
        Err(AppError::LimitExceeded(breach)) => {
            assert_eq!(breach.product_excess, dec("100000"));
            assert_eq!(breach.current_product_exposure, dec("900000"));
            assert_eq!(breach.product_limit, dec("1000000"));
        }
        other => panic!("expected limit denial, got {:?}", other.map(|d| d.deal_number)),
    }

    // Nothing from the denied deal persisted.
    let recent = repo.recent_transactions(10).await.unwrap();
    assert_eq!(recent.len(), 1);
}

#[tokio::test]
async fn test_no_limit_row_is_fail_open() {
    // Deliberate carry-over: an unconfigured counterparty is unlimited.
    let (_repo, service, _temp) = setup().await;

    let input = NewTransaction {
        counterparty_id: Some(99),
        counterparty_type: Some("joint".to_string()),
        ..new_transaction("999999999")
    };
    let result = service.create_transaction(input, &user()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_product_dimension_follows_transaction_type() {
    let (repo, service, _temp) = setup().await;

    let type_id = repo
        .insert_transaction_type("Interbank Repo", ProductType::Repo)
        .await
        .unwrap();
    let lkr = Currency::new("LKR".to_string());
    repo.upsert_counterparty_limits(
        3,
        CounterpartyType::Individual,
        &lkr,
        &CounterpartyLimits {
            product_repo_limit: dec("100000"),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let input = NewTransaction {
        counterparty_id: Some(3),
        counterparty_type: Some("individual".to_string()),
        transaction_type_id: Some(type_id),
        ..new_transaction("150000")
    };
    let result = service.create_transaction(input, &user()).await;
    assert!(matches!(result, Err(AppError::LimitExceeded(_))));
}

#[tokio::test]
async fn test_rejection_without_comment_fails() {
    let (_repo, service, _temp) = setup().await;

    let deal = service
        .create_transaction(new_transaction("1000"), &user())
        .await
        .unwrap();

    let patch = TransactionPatch {
        status: Some("rejected".to_string()),
        ..Default::default()
    };
    let result = service
        .update_transaction(deal.deal_number.as_str(), patch, &authorizer())
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_back_office_rejection_resets_to_front_office() {
    let (_repo, service, _temp) = setup().await;

    let deal = service
        .create_transaction(new_transaction("1000"), &user())
        .await
        .unwrap();
    let deal_number = deal.deal_number.as_str().to_string();

    // Front-office approval moves the deal to the verifier level.
    let approve = TransactionPatch {
        status: Some("approved".to_string()),
        ..Default::default()
    };
    let deal = service
        .update_transaction(&deal_number, approve, &authorizer())
        .await
        .unwrap();
    assert_eq!(deal.current_approval_level, ApprovalLevel::BackOfficeVerifier);
    assert_eq!(deal.status, DealStatus::Pending);

    // Back-office rejection sends it back to the start, creator regardless.
    let reject = TransactionPatch {
        status: Some("rejected".to_string()),
        comment: Some("face value mismatch".to_string()),
        ..Default::default()
    };
    let deal = service
        .update_transaction(&deal_number, reject, &authorizer())
        .await
        .unwrap();
    assert_eq!(deal.status, DealStatus::Pending);
    assert_eq!(deal.approval_status, DealStatus::Pending);
    assert_eq!(deal.current_approval_level, ApprovalLevel::FrontOffice);
    assert_eq!(deal.approval_chain.len(), 2);
    assert_eq!(deal.comment.as_deref(), Some("face value mismatch"));
}

#[tokio::test]
async fn test_full_ladder_approval_is_terminal() {
    let (_repo, service, _temp) = setup().await;

    let deal = service
        .create_transaction(new_transaction("1000"), &user())
        .await
        .unwrap();
    let deal_number = deal.deal_number.as_str().to_string();

    // front_office -> back_office_verifier -> back_office_final -> approved.
    let mut deal = deal;
    for _ in 0..3 {
        let approve = TransactionPatch {
            status: Some("approved".to_string()),
            ..Default::default()
        };
        deal = service
            .update_transaction(&deal_number, approve, &authorizer())
            .await
            .unwrap();
    }

    assert_eq!(deal.status, DealStatus::Approved);
    assert_eq!(deal.current_approval_level, ApprovalLevel::BackOfficeFinal);
    assert_eq!(deal.approval_chain.len(), 3);
}

#[tokio::test]
async fn test_non_authorizer_cannot_update_status() {
    let (_repo, service, _temp) = setup().await;

    let deal = service
        .create_transaction(new_transaction("1000"), &user())
        .await
        .unwrap();

    let patch = TransactionPatch {
        status: Some("approved".to_string()),
        ..Default::default()
    };
    let result = service
        .update_transaction(deal.deal_number.as_str(), patch, &user())
        .await;
    assert!(matches!(result, Err(AppError::Permission(_))));
}

#[tokio::test]
async fn test_authorizer_cannot_edit_business_fields() {
    let (_repo, service, _temp) = setup().await;

    let deal = service
        .create_transaction(new_transaction("1000"), &user())
        .await
        .unwrap();

    let patch = TransactionPatch {
        amount: Some(dec("2000")),
        ..Default::default()
    };
    let result = service
        .update_transaction(deal.deal_number.as_str(), patch, &authorizer())
        .await;
    assert!(matches!(result, Err(AppError::Permission(_))));
}

#[tokio::test]
async fn test_authorizer_escalation_moves_workflow_only() {
    let (_repo, service, _temp) = setup().await;

    let deal = service
        .create_transaction(new_transaction("1000"), &user())
        .await
        .unwrap();

    let patch = TransactionPatch {
        approval_status: Some("approved".to_string()),
        current_approval_level: Some("back_office_final".to_string()),
        ..Default::default()
    };
    let updated = service
        .update_transaction(deal.deal_number.as_str(), patch, &authorizer())
        .await
        .unwrap();
    assert_eq!(updated.approval_status, DealStatus::Approved);
    assert_eq!(updated.current_approval_level, ApprovalLevel::BackOfficeFinal);
    assert_eq!(updated.amount, deal.amount);
    assert_eq!(updated.status, DealStatus::Pending);
}

#[tokio::test]
async fn test_field_edit_resets_status_and_reposts_ledger() {
    let (repo, service, _temp) = setup().await;
    let account_id = repo.create_account("Desk float", dec("0")).await.unwrap();

    let input = NewTransaction {
        source_account_id: Some(account_id),
        ..new_transaction("500")
    };
    let deal = service.create_transaction(input, &user()).await.unwrap();
    let deal_number = deal.deal_number.as_str().to_string();

    let patch = TransactionPatch {
        amount: Some(dec("800")),
        ..Default::default()
    };
    let updated = service
        .update_transaction(&deal_number, patch, &user())
        .await
        .unwrap();

    assert_eq!(updated.amount, dec("800"));
    assert_eq!(updated.status, DealStatus::Pending);
    assert_eq!(
        repo.account_balance(account_id).await.unwrap(),
        Some(dec("800"))
    );

    // Old pair replaced, not stacked.
    let entries = repo.ledger_entries_for_deal(&deal_number).await.unwrap();
    assert_eq!(entries.len(), 2);
    let (debits, credits) = repo.deal_posting_totals(&deal_number).await.unwrap();
    assert_eq!(debits, credits);
    assert_eq!(debits, dec("800"));
}

#[tokio::test]
async fn test_moving_deal_between_accounts_rebalances_both() {
    let (repo, service, _temp) = setup().await;
    let first = repo.create_account("Account A", dec("0")).await.unwrap();
    let second = repo.create_account("Account B", dec("0")).await.unwrap();

    let input = NewTransaction {
        source_account_id: Some(first),
        ..new_transaction("300")
    };
    let deal = service.create_transaction(input, &user()).await.unwrap();

    let patch = TransactionPatch {
        source_account_id: Some(second),
        amount: Some(dec("300")),
        ..Default::default()
    };
    service
        .update_transaction(deal.deal_number.as_str(), patch, &user())
        .await
        .unwrap();

    assert_eq!(repo.account_balance(first).await.unwrap(), Some(dec("0")));
    assert_eq!(repo.account_balance(second).await.unwrap(), Some(dec("300")));
}

#[tokio::test]
async fn test_delete_reverses_balance_and_ledger() {
    let (repo, service, _temp) = setup().await;
    let account_id = repo.create_account("Desk float", dec("100")).await.unwrap();

    let input = NewTransaction {
        source_account_id: Some(account_id),
        ..new_transaction("400")
    };
    let deal = service.create_transaction(input, &user()).await.unwrap();
    let deal_number = deal.deal_number.as_str().to_string();

    service.delete_transaction(&deal_number).await.unwrap();

    assert_eq!(
        repo.account_balance(account_id).await.unwrap(),
        Some(dec("100"))
    );
    let entries = repo.ledger_entries_for_deal(&deal_number).await.unwrap();
    assert!(entries.is_empty());
    assert!(repo.get_transaction(&deal_number).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_missing_deal_is_not_found() {
    let (_repo, service, _temp) = setup().await;
    let result = service.delete_transaction("20990101XXXX").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_concurrent_creates_never_share_a_deal_number() {
    let (_repo, service, _temp) = setup().await;
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .create_transaction(new_transaction(&format!("{}", 1000 + i)), &user())
                .await
        }));
    }

    let mut numbers = std::collections::HashSet::new();
    for handle in handles {
        let deal = handle.await.unwrap().expect("create failed");
        assert!(
            numbers.insert(deal.deal_number.as_str().to_string()),
            "duplicate deal number issued"
        );
    }
    assert_eq!(numbers.len(), 8);
}
