use dealdesk::config::Config;
use dealdesk::db::init_db;
use dealdesk::db::repo::IsinRecord;
use dealdesk::domain::{CounterpartyType, Currency, DealStatus, Decimal, Isin, Role};
use dealdesk::engine::{generate_coupon_schedule, CounterpartyLimits};
use dealdesk::lifecycle::{DealService, GsecStatusPatch, NewGsecDeal};
use dealdesk::{AppError, ApprovalLevel, Principal, Repository};
use chrono::NaiveDate;
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

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn user() -> Principal {
    Principal::new("dealer1", Role::User)
}

fn authorizer() -> Principal {
    Principal::new("auth1", Role::Authorizer)
}

fn new_gsec(face_value: &str) -> NewGsecDeal {
    NewGsecDeal {
        trade_type: Some("buy".to_string()),
        counterparty_id: Some(11),
        counterparty_type: Some("individual".to_string()),
        isin: Some("LKG0025A159".to_string()),
        face_value: Some(dec(face_value)),
        value_date: Some(date(2025, 6, 1)),
        maturity_date: Some(date(2027, 1, 15)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_prices_truncate_never_round() {
    let (_repo, service, _temp) = setup().await;

    let input = NewGsecDeal {
        clean_price: Some(dec("98.76549999")),
        accrued_interest: Some(dec("1.23459999")),
        ..new_gsec("1000000")
    };
    let deal = service.create_gsec(input, &user()).await.expect("create failed");

    assert_eq!(deal.clean_price, Some(dec("98.7654")));
    assert_eq!(deal.accrued_interest, Some(dec("1.2345")));
    assert_eq!(deal.dirty_price, Some(dec("99.9999")));
}

#[tokio::test]
async fn test_gsec_posts_balanced_settlement_pair() {
    let (repo, service, _temp) = setup().await;

    let input = NewGsecDeal {
        settlement_amount: Some(dec("987654.3210")),
        ..new_gsec("1000000")
    };
    let deal = service.create_gsec(input, &user()).await.unwrap();

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
    assert_eq!(debits, dec("987654.3210"));
    // Buy side: investments control debited.
    let debit = entries.iter().find(|e| e.debit_amount.is_positive()).unwrap();
    assert_eq!(debit.account_code.as_ref().unwrap().as_str(), "2002");
}

#[tokio::test]
async fn test_gsec_limit_denied_with_exact_excess() {
    let (repo, service, _temp) = setup().await;

    let lkr = Currency::new("LKR".to_string());
    repo.upsert_counterparty_limits(
        11,
        CounterpartyType::Individual,
        &lkr,
        &CounterpartyLimits {
            product_gsec_limit: dec("1000000"),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    service
        .create_gsec(new_gsec("900000"), &user())
        .await
        .expect("seed deal failed");

    let result = service.create_gsec(new_gsec("200000"), &user()).await;
    match result {
        Err(AppError::LimitExceeded(breach)) => {
            assert_eq!(breach.product_excess, dec("100000"));
            assert_eq!(breach.current_product_exposure, dec("900000"));
            assert_eq!(breach.product_limit, dec("1000000"));
        }
        other => panic!("expected limit denial, got {:?}", other.map(|d| d.deal_number)),
    }
}

#[tokio::test]
async fn test_gsec_fail_open_without_limit_row() {
    let (_repo, service, _temp) = setup().await;
    // No limits configured for counterparty 11: any face value passes.
    let result = service.create_gsec(new_gsec("99999999999"), &user()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_coupon_window_filled_from_isin_master() {
    let (repo, service, _temp) = setup().await;

    let isin = "LKG0025A159";
    let schedule = generate_coupon_schedule(
        date(2025, 1, 15),
        date(2027, 1, 15),
        dec("10"),
        dec("100"),
    );
    repo.insert_isin_with_schedule(
        &IsinRecord {
            isin: Isin::new(isin.to_string()),
            issuer: "CBSL".to_string(),
            issue_date: date(2025, 1, 15),
            maturity_date: date(2027, 1, 15),
            coupon_rate: dec("10"),
            series: Some("A".to_string()),
            day_basis: 365,
            currency: Currency::new("LKR".to_string()),
        },
        &schedule,
    )
    .await
    .unwrap();

    // Value date 2025-06-01 sits before the first coupon: the window
    // degenerates to the first two entries.
    let deal = service.create_gsec(new_gsec("365000"), &user()).await.unwrap();
    assert_eq!(deal.last_coupon_date, Some(date(2025, 7, 15)));
    assert_eq!(deal.next_coupon_date, Some(date(2026, 1, 15)));
    // 365,000 face at 10% over a 365-day basis: 100 per day.
    assert_eq!(deal.per_day_accrual, Some(dec("100")));
    assert_eq!(deal.issue_date, Some(date(2025, 1, 15)));
}

#[tokio::test]
async fn test_accrued_interest_derived_from_coupon_window() {
    let (repo, service, _temp) = setup().await;

    let isin = "LKG0025A159";
    let schedule = generate_coupon_schedule(
        date(2025, 1, 15),
        date(2027, 1, 15),
        dec("10"),
        dec("100"),
    );
    repo.insert_isin_with_schedule(
        &IsinRecord {
            isin: Isin::new(isin.to_string()),
            issuer: "CBSL".to_string(),
            issue_date: date(2025, 1, 15),
            maturity_date: date(2027, 1, 15),
            coupon_rate: dec("10"),
            series: None,
            day_basis: 365,
            currency: Currency::new("LKR".to_string()),
        },
        &schedule,
    )
    .await
    .unwrap();

    // 2025-10-15 sits exactly halfway through the 2025-07-15 .. 2026-01-15
    // period (92 of 184 days): half of one period coupon accrues.
    let input = NewGsecDeal {
        value_date: Some(date(2025, 10, 15)),
        ..new_gsec("365000")
    };
    let deal = service.create_gsec(input, &user()).await.unwrap();

    assert_eq!(deal.last_coupon_date, Some(date(2025, 7, 15)));
    assert_eq!(deal.next_coupon_date, Some(date(2026, 1, 15)));
    // Period coupon: 365000 * 10 / 200 = 18250; half accrued = 9125.
    assert_eq!(deal.accrued_interest, Some(dec("9125")));
}

#[tokio::test]
async fn test_gsec_back_office_rejection_resets() {
    let (_repo, service, _temp) = setup().await;

    let deal = service.create_gsec(new_gsec("500000"), &user()).await.unwrap();
    let deal_number = deal.deal_number.as_str().to_string();

    let approve = GsecStatusPatch {
        status: Some("approved".to_string()),
        ..Default::default()
    };
    let deal = service
        .update_gsec_status(&deal_number, approve, &authorizer())
        .await
        .unwrap();
    assert_eq!(deal.current_approval_level, ApprovalLevel::BackOfficeVerifier);

    let reject = GsecStatusPatch {
        status: Some("rejected".to_string()),
        comment: Some("ISIN mismatch".to_string()),
        ..Default::default()
    };
    let deal = service
        .update_gsec_status(&deal_number, reject, &authorizer())
        .await
        .unwrap();
    assert_eq!(deal.status, DealStatus::Pending);
    assert_eq!(deal.current_approval_level, ApprovalLevel::FrontOffice);
}

#[tokio::test]
async fn test_gsec_rejection_requires_comment() {
    let (_repo, service, _temp) = setup().await;

    let deal = service.create_gsec(new_gsec("500000"), &user()).await.unwrap();

    let reject = GsecStatusPatch {
        status: Some("rejected".to_string()),
        ..Default::default()
    };
    let result = service
        .update_gsec_status(deal.deal_number.as_str(), reject, &authorizer())
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_gsec_missing_required_fields() {
    let (_repo, service, _temp) = setup().await;

    let result = service
        .create_gsec(
            NewGsecDeal {
                face_value: None,
                ..new_gsec("0")
            },
            &user(),
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}
