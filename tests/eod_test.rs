use dealdesk::config::Config;
use dealdesk::db::init_db;
use dealdesk::domain::{DealStatus, Decimal, Role};
use dealdesk::lifecycle::{DealService, EodRunner, NewGsecDeal, NewMoneyMarketDeal};
use dealdesk::{AppError, Principal, Repository};
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

async fn setup() -> (Arc<Repository>, DealService, EodRunner, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let service = DealService::new(repo.clone(), &test_config(&db_path));
    let eod = EodRunner::new(repo.clone());
    (repo, service, eod, temp_dir)
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

fn lending_deal() -> NewMoneyMarketDeal {
    NewMoneyMarketDeal {
        trade_date: Some(date(2025, 6, 1)),
        value_date: Some(date(2025, 6, 1)),
        maturity_date: Some(date(2025, 12, 1)),
        counterparty_id: Some(5),
        product_code: Some("MMAR".to_string()),
        deal_type: Some("lending".to_string()),
        principal_amount: Some(dec("365000")),
        interest_rate: Some(dec("10")),
        tenor: Some(183),
        ..Default::default()
    }
}

fn gsec_deal(per_day: &str) -> NewGsecDeal {
    NewGsecDeal {
        trade_type: Some("buy".to_string()),
        counterparty_id: Some(6),
        counterparty_type: Some("individual".to_string()),
        isin: Some("LKG0027B001".to_string()),
        face_value: Some(dec("1000000")),
        value_date: Some(date(2025, 6, 1)),
        maturity_date: Some(date(2027, 6, 1)),
        per_day_accrual: Some(dec(per_day)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_eod_requires_system_day() {
    let (_repo, _service, eod, _temp) = setup().await;
    let result = eod.run().await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_eod_posts_accruals_and_advances_day() {
    let (repo, service, eod, _temp) = setup().await;
    let system_day = date(2025, 6, 10);
    repo.set_system_day(system_day).await.unwrap();

    let mm = service
        .create_money_market(lending_deal(), &user())
        .await
        .unwrap();
    // 365,000 at 10% over 365 days: 100 per day.
    assert_eq!(mm.per_day_interest, Some(dec("100")));
    assert_eq!(mm.status, DealStatus::Pending);

    let gsec = service.create_gsec(gsec_deal("50"), &user()).await.unwrap();

    let result = eod.run().await.expect("EOD failed");
    assert_eq!(result.posted_money_market, 1);
    assert_eq!(result.posted_gsec, 1);
    assert_eq!(result.next_system_day, date(2025, 6, 11));
    assert_eq!(repo.get_system_day().await.unwrap(), Some(date(2025, 6, 11)));

    // Each deal got one balanced accrual pair dated at the system day, on
    // top of its settlement pair from capture.
    let mm_entries = repo
        .ledger_entries_for_deal(mm.deal_number.as_str())
        .await
        .unwrap();
    assert_eq!(mm_entries.len(), 4);
    let accruals: Vec<_> = mm_entries
        .iter()
        .filter(|e| e.entry_date == system_day)
        .collect();
    assert_eq!(accruals.len(), 2);
    let (debits, credits) = repo
        .deal_posting_totals(mm.deal_number.as_str())
        .await
        .unwrap();
    assert_eq!(debits, credits);

    let (debits, credits) = repo
        .deal_posting_totals(gsec.deal_number.as_str())
        .await
        .unwrap();
    assert_eq!(debits, credits);
}

#[tokio::test]
async fn test_eod_is_idempotent_per_deal_per_day() {
    let (repo, service, eod, _temp) = setup().await;
    let system_day = date(2025, 6, 10);
    repo.set_system_day(system_day).await.unwrap();

    let mm = service
        .create_money_market(lending_deal(), &user())
        .await
        .unwrap();

    let first = eod.run().await.unwrap();
    assert_eq!(first.posted_money_market, 1);

    // Rewind the business date and run again: the (deal, day) guard must
    // refuse a second posting for the same day.
    repo.set_system_day(system_day).await.unwrap();
    let second = eod.run().await.unwrap();
    assert_eq!(second.posted_money_market, 0);
    assert_eq!(second.skipped, 1);

    let entries = repo
        .ledger_entries_for_deal(mm.deal_number.as_str())
        .await
        .unwrap();
    let accruals: Vec<_> = entries
        .iter()
        .filter(|e| e.entry_date == system_day)
        .collect();
    assert_eq!(accruals.len(), 2, "accrual pair must not be duplicated");
}

#[tokio::test]
async fn test_eod_skips_malformed_rows_without_failing() {
    let (repo, service, eod, _temp) = setup().await;
    repo.set_system_day(date(2025, 6, 10)).await.unwrap();

    service
        .create_money_market(lending_deal(), &user())
        .await
        .unwrap();

    // Legacy rows: non-numeric per-day interest, unrecognized deal type.
    sqlx::query(
        r#"
        INSERT INTO money_market_deals
            (deal_number, trade_date, value_date, maturity_date, counterparty_id,
             product_code, deal_type, currency, principal_amount, interest_rate,
             tenor, per_day_interest, status)
        VALUES
            ('20250601MMAR9998', '2025-06-01', '2025-06-01', '2025-12-01', 5,
             'MMAR', 'lending', 'LKR', '100000', '8', 30, 'not-a-number', 'pending'),
            ('20250601MMAR9999', '2025-06-01', '2025-06-01', '2025-12-01', 5,
             'MMAR', 'swap', 'LKR', '100000', '8', 30, '12.5', 'pending')
        "#,
    )
    .execute(repo.pool())
    .await
    .unwrap();

    let result = eod.run().await.expect("EOD must not fail on bad rows");
    assert_eq!(result.posted_money_market, 1);
    assert_eq!(result.skipped, 2);
}

#[tokio::test]
async fn test_eod_skips_matured_gsec() {
    let (repo, service, eod, _temp) = setup().await;
    service.create_gsec(gsec_deal("50"), &user()).await.unwrap();

    // System day beyond maturity: the deal no longer accrues.
    repo.set_system_day(date(2027, 6, 2)).await.unwrap();
    let result = eod.run().await.unwrap();
    assert_eq!(result.posted_gsec, 0);
}

#[tokio::test]
async fn test_zero_accrual_gsec_not_posted() {
    let (repo, service, eod, _temp) = setup().await;
    repo.set_system_day(date(2025, 6, 10)).await.unwrap();
    service.create_gsec(gsec_deal("0"), &user()).await.unwrap();

    let result = eod.run().await.unwrap();
    assert_eq!(result.posted_gsec, 0);
    assert_eq!(result.skipped, 1);
}

#[tokio::test]
async fn test_set_system_day_serialized_with_eod() {
    let (repo, _service, eod, _temp) = setup().await;
    eod.set_system_day(date(2025, 6, 10)).await.unwrap();
    assert_eq!(repo.get_system_day().await.unwrap(), Some(date(2025, 6, 10)));
}
