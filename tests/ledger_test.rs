use dealdesk::config::Config;
use dealdesk::db::init_db;
use dealdesk::db::repo::LedgerFilters;
use dealdesk::domain::{Decimal, Role};
use dealdesk::lifecycle::{DealService, NewTransaction};
use dealdesk::{Principal, Repository};
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

async fn capture(service: &DealService, amount: &str, on: NaiveDate) -> String {
    let deal = service
        .create_transaction(
            NewTransaction {
                amount: Some(dec(amount)),
                txn_date: Some(on),
                ..Default::default()
            },
            &user(),
        )
        .await
        .expect("create failed");
    deal.deal_number.as_str().to_string()
}

#[tokio::test]
async fn test_every_deal_balances_exactly() {
    let (repo, service, _temp) = setup().await;

    let amounts = ["0.1", "0.2", "123456.7891", "-999.9999"];
    for amount in amounts {
        let deal_number = capture(&service, amount, date(2025, 6, 1)).await;
        let (debits, credits) = repo.deal_posting_totals(&deal_number).await.unwrap();
        assert_eq!(debits, credits, "imbalance for amount {}", amount);
        assert_eq!(debits, dec(amount).abs());
    }
}

#[tokio::test]
async fn test_general_ledger_filters_by_date_and_deal() {
    let (repo, service, _temp) = setup().await;

    let may_deal = capture(&service, "100", date(2025, 5, 10)).await;
    let june_deal = capture(&service, "200", date(2025, 6, 10)).await;

    let june_only = repo
        .general_ledger(&LedgerFilters {
            start_date: Some(date(2025, 6, 1)),
            end_date: Some(date(2025, 6, 30)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(june_only.len(), 2);
    assert!(june_only
        .iter()
        .all(|e| e.deal_number.as_str() == june_deal));

    let by_deal = repo
        .general_ledger(&LedgerFilters {
            deal_number: Some(may_deal.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_deal.len(), 2);
    assert!(by_deal.iter().all(|e| e.deal_number.as_str() == may_deal));
}

#[tokio::test]
async fn test_general_ledger_pagination() {
    let (repo, service, _temp) = setup().await;

    for i in 0..3 {
        capture(&service, &format!("{}", 100 + i), date(2025, 6, 10)).await;
    }

    let page = repo
        .general_ledger(&LedgerFilters {
            limit: Some(4),
            offset: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 4);
}

#[tokio::test]
async fn test_profit_and_loss_revenue_and_expense_sides() {
    let (repo, service, _temp) = setup().await;

    capture(&service, "10000", date(2025, 6, 5)).await;
    capture(&service, "-2500", date(2025, 6, 6)).await;
    // Outside the period: must not count.
    capture(&service, "77777", date(2025, 7, 5)).await;

    let statement = repo
        .profit_and_loss(date(2025, 6, 1), date(2025, 6, 30))
        .await
        .unwrap();

    assert_eq!(statement.total_revenue, dec("10000"));
    assert_eq!(statement.total_expenses, dec("2500"));
    assert_eq!(statement.net_profit, dec("7500"));
}

#[tokio::test]
async fn test_balance_sheet_balances_with_retained_earnings() {
    let (repo, service, _temp) = setup().await;

    capture(&service, "10000", date(2025, 6, 5)).await;
    capture(&service, "-2500", date(2025, 6, 6)).await;

    let sheet = repo.balance_sheet(date(2025, 6, 30)).await.unwrap();

    // Cash: +10000 debit, -2500 credit.
    assert_eq!(sheet.total_assets, dec("7500"));
    assert_eq!(sheet.retained_earnings, dec("7500"));
    assert_eq!(sheet.total_liabilities, Decimal::zero());
    assert_eq!(sheet.total_liabilities_and_equity, sheet.total_assets);
}

#[tokio::test]
async fn test_deleted_deal_leaves_no_ledger_rows() {
    let (repo, service, _temp) = setup().await;

    let deal_number = capture(&service, "500", date(2025, 6, 5)).await;
    service.delete_transaction(&deal_number).await.unwrap();

    let rows = repo
        .general_ledger(&LedgerFilters {
            deal_number: Some(deal_number),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(rows.is_empty());
}
