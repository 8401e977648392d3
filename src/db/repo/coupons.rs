//! ISIN master records and their immutable coupon schedules.

use super::{get_date, get_decimal, Repository};
use crate::domain::{CouponScheduleEntry, Currency, Decimal, Isin};
use chrono::NaiveDate;
use sqlx::Row;

/// One ISIN master row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsinRecord {
    pub isin: Isin,
    pub issuer: String,
    pub issue_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub coupon_rate: Decimal,
    pub series: Option<String>,
    pub day_basis: i64,
    pub currency: Currency,
}

impl Repository {
    /// Insert an ISIN master row together with its full coupon schedule,
    /// atomically. The schedule is generated once here and never mutated.
    pub async fn insert_isin_with_schedule(
        &self,
        record: &IsinRecord,
        schedule: &[CouponScheduleEntry],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO isin_master
                (isin, issuer, issue_date, maturity_date, coupon_rate, series, day_basis, currency)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.isin.as_str())
        .bind(record.issuer.as_str())
        .bind(record.issue_date.to_string())
        .bind(record.maturity_date.to_string())
        .bind(record.coupon_rate.to_canonical_string())
        .bind(record.series.as_deref())
        .bind(record.day_basis)
        .bind(record.currency.as_str())
        .execute(&mut *tx)
        .await?;

        for entry in schedule {
            sqlx::query(
                r#"
                INSERT INTO isin_coupon_schedule
                    (isin, coupon_number, coupon_date, coupon_amount, principal)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.isin.as_str())
            .bind(entry.coupon_number)
            .bind(entry.coupon_date.to_string())
            .bind(entry.coupon_amount.to_canonical_string())
            .bind(entry.principal.to_canonical_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch an ISIN master row.
    pub async fn get_isin(&self, isin: &str) -> Result<Option<IsinRecord>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM isin_master WHERE isin = ?")
            .bind(isin)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|r| IsinRecord {
            isin: Isin::new(r.get("isin")),
            issuer: r.get("issuer"),
            issue_date: get_date(&r, "issue_date"),
            maturity_date: get_date(&r, "maturity_date"),
            coupon_rate: get_decimal(&r, "coupon_rate"),
            series: r.get("series"),
            day_basis: r.get("day_basis"),
            currency: Currency::new(r.get("currency")),
        }))
    }

    /// The coupon schedule for an ISIN, ascending by date.
    pub async fn coupon_schedule(
        &self,
        isin: &str,
    ) -> Result<Vec<CouponScheduleEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT coupon_number, coupon_date, coupon_amount, principal
            FROM isin_coupon_schedule
            WHERE isin = ?
            ORDER BY coupon_date ASC, coupon_number ASC
            "#,
        )
        .bind(isin)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| CouponScheduleEntry {
                coupon_number: row.get("coupon_number"),
                coupon_date: get_date(row, "coupon_date"),
                coupon_amount: get_decimal(row, "coupon_amount"),
                principal: get_decimal(row, "principal"),
            })
            .collect())
    }
}
