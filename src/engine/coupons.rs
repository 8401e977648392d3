//! Coupon schedule generation and coupon-date lookup for semiannual bonds.

use crate::domain::{CouponScheduleEntry, Decimal};
use chrono::{Months, NaiveDate};

/// Previous/next coupon dates bracketing a value date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponWindow {
    pub previous: NaiveDate,
    pub next: NaiveDate,
}

/// Generate the full semiannual coupon schedule for an instrument.
///
/// Steps forward six calendar months at a time from the issue date; every
/// stepped date strictly before maturity becomes a coupon entry, and one
/// terminal entry at exactly the maturity date carries the final coupon plus
/// the principal redemption. Each interim coupon pays
/// `coupon_rate_pct / 2 * face_value / 100` with zero principal.
///
/// Steps are computed as `issue + 6k months` rather than by repeated
/// addition, so month-end clamping never compounds across periods.
pub fn generate_coupon_schedule(
    issue_date: NaiveDate,
    maturity_date: NaiveDate,
    coupon_rate_pct: Decimal,
    face_value: Decimal,
) -> Vec<CouponScheduleEntry> {
    let coupon_amount = coupon_rate_pct * face_value / Decimal::from_i64(200);

    let mut entries = Vec::new();
    let mut k: u32 = 1;
    loop {
        let Some(stepped) = issue_date.checked_add_months(Months::new(6 * k)) else {
            break;
        };
        if stepped >= maturity_date {
            break;
        }
        entries.push(CouponScheduleEntry {
            coupon_number: entries.len() as i64 + 1,
            coupon_date: stepped,
            coupon_amount,
            principal: Decimal::zero(),
        });
        k += 1;
    }

    entries.push(CouponScheduleEntry {
        coupon_number: entries.len() as i64 + 1,
        coupon_date: maturity_date,
        coupon_amount,
        principal: face_value,
    });

    entries
}

/// Find the coupon dates bracketing `value_date` in an ascending schedule.
///
/// Previous is the latest coupon date <= value_date; next is the earliest
/// coupon date > value_date. At the boundaries the window degenerates to the
/// first two (value date before the schedule) or last two (after) entries.
/// Returns None for an empty schedule.
pub fn prev_and_next_coupon_date(
    schedule: &[CouponScheduleEntry],
    value_date: NaiveDate,
) -> Option<CouponWindow> {
    if schedule.is_empty() {
        return None;
    }

    let mut previous: Option<NaiveDate> = None;
    let mut next: Option<NaiveDate> = None;
    for entry in schedule {
        if entry.coupon_date <= value_date {
            previous = Some(entry.coupon_date);
        } else {
            next = Some(entry.coupon_date);
            break;
        }
    }

    let first = schedule[0].coupon_date;
    let second = schedule.get(1).map(|e| e.coupon_date).unwrap_or(first);
    let last = schedule[schedule.len() - 1].coupon_date;
    let second_last = if schedule.len() >= 2 {
        schedule[schedule.len() - 2].coupon_date
    } else {
        last
    };

    let window = match (previous, next) {
        (Some(p), Some(n)) => CouponWindow { previous: p, next: n },
        // Value date before the first coupon: fall back to the first two.
        (None, Some(_)) => CouponWindow {
            previous: first,
            next: second,
        },
        // Value date on/after the last coupon: fall back to the last two.
        (Some(_), None) => CouponWindow {
            previous: second_last,
            next: last,
        },
        (None, None) => unreachable!("non-empty schedule yields at least one side"),
    };

    Some(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_two_year_bond_has_four_entries() {
        let schedule = generate_coupon_schedule(
            date(2025, 1, 15),
            date(2027, 1, 15),
            dec("10"),
            dec("100"),
        );

        assert_eq!(schedule.len(), 4);
        let dates: Vec<NaiveDate> = schedule.iter().map(|e| e.coupon_date).collect();
        assert_eq!(
            dates,
            vec![
                date(2025, 7, 15),
                date(2026, 1, 15),
                date(2026, 7, 15),
                date(2027, 1, 15),
            ]
        );
        for entry in &schedule[..3] {
            assert_eq!(entry.coupon_amount, dec("5"));
            assert_eq!(entry.principal, Decimal::zero());
        }
        assert_eq!(schedule[3].coupon_amount, dec("5"));
        assert_eq!(schedule[3].principal, dec("100"));
    }

    #[test]
    fn test_coupon_numbers_are_sequential() {
        let schedule = generate_coupon_schedule(
            date(2025, 1, 15),
            date(2027, 1, 15),
            dec("10"),
            dec("100"),
        );
        let numbers: Vec<i64> = schedule.iter().map(|e| e.coupon_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_short_bond_only_terminal_entry() {
        // Maturity within the first period: just the redemption entry.
        let schedule =
            generate_coupon_schedule(date(2025, 1, 15), date(2025, 5, 1), dec("8"), dec("100"));
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].coupon_date, date(2025, 5, 1));
        assert_eq!(schedule[0].principal, dec("100"));
    }

    #[test]
    fn test_stepped_date_landing_on_maturity_not_duplicated() {
        // issue+6m == maturity: the loop stops, leaving only the terminal entry.
        let schedule =
            generate_coupon_schedule(date(2025, 1, 15), date(2025, 7, 15), dec("10"), dec("100"));
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].coupon_date, date(2025, 7, 15));
    }

    #[test]
    fn test_month_end_clamping_does_not_compound() {
        let schedule =
            generate_coupon_schedule(date(2024, 8, 31), date(2026, 8, 31), dec("10"), dec("100"));
        let dates: Vec<NaiveDate> = schedule.iter().map(|e| e.coupon_date).collect();
        // Feb clamps to 28, but the following August step returns to the 31st.
        assert_eq!(
            dates,
            vec![
                date(2025, 2, 28),
                date(2025, 8, 31),
                date(2026, 2, 28),
                date(2026, 8, 31),
            ]
        );
    }

    #[test]
    fn test_window_mid_schedule() {
        let schedule = generate_coupon_schedule(
            date(2025, 1, 15),
            date(2027, 1, 15),
            dec("10"),
            dec("100"),
        );
        let w = prev_and_next_coupon_date(&schedule, date(2026, 3, 1)).unwrap();
        assert_eq!(w.previous, date(2026, 1, 15));
        assert_eq!(w.next, date(2026, 7, 15));
    }

    #[test]
    fn test_window_on_coupon_date_counts_as_previous() {
        let schedule = generate_coupon_schedule(
            date(2025, 1, 15),
            date(2027, 1, 15),
            dec("10"),
            dec("100"),
        );
        let w = prev_and_next_coupon_date(&schedule, date(2026, 1, 15)).unwrap();
        assert_eq!(w.previous, date(2026, 1, 15));
        assert_eq!(w.next, date(2026, 7, 15));
    }

    #[test]
    fn test_window_before_first_degenerates_to_first_two() {
        let schedule = generate_coupon_schedule(
            date(2025, 1, 15),
            date(2027, 1, 15),
            dec("10"),
            dec("100"),
        );
        let w = prev_and_next_coupon_date(&schedule, date(2024, 6, 1)).unwrap();
        assert_eq!(w.previous, date(2025, 7, 15));
        assert_eq!(w.next, date(2026, 1, 15));
    }

    #[test]
    fn test_window_after_last_degenerates_to_last_two() {
        let schedule = generate_coupon_schedule(
            date(2025, 1, 15),
            date(2027, 1, 15),
            dec("10"),
            dec("100"),
        );
        let w = prev_and_next_coupon_date(&schedule, date(2030, 1, 1)).unwrap();
        assert_eq!(w.previous, date(2026, 7, 15));
        assert_eq!(w.next, date(2027, 1, 15));
    }

    #[test]
    fn test_window_empty_schedule_is_none() {
        assert!(prev_and_next_coupon_date(&[], date(2025, 1, 1)).is_none());
    }
}
