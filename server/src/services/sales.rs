use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

/// Chart window selector as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesInterval {
    Days7,
    Days30,
    Months3,
    Months6,
    Months12,
}

impl SalesInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesInterval::Days7 => "7d",
            SalesInterval::Days30 => "30d",
            SalesInterval::Months3 => "3m",
            SalesInterval::Months6 => "6m",
            SalesInterval::Months12 => "12m",
        }
    }

    pub fn bucket_count(&self) -> u32 {
        match self {
            SalesInterval::Days7 => 7,
            SalesInterval::Days30 => 30,
            SalesInterval::Months3 => 3,
            SalesInterval::Months6 => 6,
            SalesInterval::Months12 => 12,
        }
    }

    fn monthly(&self) -> bool {
        matches!(
            self,
            SalesInterval::Months3 | SalesInterval::Months6 | SalesInterval::Months12
        )
    }
}

impl FromStr for SalesInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(SalesInterval::Days7),
            "30d" => Ok(SalesInterval::Days30),
            "3m" => Ok(SalesInterval::Months3),
            "6m" => Ok(SalesInterval::Months6),
            "12m" => Ok(SalesInterval::Months12),
            other => Err(format!("unknown interval: {}", other)),
        }
    }
}

// Year and month of the calendar month `back` months before `now`.
fn month_back(now: DateTime<Utc>, back: u32) -> (i32, u32) {
    let months = now.year() * 12 + now.month0() as i32 - back as i32;
    (months.div_euclid(12), months.rem_euclid(12) as u32 + 1)
}

/// Bucket labels for the window ending at `now`, oldest first.
/// Daily intervals label each day `YYYY-MM-DD`; monthly intervals label each
/// calendar month `YYYY-MM`.
pub fn bucket_labels(interval: SalesInterval, now: DateTime<Utc>) -> Vec<String> {
    let n = interval.bucket_count();
    if interval.monthly() {
        (0..n)
            .rev()
            .map(|back| {
                let (year, month) = month_back(now, back);
                format!("{:04}-{:02}", year, month)
            })
            .collect()
    } else {
        let today = now.date_naive();
        (0..n)
            .rev()
            .map(|back| {
                (today - chrono::Days::new(back as u64))
                    .format("%Y-%m-%d")
                    .to_string()
            })
            .collect()
    }
}

/// Start of the chart window, for filtering payment rows in SQL.
pub fn window_start(interval: SalesInterval, now: DateTime<Utc>) -> DateTime<Utc> {
    let day = if interval.monthly() {
        let (year, month) = month_back(now, interval.bucket_count() - 1);
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_else(|| now.date_naive())
    } else {
        now.date_naive() - chrono::Days::new((interval.bucket_count() - 1) as u64)
    };
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Reduces `(paid_at, amount_cents)` rows into the chart buckets. Buckets
/// with no payments stay at zero; rows outside the window are dropped.
pub fn bucket_payments(
    payments: &[(DateTime<Utc>, i64)],
    interval: SalesInterval,
    now: DateTime<Utc>,
) -> (Vec<String>, Vec<i64>) {
    let labels = bucket_labels(interval, now);
    let fmt = if interval.monthly() { "%Y-%m" } else { "%Y-%m-%d" };

    let mut sums: HashMap<String, i64> = HashMap::new();
    for (paid_at, amount_cents) in payments {
        *sums.entry(paid_at.format(fmt).to_string()).or_insert(0) += amount_cents;
    }

    let totals = labels
        .iter()
        .map(|label| sums.get(label).copied().unwrap_or(0))
        .collect();

    (labels, totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_wire_intervals() {
        assert_eq!("7d".parse(), Ok(SalesInterval::Days7));
        assert_eq!("30d".parse(), Ok(SalesInterval::Days30));
        assert_eq!("3m".parse(), Ok(SalesInterval::Months3));
        assert_eq!("6m".parse(), Ok(SalesInterval::Months6));
        assert_eq!("12m".parse(), Ok(SalesInterval::Months12));
        assert!("1y".parse::<SalesInterval>().is_err());
        assert!("".parse::<SalesInterval>().is_err());
    }

    #[test]
    fn daily_labels_cover_the_window() {
        let labels = bucket_labels(SalesInterval::Days7, at(2025, 3, 10));
        assert_eq!(labels.len(), 7);
        assert_eq!(labels[0], "2025-03-04");
        assert_eq!(labels[6], "2025-03-10");
    }

    #[test]
    fn monthly_labels_cross_year_boundary() {
        let labels = bucket_labels(SalesInterval::Months3, at(2025, 1, 15));
        assert_eq!(labels, vec!["2024-11", "2024-12", "2025-01"]);
    }

    #[test]
    fn buckets_daily_payments() {
        let now = at(2025, 3, 10);
        let payments = vec![
            (at(2025, 3, 10), 1500),
            (at(2025, 3, 10), 500),
            (at(2025, 3, 4), 999),
            (at(2025, 3, 3), 10_000),
        ];

        let (labels, totals) = bucket_payments(&payments, SalesInterval::Days7, now);
        assert_eq!(labels.len(), 7);
        assert_eq!(totals[0], 999);
        assert_eq!(totals[6], 2000);
        // 2025-03-03 falls before the window and is dropped
        assert_eq!(totals.iter().sum::<i64>(), 2999);
    }

    #[test]
    fn buckets_monthly_payments_by_calendar_month() {
        let now = at(2025, 3, 31);
        let payments = vec![
            (at(2025, 2, 1), 100),
            (at(2025, 2, 28), 200),
            (at(2025, 3, 1), 50),
        ];

        let (labels, totals) = bucket_payments(&payments, SalesInterval::Months3, now);
        assert_eq!(labels, vec!["2025-01", "2025-02", "2025-03"]);
        assert_eq!(totals, vec![0, 300, 50]);
    }

    #[test]
    fn empty_input_yields_zero_buckets() {
        let (labels, totals) = bucket_payments(&[], SalesInterval::Months12, at(2025, 6, 1));
        assert_eq!(labels.len(), 12);
        assert_eq!(labels[0], "2024-07");
        assert_eq!(labels[11], "2025-06");
        assert!(totals.iter().all(|t| *t == 0));
    }

    #[test]
    fn window_start_daily_counts_back_inclusive() {
        let start = window_start(SalesInterval::Days30, at(2025, 3, 15));
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 2, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn window_start_monthly_is_first_of_month() {
        let start = window_start(SalesInterval::Months6, at(2025, 8, 22));
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }
}
