//! # Sales Report Windows
//!
//! Date arithmetic for the daily sales series. caja-db runs the queries;
//! this module decides which days they cover and pads the gaps.
//!
//! ```text
//! today = 2024-03-10, LastDays(3)
//!
//!   start                     today      end (exclusive)
//!     │                         │           │
//!     ▼                         ▼           ▼
//!  ┌──────────┬──────────┬──────────┐
//!  │ 03-08    │ 03-09    │ 03-10    │ 03-11
//!  │ 2u $50   │ (filled) │ 1u $25   │
//!  └──────────┴──────────┴──────────┘
//!     one point per UTC day, oldest first
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::{DEFAULT_REPORT_DAYS, MAX_REPORT_DAYS};

// =============================================================================
// Window
// =============================================================================

/// Which days a report covers. The window always ends with today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReportWindow {
    /// The last `n` days including today. 0 means the default (30);
    /// anything above 365 is clamped.
    LastDays(u32),
    /// From a start date through today. Must not be in the future.
    Since(NaiveDate),
}

impl Default for ReportWindow {
    fn default() -> Self {
        ReportWindow::LastDays(DEFAULT_REPORT_DAYS)
    }
}

impl ReportWindow {
    /// Resolves the window against a reference date.
    pub fn resolve(&self, today: NaiveDate) -> CoreResult<DateRange> {
        match *self {
            ReportWindow::LastDays(n) => {
                let n = if n == 0 { DEFAULT_REPORT_DAYS } else { n };
                Ok(DateRange::last_days(today, n))
            }
            ReportWindow::Since(start) => {
                if start > today {
                    return Err(ValidationError::InvalidFormat {
                        field: "start_date".to_string(),
                        reason: format!("{start} is in the future"),
                    }
                    .into());
                }
                let span = (today - start).num_days() + 1;
                if span > MAX_REPORT_DAYS as i64 {
                    Ok(DateRange::last_days(today, MAX_REPORT_DAYS))
                } else {
                    Ok(DateRange {
                        start,
                        end_exclusive: next_day(today),
                    })
                }
            }
        }
    }
}

/// Half-open range of calendar days `[start, end_exclusive)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end_exclusive: NaiveDate,
}

impl DateRange {
    /// The `n` days ending with `today` (n clamped to 1..=365).
    pub fn last_days(today: NaiveDate, n: u32) -> Self {
        let n = n.clamp(1, MAX_REPORT_DAYS);
        DateRange {
            start: today - Days::new(u64::from(n - 1)),
            end_exclusive: next_day(today),
        }
    }

    /// Number of days covered.
    pub fn days(&self) -> i64 {
        (self.end_exclusive - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end_exclusive
    }

    /// Every day in the range, oldest first.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start
            .iter_days()
            .take_while(move |d| *d < self.end_exclusive)
    }

    /// Midnight UTC at the start of the range, for timestamp queries.
    pub fn start_at(&self) -> DateTime<Utc> {
        midnight(self.start)
    }

    /// Midnight UTC at the exclusive end of the range.
    pub fn end_at(&self) -> DateTime<Utc> {
        midnight(self.end_exclusive)
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

// =============================================================================
// Series
// =============================================================================

/// One point of a daily series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySales {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub units: i64,
    pub revenue_cents: i64,
}

impl DailySales {
    pub const fn empty(date: NaiveDate) -> Self {
        DailySales {
            date,
            units: 0,
            revenue_cents: 0,
        }
    }
}

/// Sums `rows` per day and pads every missing day in `range` with zeros.
///
/// Rows outside the range are ignored.
pub fn fill_missing_days<I>(range: &DateRange, rows: I) -> Vec<DailySales>
where
    I: IntoIterator<Item = DailySales>,
{
    let mut by_day: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();
    for row in rows.into_iter().filter(|r| range.contains(r.date)) {
        let day = by_day
            .entry(row.date)
            .or_insert_with(|| DailySales::empty(row.date));
        day.units += row.units;
        day.revenue_cents += row.revenue_cents;
    }

    range
        .dates()
        .map(|date| by_day.get(&date).copied().unwrap_or(DailySales::empty(date)))
        .collect()
}

/// Product the series is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopProduct {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    /// Units sold in the 30 days ending today, regardless of the window.
    pub units_last_30_days: i64,
}

/// Report payload: the product and its daily series.
///
/// `top` is `None` (with an empty series) when nothing sold in the window.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSeries {
    pub top: Option<TopProduct>,
    pub series: Vec<DailySales>,
}

// =============================================================================
// Unit Tests
// =============================================================================
