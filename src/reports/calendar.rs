use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCell {
    pub day: Option<u32>,
    pub date: Option<String>,
    pub revenue: Decimal,
}

impl CalendarCell {
    fn blank() -> Self {
        Self {
            day: None,
            date: None,
            revenue: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub total_revenue: Decimal,
    pub cells: Vec<CalendarCell>,
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

/// Sunday-first month grid. Leading blanks align day 1 under its weekday,
/// trailing blanks complete the last week. `None` for an invalid month.
pub fn month_grid(
    year: i32,
    month: u32,
    revenue_by_date: &HashMap<String, Decimal>,
) -> Option<CalendarMonth> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days = days_in_month(year, month)?;
    let leading = first.weekday().num_days_from_sunday() as usize;

    let mut cells = Vec::with_capacity(42);
    cells.extend((0..leading).map(|_| CalendarCell::blank()));

    let mut total_revenue = Decimal::ZERO;
    for day in 1..=days {
        let date = format!("{:04}-{:02}-{:02}", year, month, day);
        let revenue = revenue_by_date.get(&date).copied().unwrap_or(Decimal::ZERO);
        total_revenue += revenue;
        cells.push(CalendarCell {
            day: Some(day),
            date: Some(date),
            revenue,
        });
    }

    while cells.len() % 7 != 0 {
        cells.push(CalendarCell::blank());
    }

    Some(CalendarMonth {
        year,
        month,
        total_revenue,
        cells,
    })
}

/// Parses `YYYY-MM`.
pub fn parse_month(raw: &str) -> Option<(i32, u32)> {
    let (year, month) = raw.trim().split_once('-')?;
    let year = year.parse().ok()?;
    let month = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
}
