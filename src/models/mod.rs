pub mod account;
pub mod inventory;
pub mod transaction;

pub use account::{Account, AccountResponse, Role};
pub use inventory::{InventoryItem, ItemPatch, NewItem};
pub use transaction::{SaleDetails, SaleLine, Transaction, TransactionKind, TransactionStatus};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Cell `index` of a sheet row; rows come back ragged so missing cells
/// read as empty.
pub(crate) fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.trim()).unwrap_or("")
}

pub(crate) fn optional(row: &[String], index: usize) -> Option<String> {
    let value = cell(row, index);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Accepts `1500`, `1,500.25` and blank (zero).
pub(crate) fn parse_money(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

pub(crate) fn parse_count(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Some(0);
    }
    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().map(|v| v.trunc() as i64))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
        .or_else(|| parse_serial_date(raw))
}

/// Cells the spreadsheet recognised as dates come back as serial numbers:
/// fractional days since 1899-12-30.
fn parse_serial_date(raw: &str) -> Option<DateTime<Utc>> {
    let serial: f64 = raw.parse().ok()?;
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    Some((epoch + chrono::Duration::seconds(seconds)).and_utc())
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
