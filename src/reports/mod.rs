//! Aggregations over transactions and items already loaded from the sheet.
//! Everything here is pure; handlers fetch, filter and hand arrays in.

pub mod abc;
pub mod alerts;
pub mod calendar;
pub mod forecast;
pub mod turnover;

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{InventoryItem, Transaction};

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const UNASSIGNED: &str = "Unassigned";

/// Inclusive date window; an absent bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    /// Number of calendar days covered, when both ends are known.
    pub fn days(&self) -> Option<i64> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if end >= start => Some((end - start).num_days() + 1),
            _ => None,
        }
    }
}

pub fn filter_by_date(transactions: &[Transaction], range: &DateRange) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| range.contains(tx.timestamp.date_naive()))
        .cloned()
        .collect()
}

pub fn effective_sales(transactions: &[Transaction]) -> impl Iterator<Item = &Transaction> {
    transactions.iter().filter(|tx| tx.is_effective_sale())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub profit_margin: Decimal,
    pub items_sold: i64,
    pub transaction_count: usize,
    pub average_sale: Decimal,
}

/// Totals over non-cancelled sales. Profit is derived from revenue and cost
/// so the three always reconcile exactly.
pub fn summarize(transactions: &[Transaction]) -> SalesSummary {
    let mut summary = SalesSummary::default();
    for tx in effective_sales(transactions) {
        summary.total_revenue += tx.total_revenue;
        summary.total_cost += tx.total_cost;
        summary.items_sold += tx.quantity;
        summary.transaction_count += 1;
    }
    summary.total_profit = summary.total_revenue - summary.total_cost;
    summary.profit_margin = percentage(summary.total_profit, summary.total_revenue);
    if summary.transaction_count > 0 {
        summary.average_sale =
            (summary.total_revenue / Decimal::from(summary.transaction_count)).round_dp(2);
    }
    summary
}

/// `part / whole * 100` rounded to two places; zero when `whole` is zero.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        (part / whole * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub key: String,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub quantity: i64,
    pub count: usize,
}

impl Bucket {
    fn new(key: String) -> Self {
        Self {
            key,
            ..Default::default()
        }
    }

    fn add(&mut self, tx: &Transaction) {
        self.revenue += tx.total_revenue;
        self.cost += tx.total_cost;
        self.profit = self.revenue - self.cost;
        self.quantity += tx.quantity;
        self.count += 1;
    }
}

fn group_sorted_by_key<F>(transactions: &[Transaction], key: F) -> Vec<Bucket>
where
    F: Fn(&Transaction) -> String,
{
    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
    for tx in effective_sales(transactions) {
        let k = key(tx);
        buckets.entry(k.clone()).or_insert_with(|| Bucket::new(k)).add(tx);
    }
    buckets.into_values().collect()
}

fn by_revenue_desc(mut buckets: Vec<Bucket>) -> Vec<Bucket> {
    buckets.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.key.cmp(&b.key)));
    buckets
}

/// Daily buckets keyed `YYYY-MM-DD`, oldest first.
pub fn group_by_day(transactions: &[Transaction]) -> Vec<Bucket> {
    group_sorted_by_key(transactions, |tx| {
        tx.timestamp.date_naive().format("%Y-%m-%d").to_string()
    })
}

/// Monthly buckets keyed `YYYY-MM`, oldest first.
pub fn group_by_month(transactions: &[Transaction]) -> Vec<Bucket> {
    group_sorted_by_key(transactions, |tx| {
        let date = tx.timestamp.date_naive();
        format!("{:04}-{:02}", date.year(), date.month())
    })
}

/// Buckets by the sold item's current category, highest revenue first.
pub fn group_by_category(transactions: &[Transaction], items: &[InventoryItem]) -> Vec<Bucket> {
    let categories: HashMap<&str, &str> = items
        .iter()
        .map(|item| (item.id.as_str(), item.category.as_str()))
        .collect();

    by_revenue_desc(group_sorted_by_key(transactions, |tx| {
        categories
            .get(tx.item_id.as_str())
            .filter(|c| !c.trim().is_empty())
            .map(|c| c.to_string())
            .unwrap_or_else(|| UNCATEGORIZED.to_string())
    }))
}

pub fn channel_of(tx: &Transaction) -> String {
    tx.department
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(UNASSIGNED)
        .to_string()
}

/// Buckets by sales channel, highest revenue first. Names that share a slug
/// are one channel, shown under the first spelling seen.
pub fn group_by_channel(transactions: &[Transaction]) -> Vec<Bucket> {
    let mut names: HashMap<String, String> = HashMap::new();
    for tx in effective_sales(transactions) {
        let name = channel_of(tx);
        names.entry(slug(&name)).or_insert(name);
    }

    let mut buckets = group_sorted_by_key(transactions, |tx| slug(&channel_of(tx)));
    for bucket in &mut buckets {
        if let Some(name) = names.remove(&bucket.key) {
            bucket.key = name;
        }
    }
    by_revenue_desc(buckets)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSales {
    pub item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub revenue: Decimal,
    pub profit: Decimal,
}

pub fn top_items(transactions: &[Transaction], limit: usize) -> Vec<ItemSales> {
    let mut per_item: HashMap<&str, ItemSales> = HashMap::new();
    for tx in effective_sales(transactions) {
        let entry = per_item.entry(tx.item_id.as_str()).or_insert_with(|| ItemSales {
            item_id: tx.item_id.clone(),
            item_name: tx.item_name.clone(),
            quantity: 0,
            revenue: Decimal::ZERO,
            profit: Decimal::ZERO,
        });
        entry.quantity += tx.quantity;
        entry.revenue += tx.total_revenue;
        entry.profit += tx.total_revenue - tx.total_cost;
    }

    let mut ranked: Vec<ItemSales> = per_item.into_values().collect();
    ranked.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| b.quantity.cmp(&a.quantity))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    ranked.truncate(limit);
    ranked
}

/// Lowercase, dash-separated identifier for a channel name.
pub fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::models::{InventoryItem, Transaction, TransactionKind, TransactionStatus};

    pub fn item(id: &str, category: &str, quantity: i64, reorder_level: i64) -> InventoryItem {
        InventoryItem {
            id: id.to_string(),
            name: format!("Item {}", id),
            sku: format!("SKU-{}", id),
            category: category.to_string(),
            quantity,
            cost_price: Decimal::from(10),
            selling_price: Decimal::from(20),
            reorder_level,
            supplier: String::new(),
            storage_room: String::new(),
            last_updated: None,
        }
    }

    pub fn sale(id: &str, item_id: &str, day: (i32, u32, u32), qty: i64, revenue: i64, cost: i64) -> Transaction {
        let at = Utc.with_ymd_and_hms(day.0, day.1, day.2, 12, 0, 0).unwrap();
        Transaction {
            id: id.to_string(),
            item_id: item_id.to_string(),
            item_name: format!("Item {}", item_id),
            quantity: qty,
            cost_price: Decimal::from(cost) / Decimal::from(qty.max(1)),
            selling_price: Decimal::from(revenue) / Decimal::from(qty.max(1)),
            total_cost: Decimal::from(cost),
            total_revenue: Decimal::from(revenue),
            profit: Decimal::from(revenue - cost),
            timestamp: at,
            kind: TransactionKind::Sale,
            status: TransactionStatus::Completed,
            customer: None,
            department: None,
            payment_method: None,
            note: None,
        }
    }

    pub fn restock(id: &str, item_id: &str, day: (i32, u32, u32), qty: i64) -> Transaction {
        let mut tx = sale(id, item_id, day, qty, 0, qty * 10);
        tx.kind = TransactionKind::Restock;
        tx.profit = Decimal::ZERO;
        tx
    }
}
