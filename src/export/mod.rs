//! Tabular exports. Report data is shaped into an `ExportTable` and handed
//! to one of the renderers.

pub mod pdf;
pub mod xlsx;

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{InventoryItem, Transaction};
use crate::reports::{DateRange, SalesSummary};

#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    Text(String),
    Integer(i64),
    Money(Decimal),
    Percent(Decimal),
}

impl ExportValue {
    /// Numeric view used by the workbook writer; `None` for text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ExportValue::Text(_) => None,
            ExportValue::Integer(n) => Some(*n as f64),
            ExportValue::Money(d) | ExportValue::Percent(d) => d.to_f64(),
        }
    }
}

impl fmt::Display for ExportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportValue::Text(s) => write!(f, "{}", s),
            ExportValue::Integer(n) => write!(f, "{}", n),
            ExportValue::Money(d) => write!(f, "{:.2}", d),
            ExportValue::Percent(d) => write!(f, "{:.2}%", d),
        }
    }
}

impl From<&str> for ExportValue {
    fn from(s: &str) -> Self {
        ExportValue::Text(s.to_string())
    }
}

impl From<String> for ExportValue {
    fn from(s: String) -> Self {
        ExportValue::Text(s)
    }
}

#[derive(Debug, Clone)]
pub struct ExportTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ExportValue>>,
    pub summary: Vec<(String, ExportValue)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Some(ExportFormat::Xlsx),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }
}

pub fn render(table: &ExportTable, format: ExportFormat) -> Result<Vec<u8>, String> {
    match format {
        ExportFormat::Xlsx => xlsx::render(table).map_err(|e| e.to_string()),
        ExportFormat::Pdf => pdf::render(table).map_err(|e| e.to_string()),
    }
}

fn period_label(range: &DateRange) -> String {
    match (range.start, range.end) {
        (Some(start), Some(end)) => format!("{} to {}", start, end),
        (Some(start), None) => format!("from {}", start),
        (None, Some(end)) => format!("until {}", end),
        (None, None) => "all time".to_string(),
    }
}

pub fn sales_table(
    transactions: &[Transaction],
    summary: &SalesSummary,
    range: &DateRange,
) -> ExportTable {
    let columns = [
        "Date", "Item", "Channel", "Qty", "Revenue", "Cost", "Profit", "Status",
    ];

    let mut sales: Vec<&Transaction> = transactions.iter().filter(|tx| tx.is_sale()).collect();
    sales.sort_by_key(|tx| tx.timestamp);

    let rows = sales
        .into_iter()
        .map(|tx| {
            vec![
                tx.timestamp.format("%Y-%m-%d %H:%M").to_string().into(),
                tx.item_name.clone().into(),
                crate::reports::channel_of(tx).into(),
                ExportValue::Integer(tx.quantity),
                ExportValue::Money(tx.total_revenue),
                ExportValue::Money(tx.total_cost),
                ExportValue::Money(tx.total_revenue - tx.total_cost),
                tx.status.as_str().into(),
            ]
        })
        .collect();

    ExportTable {
        title: "Sales Report".to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
        summary: vec![
            ("Period".to_string(), period_label(range).into()),
            ("Total Revenue".to_string(), ExportValue::Money(summary.total_revenue)),
            ("Total Cost".to_string(), ExportValue::Money(summary.total_cost)),
            ("Total Profit".to_string(), ExportValue::Money(summary.total_profit)),
            ("Profit Margin".to_string(), ExportValue::Percent(summary.profit_margin)),
            ("Items Sold".to_string(), ExportValue::Integer(summary.items_sold)),
            (
                "Transactions".to_string(),
                ExportValue::Integer(summary.transaction_count as i64),
            ),
        ],
    }
}

pub fn inventory_table(items: &[InventoryItem]) -> ExportTable {
    let columns = [
        "SKU", "Name", "Category", "Qty", "Reorder Level", "Cost Price", "Selling Price",
        "Stock Value",
    ];

    let mut sorted: Vec<&InventoryItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));

    let rows = sorted
        .iter()
        .map(|item| {
            vec![
                item.sku.clone().into(),
                item.name.clone().into(),
                item.category.clone().into(),
                ExportValue::Integer(item.quantity),
                ExportValue::Integer(item.reorder_level),
                ExportValue::Money(item.cost_price),
                ExportValue::Money(item.selling_price),
                ExportValue::Money(item.stock_value()),
            ]
        })
        .collect();

    let total_units: i64 = items.iter().map(|i| i.quantity).sum();
    let cost_value: Decimal = items.iter().map(|i| i.stock_value()).sum();
    let retail_value: Decimal = items.iter().map(|i| i.retail_value()).sum();
    let low = items
        .iter()
        .filter(|i| crate::reports::alerts::alert_level(i).is_some())
        .count();

    ExportTable {
        title: "Inventory Report".to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
        summary: vec![
            ("Items".to_string(), ExportValue::Integer(items.len() as i64)),
            ("Units on Hand".to_string(), ExportValue::Integer(total_units)),
            ("Value at Cost".to_string(), ExportValue::Money(cost_value)),
            ("Value at Retail".to_string(), ExportValue::Money(retail_value)),
            ("Needing Reorder".to_string(), ExportValue::Integer(low as i64)),
        ],
    }
}
