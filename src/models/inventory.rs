use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{cell, format_timestamp, parse_count, parse_money, parse_timestamp};
use crate::sheets::Row;

pub const SHEET: &str = "Inventory";
pub const RANGE: &str = "Inventory!A2:K";
pub const HEADER: &[&str] = &[
    "ID",
    "Name",
    "SKU",
    "Category",
    "Quantity",
    "Cost Price",
    "Selling Price",
    "Reorder Level",
    "Supplier",
    "Storage Room",
    "Last Updated",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub quantity: i64,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub reorder_level: i64,
    pub supplier: String,
    pub storage_room: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl InventoryItem {
    /// `None` for rows without an id or with unreadable numbers.
    pub fn from_row(row: &[String]) -> Option<Self> {
        let id = cell(row, 0);
        if id.is_empty() {
            return None;
        }

        Some(Self {
            id: id.to_string(),
            name: cell(row, 1).to_string(),
            sku: cell(row, 2).to_string(),
            category: cell(row, 3).to_string(),
            quantity: parse_count(cell(row, 4))?,
            cost_price: parse_money(cell(row, 5))?,
            selling_price: parse_money(cell(row, 6))?,
            reorder_level: parse_count(cell(row, 7))?,
            supplier: cell(row, 8).to_string(),
            storage_room: cell(row, 9).to_string(),
            last_updated: parse_timestamp(cell(row, 10)),
        })
    }

    pub fn to_row(&self) -> Row {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.sku.clone(),
            self.category.clone(),
            self.quantity.to_string(),
            self.cost_price.to_string(),
            self.selling_price.to_string(),
            self.reorder_level.to_string(),
            self.supplier.clone(),
            self.storage_room.clone(),
            self.last_updated.as_ref().map(format_timestamp).unwrap_or_default(),
        ]
    }

    pub fn stock_value(&self) -> Decimal {
        self.cost_price * Decimal::from(self.quantity)
    }

    pub fn retail_value(&self) -> Decimal {
        self.selling_price * Decimal::from(self.quantity)
    }

    pub fn apply(&mut self, patch: ItemPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(sku) = patch.sku {
            self.sku = sku.trim().to_string();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(cost_price) = patch.cost_price {
            self.cost_price = cost_price;
        }
        if let Some(selling_price) = patch.selling_price {
            self.selling_price = selling_price;
        }
        if let Some(reorder_level) = patch.reorder_level {
            self.reorder_level = reorder_level;
        }
        if let Some(supplier) = patch.supplier {
            self.supplier = supplier;
        }
        if let Some(storage_room) = patch.storage_room {
            self.storage_room = storage_room;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub selling_price: Decimal,
    #[serde(default)]
    pub reorder_level: i64,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub storage_room: String,
}

impl NewItem {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if self.sku.trim().is_empty() {
            return Err("sku is required".to_string());
        }
        check_amounts(
            Some(self.quantity),
            Some(self.reorder_level),
            Some(self.cost_price),
            Some(self.selling_price),
        )
    }

    pub fn into_item(self, id: String, now: DateTime<Utc>) -> InventoryItem {
        InventoryItem {
            id,
            name: self.name.trim().to_string(),
            sku: self.sku.trim().to_string(),
            category: self.category.trim().to_string(),
            quantity: self.quantity,
            cost_price: self.cost_price,
            selling_price: self.selling_price,
            reorder_level: self.reorder_level,
            supplier: self.supplier,
            storage_room: self.storage_room,
            last_updated: Some(now),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i64>,
    pub cost_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub reorder_level: Option<i64>,
    pub supplier: Option<String>,
    pub storage_room: Option<String>,
}

impl ItemPatch {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.as_deref().map_or(false, |n| n.trim().is_empty()) {
            return Err("name cannot be blank".to_string());
        }
        if self.sku.as_deref().map_or(false, |s| s.trim().is_empty()) {
            return Err("sku cannot be blank".to_string());
        }
        check_amounts(self.quantity, self.reorder_level, self.cost_price, self.selling_price)
    }
}

fn check_amounts(
    quantity: Option<i64>,
    reorder_level: Option<i64>,
    cost_price: Option<Decimal>,
    selling_price: Option<Decimal>,
) -> Result<(), String> {
    if quantity.map_or(false, |q| q < 0) {
        return Err("quantity cannot be negative".to_string());
    }
    if reorder_level.map_or(false, |r| r < 0) {
        return Err("reorderLevel cannot be negative".to_string());
    }
    if cost_price.map_or(false, |p| p.is_sign_negative()) {
        return Err("costPrice cannot be negative".to_string());
    }
    if selling_price.map_or(false, |p| p.is_sign_negative()) {
        return Err("sellingPrice cannot be negative".to_string());
    }
    Ok(())
}
