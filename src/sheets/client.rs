use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{A1Range, Row, SheetStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        account, inventory, transaction, Account, InventoryItem, SaleDetails, SaleLine,
        Transaction, TransactionStatus,
    },
};

/// Rows start under the header, so array index 0 is sheet row 2.
const HEADER_OFFSET: usize = 2;

/// One writer per sheet. Read-locate-write sequences hold the sheet's lock
/// for their whole duration; when both are needed, inventory is taken
/// before transactions.
#[derive(Default)]
struct WriteLocks {
    inventory: Mutex<()>,
    transactions: Mutex<()>,
    accounts: Mutex<()>,
}

/// Typed access to the Inventory, Transactions and Accounts sheets.
#[derive(Clone)]
pub struct SheetClient {
    store: Arc<dyn SheetStore>,
    locks: Arc<WriteLocks>,
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl SheetClient {
    pub fn new(store: Arc<dyn SheetStore>) -> Self {
        Self {
            store,
            locks: Arc::new(WriteLocks::default()),
        }
    }

    // ----- inventory -----

    pub async fn list_items(&self) -> AppResult<Vec<InventoryItem>> {
        let rows = self.store.read(inventory::RANGE).await?;
        Ok(parse_rows(&rows, "inventory", InventoryItem::from_row))
    }

    pub async fn get_item(&self, id: &str) -> AppResult<InventoryItem> {
        let rows = self.store.read(inventory::RANGE).await?;
        let (_, item) = locate(&rows, id, "item", InventoryItem::from_row)?;
        Ok(item)
    }

    pub async fn create_item(&self, item: InventoryItem) -> AppResult<InventoryItem> {
        let _guard = self.locks.inventory.lock().await;
        let rows = self.store.read(inventory::RANGE).await?;
        if sku_taken(&rows, &item.sku, None) {
            return Err(AppError::Conflict(format!("sku {} already exists", item.sku)));
        }

        self.store.append(inventory::RANGE, vec![item.to_row()]).await?;
        log::info!("created item {} ({})", item.id, item.sku);
        Ok(item)
    }

    /// Applies `change` to the current row contents and writes the row back.
    pub async fn update_item<F>(&self, id: &str, change: F) -> AppResult<InventoryItem>
    where
        F: FnOnce(&mut InventoryItem) -> AppResult<()>,
    {
        let _guard = self.locks.inventory.lock().await;
        self.update_item_locked(id, change).await
    }

    async fn update_item_locked<F>(&self, id: &str, change: F) -> AppResult<InventoryItem>
    where
        F: FnOnce(&mut InventoryItem) -> AppResult<()>,
    {
        let rows = self.store.read(inventory::RANGE).await?;
        let (row_number, mut item) = locate(&rows, id, "item", InventoryItem::from_row)?;
        let previous_sku = item.sku.clone();

        change(&mut item)?;
        if item.quantity < 0 {
            return Err(AppError::validation("quantity cannot be negative"));
        }
        let sku_changed = !item.sku.eq_ignore_ascii_case(&previous_sku);
        if sku_changed && sku_taken(&rows, &item.sku, Some(id)) {
            return Err(AppError::Conflict(format!("sku {} already exists", item.sku)));
        }
        item.last_updated = Some(Utc::now());

        self.write_row(inventory::RANGE, row_number, item.to_row()).await?;
        Ok(item)
    }

    pub async fn delete_item(&self, id: &str) -> AppResult<InventoryItem> {
        let _guard = self.locks.inventory.lock().await;
        let rows = self.store.read(inventory::RANGE).await?;
        let (row_number, item) = locate(&rows, id, "item", InventoryItem::from_row)?;

        self.store.delete_row(inventory::SHEET, row_number).await?;
        log::info!("deleted item {} from row {}", item.id, row_number);
        Ok(item)
    }

    /// Adds `amount` units and records one restock transaction.
    pub async fn restock(
        &self,
        id: &str,
        amount: i64,
        cost_price: Option<Decimal>,
        note: Option<String>,
    ) -> AppResult<(InventoryItem, Transaction)> {
        let _guard = self.locks.inventory.lock().await;
        let mut restock_tx = None;
        let item = self
            .update_item_locked(id, |item| {
                if let Some(cost) = cost_price {
                    item.cost_price = cost;
                }
                item.quantity = item
                    .quantity
                    .checked_add(amount)
                    .ok_or_else(|| AppError::validation("restock amount is too large"))?;
                let tx = Transaction::restock(
                    new_id(),
                    &item.id,
                    &item.name,
                    amount,
                    item.cost_price,
                    item.selling_price,
                    Utc::now(),
                )
                .ok_or_else(|| AppError::validation("restock total is too large"))?;
                restock_tx = Some(tx);
                Ok(())
            })
            .await?;

        let mut tx = restock_tx
            .ok_or_else(|| AppError::Internal(format!("restock of {} built no transaction", id)))?;
        tx.note = note;
        self.store.append(transaction::RANGE, vec![tx.to_row()]).await?;

        log::info!("restocked {} by {} to {}", item.id, amount, item.quantity);
        Ok((item, tx))
    }

    /// Checks every line against current stock before writing anything,
    /// then decrements stock and appends one sale row per line.
    pub async fn record_sale(
        &self,
        lines: Vec<SaleLine>,
        details: SaleDetails,
    ) -> AppResult<Vec<Transaction>> {
        if lines.is_empty() {
            return Err(AppError::validation("a sale needs at least one line"));
        }
        if let Some(line) = lines.iter().find(|line| line.quantity <= 0) {
            return Err(AppError::validation(format!(
                "quantity for item {} must be positive",
                line.item_id
            )));
        }
        let status = details.status.unwrap_or_default();
        if status == TransactionStatus::Cancelled {
            return Err(AppError::validation("a sale cannot be recorded as cancelled"));
        }

        let _guard = self.locks.inventory.lock().await;
        let rows = self.store.read(inventory::RANGE).await?;

        let mut touched: HashMap<String, (usize, InventoryItem)> = HashMap::new();
        for line in &lines {
            if !touched.contains_key(&line.item_id) {
                let found = locate(&rows, &line.item_id, "item", InventoryItem::from_row)?;
                touched.insert(line.item_id.clone(), found);
            }
            let (_, item) = touched
                .get_mut(&line.item_id)
                .ok_or_else(|| AppError::NotFound(format!("item {}", line.item_id)))?;
            if item.quantity < line.quantity {
                return Err(AppError::Conflict(format!(
                    "insufficient stock for {}: {} available, {} requested",
                    item.name, item.quantity, line.quantity
                )));
            }
            item.quantity -= line.quantity;
        }

        let now = Utc::now();
        let mut sales = Vec::with_capacity(lines.len());
        for line in &lines {
            let (_, item) = &touched[&line.item_id];
            let mut tx = Transaction::sale(
                new_id(),
                &item.id,
                &item.name,
                line.quantity,
                item.cost_price,
                line.selling_price.unwrap_or(item.selling_price),
                now,
            )
            .ok_or_else(|| {
                AppError::validation(format!("line total for {} is too large", item.name))
            })?;
            tx.status = status;
            tx.customer = details.customer.clone();
            tx.department = details.department.clone();
            tx.payment_method = details.payment_method.clone();
            tx.note = details.note.clone();
            sales.push(tx);
        }

        for (row_number, item) in touched.values_mut() {
            item.last_updated = Some(now);
            self.write_row(inventory::RANGE, *row_number, item.to_row()).await?;
        }
        self.store
            .append(transaction::RANGE, sales.iter().map(Transaction::to_row).collect())
            .await?;

        log::info!("recorded sale of {} line(s)", sales.len());
        Ok(sales)
    }

    // ----- transactions -----

    pub async fn list_transactions(&self) -> AppResult<Vec<Transaction>> {
        let rows = self.store.read(transaction::RANGE).await?;
        Ok(parse_rows(&rows, "transactions", Transaction::from_row))
    }

    /// Moves a transaction to `status`. Cancelling a sale puts its quantity
    /// back on the shelf; restocks cannot be cancelled.
    pub async fn set_transaction_status(
        &self,
        id: &str,
        status: TransactionStatus,
    ) -> AppResult<Transaction> {
        let _inventory = self.locks.inventory.lock().await;
        let _transactions = self.locks.transactions.lock().await;

        let rows = self.store.read(transaction::RANGE).await?;
        let (row_number, mut tx) = locate(&rows, id, "transaction", Transaction::from_row)?;

        if tx.status == status {
            return Ok(tx);
        }
        if tx.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "transaction {} is {} and cannot change",
                tx.id,
                tx.status.as_str()
            )));
        }

        if status == TransactionStatus::Cancelled && !tx.is_sale() {
            return Err(AppError::Conflict(format!(
                "{} transaction {} cannot be cancelled",
                tx.kind.as_str(),
                tx.id
            )));
        }

        if status == TransactionStatus::Cancelled {
            let quantity = tx.quantity;
            match self
                .update_item_locked(&tx.item_id, |item| {
                    item.quantity = item
                        .quantity
                        .checked_add(quantity)
                        .ok_or_else(|| AppError::validation("restored quantity is too large"))?;
                    Ok(())
                })
                .await
            {
                Ok(_) => {}
                // Item deleted since the sale
                Err(AppError::NotFound(_)) => {
                    log::warn!("cancelled {} for missing item {}", tx.id, tx.item_id)
                }
                Err(other) => return Err(other),
            }
        }

        tx.status = status;
        self.write_row(transaction::RANGE, row_number, tx.to_row()).await?;
        log::info!("transaction {} is now {}", tx.id, status.as_str());
        Ok(tx)
    }

    // ----- accounts -----

    pub async fn list_accounts(&self) -> AppResult<Vec<Account>> {
        let rows = self.store.read(account::RANGE).await?;
        Ok(parse_rows(&rows, "accounts", Account::from_row))
    }

    pub async fn find_account(&self, username: &str) -> AppResult<Option<Account>> {
        Ok(self
            .list_accounts()
            .await?
            .into_iter()
            .find(|account| account.username.eq_ignore_ascii_case(username)))
    }

    pub async fn update_account<F>(&self, id: &str, change: F) -> AppResult<Account>
    where
        F: FnOnce(&mut Account) -> AppResult<()>,
    {
        let _guard = self.locks.accounts.lock().await;
        let rows = self.store.read(account::RANGE).await?;
        let (row_number, mut account) = locate(&rows, id, "account", Account::from_row)?;

        change(&mut account)?;
        self.write_row(account::RANGE, row_number, account.to_row()).await?;
        Ok(account)
    }

    async fn write_row(&self, range: &str, row_number: usize, row: Row) -> AppResult<()> {
        let target = A1Range::parse(range)?.single_row(row_number);
        self.store.update(&target.to_string(), vec![row]).await?;
        Ok(())
    }
}

fn parse_rows<T>(rows: &[Row], what: &str, parse: fn(&[String]) -> Option<T>) -> Vec<T> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let parsed = parse(row);
            if parsed.is_none() && row.iter().any(|c| !c.trim().is_empty()) {
                log::warn!("skipping malformed {} row {}", what, index + HEADER_OFFSET);
            }
            parsed
        })
        .collect()
}

/// True when another item already uses `sku`, compared case-insensitively.
fn sku_taken(rows: &[Row], sku: &str, except_id: Option<&str>) -> bool {
    parse_rows(rows, "inventory", InventoryItem::from_row)
        .iter()
        .any(|existing| {
            Some(existing.id.as_str()) != except_id && existing.sku.eq_ignore_ascii_case(sku)
        })
}

/// Finds the record whose first column is `id` and returns its absolute
/// sheet row together with the parsed record.
fn locate<T>(
    rows: &[Row],
    id: &str,
    what: &str,
    parse: fn(&[String]) -> Option<T>,
) -> AppResult<(usize, T)> {
    let index = rows
        .iter()
        .position(|row| row.first().map(|c| c.trim()) == Some(id))
        .ok_or_else(|| AppError::NotFound(format!("{} {}", what, id)))?;

    let record = parse(&rows[index]).ok_or_else(|| {
        AppError::validation(format!("{} {} has unreadable spreadsheet data", what, id))
    })?;

    Ok((index + HEADER_OFFSET, record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use crate::sheets::MemorySheets;

    fn item(id: &str, quantity: i64) -> InventoryItem {
        InventoryItem {
            id: id.to_string(),
            name: format!("Item {}", id),
            sku: format!("SKU-{}", id),
            category: "General".to_string(),
            quantity,
            cost_price: Decimal::from(50),
            selling_price: Decimal::from(100),
            reorder_level: 3,
            supplier: String::new(),
            storage_room: String::new(),
            last_updated: None,
        }
    }

    async fn client_with(items: &[InventoryItem]) -> (SheetClient, Arc<MemorySheets>) {
        let store = Arc::new(MemorySheets::with_default_layout());
        let client = SheetClient::new(store.clone());
        for item in items {
            client.create_item(item.clone()).await.unwrap();
        }
        (client, store)
    }

    #[tokio::test]
    async fn restock_adds_quantity_and_one_transaction() {
        let (client, _) = client_with(&[item("a", 5)]).await;

        let (updated, tx) = client.restock("a", 10, None, None).await.unwrap();

        assert_eq!(updated.quantity, 15);
        assert_eq!(client.get_item("a").await.unwrap().quantity, 15);
        let txs = client.list_transactions().await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].kind, TransactionKind::Restock);
        assert_eq!(txs[0].id, tx.id);
        assert_eq!(txs[0].quantity, 10);
    }

    #[tokio::test]
    async fn update_after_delete_hits_the_shifted_row() {
        let (client, store) = client_with(&[item("a", 1), item("b", 2), item("c", 3)]).await;

        client.delete_item("a").await.unwrap();
        client
            .update_item("c", |item| {
                item.quantity = 30;
                Ok(())
            })
            .await
            .unwrap();

        let grid = store.snapshot("Inventory");
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[1][0], "b");
        assert_eq!(grid[1][4], "2");
        assert_eq!(grid[2][0], "c");
        assert_eq!(grid[2][4], "30");
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let (client, _) = client_with(&[item("a", 1)]).await;
        assert!(matches!(client.delete_item("zzz").await, Err(AppError::NotFound(_))));
        assert!(matches!(client.get_item("zzz").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_sku_is_refused() {
        let (client, _) = client_with(&[item("a", 1)]).await;
        let mut dup = item("b", 1);
        dup.sku = "sku-a".to_string();
        assert!(matches!(client.create_item(dup).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn sku_change_to_a_taken_sku_is_refused() {
        let (client, _) = client_with(&[item("a", 1), item("b", 1)]).await;

        let err = client
            .update_item("b", |item| {
                item.sku = "sku-A".to_string();
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(client.get_item("b").await.unwrap().sku, "SKU-b");

        let renamed = client
            .update_item("a", |item| {
                item.sku = "sku-a".to_string();
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(renamed.sku, "sku-a");
    }

    #[tokio::test]
    async fn overflowing_restock_is_rejected_without_writing() {
        let (client, _) = client_with(&[item("a", 5)]).await;

        let err = client.restock("a", i64::MAX, None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(client.get_item("a").await.unwrap().quantity, 5);
        assert!(client.list_transactions().await.unwrap().is_empty());

        let mut pricey = item("b", 0);
        pricey.cost_price = Decimal::MAX;
        let (client, _) = client_with(&[pricey]).await;
        let err = client.restock("b", 2, None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(client.get_item("b").await.unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn restocks_cannot_be_cancelled() {
        let (client, _) = client_with(&[item("a", 5)]).await;
        let (_, tx) = client.restock("a", 10, None, None).await.unwrap();

        let err = client
            .set_transaction_status(&tx.id, TransactionStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(client.get_item("a").await.unwrap().quantity, 15);
        assert_eq!(
            client.list_transactions().await.unwrap()[0].status,
            TransactionStatus::Completed
        );
    }

    #[tokio::test]
    async fn concurrent_restocks_do_not_lose_updates() {
        let (client, _) = client_with(&[item("a", 0)]).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                client.restock("a", 1, None, None).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(client.get_item("a").await.unwrap().quantity, 20);
        assert_eq!(client.list_transactions().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn sale_with_short_stock_writes_nothing() {
        let (client, _) = client_with(&[item("a", 5), item("b", 1)]).await;

        let lines = vec![
            SaleLine { item_id: "a".into(), quantity: 2, selling_price: None },
            SaleLine { item_id: "b".into(), quantity: 2, selling_price: None },
        ];
        let err = client.record_sale(lines, SaleDetails::default()).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(client.get_item("a").await.unwrap().quantity, 5);
        assert!(client.list_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_lines_for_one_item_share_its_stock() {
        let (client, _) = client_with(&[item("a", 3)]).await;

        let lines = vec![
            SaleLine { item_id: "a".into(), quantity: 2, selling_price: None },
            SaleLine { item_id: "a".into(), quantity: 2, selling_price: None },
        ];
        assert!(client.record_sale(lines, SaleDetails::default()).await.is_err());

        let lines = vec![
            SaleLine { item_id: "a".into(), quantity: 1, selling_price: Some(Decimal::from(90)) },
            SaleLine { item_id: "a".into(), quantity: 2, selling_price: None },
        ];
        let sales = client.record_sale(lines, SaleDetails::default()).await.unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].total_revenue, Decimal::from(90));
        assert_eq!(client.get_item("a").await.unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn sale_cannot_start_cancelled() {
        let (client, _) = client_with(&[item("a", 5)]).await;

        let err = client
            .record_sale(
                vec![SaleLine { item_id: "a".into(), quantity: 3, selling_price: None }],
                SaleDetails {
                    status: Some(TransactionStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(client.get_item("a").await.unwrap().quantity, 5);
        assert!(client.list_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelling_a_sale_restores_stock_once() {
        let (client, _) = client_with(&[item("a", 5)]).await;
        let sales = client
            .record_sale(
                vec![SaleLine { item_id: "a".into(), quantity: 3, selling_price: None }],
                SaleDetails {
                    status: Some(TransactionStatus::Pending),
                    department: Some("Shopee".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(client.get_item("a").await.unwrap().quantity, 2);

        let id = &sales[0].id;
        client.set_transaction_status(id, TransactionStatus::Packed).await.unwrap();
        let cancelled = client
            .set_transaction_status(id, TransactionStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, TransactionStatus::Cancelled);
        assert_eq!(client.get_item("a").await.unwrap().quantity, 5);

        let again = client.set_transaction_status(id, TransactionStatus::Pending).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert_eq!(client.get_item("a").await.unwrap().quantity, 5);
    }
}
