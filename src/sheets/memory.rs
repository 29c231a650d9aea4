use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{A1Range, Row, SheetError, SheetStore};

/// In-process spreadsheet. Each sheet is a grid whose first row is the
/// header, mirroring how the real spreadsheet is laid out.
#[derive(Default)]
pub struct MemorySheets {
    sheets: Mutex<HashMap<String, Vec<Row>>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the stock layout: Inventory, Transactions and Accounts with
    /// their header rows.
    pub fn with_default_layout() -> Self {
        let store = Self::new();
        store.add_sheet("Inventory", crate::models::inventory::HEADER);
        store.add_sheet("Transactions", crate::models::transaction::HEADER);
        store.add_sheet("Accounts", crate::models::account::HEADER);
        store
    }

    pub fn add_sheet(&self, title: &str, header: &[&str]) {
        let header = header.iter().map(|h| h.to_string()).collect();
        self.lock().insert(title.to_string(), vec![header]);
    }

    /// Raw grid including the header row.
    pub fn snapshot(&self, title: &str) -> Vec<Row> {
        self.lock().get(title).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Row>>> {
        self.sheets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SheetStore for MemorySheets {
    async fn read(&self, range: &str) -> Result<Vec<Row>, SheetError> {
        let range = A1Range::parse(range)?;
        let sheets = self.lock();
        let grid = sheets
            .get(&range.sheet)
            .ok_or_else(|| SheetError::MissingSheet(range.sheet.clone()))?;

        let last = range.end_row.unwrap_or(grid.len()).min(grid.len());
        let rows = grid
            .iter()
            .enumerate()
            .skip(range.start_row - 1)
            .take_while(|(index, _)| index + 1 <= last)
            .map(|(_, row)| {
                let mut cells: Row = row
                    .iter()
                    .skip(range.start_col)
                    .take(range.width())
                    .cloned()
                    .collect();
                // The Sheets API drops trailing empty cells
                while cells.last().map_or(false, |c| c.is_empty()) {
                    cells.pop();
                }
                cells
            })
            .collect();

        Ok(rows)
    }

    async fn append(&self, range: &str, rows: Vec<Row>) -> Result<(), SheetError> {
        let range = A1Range::parse(range)?;
        let mut sheets = self.lock();
        let grid = sheets
            .get_mut(&range.sheet)
            .ok_or_else(|| SheetError::MissingSheet(range.sheet.clone()))?;

        for row in rows {
            let mut padded = vec![String::new(); range.start_col];
            padded.extend(row);
            grid.push(padded);
        }
        Ok(())
    }

    async fn update(&self, range: &str, rows: Vec<Row>) -> Result<(), SheetError> {
        let range = A1Range::parse(range)?;
        let mut sheets = self.lock();
        let grid = sheets
            .get_mut(&range.sheet)
            .ok_or_else(|| SheetError::MissingSheet(range.sheet.clone()))?;

        for (offset, row) in rows.into_iter().enumerate() {
            let index = range.start_row - 1 + offset;
            if index >= grid.len() {
                grid.resize_with(index + 1, Vec::new);
            }
            let target = &mut grid[index];
            let needed = range.start_col + row.len();
            if target.len() < needed {
                target.resize(needed, String::new());
            }
            for (col, value) in row.into_iter().enumerate() {
                target[range.start_col + col] = value;
            }
        }
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> Result<(), SheetError> {
        let mut sheets = self.lock();
        let grid = sheets
            .get_mut(sheet)
            .ok_or_else(|| SheetError::MissingSheet(sheet.to_string()))?;

        if row == 0 || row > grid.len() {
            return Err(SheetError::Range(format!("{}!{}", sheet, row)));
        }
        grid.remove(row - 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn read_skips_header_and_trims_trailing_blanks() {
        let store = MemorySheets::new();
        store.add_sheet("Data", &["id", "name", "note"]);
        store
            .append("Data!A2:C", vec![row(&["1", "bolt", ""]), row(&["2", "nut", "x"])])
            .await
            .unwrap();

        let rows = store.read("Data!A2:C").await.unwrap();
        assert_eq!(rows, vec![row(&["1", "bolt"]), row(&["2", "nut", "x"])]);
    }

    #[tokio::test]
    async fn update_and_delete_use_absolute_rows() {
        let store = MemorySheets::new();
        store.add_sheet("Data", &["id", "name"]);
        store
            .append(
                "Data!A2:B",
                vec![row(&["1", "a"]), row(&["2", "b"]), row(&["3", "c"])],
            )
            .await
            .unwrap();

        store.update("Data!A3:B3", vec![row(&["2", "B"])]).await.unwrap();
        store.delete_row("Data", 2).await.unwrap();

        let rows = store.read("Data!A2:B").await.unwrap();
        assert_eq!(rows, vec![row(&["2", "B"]), row(&["3", "c"])]);
    }

    #[tokio::test]
    async fn unknown_sheet_is_an_error() {
        let store = MemorySheets::new();
        let err = store.read("Nope!A2:B").await.unwrap_err();
        assert!(matches!(err, SheetError::MissingSheet(name) if name == "Nope"));
    }
}
