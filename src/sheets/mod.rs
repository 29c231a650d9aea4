pub mod client;
pub mod google;
pub mod memory;
pub mod range;

use async_trait::async_trait;
use thiserror::Error;

pub use client::SheetClient;
pub use google::GoogleSheets;
pub use memory::MemorySheets;
pub use range::A1Range;

pub type Row = Vec<String>;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sheets api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("service account authentication failed: {0}")]
    Auth(String),

    #[error("invalid range: {0}")]
    Range(String),

    #[error("sheet {0} does not exist")]
    MissingSheet(String),
}

/// Row-oriented access to a spreadsheet. Ranges are A1 strings such as
/// `Inventory!A2:K`; row numbers are the absolute one-based sheet rows.
#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn read(&self, range: &str) -> Result<Vec<Row>, SheetError>;

    async fn append(&self, range: &str, rows: Vec<Row>) -> Result<(), SheetError>;

    async fn update(&self, range: &str, rows: Vec<Row>) -> Result<(), SheetError>;

    async fn delete_row(&self, sheet: &str, row: usize) -> Result<(), SheetError>;
}
