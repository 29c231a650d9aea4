use std::sync::Arc;

use crate::{
    config::{AuthSettings, Config, ConfigError, SheetsBackend},
    sheets::{GoogleSheets, MemorySheets, SheetClient, SheetError, SheetStore},
};

#[derive(Clone)]
pub struct AppState {
    pub sheets: SheetClient,
    pub auth: Arc<AuthSettings>,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sheets(#[from] SheetError),
}

impl AppState {
    pub fn new(store: Arc<dyn SheetStore>, auth: AuthSettings) -> Self {
        Self {
            sheets: SheetClient::new(store),
            auth: Arc::new(auth),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let store: Arc<dyn SheetStore> = match config.backend {
            SheetsBackend::Google => {
                let credentials = config
                    .google
                    .clone()
                    .ok_or(ConfigError::Missing("GOOGLE_SHEET_ID"))?;
                log::info!("using spreadsheet {}", credentials.sheet_id);
                Arc::new(GoogleSheets::new(credentials)?)
            }
            SheetsBackend::Memory => {
                log::warn!("using the in-memory sheet store; data is lost on restart");
                Arc::new(MemorySheets::with_default_layout())
            }
        };

        Ok(Self::new(store, config.auth.clone()))
    }
}
