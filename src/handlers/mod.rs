pub mod accounts;
pub mod alerts;
pub mod analytics;
pub mod auth;
pub mod dashboard;
pub mod departments;
pub mod items;
pub mod reports;
pub mod sales;
pub mod transactions;

use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    reports::DateRange,
};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `startDate` / `endDate` query pair shared by the reporting routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateQuery {
    pub fn range(&self) -> AppResult<DateRange> {
        let start = parse_date(self.start_date.as_deref(), "startDate")?;
        let end = parse_date(self.end_date.as_deref(), "endDate")?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AppError::validation("startDate must not be after endDate"));
            }
        }
        Ok(DateRange::new(start, end))
    }
}

fn parse_date(raw: Option<&str>, name: &str) -> AppResult<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::validation(format!("{} must be YYYY-MM-DD", name))),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_query_validates_bounds() {
        let query = DateQuery {
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-01-31".into()),
        };
        assert_eq!(query.range().unwrap().days(), Some(31));

        let reversed = DateQuery {
            start_date: Some("2024-02-01".into()),
            end_date: Some("2024-01-01".into()),
        };
        assert!(reversed.range().is_err());

        let malformed = DateQuery {
            start_date: Some("01/02/2024".into()),
            end_date: None,
        };
        assert!(matches!(malformed.range(), Err(AppError::Validation(_))));
        assert_eq!(DateQuery::default().range().unwrap(), DateRange::default());
    }
}
