use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{cell, format_timestamp, parse_timestamp};
use crate::sheets::Row;

pub const SHEET: &str = "Accounts";
pub const RANGE: &str = "Accounts!A2:F";
pub const HEADER: &[&str] = &["ID", "Username", "Password", "Role", "Display Name", "Created At"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operations,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Operations => "operations",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "operations" => Some(Role::Operations),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: String,
    pub username: String,
    /// Plaintext on legacy rows, a bcrypt hash once changed through the API.
    pub password: String,
    pub role: Role,
    pub display_name: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn from_row(row: &[String]) -> Option<Self> {
        let id = cell(row, 0);
        let username = cell(row, 1);
        if id.is_empty() || username.is_empty() {
            return None;
        }

        Some(Self {
            id: id.to_string(),
            username: username.to_string(),
            password: cell(row, 2).to_string(),
            role: Role::parse(cell(row, 3))?,
            display_name: cell(row, 4).to_string(),
            created_at: parse_timestamp(cell(row, 5)),
        })
    }

    pub fn to_row(&self) -> Row {
        vec![
            self.id.clone(),
            self.username.clone(),
            self.password.clone(),
            self.role.as_str().to_string(),
            self.display_name.clone(),
            self.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
        ]
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub display_name: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            role: account.role,
            display_name: account.display_name,
            created_at: account.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_role_case_insensitively() {
        let row: Row = ["1", "ops", "pw", "Operations", "Ops Desk", ""]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let account = Account::from_row(&row).unwrap();
        assert_eq!(account.role, Role::Operations);
        assert_eq!(account.created_at, None);
    }

    #[test]
    fn response_never_carries_password() {
        let account = Account {
            id: "1".into(),
            username: "admin".into(),
            password: "secret".into(),
            role: Role::Admin,
            display_name: "Admin".into(),
            created_at: None,
        };
        let json = serde_json::to_value(AccountResponse::from(account)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["displayName"], "Admin");
    }
}
