use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::{Row, SheetError, SheetStore};
use crate::config::GoogleCredentials;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Google Sheets v4 REST backend authenticated as a service account.
pub struct GoogleSheets {
    http: Client,
    credentials: GoogleCredentials,
    token: Mutex<Option<CachedToken>>,
    sheet_ids: Mutex<HashMap<String, i64>>,
}

impl GoogleSheets {
    pub fn new(credentials: GoogleCredentials) -> Result<Self, SheetError> {
        // Reject a malformed key at startup
        EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| SheetError::Auth(format!("invalid private key: {}", e)))?;

        Ok(Self {
            http: Client::new(),
            credentials,
            token: Mutex::new(None),
            sheet_ids: Mutex::new(HashMap::new()),
        })
    }

    async fn access_token(&self) -> Result<String, SheetError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.credentials.client_email,
            scope: SCOPE,
            aud: TOKEN_URI,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| SheetError::Auth(e.to_string()))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SheetError::Auth(e.to_string()))?;

        let response = self
            .http
            .post(TOKEN_URI)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SheetError::Auth(format!("token exchange returned {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        log::debug!("refreshed sheets access token, valid for {}s", token.expires_in);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(token.access_token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SheetError> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(SheetError::Api { status, body })
        }
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            SHEETS_API,
            self.credentials.sheet_id,
            urlencoding::encode(range)
        )
    }

    async fn sheet_id(&self, title: &str) -> Result<i64, SheetError> {
        let mut ids = self.sheet_ids.lock().await;
        if let Some(id) = ids.get(title) {
            return Ok(*id);
        }

        let url = format!("{}/{}", SHEETS_API, self.credentials.sheet_id);
        let meta: SpreadsheetMeta = self
            .send(
                self.http
                    .get(url)
                    .query(&[("fields", "sheets.properties(sheetId,title)")]),
            )
            .await?
            .json()
            .await?;

        for sheet in meta.sheets {
            ids.insert(sheet.properties.title, sheet.properties.sheet_id);
        }

        ids.get(title)
            .copied()
            .ok_or_else(|| SheetError::MissingSheet(title.to_string()))
    }
}

#[async_trait]
impl SheetStore for GoogleSheets {
    async fn read(&self, range: &str) -> Result<Vec<Row>, SheetError> {
        let body: ValueRange = self
            .send(
                self.http
                    .get(self.values_url(range))
                    .query(&[("valueRenderOption", "UNFORMATTED_VALUE")]),
            )
            .await?
            .json()
            .await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append(&self, range: &str, rows: Vec<Row>) -> Result<(), SheetError> {
        let url = format!("{}:append", self.values_url(range));
        self.send(append_request(&self.http, url, &rows)).await?;
        Ok(())
    }

    async fn update(&self, range: &str, rows: Vec<Row>) -> Result<(), SheetError> {
        self.send(update_request(&self.http, self.values_url(range), range, &rows))
            .await?;
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> Result<(), SheetError> {
        let sheet_id = self.sheet_id(sheet).await?;
        let url = format!("{}/{}:batchUpdate", SHEETS_API, self.credentials.sheet_id);
        self.send(self.http.post(url).json(&delete_row_request(sheet_id, row)))
            .await?;
        Ok(())
    }
}

/// Cells are written `RAW` so text like `007` or `=SUM(A1)` is stored as typed.
const VALUE_INPUT: (&str, &str) = ("valueInputOption", "RAW");

fn append_request(http: &Client, url: String, rows: &[Row]) -> RequestBuilder {
    http.post(url)
        .query(&[VALUE_INPUT, ("insertDataOption", "INSERT_ROWS")])
        .json(&json!({ "values": rows }))
}

fn update_request(http: &Client, url: String, range: &str, rows: &[Row]) -> RequestBuilder {
    http.put(url)
        .query(&[VALUE_INPUT])
        .json(&json!({ "range": range, "values": rows }))
}

fn delete_row_request(sheet_id: i64, row: usize) -> Value {
    json!({
        "requests": [{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": row - 1,
                    "endIndex": row,
                }
            }
        }]
    })
}

/// Unformatted values come back typed; the row mappers work on strings.
fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => if b { "TRUE" } else { "FALSE" }.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_stringified() {
        assert_eq!(cell_to_string(json!("abc")), "abc");
        assert_eq!(cell_to_string(json!(12)), "12");
        assert_eq!(cell_to_string(json!(12.5)), "12.5");
        assert_eq!(cell_to_string(Value::Null), "");
        assert_eq!(cell_to_string(json!(true)), "TRUE");
    }

    #[test]
    fn delete_request_targets_zero_based_half_open_rows() {
        let body = delete_row_request(42, 5);
        let range = &body["requests"][0]["deleteDimension"]["range"];
        assert_eq!(range["sheetId"], 42);
        assert_eq!(range["startIndex"], 4);
        assert_eq!(range["endIndex"], 5);
        assert_eq!(range["dimension"], "ROWS");
    }

    #[test]
    fn writes_store_cells_verbatim() {
        let http = Client::new();
        let rows = vec![vec!["it-1".to_string(), "=1+1".to_string(), "007".to_string()]];

        let url = format!("{}/s/values/Inventory:append", SHEETS_API);
        let append = append_request(&http, url, &rows).build().unwrap();
        let query = append.url().query().unwrap();
        assert!(query.contains("valueInputOption=RAW"));
        assert!(query.contains("insertDataOption=INSERT_ROWS"));
        assert!(!query.contains("USER_ENTERED"));

        let url = format!("{}/s/values/Inventory", SHEETS_API);
        let update = update_request(&http, url, "Inventory!A2:K2", &rows).build().unwrap();
        assert_eq!(update.url().query(), Some("valueInputOption=RAW"));
        let bytes = update.body().and_then(|body| body.as_bytes()).unwrap();
        let body: Value = serde_json::from_slice(bytes).unwrap();
        assert_eq!(body["values"][0][2], "007");
        assert_eq!(body["range"], "Inventory!A2:K2");
    }

    #[test]
    fn missing_values_key_means_empty_range() {
        let body: ValueRange = serde_json::from_str(r#"{"range":"Inventory!A2:K1000"}"#).unwrap();
        assert!(body.values.is_empty());
    }

    #[test]
    fn rejects_garbage_private_key() {
        let result = GoogleSheets::new(GoogleCredentials {
            client_email: "svc@example.com".to_string(),
            private_key: "not a key".to_string(),
            sheet_id: "sheet".to_string(),
        });
        assert!(matches!(result, Err(SheetError::Auth(_))));
    }
}
