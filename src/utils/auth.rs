use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthSettings,
    models::{Account, Role},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account id
    pub username: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(account: &Account, session_hours: i64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(session_hours);

        Self {
            sub: account.id.clone(),
            username: account.username.clone(),
            role: account.role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn create_token(
    account: &Account,
    settings: &AuthSettings,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::new(account, settings.session_hours);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_ref()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Accounts sheet passwords are bcrypt hashes once changed through the API,
/// but rows entered by hand hold plaintext.
pub fn verify_password(password: &str, stored: &str) -> bool {
    if stored.starts_with("$2") {
        bcrypt::verify(password, stored).unwrap_or(false)
    } else {
        !stored.is_empty() && password == stored
    }
}
