use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetsBackend {
    Google,
    Memory,
}

#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_email: String,
    pub private_key: String,
    pub sheet_id: String,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub session_hours: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: SheetsBackend,
    pub google: Option<GoogleCredentials>,
    pub auth: AuthSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source so tests
    /// do not have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("SHEETS_BACKEND").as_deref() {
            None | Some("") | Some("google") => SheetsBackend::Google,
            Some("memory") => SheetsBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "SHEETS_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let google = match backend {
            SheetsBackend::Google => Some(GoogleCredentials {
                client_email: require(&lookup, "GOOGLE_CLIENT_EMAIL")?,
                // Unescape literal \n sequences
                private_key: require(&lookup, "GOOGLE_PRIVATE_KEY")?.replace("\\n", "\n"),
                sheet_id: require(&lookup, "GOOGLE_SHEET_ID")?,
            }),
            SheetsBackend::Memory => None,
        };

        let auth = AuthSettings {
            jwt_secret: require(&lookup, "JWT_SECRET")?,
            session_hours: parse_or(&lookup, "SESSION_HOURS", 24)?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        };

        Ok(Self {
            port: parse_or(&lookup, "PORT", 3000)?,
            backend,
            google,
            auth,
        })
    }
}

fn require<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
