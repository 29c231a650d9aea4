use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    models::Role,
    state::AppState,
    utils::verify_token,
};

pub const AUTH_COOKIE: &str = "auth_token";

/// Path prefixes the operations role may reach. Admins reach everything.
const OPERATIONS_PREFIXES: &[&str] = &[
    "/api/items",
    "/api/sales",
    "/api/transactions",
    "/api/alerts",
    "/api/dashboard",
    "/api/auth",
    "/api/accounts",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn is_allowed(role: Role, path: &str) -> bool {
    match role {
        Role::Admin => true,
        Role::Operations => OPERATIONS_PREFIXES.iter().any(|prefix| {
            path == *prefix
                || path
                    .strip_prefix(prefix)
                    .map_or(false, |rest| rest.starts_with('/'))
        }),
    }
}

/// Resolves the session from the `auth_token` cookie or a bearer header for
/// API clients, then checks the role against the requested path. A cookie
/// that fails to verify falls through to the bearer token.
pub async fn require_permission(
    State(state): State<AppState>,
    cookies: Cookies,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let candidates = [
        cookies.get(AUTH_COOKIE).map(|cookie| cookie.value().to_string()),
        bearer.map(|TypedHeader(auth)| auth.token().to_string()),
    ];

    let claims = candidates
        .into_iter()
        .flatten()
        .find_map(|token| match verify_token(&token, &state.auth.jwt_secret) {
            Ok(claims) => Some(claims),
            Err(err) => {
                log::debug!("rejected session token: {}", err);
                None
            }
        })
        .ok_or(AppError::Unauthorized)?;

    let path = request.uri().path();
    if !is_allowed(claims.role, path) {
        log::warn!("{} ({}) refused {}", claims.username, claims.role.as_str(), path);
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(CurrentUser {
        id: claims.sub,
        username: claims.username,
        role: claims.role,
    });

    Ok(next.run(request).await)
}
