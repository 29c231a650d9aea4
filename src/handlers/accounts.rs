use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::{AccountResponse, Role},
    state::AppState,
    utils::hash_password,
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    /// Defaults to the caller's own account.
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<AccountResponse>>> {
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    let accounts = state.sheets.list_accounts().await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

/// Admins may edit any account including its role; everyone else only
/// their own display name and password.
pub async fn update_account(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(update): Json<AccountUpdate>,
) -> AppResult<Json<AccountResponse>> {
    let target = update.id.clone().unwrap_or_else(|| user.id.clone());
    if !user.is_admin() && (target != user.id || update.role.is_some()) {
        return Err(AppError::Forbidden);
    }

    let display_name = match update.display_name {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::validation("displayName cannot be blank"))
        }
        other => other.map(|name| name.trim().to_string()),
    };

    let password_hash = match update.password {
        Some(password) if password.chars().count() < MIN_PASSWORD_LEN => {
            return Err(AppError::validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )))
        }
        Some(password) => {
            let cost = state.auth.bcrypt_cost;
            let hashed = tokio::task::spawn_blocking(move || hash_password(&password, cost))
                .await
                .map_err(|err| AppError::Internal(err.to_string()))?
                .map_err(|err| AppError::Internal(err.to_string()))?;
            Some(hashed)
        }
        None => None,
    };

    let role = update.role;
    let account = state
        .sheets
        .update_account(&target, |account| {
            if let Some(name) = display_name {
                account.display_name = name;
            }
            if let Some(hash) = password_hash {
                account.password = hash;
            }
            if let Some(role) = role {
                account.role = role;
            }
            Ok(())
        })
        .await?;

    log::info!("{} updated account {}", user.username, account.username);
    Ok(Json(account.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::handlers::test_support::{get, send_json, TestApp};
    use crate::models::{account, Role};
    use crate::utils::{create_token, verify_password};

    #[tokio::test]
    async fn listing_hides_passwords_and_needs_admin() {
        let app = TestApp::new();
        app.add_account("1", "boss", "secret", Role::Admin).await;

        let (status, body) = app.send(get("/api/accounts", &app.token(Role::Admin))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["username"], "boss");
        assert!(body[0].get("password").is_none());

        let (status, _) = app.send(get("/api/accounts", &app.token(Role::Operations))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn operations_may_change_only_their_own_password() {
        let app = TestApp::new();
        let me = app.add_account("ops-1", "ops", "oldpass", Role::Operations).await;
        app.add_account("adm-1", "boss", "secret", Role::Admin).await;
        let token = create_token(&me, &app.state.auth).unwrap();

        let (status, body) = app
            .send(send_json(Method::PUT, "/api/accounts", &token, json!({ "password": "newpass1" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "ops");
        let rows = app.store.snapshot(account::SHEET);
        assert!(verify_password("newpass1", &rows[1][2]));

        let (status, _) = app
            .send(send_json(
                Method::PUT,
                "/api/accounts",
                &token,
                json!({ "id": "adm-1", "displayName": "Hacked" }),
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .send(send_json(Method::PUT, "/api/accounts", &token, json!({ "role": "admin" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_can_change_roles() {
        let app = TestApp::new();
        app.add_account("ops-1", "ops", "oldpass", Role::Operations).await;

        let (status, body) = app
            .send(send_json(
                Method::PUT,
                "/api/accounts",
                &app.token(Role::Admin),
                json!({ "id": "ops-1", "role": "admin", "displayName": " Lead " }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "admin");
        assert_eq!(body["displayName"], "Lead");

        let (status, _) = app
            .send(send_json(
                Method::PUT,
                "/api/accounts",
                &app.token(Role::Admin),
                json!({ "id": "ops-1", "password": "123" }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
