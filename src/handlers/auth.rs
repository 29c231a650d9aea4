use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::{AppError, AppResult},
    middleware::{permission::AUTH_COOKIE, CurrentUser},
    models::AccountResponse,
    state::AppState,
    utils::{create_token, verify_password},
};

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    user: AccountResponse,
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(form): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let account = state
        .sheets
        .find_account(form.username.trim())
        .await?
        .filter(|account| verify_password(&form.password, &account.password))
        .ok_or_else(|| {
            log::warn!("failed login for {}", form.username.trim());
            AppError::Unauthorized
        })?;

    let token = create_token(&account, &state.auth)
        .map_err(|err| AppError::Internal(format!("could not sign session: {}", err)))?;

    // HTTP-only cookie carrying the JWT
    let cookie = Cookie::build((AUTH_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::hours(state.auth.session_hours))
        .build();
    cookies.add(cookie);

    log::info!("{} signed in", account.username);
    Ok(Json(LoginResponse {
        token,
        user: account.into(),
    }))
}

pub async fn logout(cookies: Cookies) -> Json<Value> {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    cookies.remove(cookie);
    Json(json!({ "success": true }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<AccountResponse>> {
    let account = state
        .sheets
        .list_accounts()
        .await?
        .into_iter()
        .find(|account| account.id == user.id)
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(account.into()))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;

    use crate::handlers::test_support::{send_json, TestApp};
    use crate::models::Role;
    use crate::utils::hash_password;

    fn login_request(username: &str, password: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "username": username, "password": password }).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn login_sets_cookie_that_opens_protected_routes() {
        let app = TestApp::new();
        app.add_account("1", "kasir", "legacy-plain", Role::Operations).await;

        let response = app
            .router()
            .oneshot(login_request("Kasir", "legacy-plain"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.starts_with("auth_token="));
        assert!(set_cookie.contains("HttpOnly"));

        let cookie = set_cookie.split(';').next().unwrap().to_string();
        let me = Request::builder()
            .uri("/api/auth/me")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let (status, body) = app.send(me).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "kasir");
        assert_eq!(body["role"], "operations");
    }

    #[tokio::test]
    async fn hashed_passwords_verify_and_wrong_ones_fail() {
        let app = TestApp::new();
        let hash = hash_password("s3cret!", 4).unwrap();
        app.add_account("1", "boss", &hash, Role::Admin).await;

        let (status, body) = app.send(login_request("boss", "s3cret!")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some());
        assert!(body["user"].get("password").is_none());

        let (status, _) = app.send(login_request("boss", "wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.send(login_request("nobody", "s3cret!")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_requires_an_existing_account() {
        let app = TestApp::new();
        let token = app.token(Role::Admin);
        let (status, _) = app
            .send(send_json(Method::GET, "/api/auth/me", &token, json!({})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
