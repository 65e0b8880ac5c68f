//! Login against the seeded account table
//!
//! Demo-grade credential checking: plaintext comparison against the rows
//! seeded at first startup. The pipeline never consults this; it exists so
//! the dashboard UI can resolve an account to its tenant.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/demo-accounts", get(demo_accounts))
}

/// POST /api/login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct LoginTenant {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// POST /api/login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: LoginUser,
    pub business: LoginTenant,
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let account = db::find_account(&state.db, &request.email)
        .await
        .map_err(ApiError::from)?;

    let Some(account) = account.filter(|a| a.password == request.password) else {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    Ok(Json(LoginResponse {
        success: true,
        user: LoginUser {
            email: account.email,
            name: account.tenant_name.clone(),
        },
        business: LoginTenant {
            id: account.tenant_id,
            name: account.tenant_name,
            kind: account.tenant_kind,
        },
    }))
}

/// One demo account descriptor for the login screen
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoAccount {
    pub email: String,
    pub password: String,
    pub business_name: String,
    pub business_type: Option<String>,
}

/// GET /api/demo-accounts
pub async fn demo_accounts(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<DemoAccount>>> {
    let accounts = db::list_accounts(&state.db)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(
        accounts
            .into_iter()
            .map(|account| DemoAccount {
                email: account.email,
                password: account.password,
                business_name: account.tenant_name,
                business_type: account.tenant_kind,
            })
            .collect(),
    ))
}
