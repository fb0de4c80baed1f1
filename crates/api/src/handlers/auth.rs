//! Handlers for the `/auth` resource (register, login, verify).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use crowdcount_core::error::CoreError;
use crowdcount_core::roles::{ROLE_ADMIN, ROLE_USER};
use crowdcount_core::types::DbId;
use crowdcount_db::models::activity::{CreateActivity, ACTIVITY_LOGIN};
use crowdcount_db::models::user::{CreateUser, UserResponse};
use crowdcount_db::repositories::{ActivityRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{generate_access_token, TokenSubject};
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Public user info embedded in auth responses.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: String,
}

/// Response of `POST /auth/verify`.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: UserInfo,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account. The first account ever registered becomes an admin;
/// every later one gets the `user` role.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    let username = input.username.trim();
    let email = input.email.trim();

    if username.is_empty() || email.is_empty() || input.password.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Username, email and password are required".into(),
        )));
    }

    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    if UserRepo::find_by_email(&state.pool, email).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "Email already registered".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let role = if UserRepo::count(&state.pool).await? == 0 {
        ROLE_ADMIN
    } else {
        ROLE_USER
    };

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role: role.to_string(),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(user),
        }),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Returns a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    if input.email.trim().is_empty() || input.password.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Email and password are required".into(),
        )));
    }

    let invalid =
        || AppError::Core(CoreError::Unauthorized("Invalid email or password".into()));

    let user = UserRepo::find_by_email(&state.pool, input.email.trim())
        .await?
        .ok_or_else(invalid)?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(user_id = user.id, "Rejected login with wrong password");
        return Err(invalid());
    }

    let token = generate_access_token(
        TokenSubject {
            user_id: user.id,
            username: &user.username,
            email: &user.email,
            role: &user.role,
        },
        &state.config.jwt,
    )
    .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    ActivityRepo::create(
        &state.pool,
        &CreateActivity {
            user_id: user.id,
            activity_type: ACTIVITY_LOGIN.to_string(),
            activity_details: Some("User logged in".to_string()),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(DataResponse {
        data: AuthResponse {
            token,
            expires_in: state.config.jwt.expires_in_secs(),
            user: UserInfo {
                id: user.id,
                username: user.username,
                email: user.email,
                role: user.role,
            },
        },
    }))
}

/// POST /api/v1/auth/verify
///
/// Echo the identity carried by a valid token.
pub async fn verify(auth_user: AuthUser) -> Json<DataResponse<VerifyResponse>> {
    Json(DataResponse {
        data: VerifyResponse {
            valid: true,
            user: UserInfo {
                id: auth_user.user_id,
                username: auth_user.username,
                email: auth_user.email,
                role: auth_user.role,
            },
        },
    })
}
