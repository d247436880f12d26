// handlers/users.rs - /users routes

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

use super::parse_id;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::database::StoreError;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthError, AuthUser, ClientAddr};
use crate::models::{LoginRequest, User, UserInput, UserProfile};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// POST /users - Register a new user
///
/// Registration can never grant admin: `isAdmin` is not an accepted field.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let Json(input) = payload?;
    input.validate()?;

    if state.users.user_by_email(&input.email.to_lowercase()).await?.is_some() {
        return Err(ApiError::bad_request("User already registered"));
    }

    let hash = hash(input.password.clone()).await?;
    let user = User::from_input(input, hash);

    state.users.insert_user(&user).await.map_err(|e| match e {
        StoreError::Duplicate(_) => ApiError::bad_request("User already registered"),
        other => other.into(),
    })?;

    tracing::info!("Registered user {}", user.id);
    Ok(ApiResponse::created(user.profile()))
}

/// POST /users/login - Exchange credentials for a token
///
/// Guarded by the login throttle, keyed by client address. A blocked address
/// is refused before credentials are looked at, so even a correct password
/// gets 429 until the address is cleared.
pub async fn login(
    State(state): State<AppState>,
    ClientAddr(addr): ClientAddr,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Value> {
    if state.throttle.is_blocked(&addr) {
        tracing::warn!("Login refused for blocked address {}", addr);
        return Err(AuthError::TooManyAttempts.into());
    }

    let Json(request) = payload?;
    request.validate()?;

    let user = state.users.user_by_email(&request.email.to_lowercase()).await?;
    let verified = match &user {
        Some(user) => verify_password_blocking(user.password.clone(), request.password)
            .await
            .map_err(|e| {
                tracing::error!("Password check for user {} failed: {}", user.id, e);
                ApiError::internal_server_error("Failed to verify credentials")
            })?,
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            let tries = state.throttle.record_failure(&addr);
            if state.throttle.block_if_threshold_reached(&addr) {
                tracing::warn!("Address {} blocked after {} failed logins", addr, tries);
            } else {
                tracing::debug!("Failed login {} from {}", tries, addr);
            }
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
    };

    state.throttle.clear(&addr);
    let token = state.tokens.issue(&user)?;

    tracing::info!("User {} logged in from {}", user.id, addr);
    Ok(ApiResponse::success(serde_json::json!({ "token": token })))
}

/// GET /users - List every user (admin)
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<UserProfile>> {
    let users = state.users.list_users().await?;
    Ok(ApiResponse::success(users.iter().map(User::profile).collect()))
}

/// GET /users/:id - Fetch one user (admin or self)
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<UserProfile> {
    let id = parse_id(&id)?;
    let user = state
        .users
        .user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User was not found."))?;

    Ok(ApiResponse::success(user.profile()))
}

/// PUT /users/:id - Replace the caller's own profile
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let id = parse_id(&id)?;
    let Json(input) = payload?;
    input.validate()?;

    let email = input.email.to_lowercase();
    if let Some(other) = state.users.user_by_email(&email).await? {
        if other.id != id {
            return Err(ApiError::bad_request("A User with this email already exists."));
        }
    }

    let mut user = state
        .users
        .user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User was not found."))?;

    let hash = hash(input.password.clone()).await?;
    user.apply(input, hash);
    save_user(&state, &user).await?;

    Ok(ApiResponse::success(user.profile()))
}

/// PATCH /users/:id - Toggle the caller's business status
///
/// The body must be exactly `{"isBusiness": <bool>}`.
pub async fn set_business(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let id = parse_id(&id)?;
    let Json(body) = payload?;
    let is_business = business_flag(&body)?;

    let mut user = state
        .users
        .user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User was not found."))?;

    user.is_business = is_business;
    save_user(&state, &user).await?;

    tracing::info!("User {} set isBusiness={}", user.id, is_business);
    Ok(ApiResponse::success(user.profile()))
}

/// DELETE /users/:id - Remove a user (self or admin)
pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<UserProfile> {
    let id = parse_id(&id)?;
    let user = state
        .users
        .delete_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User was not found."))?;

    tracing::info!("User {} deleted by {}", user.id, caller.id);
    Ok(ApiResponse::success(user.profile()))
}

fn business_flag(body: &Value) -> Result<bool, ApiError> {
    let fields = body.as_object().filter(|map| map.len() == 1 && map.contains_key("isBusiness"));
    let Some(fields) = fields else {
        return Err(ApiError::bad_request(
            "The input must contain 'isBusiness' property and nothing else.",
        ));
    };

    fields["isBusiness"]
        .as_bool()
        .ok_or_else(|| ApiError::bad_request("'isBusiness' must contain a Boolean value (true/false)."))
}

async fn hash(password: String) -> Result<String, ApiError> {
    hash_password_blocking(password).await.map_err(|e| {
        tracing::error!("Password hashing failed: {}", e);
        ApiError::internal_server_error("Failed to process password")
    })
}

async fn save_user(state: &AppState, user: &User) -> Result<(), ApiError> {
    let replaced = state.users.replace_user(user).await.map_err(|e| match e {
        StoreError::Duplicate(_) => ApiError::bad_request("A User with this email already exists."),
        other => other.into(),
    })?;

    if replaced {
        Ok(())
    } else {
        Err(ApiError::not_found("User was not found."))
    }
}
