// handlers/auth.rs - login throttle administration

use axum::extract::{Path, State};
use serde::Serialize;

use crate::auth::LoginAttempts;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearedAttempts {
    pub address: String,
    /// Record as it stood before clearing.
    pub previous: LoginAttempts,
}

/// GET /auth/login-attempts/:address - Inspect an address's failed-login record (admin)
pub async fn get_attempts(State(state): State<AppState>, Path(address): Path<String>) -> ApiResult<LoginAttempts> {
    Ok(ApiResponse::success(state.throttle.attempts(&address)))
}

/// DELETE /auth/login-attempts/:address - Unblock an address (admin)
pub async fn clear_attempts(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(address): Path<String>,
) -> ApiResult<ClearedAttempts> {
    let previous = state.throttle.attempts(&address);
    state.throttle.clear(&address);

    tracing::info!(
        "Admin {} cleared login attempts for {} (tries={}, blocked={})",
        caller.id,
        address,
        previous.tries,
        previous.blocked
    );
    Ok(ApiResponse::success(ClearedAttempts { address, previous }))
}
