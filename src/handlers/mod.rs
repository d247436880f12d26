// handlers/mod.rs - route handlers grouped by resource
//
// Authorization happens in the guard layer attached at routing time
// (see app.rs); handlers only see requests that already passed it.

pub mod auth;
pub mod cards;
pub mod system;
pub mod users;

use uuid::Uuid;

use crate::error::ApiError;

/// Parse a resource id from the path, 400 if it is not a UUID.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid id: {}", raw)))
}
