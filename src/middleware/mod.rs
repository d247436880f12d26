pub mod client_addr;
pub mod guard;
pub mod response;

pub use client_addr::ClientAddr;
pub use guard::{guard, AuthError, AuthUser, Capability, Guard, GuardLayer};
pub use response::{ApiResponse, ApiResult};
