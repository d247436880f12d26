use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

use crate::state::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Network address of the caller, used to key login throttling.
///
/// Behind a proxy (`trust_proxy`) the last `X-Forwarded-For` entry wins,
/// since that is the one our proxy appended; earlier entries are whatever the
/// client sent. Otherwise the TCP peer address is used. Never fails: callers without a
/// resolvable address share the `"unknown"` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

impl ClientAddr {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let forwarded = if state.config.security.trust_proxy {
            forwarded_for(&parts.headers)
        } else {
            None
        };

        let addr = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(peer)| peer.ip().to_string())
            })
            .unwrap_or_else(|| Self::UNKNOWN.to_string());

        Ok(ClientAddr(addr))
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .rfind(|entry| !entry.is_empty())
        .map(str::to_string)
}
