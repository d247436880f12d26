use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::{FromRequestParts, Path, Request},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};
use uuid::Uuid;

use crate::auth::{Claims, TokenKeys};
use crate::database::CardStore;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the identity token.
pub const TOKEN_HEADER: &str = "x-auth-token";

/// Path parameter naming the user or card a route acts on.
const TARGET_PARAM: &str = "id";

/// A permission a route can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "isAdmin")]
    IsAdmin,
    #[serde(rename = "isBusiness")]
    IsBusiness,
    /// The `:id` in the path is the caller's own user id.
    #[serde(rename = "userOwner")]
    UserOwner,
    /// The `:id` in the path is a card the caller owns.
    #[serde(rename = "cardOwner")]
    CardOwner,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::IsAdmin => "isAdmin",
            Capability::IsBusiness => "isBusiness",
            Capability::UserOwner => "userOwner",
            Capability::CardOwner => "cardOwner",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no token provided")]
    Unauthenticated,
    #[error("token failed verification")]
    InvalidToken,
    #[error("caller holds none of the required capabilities")]
    Forbidden,
    #[error("capability lookup failed")]
    AuthorizationLookupFailed,
    #[error("too many failed login attempts")]
    TooManyAttempts,
}

/// Authenticated caller, attached to request extensions once the guard passes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub is_admin: bool,
    pub is_business: bool,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            is_admin: claims.is_admin,
            is_business: claims.is_business,
        }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        // Only reachable on routes without a guard layer, which is a wiring bug.
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            tracing::error!("AuthUser requested on {} without a guard", parts.uri.path());
            ApiError::from(AuthError::Unauthenticated)
        })
    }
}

/// Per-request capability results. Only requested capabilities are ever set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityFlags {
    pub is_admin: bool,
    pub is_business: bool,
    pub user_owner: bool,
    pub card_owner: bool,
}

impl CapabilityFlags {
    pub fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::IsAdmin => self.is_admin,
            Capability::IsBusiness => self.is_business,
            Capability::UserOwner => self.user_owner,
            Capability::CardOwner => self.card_owner,
        }
    }

    fn set(&mut self, capability: Capability, value: bool) {
        match capability {
            Capability::IsAdmin => self.is_admin = value,
            Capability::IsBusiness => self.is_business = value,
            Capability::UserOwner => self.user_owner = value,
            Capability::CardOwner => self.card_owner = value,
        }
    }
}

/// Token check plus capability check for one route.
///
/// An empty capability list admits any holder of a valid token. Otherwise
/// the caller needs at least one of the listed capabilities.
#[derive(Clone)]
pub struct Guard {
    tokens: Arc<TokenKeys>,
    cards: Arc<dyn CardStore>,
    capabilities: Arc<[Capability]>,
}

impl Guard {
    pub fn new(tokens: Arc<TokenKeys>, cards: Arc<dyn CardStore>, capabilities: &[Capability]) -> Self {
        Self {
            tokens,
            cards,
            capabilities: capabilities.into(),
        }
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Run the full check for a token and the route's `:id` parameter.
    pub async fn authorize(&self, token: Option<&str>, target_id: Option<&str>) -> Result<Claims, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Unauthenticated)?;

        let claims = self.tokens.verify(token).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            AuthError::InvalidToken
        })?;

        if self.capabilities.is_empty() {
            return Ok(claims);
        }

        let flags = self.resolve(&claims, target_id).await?;
        if self.capabilities.iter().any(|c| flags.get(*c)) {
            Ok(claims)
        } else {
            tracing::warn!(
                "User {} lacks all of [{}] for target {:?}",
                claims.sub,
                self.describe(),
                target_id
            );
            Err(AuthError::Forbidden)
        }
    }

    /// Resolve requested capabilities, claim-based ones first in declaration
    /// order, `cardOwner` last.
    ///
    /// Resolution stops at the first granted capability, so the card lookup
    /// only runs when `cardOwner` is requested and nothing else granted
    /// access. A card that is missing or owned by someone else makes
    /// `cardOwner` false; only a store failure aborts.
    pub async fn resolve(&self, claims: &Claims, target_id: Option<&str>) -> Result<CapabilityFlags, AuthError> {
        let mut flags = CapabilityFlags::default();
        let target = target_id.and_then(|id| Uuid::parse_str(id).ok());

        // Claim checks first so a granted flag can spare the lookup.
        let mut needs_lookup = false;
        for &capability in self.capabilities.iter() {
            let granted = match capability {
                Capability::IsAdmin => claims.is_admin,
                Capability::IsBusiness => claims.is_business,
                Capability::UserOwner => target == Some(claims.sub),
                Capability::CardOwner => {
                    needs_lookup = true;
                    continue;
                }
            };
            flags.set(capability, granted);
            if granted {
                return Ok(flags);
            }
        }

        if needs_lookup {
            let granted = match target {
                Some(card_id) => self.card_owned_by(card_id, claims.sub).await?,
                None => false,
            };
            flags.set(Capability::CardOwner, granted);
        }

        Ok(flags)
    }

    async fn card_owned_by(&self, card_id: Uuid, user_id: Uuid) -> Result<bool, AuthError> {
        match self.cards.owned_card(card_id, user_id).await {
            Ok(card) => Ok(card.is_some()),
            Err(e) => {
                tracing::error!("Card ownership lookup for {} failed: {}", card_id, e);
                Err(AuthError::AuthorizationLookupFailed)
            }
        }
    }

    fn describe(&self) -> String {
        self.capabilities
            .iter()
            .map(Capability::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Build the guard layer for a route. Pass no capabilities for authenticated-only routes.
pub fn guard(state: &AppState, capabilities: &[Capability]) -> GuardLayer {
    GuardLayer {
        guard: Guard::new(state.tokens.clone(), state.cards.clone(), capabilities),
    }
}

#[derive(Clone)]
pub struct GuardLayer {
    guard: Guard,
}

impl<S> Layer<S> for GuardLayer {
    type Service = GuardService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GuardService {
            inner,
            guard: self.guard.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GuardService<S> {
    inner: S,
    guard: Guard,
}

impl<S> Service<Request> for GuardService<S>
where
    S: Service<Request, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let guard = self.guard.clone();
        // Take the service that was driven to readiness, leave a clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (mut parts, body) = request.into_parts();

            let token = match extract_token(&parts.headers) {
                Ok(token) => token,
                Err(err) => return Ok(ApiError::from(err).into_response()),
            };
            let target = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
                .await
                .ok()
                .and_then(|Path(mut params)| params.remove(TARGET_PARAM));

            match guard.authorize(token.as_deref(), target.as_deref()).await {
                Ok(claims) => {
                    parts.extensions.insert(AuthUser::from(claims));
                    let request = Request::from_parts(parts, body);
                    inner.call(request).await.map(IntoResponse::into_response)
                }
                Err(err) => Ok(ApiError::from(err).into_response()),
            }
        })
    }
}

/// A header that is present but not visible ASCII is an invalid token, not a missing one.
fn extract_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(TOKEN_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .map(|token| Some(token.to_string()))
        .map_err(|_| AuthError::InvalidToken)
}
