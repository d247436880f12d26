pub mod password;
pub mod throttle;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::User;

pub use throttle::{LoginAttempts, LoginThrottle, LOGIN_ATTEMPT_THRESHOLD};

/// Upper bound on token lifetime, one year. Larger configured values are clamped.
pub const MAX_EXPIRY_HOURS: u64 = 24 * 365;

/// Identity token payload. Field names match what clients of the API decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "_id")]
    pub sub: Uuid,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    #[serde(rename = "isBusiness")]
    pub is_business: bool,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: Uuid, is_admin: bool, is_business: bool, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let hours = expiry_hours.min(MAX_EXPIRY_HOURS) as i64;
        let exp = (now + Duration::hours(hours)).timestamp();

        Self {
            sub,
            is_admin,
            is_business,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
    #[error("Invalid JWT token: {0}")]
    Verification(#[from] jsonwebtoken::errors::Error),
}

/// HS256 signing and verification keys derived from the shared secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    has_secret: bool,
    expiry_hours: u64,
}

impl TokenKeys {
    pub fn new(secret: &str, expiry_hours: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            has_secret: !secret.is_empty(),
            expiry_hours,
        }
    }

    pub fn expiry_hours(&self) -> u64 {
        self.expiry_hours
    }

    /// Sign a token for an authenticated user.
    pub fn issue(&self, user: &User) -> Result<String, JwtError> {
        self.sign(Claims::new(user.id, user.is_admin, user.is_business, self.expiry_hours))
    }

    pub fn sign(&self, claims: Claims) -> Result<String, JwtError> {
        if !self.has_secret {
            return Err(JwtError::InvalidSecret);
        }

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    /// Check signature and expiry, returning the decoded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        if !self.has_secret {
            return Err(JwtError::InvalidSecret);
        }

        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("expiry_hours", &self.expiry_hours)
            .finish_non_exhaustive()
    }
}
