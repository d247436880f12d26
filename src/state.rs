use std::sync::Arc;
use std::time::Duration;

use crate::auth::{LoginThrottle, TokenKeys};
use crate::config::AppConfig;
use crate::database::{CardStore, MemoryStore, UserStore};

/// Shared handles passed to every handler and guard.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub cards: Arc<dyn CardStore>,
    pub throttle: Arc<LoginThrottle>,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    /// Build state over a store that holds both users and cards.
    ///
    /// `config` must already be validated so the JWT secret is populated.
    pub fn new<S>(config: AppConfig, store: Arc<S>) -> Self
    where
        S: UserStore + CardStore + 'static,
    {
        let tokens = TokenKeys::new(&config.security.jwt_secret, config.security.jwt_expiry_hours);
        let throttle = match config.security.login_lockout_secs {
            Some(secs) => LoginThrottle::with_lockout(Duration::from_secs(secs)),
            None => LoginThrottle::new(),
        };

        Self {
            users: store.clone(),
            cards: store,
            throttle: Arc::new(throttle),
            tokens: Arc::new(tokens),
            config: Arc::new(config),
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }
}
