use axum::{
    handler::Handler,
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, Environment};
use crate::handlers::{auth, cards, system, users};
use crate::middleware::{guard, Capability::*};
use crate::state::AppState;

/// Full application router with shared state and global middleware applied.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .merge(user_routes(&state))
        .merge(card_routes(&state))
        .merge(auth_routes(&state))
        .fallback(system::not_found);

    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state.config));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            post(users::register).get(users::list_users.layer(guard(state, &[IsAdmin]))),
        )
        .route("/users/login", post(users::login))
        .route(
            "/users/:id",
            get(users::get_user.layer(guard(state, &[IsAdmin, UserOwner])))
                .put(users::update_user.layer(guard(state, &[UserOwner])))
                .patch(users::set_business.layer(guard(state, &[UserOwner])))
                .delete(users::delete_user.layer(guard(state, &[UserOwner, IsAdmin]))),
        )
}

fn card_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/cards",
            get(cards::list_cards).post(cards::create_card.layer(guard(state, &[IsBusiness]))),
        )
        .route(
            "/cards/my-cards",
            get(cards::my_cards.layer(guard(state, &[IsBusiness]))),
        )
        .route(
            "/cards/:id",
            get(cards::get_card)
                .put(cards::update_card.layer(guard(state, &[CardOwner])))
                // Any authenticated user may like a card.
                .patch(cards::like_card.layer(guard(state, &[])))
                .delete(cards::delete_card.layer(guard(state, &[CardOwner, IsAdmin]))),
        )
        .route(
            "/cards/bizNum/:id",
            patch(cards::set_biz_number.layer(guard(state, &[IsAdmin]))),
        )
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/auth/login-attempts/:address",
        get(auth::get_attempts.layer(guard(state, &[IsAdmin])))
            .delete(auth::clear_attempts.layer(guard(state, &[IsAdmin]))),
    )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
