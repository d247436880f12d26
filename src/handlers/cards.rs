// handlers/cards.rs - /cards routes

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

use super::parse_id;
use crate::database::{CardStore, LikeOutcome, StoreError};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::card::{random_biz_number, BIZ_NUMBER_RANGE};
use crate::models::{Card, CardInput};
use crate::state::AppState;

const MAX_BIZ_NUMBER_ATTEMPTS: usize = 16;

/// GET /cards - All cards, public
pub async fn list_cards(State(state): State<AppState>) -> ApiResult<Vec<Card>> {
    Ok(ApiResponse::success(state.cards.list_cards().await?))
}

/// GET /cards/my-cards - Cards owned by the calling business user
pub async fn my_cards(State(state): State<AppState>, caller: AuthUser) -> ApiResult<Vec<Card>> {
    Ok(ApiResponse::success(state.cards.cards_by_owner(caller.id).await?))
}

/// GET /cards/:id - One card, public
pub async fn get_card(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Card> {
    let id = parse_id(&id)?;
    let card = state
        .cards
        .card_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Card was not found."))?;

    Ok(ApiResponse::success(card))
}

/// POST /cards - Create a card owned by the caller
pub async fn create_card(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<CardInput>, JsonRejection>,
) -> ApiResult<Card> {
    let Json(input) = payload?;
    input.validate()?;

    let biz_number = unique_biz_number(state.cards.as_ref()).await?;
    let card = Card::from_input(input, caller.id, biz_number);
    state.cards.insert_card(&card).await?;

    tracing::info!("User {} created card {} ({})", caller.id, card.id, card.biz_number);
    Ok(ApiResponse::created(card))
}

/// PUT /cards/:id - Replace the editable fields of the caller's card
pub async fn update_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CardInput>, JsonRejection>,
) -> ApiResult<Card> {
    let id = parse_id(&id)?;
    let Json(input) = payload?;
    input.validate()?;

    let card = state
        .cards
        .update_card_details(id, &input.into_details())
        .await?
        .ok_or_else(|| ApiError::not_found("Card was not found."))?;

    Ok(ApiResponse::success(card))
}

/// PATCH /cards/:id - Like a card
pub async fn like_card(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Card> {
    let id = parse_id(&id)?;

    match state.cards.add_like(id, caller.id).await? {
        LikeOutcome::Liked(card) => Ok(ApiResponse::success(card)),
        LikeOutcome::AlreadyLiked => Err(ApiError::bad_request("You already liked this card.")),
        LikeOutcome::NotFound => Err(ApiError::not_found("Card was not found.")),
    }
}

/// DELETE /cards/:id - Remove a card (owner or admin)
pub async fn delete_card(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Card> {
    let id = parse_id(&id)?;
    let card = state
        .cards
        .delete_card(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Card was not found."))?;

    tracing::info!("Card {} deleted by {}", card.id, caller.id);
    Ok(ApiResponse::success(card))
}

/// PATCH /cards/bizNum/:id - Reassign a card's bizNumber (admin)
///
/// Uses `bizNumber` from the body when given, otherwise generates a fresh one.
pub async fn set_biz_number(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Card> {
    let id = parse_id(&id)?;
    let requested = requested_biz_number(&body)?;

    let card = state
        .cards
        .card_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("No card with this ID was found."))?;

    let biz_number = match requested {
        Some(number) => {
            if let Some(other) = state.cards.card_by_biz_number(&number).await? {
                if other.id != card.id {
                    return Err(ApiError::conflict("A card with this bizNumber already exists."));
                }
            }
            number
        }
        None => unique_biz_number(state.cards.as_ref()).await?,
    };

    let card = state
        .cards
        .set_biz_number(card.id, &biz_number)
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => ApiError::conflict("A card with this bizNumber already exists."),
            other => other.into(),
        })?
        .ok_or_else(|| ApiError::not_found("No card with this ID was found."))?;

    tracing::info!("Card {} bizNumber set to {}", card.id, card.biz_number);
    Ok(ApiResponse::success(card))
}

/// Draw random bizNumbers until one is free.
async fn unique_biz_number(cards: &dyn CardStore) -> Result<String, ApiError> {
    for _ in 0..MAX_BIZ_NUMBER_ATTEMPTS {
        let candidate = random_biz_number();
        if cards.card_by_biz_number(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }

    tracing::error!("No free bizNumber after {} attempts", MAX_BIZ_NUMBER_ATTEMPTS);
    Err(ApiError::internal_server_error("Could not allocate a bizNumber"))
}

/// Parse the optional `{"bizNumber": ...}` body. An empty body means "generate".
fn requested_biz_number(body: &[u8]) -> Result<Option<String>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| ApiError::invalid_json(e.to_string()))?;
    let number = match value.get("bizNumber") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.is_empty() => return Ok(None),
        Some(Value::String(s)) => s.parse::<u32>().ok(),
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(_) => None,
    };

    match number {
        Some(n) if BIZ_NUMBER_RANGE.contains(&n) => Ok(Some(n.to_string())),
        _ => Err(ApiError::bad_request(format!(
            "bizNumber must be a number between {} and {}",
            BIZ_NUMBER_RANGE.start(),
            BIZ_NUMBER_RANGE.end()
        ))),
    }
}
