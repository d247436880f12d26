use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::database::{CardStore, LikeOutcome, StoreError};
use crate::models::{card::Card, user::Name, Address, CardDetails, Image, User};

/// Password hash placeholder for fixture users that never log in.
pub const UNUSABLE_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$unusable$unusable";

pub fn address() -> Address {
    Address {
        state: String::new(),
        country: "Israel".to_string(),
        city: "Tel Aviv".to_string(),
        street: "Dizengoff".to_string(),
        house_number: "12".to_string(),
        zip: "6100000".to_string(),
    }
}

/// A stored user with the given role flags.
pub fn user(email: &str, is_admin: bool, is_business: bool) -> User {
    User {
        id: Uuid::new_v4(),
        name: Name {
            first: "Test".to_string(),
            middle: String::new(),
            last: "User".to_string(),
        },
        phone: "0501234567".to_string(),
        email: email.to_lowercase(),
        password: UNUSABLE_HASH.to_string(),
        image: Image {
            url: "https://example.com/avatar.png".to_string(),
            alt: "Test avatar".to_string(),
        },
        address: address(),
        is_business,
        is_admin,
        created_at: Utc::now(),
    }
}

/// A stored card owned by `owner`.
pub fn card(owner: Uuid, biz_number: &str) -> Card {
    Card {
        id: Uuid::new_v4(),
        title: "Test Card".to_string(),
        subtitle: "Fixture".to_string(),
        description: "A card used in tests".to_string(),
        phone: "0501234567".to_string(),
        email: "card@example.com".to_string(),
        web: "https://example.com".to_string(),
        image: Image {
            url: "https://example.com/card.png".to_string(),
            alt: "Card image".to_string(),
        },
        address: address(),
        biz_number: biz_number.to_string(),
        likes: Vec::new(),
        user_id: owner,
    }
}

/// Editable card fields with the given title.
pub fn card_details(title: &str) -> CardDetails {
    CardDetails {
        title: title.to_string(),
        subtitle: "Fixture".to_string(),
        description: "A card used in tests".to_string(),
        phone: "0501234567".to_string(),
        email: "card@example.com".to_string(),
        web: "https://example.com".to_string(),
        image: Image {
            url: "https://example.com/card.png".to_string(),
            alt: "Card image".to_string(),
        },
        address: address(),
    }
}

/// Card store whose every call fails as if the database were down.
pub struct FailingCardStore;

fn down() -> StoreError {
    StoreError::Unavailable("store offline".to_string())
}

#[async_trait]
impl CardStore for FailingCardStore {
    async fn insert_card(&self, _card: &Card) -> Result<(), StoreError> {
        Err(down())
    }

    async fn card_by_id(&self, _id: Uuid) -> Result<Option<Card>, StoreError> {
        Err(down())
    }

    async fn owned_card(&self, _id: Uuid, _owner: Uuid) -> Result<Option<Card>, StoreError> {
        Err(down())
    }

    async fn list_cards(&self) -> Result<Vec<Card>, StoreError> {
        Err(down())
    }

    async fn cards_by_owner(&self, _owner: Uuid) -> Result<Vec<Card>, StoreError> {
        Err(down())
    }

    async fn card_by_biz_number(&self, _biz_number: &str) -> Result<Option<Card>, StoreError> {
        Err(down())
    }

    async fn update_card_details(&self, _id: Uuid, _details: &CardDetails) -> Result<Option<Card>, StoreError> {
        Err(down())
    }

    async fn set_biz_number(&self, _id: Uuid, _biz_number: &str) -> Result<Option<Card>, StoreError> {
        Err(down())
    }

    async fn add_like(&self, _id: Uuid, _user_id: Uuid) -> Result<LikeOutcome, StoreError> {
        Err(down())
    }

    async fn delete_card(&self, _id: Uuid) -> Result<Option<Card>, StoreError> {
        Err(down())
    }
}
