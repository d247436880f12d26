pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Card, CardDetails, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field (user email, card bizNumber) is already taken.
    #[error("Duplicate value for unique field: {0}")]
    Duplicate(&'static str),

    #[error("Stored document could not be decoded: {0}")]
    Serialization(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked(Card),
    AlreadyLiked,
    NotFound,
}

/// Persistence for registered users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Emails are stored lowercased; callers pass the lowercased form.
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Overwrite an existing user. Returns false if no user has that id.
    async fn replace_user(&self, user: &User) -> Result<bool, StoreError>;

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Persistence for business cards.
#[async_trait]
pub trait CardStore: Send + Sync {
    async fn insert_card(&self, card: &Card) -> Result<(), StoreError>;

    async fn card_by_id(&self, id: Uuid) -> Result<Option<Card>, StoreError>;

    /// The card with `id` if and only if `owner` owns it.
    async fn owned_card(&self, id: Uuid, owner: Uuid) -> Result<Option<Card>, StoreError>;

    async fn list_cards(&self) -> Result<Vec<Card>, StoreError>;

    async fn cards_by_owner(&self, owner: Uuid) -> Result<Vec<Card>, StoreError>;

    async fn card_by_biz_number(&self, biz_number: &str) -> Result<Option<Card>, StoreError>;

    /// Overwrite the owner-editable fields in one write; `None` if no card has that id.
    async fn update_card_details(&self, id: Uuid, details: &CardDetails) -> Result<Option<Card>, StoreError>;

    async fn set_biz_number(&self, id: Uuid, biz_number: &str) -> Result<Option<Card>, StoreError>;

    /// Append a like from `user_id` unless one exists. Check and append are a
    /// single atomic step, so concurrent likes are never lost.
    async fn add_like(&self, id: Uuid, user_id: Uuid) -> Result<LikeOutcome, StoreError>;

    async fn delete_card(&self, id: Uuid) -> Result<Option<Card>, StoreError>;
}
