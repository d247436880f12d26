use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CardStore, LikeOutcome, StoreError, UserStore};
use crate::models::{Card, CardDetails, User};

/// Process-local store used in development mode and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    cards: RwLock<HashMap<Uuid, Card>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn replace_user(&self, user: &User) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email && u.id != user.id) {
            return Err(StoreError::Duplicate("email"));
        }
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.write().await.remove(&id))
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn insert_card(&self, card: &Card) -> Result<(), StoreError> {
        let mut cards = self.cards.write().await;
        if cards.values().any(|c| c.biz_number == card.biz_number) {
            return Err(StoreError::Duplicate("bizNumber"));
        }
        cards.insert(card.id, card.clone());
        Ok(())
    }

    async fn card_by_id(&self, id: Uuid) -> Result<Option<Card>, StoreError> {
        Ok(self.cards.read().await.get(&id).cloned())
    }

    async fn owned_card(&self, id: Uuid, owner: Uuid) -> Result<Option<Card>, StoreError> {
        let cards = self.cards.read().await;
        Ok(cards.get(&id).filter(|c| c.user_id == owner).cloned())
    }

    async fn list_cards(&self) -> Result<Vec<Card>, StoreError> {
        Ok(self.cards.read().await.values().cloned().collect())
    }

    async fn cards_by_owner(&self, owner: Uuid) -> Result<Vec<Card>, StoreError> {
        let cards = self.cards.read().await;
        Ok(cards.values().filter(|c| c.user_id == owner).cloned().collect())
    }

    async fn card_by_biz_number(&self, biz_number: &str) -> Result<Option<Card>, StoreError> {
        let cards = self.cards.read().await;
        Ok(cards.values().find(|c| c.biz_number == biz_number).cloned())
    }

    async fn update_card_details(&self, id: Uuid, details: &CardDetails) -> Result<Option<Card>, StoreError> {
        let mut cards = self.cards.write().await;
        Ok(cards.get_mut(&id).map(|card| {
            card.apply(details.clone());
            card.clone()
        }))
    }

    async fn set_biz_number(&self, id: Uuid, biz_number: &str) -> Result<Option<Card>, StoreError> {
        let mut cards = self.cards.write().await;
        if cards.values().any(|c| c.biz_number == biz_number && c.id != id) {
            return Err(StoreError::Duplicate("bizNumber"));
        }
        Ok(cards.get_mut(&id).map(|card| {
            card.biz_number = biz_number.to_string();
            card.clone()
        }))
    }

    async fn add_like(&self, id: Uuid, user_id: Uuid) -> Result<LikeOutcome, StoreError> {
        let mut cards = self.cards.write().await;
        let Some(card) = cards.get_mut(&id) else {
            return Ok(LikeOutcome::NotFound);
        };

        if card.add_like(user_id) {
            Ok(LikeOutcome::Liked(card.clone()))
        } else {
            Ok(LikeOutcome::AlreadyLiked)
        }
    }

    async fn delete_card(&self, id: Uuid) -> Result<Option<Card>, StoreError> {
        Ok(self.cards.write().await.remove(&id))
    }
}
