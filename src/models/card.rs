use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::FieldErrors;
use super::{Address, Image, ImageInput};
use crate::error::ApiError;

const DEFAULT_IMAGE_URL: &str =
    "https://cdn.pixabay.com/photo/2018/03/10/12/00/teamwork-3213924_1280.jpg";
const DEFAULT_IMAGE_ALT: &str = "Business Image";

pub const BIZ_NUMBER_RANGE: std::ops::RangeInclusive<u32> = 1_000..=999_999_999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(rename = "user_id")]
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub phone: String,
    pub email: String,
    pub web: String,
    pub image: Image,
    pub address: Address,
    pub biz_number: String,
    #[serde(default)]
    pub likes: Vec<Like>,
    #[serde(rename = "user_id")]
    pub user_id: Uuid,
}

/// Create and update payload; ownership, likes and bizNumber are server-managed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardInput {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub phone: String,
    pub email: String,
    pub web: String,
    #[serde(default)]
    pub image: Option<ImageInput>,
    pub address: Address,
}

impl CardInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();

        errors.length("title", &self.title, 2, 255);
        errors.length("subtitle", &self.subtitle, 2, 255);
        errors.length("description", &self.description, 2, 1024);
        errors.phone("phone", &self.phone);
        errors.email("email", &self.email);
        errors.length("web", &self.web, 11, 1024);
        if let Some(image) = &self.image {
            image.validate(&mut errors);
        }
        self.address.validate(&mut errors);

        errors.into_result("Invalid card")
    }
}

impl CardInput {
    pub fn into_details(self) -> CardDetails {
        CardDetails {
            title: self.title,
            subtitle: self.subtitle,
            description: self.description,
            phone: self.phone,
            email: self.email,
            web: self.web,
            image: self
                .image
                .unwrap_or_default()
                .into_image(DEFAULT_IMAGE_URL, DEFAULT_IMAGE_ALT),
            address: self.address,
        }
    }
}

/// The owner-editable part of a card. Stores write it as one partial update so
/// likes, owner and bizNumber are never overwritten by an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub phone: String,
    pub email: String,
    pub web: String,
    pub image: Image,
    pub address: Address,
}

impl Like {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            created_at: Utc::now(),
        }
    }
}

impl Card {
    pub fn from_input(input: CardInput, owner: Uuid, biz_number: String) -> Self {
        let details = input.into_details();
        Self {
            id: Uuid::new_v4(),
            title: details.title,
            subtitle: details.subtitle,
            description: details.description,
            phone: details.phone,
            email: details.email,
            web: details.web,
            image: details.image,
            address: details.address,
            biz_number,
            likes: Vec::new(),
            user_id: owner,
        }
    }

    pub fn apply(&mut self, details: CardDetails) {
        self.title = details.title;
        self.subtitle = details.subtitle;
        self.description = details.description;
        self.phone = details.phone;
        self.email = details.email;
        self.web = details.web;
        self.image = details.image;
        self.address = details.address;
    }

    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.likes.iter().any(|like| like.user_id == user_id)
    }

    /// Returns false if the user had already liked the card.
    pub fn add_like(&mut self, user_id: Uuid) -> bool {
        if self.is_liked_by(user_id) {
            return false;
        }
        self.likes.push(Like::new(user_id));
        true
    }
}

/// A random bizNumber candidate; callers retry until the store has no card with it.
pub fn random_biz_number() -> String {
    rand::thread_rng().gen_range(BIZ_NUMBER_RANGE).to_string()
}
