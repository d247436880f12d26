use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::FieldErrors;
use super::{Address, Image, ImageInput};
use crate::error::ApiError;

const DEFAULT_IMAGE_URL: &str =
    "https://cdn.pixabay.com/photo/2015/10/05/22/37/blank-profile-picture-973460_1280.png";
const DEFAULT_IMAGE_ALT: &str = "User Image";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Name {
    pub first: String,
    #[serde(default)]
    pub middle: String,
    pub last: String,
}

/// Stored user document. `password` holds the argon2 hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: Name,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub image: Image,
    pub address: Address,
    pub is_business: bool,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Registration and full-update payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserInput {
    pub name: Name,
    pub phone: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image: Option<ImageInput>,
    pub address: Address,
    pub is_business: bool,
}

impl UserInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();

        errors.length("name.first", &self.name.first, 2, 255);
        if !self.name.middle.is_empty() {
            errors.length("name.middle", &self.name.middle, 2, 255);
        }
        errors.length("name.last", &self.name.last, 2, 255);
        errors.phone("phone", &self.phone);
        errors.email("email", &self.email);
        errors.length("password", &self.password, 6, 1024);
        if let Some(image) = &self.image {
            image.validate(&mut errors);
        }
        self.address.validate(&mut errors);

        errors.into_result("Invalid user")
    }
}

impl User {
    /// Build a new user from a validated payload. Registration never grants admin.
    pub fn from_input(input: UserInput, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            phone: input.phone,
            email: input.email.to_lowercase(),
            password: password_hash,
            image: input
                .image
                .unwrap_or_default()
                .into_image(DEFAULT_IMAGE_URL, DEFAULT_IMAGE_ALT),
            address: input.address,
            is_business: input.is_business,
            is_admin: false,
            created_at: Utc::now(),
        }
    }

    /// Replace every client-editable field. Identity, role and creation time are kept.
    pub fn apply(&mut self, input: UserInput, password_hash: String) {
        self.name = input.name;
        self.phone = input.phone;
        self.email = input.email.to_lowercase();
        self.password = password_hash;
        self.image = input
            .image
            .unwrap_or_default()
            .into_image(DEFAULT_IMAGE_URL, DEFAULT_IMAGE_ALT);
        self.address = input.address;
        self.is_business = input.is_business;
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

/// User as returned by the API; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: Name,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub image: Image,
    pub is_business: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            image: user.image.clone(),
            is_business: user.is_business,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.email("email", &self.email);
        errors.length("password", &self.password, 6, 1024);
        errors.into_result("Invalid login request")
    }
}
