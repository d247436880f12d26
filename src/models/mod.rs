pub mod card;
pub mod user;
pub mod validation;

use serde::{Deserialize, Serialize};

pub use card::{Card, CardDetails, CardInput, Like};
pub use user::{LoginRequest, User, UserInput, UserProfile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Address {
    #[serde(default)]
    pub state: String,
    pub country: String,
    pub city: String,
    pub street: String,
    pub house_number: String,
    #[serde(default)]
    pub zip: String,
}

impl Address {
    fn validate(&self, errors: &mut validation::FieldErrors) {
        errors.length("address.country", &self.country, 3, 255);
        errors.length("address.city", &self.city, 6, 255);
        errors.length("address.street", &self.street, 3, 255);
        errors.length("address.houseNumber", &self.house_number, 1, 10);
        errors.length("address.zip", &self.zip, 0, 12);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub alt: String,
}

/// Image as submitted by clients; either part may be left to the resource default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageInput {
    pub url: Option<String>,
    pub alt: Option<String>,
}

impl ImageInput {
    fn validate(&self, errors: &mut validation::FieldErrors) {
        if let Some(url) = &self.url {
            errors.length("image.url", url, 11, 1024);
        }
        if let Some(alt) = &self.alt {
            errors.length("image.alt", alt, 6, 255);
        }
    }

    fn into_image(self, default_url: &str, default_alt: &str) -> Image {
        Image {
            url: self.url.unwrap_or_else(|| default_url.to_string()),
            alt: self.alt.unwrap_or_else(|| default_alt.to_string()),
        }
    }
}
