use std::collections::BTreeMap;

use crate::error::ApiError;

/// Collects per-field problems so a payload reports all of them at once.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    /// Character-count bounds, inclusive.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            self.add(field, format!("must be between {min} and {max} characters long"));
        }
    }

    pub fn phone(&mut self, field: &str, value: &str) {
        self.length(field, value, 9, 10);
        if !is_phone(value) {
            self.add(field, "must be a local phone number such as 0501234567");
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        self.length(field, value, 6, 255);
        if !is_email(value) {
            self.add(field, "must be a valid email");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self, message: &str) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error(message, Some(self.0)))
        }
    }
}

/// `0`, then a digit 2-9, then 7 or 8 more digits.
fn is_phone(value: &str) -> bool {
    let bytes = value.as_bytes();
    (9..=10).contains(&bytes.len())
        && bytes[0] == b'0'
        && (b'2'..=b'9').contains(&bytes[1])
        && bytes[2..].iter().all(u8::is_ascii_digit)
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || value.chars().any(char::is_whitespace) {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}
