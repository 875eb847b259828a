//! API request handlers

use serde::{Deserialize, Deserializer};

pub mod auth;
pub mod customers;
pub mod health;
pub mod llm_configs;
pub mod reports;
pub mod standards;
pub mod surveys;
pub mod users;

/// Deserialize helper for partial updates: the outer None means the field
/// was absent, the inner None means an explicit null that clears the value
pub(crate) fn double_option<'de, T, D>(
    deserializer: D,
) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
