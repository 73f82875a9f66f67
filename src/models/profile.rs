use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User profile a recommendation request is made for.
///
/// Favourites stay in storage; the fallback picker queries them by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            updated_at: Utc::now(),
        }
    }
}
