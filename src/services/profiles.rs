use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    cache::{Cache, CacheKey, Ttl},
    cached,
    error::{AppError, AppResult},
    models::UserProfile,
};

/// Source of user profiles by id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, user_id: Uuid) -> AppResult<UserProfile>;
}

/// Profiles stored in PostgreSQL, cached for an hour
#[derive(Clone)]
pub struct PgProfileSource {
    pool: PgPool,
    cache: Cache,
}

impl PgProfileSource {
    pub fn new(pool: PgPool, cache: Cache) -> Self {
        Self { pool, cache }
    }

    async fn load(&self, user_id: Uuid) -> AppResult<UserProfile> {
        let profile: UserProfile = sqlx::query_as(
            r#"
            SELECT id, username, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

        tracing::debug!(user_id = %user_id, "Loaded profile");
        Ok(profile)
    }
}

#[async_trait]
impl ProfileSource for PgProfileSource {
    async fn fetch_profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        cached!(
            self.cache,
            CacheKey::Profile(user_id),
            Ttl::Hour,
            async move { self.load(user_id).await }
        )
    }
}
