use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{cache::CacheKey, error::AppResult, state::AppState};

/// Drops the cached profile so the next request reloads it
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.cache.invalidate(&CacheKey::Profile(user_id)).await?;
    tracing::info!(%user_id, "Profile cache invalidated");
    Ok(StatusCode::NO_CONTENT)
}
