use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    services::recommendations::{RecommendationRequest, RecommendationResponse},
    state::AppState,
};

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let response = state.recommendations.recommend(request).await?;
    Ok(Json(response))
}
