use crate::{
    error::AppResult,
    models::{BaseSelection, RecommendationContext, UserProfile},
};

use super::picker::AnimePicker;

/// Resolves the anime a recommendation request is based on.
///
/// A `currentAnime` in the context wins outright and no I/O happens.
/// Otherwise the picker chooses one for the profile; its errors are returned
/// as-is.
pub async fn get_jikan_base(
    context: &RecommendationContext,
    profile: &UserProfile,
    picker: &dyn AnimePicker,
) -> AppResult<BaseSelection> {
    if let Some(anime) = context.anchor() {
        tracing::debug!(mal_id = anime.mal_id, "Using caller-supplied anchor");
        return Ok(BaseSelection::from(anime.clone()));
    }

    tracing::debug!(user_id = %profile.id, picker = picker.name(), "No anchor supplied, picking fallback");
    picker.pick(profile).await
}
