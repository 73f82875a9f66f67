//! Recommendation pipeline: resolve an anchor, fetch candidates, clean them.

pub mod context;
pub mod picker;
pub mod sanitize;
pub mod source;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{AnimeRecommendation, BaseSelection, RecommendationContext},
    services::profiles::ProfileSource,
};

pub use context::get_jikan_base;
pub use picker::{AnimePicker, PgWeightedPicker, PickerRetryConfig, RetryingPicker};
pub use sanitize::{dedupe_by_id, exclude_current, exclude_ids, sanitize_ids};
pub use source::{JikanSource, RecommendationSource};

/// Upper bound on recommendations returned per request
pub const MAX_LIMIT: usize = 25;

fn default_limit() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub context: RecommendationContext,
    /// Ids the client has already seen; malformed entries are ignored
    #[serde(default)]
    pub seen_ids: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResponse {
    #[serde(flatten)]
    pub base: BaseSelection,
    pub recommendations: Vec<AnimeRecommendation>,
}

#[derive(Clone)]
pub struct RecommendationService {
    profiles: Arc<dyn ProfileSource>,
    picker: Arc<dyn AnimePicker>,
    source: Arc<dyn RecommendationSource>,
}

impl RecommendationService {
    pub fn new(
        profiles: Arc<dyn ProfileSource>,
        picker: Arc<dyn AnimePicker>,
        source: Arc<dyn RecommendationSource>,
    ) -> Self {
        Self {
            profiles,
            picker,
            source,
        }
    }

    /// Builds the response for one request.
    ///
    /// The anchor itself, anything in `seen_ids` and repeated ids are removed
    /// from the candidates before the list is truncated to `limit`.
    pub async fn recommend(&self, request: RecommendationRequest) -> AppResult<RecommendationResponse> {
        let profile = self.profiles.fetch_profile(request.user_id).await?;
        let base = get_jikan_base(&request.context, &profile, self.picker.as_ref()).await?;

        let candidates = self
            .source
            .recommendations_for(base.selected_favorite_id)
            .await?;
        let fetched = candidates.len();

        let current_id = base.selected_favorite_id.to_string();
        let seen = sanitize_ids(&request.seen_ids);
        let mut recommendations =
            dedupe_by_id(exclude_ids(exclude_current(candidates, Some(current_id.as_str())), &seen));
        recommendations.truncate(request.limit.clamp(1, MAX_LIMIT));

        tracing::info!(
            user_id = %request.user_id,
            anchor = base.selected_favorite_id,
            source = self.source.name(),
            fetched,
            returned = recommendations.len(),
            "Recommendations built"
        );

        Ok(RecommendationResponse {
            base,
            recommendations,
        })
    }
}
