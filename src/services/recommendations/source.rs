//! Downstream recommendation sources.
//!
//! The Jikan source asks MyAnimeList (through the public Jikan v4 API) for the
//! community recommendations attached to an anime. Responses are cached for a
//! day since they change slowly and Jikan is rate limited on its side.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use crate::{
    cache::{Cache, CacheKey, Ttl},
    cached,
    error::{AppError, AppResult},
    models::{AnimeRecommendation, JikanRecommendationsResponse},
};

/// Source of recommendations for an anchor anime
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn recommendations_for(&self, mal_id: i64) -> AppResult<Vec<AnimeRecommendation>>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct JikanSource {
    http_client: HttpClient,
    api_url: String,
    cache: Cache,
}

impl JikanSource {
    /// Creates a source whose requests are bounded by `timeout`
    pub fn new(cache: Cache, api_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("anirec-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            cache,
        })
    }

    async fn fetch_uncached(&self, mal_id: i64) -> AppResult<Vec<AnimeRecommendation>> {
        let url = format!("{}/anime/{}/recommendations", self.api_url, mal_id);

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            AppError::UpstreamFailure(format!("Jikan request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                mal_id,
                status = %status,
                body = %body,
                "Jikan request failed"
            );
            return Err(AppError::UpstreamFailure(format!(
                "Jikan returned status {}: {}",
                status, body
            )));
        }

        let parsed: JikanRecommendationsResponse = response.json().await.map_err(|e| {
            AppError::UpstreamFailure(format!("Invalid Jikan response: {}", e))
        })?;

        let recommendations: Vec<AnimeRecommendation> = parsed
            .data
            .into_iter()
            .map(AnimeRecommendation::from)
            .collect();

        tracing::info!(
            mal_id,
            results = recommendations.len(),
            provider = "jikan",
            "Recommendations fetched"
        );

        Ok(recommendations)
    }
}

#[async_trait]
impl RecommendationSource for JikanSource {
    async fn recommendations_for(&self, mal_id: i64) -> AppResult<Vec<AnimeRecommendation>> {
        if mal_id <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "Invalid MyAnimeList id: {}",
                mal_id
            )));
        }

        cached!(
            self.cache,
            CacheKey::Recommendations(mal_id),
            Ttl::Day,
            async move { self.fetch_uncached(mal_id).await }
        )
    }

    fn name(&self) -> &'static str {
        "jikan"
    }
}
