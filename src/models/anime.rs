use serde::{Deserialize, Serialize};

/// An anime referenced by its MyAnimeList id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnimeRef {
    pub mal_id: i64,
    pub title: String,
}

/// Caller-supplied anchor for a recommendation request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecommendationContext {
    #[serde(default)]
    pub data: ContextData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContextData {
    #[serde(rename = "currentAnime", default, skip_serializing_if = "Option::is_none")]
    pub current_anime: Option<AnimeRef>,
}

impl RecommendationContext {
    pub fn with_anchor(mal_id: i64, title: impl Into<String>) -> Self {
        Self {
            data: ContextData {
                current_anime: Some(AnimeRef {
                    mal_id,
                    title: title.into(),
                }),
            },
        }
    }

    pub fn anchor(&self) -> Option<&AnimeRef> {
        self.data.current_anime.as_ref()
    }
}

/// The anime recommendations are based on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BaseSelection {
    pub selected_favorite_title: String,
    pub selected_favorite_id: i64,
}

impl From<AnimeRef> for BaseSelection {
    fn from(anime: AnimeRef) -> Self {
        Self {
            selected_favorite_title: anime.title,
            selected_favorite_id: anime.mal_id,
        }
    }
}

/// Anything carrying a MyAnimeList id
pub trait HasMalId {
    fn mal_id(&self) -> i64;
}

/// A recommended anime returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimeRecommendation {
    pub mal_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    /// Number of MyAnimeList users who suggested this pairing
    pub votes: u32,
}

impl HasMalId for AnimeRecommendation {
    fn mal_id(&self) -> i64 {
        self.mal_id
    }
}

impl HasMalId for AnimeRef {
    fn mal_id(&self) -> i64 {
        self.mal_id
    }
}

// ============================================================================
// Jikan API Types
// ============================================================================

/// Response from GET /anime/{id}/recommendations
#[derive(Debug, Clone, Deserialize)]
pub struct JikanRecommendationsResponse {
    #[serde(default)]
    pub data: Vec<JikanRecommendation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanRecommendation {
    pub entry: JikanEntry,
    #[serde(default)]
    pub votes: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanEntry {
    pub mal_id: i64,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Option<JikanImages>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanImages {
    #[serde(default)]
    pub jpg: Option<JikanImage>,
    #[serde(default)]
    pub webp: Option<JikanImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanImage {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub large_image_url: Option<String>,
}

impl From<JikanRecommendation> for AnimeRecommendation {
    fn from(rec: JikanRecommendation) -> Self {
        // Prefer the large jpg, then any jpg, then webp
        let image_url = rec.entry.images.and_then(|images| {
            images
                .jpg
                .and_then(|jpg| jpg.large_image_url.or(jpg.image_url))
                .or_else(|| images.webp.and_then(|webp| webp.image_url))
        });

        AnimeRecommendation {
            mal_id: rec.entry.mal_id,
            title: rec.entry.title,
            url: rec.entry.url,
            image_url,
            votes: rec.votes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_deserializes_current_anime() {
        let context: RecommendationContext = serde_json::from_value(json!({
            "data": { "currentAnime": { "mal_id": 42, "title": "X" } }
        }))
        .unwrap();

        assert_eq!(
            context.anchor(),
            Some(&AnimeRef {
                mal_id: 42,
                title: "X".to_string()
            })
        );
    }

    #[test]
    fn test_context_without_anchor() {
        let empty: RecommendationContext = serde_json::from_value(json!({ "data": {} })).unwrap();
        let missing: RecommendationContext = serde_json::from_value(json!({})).unwrap();

        assert!(empty.anchor().is_none());
        assert!(missing.anchor().is_none());
    }

    #[test]
    fn test_base_selection_serializes_camel_case() {
        let base = BaseSelection::from(AnimeRef {
            mal_id: 5114,
            title: "Fullmetal Alchemist: Brotherhood".to_string(),
        });

        assert_eq!(
            serde_json::to_value(&base).unwrap(),
            json!({
                "selectedFavoriteTitle": "Fullmetal Alchemist: Brotherhood",
                "selectedFavoriteId": 5114
            })
        );
    }

    #[test]
    fn test_jikan_recommendation_conversion() {
        let raw: JikanRecommendationsResponse = serde_json::from_value(json!({
            "data": [{
                "entry": {
                    "mal_id": 11061,
                    "title": "Hunter x Hunter (2011)",
                    "url": "https://myanimelist.net/anime/11061",
                    "images": {
                        "jpg": { "image_url": "small.jpg", "large_image_url": "large.jpg" }
                    }
                },
                "votes": 120
            }]
        }))
        .unwrap();

        let rec = AnimeRecommendation::from(raw.data.into_iter().next().unwrap());
        assert_eq!(rec.mal_id, 11061);
        assert_eq!(rec.image_url.as_deref(), Some("large.jpg"));
        assert_eq!(rec.votes, 120);
    }

    #[test]
    fn test_jikan_recommendation_without_images() {
        let raw: JikanRecommendation = serde_json::from_value(json!({
            "entry": { "mal_id": 1, "title": "Cowboy Bebop" }
        }))
        .unwrap();

        let rec = AnimeRecommendation::from(raw);
        assert_eq!(rec.image_url, None);
        assert_eq!(rec.url, None);
        assert_eq!(rec.votes, 0);
    }
}
