/// Returns a cached value or computes, stores and returns a fresh one.
///
/// The cache is read with `get_from_cache`. On a miss, `$block` is awaited,
/// its value is queued with `set_in_background` for `$ttl` (a [`Ttl`]) and
/// returned. Errors from the lookup or the block propagate with `?`, so the
/// macro is meant to be the tail expression of a function returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// async fn recommendations(&self, mal_id: i64) -> AppResult<Vec<AnimeRecommendation>> {
///     cached!(
///         self.cache,
///         CacheKey::Recommendations(mal_id),
///         Ttl::Day,
///         async move { self.fetch_uncached(mal_id).await }
///     )
/// }
/// ```
///
/// [`Ttl`]: crate::cache::Ttl
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            tracing::debug!(key = %key, "Cache hit");
            Ok(cached)
        } else {
            tracing::debug!(key = %key, "Cache miss");
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
