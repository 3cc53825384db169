use redis::{AsyncCommands, Client};
use std::fmt::Display;

/// Keys for cached recommendation data
///
/// Popularity rankings are bucketed by UTC date so a stale entry ages out
/// naturally at midnight even before its TTL expires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Yesterday-popular food ids, bucketed by request date
    Popular(String),
    /// Category-popular food ids for one category, bucketed by request date
    CategoryPopular(i64, String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Popular(date) => write!(f, "rec:popular:{}", date),
            CacheKey::CategoryPopular(category_id, date) => {
                write!(f, "rec:popular:cat:{}:{}", category_id, date)
            }
        }
    }
}

/// Creates a Redis client for caching
///
/// The client connects lazily; nothing is established until first use.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Cache handler for ranked-result lists
///
/// Reads and writes both degrade gracefully: a failed read is treated as a
/// miss and a failed write is logged and dropped, so the recommendation
/// path keeps serving when Redis is unavailable.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
}

impl Cache {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    /// Retrieves a cached value, treating any Redis failure as a miss
    pub async fn get_cached<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let mut conn = match self.redis_client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Redis unavailable, treating as cache miss");
                return None;
            }
        };

        let cached: Option<String> = match conn.get(key.to_string()).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Redis get failed, treating as cache miss");
                return None;
            }
        };

        let json = cached?;
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Discarding undeserializable cache entry");
                None
            }
        }
    }

    /// Stores a value in the cache without blocking the caller
    ///
    /// The write happens on a spawned task; the response is never held up
    /// waiting for Redis.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Cache serialization error");
                return;
            }
        };

        let client = self.redis_client.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            let result: Result<(), redis::RedisError> = async {
                let mut conn = client.get_multiplexed_async_connection().await?;
                conn.set_ex(&key, json, ttl).await
            }
            .await;

            match result {
                Ok(()) => tracing::debug!(key = %key, ttl, "Cached recommendation list"),
                Err(e) => tracing::warn!(error = %e, key = %key, "Cache write failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_popular() {
        let key = CacheKey::Popular("2026-08-08".to_string());
        assert_eq!(format!("{}", key), "rec:popular:2026-08-08");
    }

    #[test]
    fn test_cache_key_display_category_popular() {
        let key = CacheKey::CategoryPopular(42, "2026-08-08".to_string());
        assert_eq!(format!("{}", key), "rec:popular:cat:42:2026-08-08");
    }

    #[tokio::test]
    async fn test_unreachable_redis_degrades_to_miss() {
        // Port 1 is never a Redis server; the read must degrade, not error.
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let cache = Cache::new(client);

        let key = CacheKey::Popular("2026-08-08".to_string());
        let cached: Option<Vec<i64>> = cache.get_cached(&key).await;
        assert_eq!(cached, None);
    }
}
