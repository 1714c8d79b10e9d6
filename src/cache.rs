//! Key-value caching for provider and model results.
//!
//! A [`Cache`] wraps an optional [`CacheStore`] backend. Every operation is
//! best-effort: when the store is missing, unhealthy, or a call fails, reads
//! are misses and writes report `false`. Nothing here returns an error to the
//! request path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use sha1::{Digest, Sha1};
use tracing::{debug, error, info, warn};

use crate::config::{CacheBackend, Config};
use crate::error::{AppError, Result};

/// Builds a cache key from a namespace and the parts identifying a value.
///
/// Parts are lowercased and trimmed before hashing, so `("Foo ", " bar")` and
/// `("foo", "bar")` share a key.
pub fn make_key(namespace: &str, parts: &[&str]) -> String {
    let normalized: Vec<String> = parts
        .iter()
        .map(|part| part.trim().to_lowercase())
        .collect();

    let mut hasher = Sha1::new();
    hasher.update(normalized.join(":").as_bytes());

    format!("{}:{}", namespace, hex::encode(hasher.finalize()))
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    fn name(&self) -> &'static str;
    async fn ping(&self) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

const MAX_MEMORY_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// In-process store for single-instance deployments and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let now = Utc::now();
        let ttl = chrono::Duration::seconds(ttl_seconds.min(MAX_MEMORY_TTL_SECS) as i64);
        let expires_at = now + ttl;

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // Expired entries are dropped on every write.
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }
}

pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Config(format!("Invalid REDIS_URL: {}", e)))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_error)
    }
}

fn redis_error(err: redis::RedisError) -> AppError {
    AppError::Unexpected(format!("Redis error: {}", err))
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<()> {
        let mut con = self.connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut con)
            .await
            .map(|_| ())
            .map_err(redis_error)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.connection().await?;
        con.get::<_, Option<String>>(key).await.map_err(redis_error)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut con = self.connection().await?;
        con.set_ex::<_, _, ()>(key, value, ttl_seconds.max(1))
            .await
            .map_err(redis_error)
    }
}

/// Result of the most recent availability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheHealth {
    pub available: bool,
    pub checked_at: DateTime<Utc>,
}

pub struct Cache {
    store: Option<Arc<dyn CacheStore>>,
    health: RwLock<CacheHealth>,
    recheck_after: Option<Duration>,
}

impl Cache {
    /// A cache that never hits and never stores.
    pub fn disabled() -> Self {
        Self {
            store: None,
            health: RwLock::new(CacheHealth {
                available: false,
                checked_at: Utc::now(),
            }),
            recheck_after: None,
        }
    }

    /// Wraps `store` and probes it once.
    ///
    /// Without `recheck_after` the probe result holds until
    /// [`Cache::refresh_health`] is called, so a store that comes back later
    /// stays unused until then.
    pub async fn with_store(store: Arc<dyn CacheStore>, recheck_after: Option<Duration>) -> Self {
        let cache = Self {
            store: Some(store),
            health: RwLock::new(CacheHealth {
                available: false,
                checked_at: Utc::now(),
            }),
            recheck_after,
        };
        cache.refresh_health().await;
        cache
    }

    pub async fn connect(config: &Config) -> Result<Self> {
        let store: Arc<dyn CacheStore> = match &config.cache_backend {
            CacheBackend::Disabled => {
                info!("No cache backend configured, caching disabled");
                return Ok(Self::disabled());
            }
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
            CacheBackend::Redis(url) => Arc::new(RedisStore::new(url)?),
        };

        Ok(Self::with_store(store, config.cache_health_interval).await)
    }

    pub fn health(&self) -> CacheHealth {
        *self.health.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn refresh_health(&self) -> CacheHealth {
        let available = match &self.store {
            Some(store) => match store.ping().await {
                Ok(()) => {
                    info!("{} cache connection successful, caching enabled", store.name());
                    true
                }
                Err(e) => {
                    error!("{} cache connection error: {}", store.name(), e);
                    false
                }
            },
            None => false,
        };

        let health = CacheHealth {
            available,
            checked_at: Utc::now(),
        };
        *self.health.write().unwrap_or_else(PoisonError::into_inner) = health;
        health
    }

    async fn usable_store(&self) -> Option<&Arc<dyn CacheStore>> {
        let store = self.store.as_ref()?;
        let mut health = self.health();

        if let Some(interval) = self.recheck_after {
            let stale = Utc::now()
                .signed_duration_since(health.checked_at)
                .to_std()
                .map(|age| age >= interval)
                .unwrap_or(false);
            if stale {
                health = self.refresh_health().await;
            }
        }

        health.available.then_some(store)
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let store = self.usable_store().await?;

        match store.get(key).await {
            Ok(Some(value)) => {
                info!("Cache hit for '{}'", key);
                Some(value)
            }
            Ok(None) => {
                info!("Cache miss for '{}'", key);
                None
            }
            Err(e) => {
                error!("Error getting from cache: {}", e);
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> bool {
        let Some(store) = self.usable_store().await else {
            return false;
        };

        match store.set(key, value, ttl_seconds).await {
            Ok(()) => {
                info!("Saved to cache: '{}'", key);
                true
            }
            Err(e) => {
                error!("Error saving to cache: {}", e);
                false
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding unreadable cache entry '{}': {}", key, e);
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) -> bool {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl_seconds).await,
            Err(e) => {
                debug!("Failed to serialize value for '{}': {}", key, e);
                false
            }
        }
    }
}
