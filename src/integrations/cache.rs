//! Key/value cache client.
//!
//! Backed by Redis when the `redis` feature is enabled and the configured URL
//! answers `PING`; otherwise by an in-process map that honours TTLs.

use super::{Integration, IntegrationStatus, Lifecycle, StatusSnapshot, StatusTracker};
use crate::config::{BackendTarget, CacheConfig};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

const NAME: &str = "cache";

/// In-process substitute for Redis.
#[derive(Debug, Default)]
struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some((_, Some(expires_at))) if *expires_at <= Instant::now() => {
                entries.remove(key);
                None
            },
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        let now = Instant::now();
        // A TTL past the clock's range never expires.
        let expires_at = ttl.and_then(|ttl| now.checked_add(ttl));
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, (_, expires)| expires.is_none_or(|at| at > now));
        entries.insert(key.to_string(), (value, expires_at));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn delete(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[derive(Clone)]
enum CacheBackend {
    Memory(Arc<MemoryCache>),
    #[cfg(feature = "redis")]
    Redis(redis::aio::ConnectionManager),
}

/// Cache client with an in-memory fallback.
///
/// Calls before `startup()` or after `shutdown()` are silent no-ops: reads miss
/// and writes are dropped.
pub struct CacheClient {
    config: CacheConfig,
    backend: Mutex<Option<CacheBackend>>,
    status: StatusTracker,
}

impl CacheClient {
    /// Creates an unstarted cache client.
    #[must_use]
    pub const fn new(config: CacheConfig) -> Self {
        Self {
            config,
            backend: Mutex::new(None),
            status: StatusTracker::new(NAME, IntegrationStatus::Uninitialized),
        }
    }

    /// Reads a value.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.backend()? {
            CacheBackend::Memory(memory) => memory.get(key),
            #[cfg(feature = "redis")]
            CacheBackend::Redis(mut conn) => {
                let mut cmd = redis::cmd("GET");
                cmd.arg(key);
                let call = cmd.query_async::<Option<String>>(&mut conn);
                self.absorb("cache_get", key, self.redis_call("cache_get", call).await)
                    .flatten()
            },
        }
    }

    /// Writes a value with a TTL. `None` or a zero TTL uses the configured default;
    /// a zero default stores without expiry.
    pub async fn set(&self, key: &str, value: impl Into<String>, ttl: Option<Duration>) {
        let Some(backend) = self.backend() else {
            return;
        };
        let ttl = self.effective_ttl(ttl);
        match backend {
            CacheBackend::Memory(memory) => memory.set(key, value.into(), ttl),
            #[cfg(feature = "redis")]
            CacheBackend::Redis(mut conn) => {
                let mut cmd = redis::cmd("SET");
                cmd.arg(key).arg(value.into());
                if let Some(ttl) = ttl {
                    cmd.arg("EX").arg(ttl.as_secs().max(1));
                }
                let call = cmd.query_async::<()>(&mut conn);
                self.absorb("cache_set", key, self.redis_call("cache_set", call).await);
            },
        }
    }

    /// Removes a value.
    pub async fn delete(&self, key: &str) {
        match self.backend() {
            None => {},
            Some(CacheBackend::Memory(memory)) => memory.delete(key),
            #[cfg(feature = "redis")]
            Some(CacheBackend::Redis(mut conn)) => {
                let mut cmd = redis::cmd("DEL");
                cmd.arg(key);
                let call = cmd.query_async::<i64>(&mut conn);
                self.absorb("cache_delete", key, self.redis_call("cache_delete", call).await);
            },
        }
    }

    /// Reads and decodes a JSON value. Undecodable values read as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            },
        }
    }

    /// Encodes a value as JSON and writes it.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, raw, ttl).await,
            Err(e) => tracing::warn!(key, error = %e, "Skipping unencodable cache entry"),
        }
    }

    fn backend(&self) -> Option<CacheBackend> {
        self.backend
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_backend(&self, backend: Option<CacheBackend>) -> Option<CacheBackend> {
        std::mem::replace(
            &mut *self.backend.lock().unwrap_or_else(PoisonError::into_inner),
            backend,
        )
    }

    fn effective_ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        ttl.filter(|ttl| !ttl.is_zero())
            .or_else(|| Some(self.config.default_ttl()).filter(|ttl| !ttl.is_zero()))
    }

    fn use_memory(&self, reason: Option<String>) {
        self.replace_backend(Some(CacheBackend::Memory(Arc::default())));
        self.status.set(IntegrationStatus::InMemory, reason);
    }

    #[cfg(feature = "redis")]
    async fn redis_call<T>(
        &self,
        operation: &str,
        call: impl Future<Output = redis::RedisResult<T>>,
    ) -> crate::Result<T> {
        super::redis_conn::bounded(operation, self.config.ping_timeout(), call).await
    }

    #[cfg(feature = "redis")]
    fn absorb<T>(&self, operation: &str, key: &str, result: crate::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(operation, key, error = %e, "Cache call failed");
                self.status.mark_failed(e.to_string());
                None
            },
        }
    }

    #[cfg(feature = "redis")]
    async fn connect_remote(&self, url: &str) {
        match super::redis_conn::connect(url, self.config.ping_timeout()).await {
            Ok(conn) => {
                self.replace_backend(Some(CacheBackend::Redis(conn)));
                self.status.set(IntegrationStatus::Ready, None);
            },
            Err(e) => {
                metrics::counter!("integration_fallback_total", "integration" => NAME)
                    .increment(1);
                self.use_memory(Some(e.to_string()));
            },
        }
    }

    #[cfg(not(feature = "redis"))]
    #[allow(clippy::unused_async)]
    async fn connect_remote(&self, _url: &str) {
        metrics::counter!("integration_fallback_total", "integration" => NAME).increment(1);
        self.use_memory(Some(
            "redis support not compiled in (enable the `redis` feature)".to_string(),
        ));
    }
}

impl Integration for CacheClient {
    fn name(&self) -> &'static str {
        NAME
    }

    fn health(&self) -> StatusSnapshot {
        self.status.snapshot()
    }
}

impl Lifecycle for CacheClient {
    async fn startup(&self) {
        self.status.set(IntegrationStatus::Starting, None);
        match BackendTarget::parse(&self.config.url) {
            BackendTarget::InMemory => self.use_memory(None),
            BackendTarget::Disabled => {
                self.use_memory(Some("no cache URL configured".to_string()));
            },
            BackendTarget::Remote(url) => self.connect_remote(&url).await,
        }
    }

    async fn shutdown(&self) {
        if let Some(CacheBackend::Memory(memory)) = self.replace_backend(None) {
            memory.clear();
        }
        self.status
            .stop_if(&[IntegrationStatus::Ready, IntegrationStatus::InMemory]);
    }
}
