//! Lock storage backends
//!
//! A backend owns lease state only: acquire-if-free, extend-if-held,
//! release-if-held, all keyed by a caller-supplied token so a process can
//! never release or extend a lease another process holds.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{Error, Result};

/// Lease storage for the lock service
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Acquire the lease if it is free; `false` when another holder exists
    async fn try_acquire(&self, path: &str, token: Uuid, ttl: Duration) -> Result<bool>;

    /// Extend a held lease; `false` when the lease is no longer ours
    async fn extend(&self, path: &str, token: Uuid, ttl: Duration) -> Result<bool>;

    /// Release a held lease; releasing someone else's lease is a no-op
    async fn release(&self, path: &str, token: Uuid) -> Result<()>;
}

/// Single-process backend with exact semantics, for tests and single-node
/// deployments
#[derive(Default)]
pub struct MemoryLockBackend {
    leases: DashMap<String, (Uuid, Instant)>,
}

impl MemoryLockBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    async fn try_acquire(&self, path: &str, token: Uuid, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entry = self
            .leases
            .entry(path.to_string())
            .or_insert((token, now + ttl));
        if entry.0 == token {
            return Ok(true);
        }
        if entry.1 <= now {
            // previous holder's lease lapsed
            *entry = (token, now + ttl);
            return Ok(true);
        }
        Ok(false)
    }

    async fn extend(&self, path: &str, token: Uuid, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        match self.leases.get_mut(path) {
            Some(mut entry) if entry.0 == token && entry.1 > now => {
                entry.1 = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, path: &str, token: Uuid) -> Result<()> {
        self.leases.remove_if(path, |_, (holder, _)| *holder == token);
        Ok(())
    }
}

// Compare-and-expire / compare-and-delete, atomic on the redis side.
const EXTEND_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Redis-backed lease storage for multi-node deployments
pub struct RedisLockBackend {
    redis: ConnectionManager,
    extend_script: Script,
    release_script: Script,
}

impl RedisLockBackend {
    /// Create over an established connection manager
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            extend_script: Script::new(EXTEND_SCRIPT),
            release_script: Script::new(RELEASE_SCRIPT),
        }
    }
}

#[async_trait]
impl LockBackend for RedisLockBackend {
    async fn try_acquire(&self, path: &str, token: Uuid, ttl: Duration) -> Result<bool> {
        let mut conn = self.redis.clone();
        let acquired: Option<String> = redis::cmd("SET")
            .arg(path)
            .arg(token.to_string())
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Backend(e.to_string()))?;
        Ok(acquired.is_some())
    }

    async fn extend(&self, path: &str, token: Uuid, ttl: Duration) -> Result<bool> {
        let mut conn = self.redis.clone();
        let extended: i64 = self
            .extend_script
            .key(path)
            .arg(token.to_string())
            .arg(ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| Error::Backend(e.to_string()))?;
        Ok(extended == 1)
    }

    async fn release(&self, path: &str, token: Uuid) -> Result<()> {
        let mut conn = self.redis.clone();
        let _: i64 = self
            .release_script
            .key(path)
            .arg(token.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| Error::Backend(e.to_string()))?;
        Ok(())
    }
}
