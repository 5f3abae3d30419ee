//! SatBank Lock Service
//!
//! Distributed per-resource locking with:
//! - Deterministic lease paths per wallet, payment hash, or on-chain output
//! - Bounded, jittered acquisition retries
//! - Automatic lease extension tied to the protected closure's lifetime
//! - An expiry signal callers check before non-idempotent side effects
//! - Pluggable backends: in-process for single-node use, Redis for fleets

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod backend;
pub mod config;
pub mod error;
pub mod lock;
pub mod metrics;

pub use backend::{LockBackend, MemoryLockBackend, RedisLockBackend};
pub use config::LockServiceConfig;
pub use error::{Error, Result};
pub use lock::{LockResource, LockService, LockSignal};
