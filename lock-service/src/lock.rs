//! Distributed per-resource locking
//!
//! `lock` acquires an exclusive, time-bounded lease on a path derived from
//! the resource kind and id, runs the protected closure, and releases on
//! every exit path. A background task extends the lease while the closure
//! runs; if an extension is lost the closure's [`LockSignal`] trips, and the
//! caller must re-validate its assumptions before any further side effect
//! that is not safe to duplicate.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use ledger_core::{OnChainTxHash, OnChainTxVout, PaymentHash, WalletId};

use crate::backend::LockBackend;
use crate::config::LockServiceConfig;
use crate::metrics::{LOCK_ACQUIRE_TOTAL, LOCK_EXTENSION_FAILED_TOTAL, LOCK_HELD_DURATION};
use crate::{Error, Result};

/// Resource a lock serializes access to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockResource {
    /// One wallet
    Wallet(WalletId),
    /// One Lightning payment hash
    PaymentHash(PaymentHash),
    /// One on-chain transaction output
    OnChainUtxo {
        /// Transaction hash
        tx_hash: OnChainTxHash,
        /// Output index
        vout: OnChainTxVout,
    },
}

impl LockResource {
    /// Deterministic lease path for this resource
    pub fn path(&self) -> String {
        match self {
            LockResource::Wallet(id) => format!("locks:wallet:{}", id),
            LockResource::PaymentHash(hash) => format!("locks:paymenthash:{}", hash),
            LockResource::OnChainUtxo { tx_hash, vout } => {
                format!("locks:onchaintxhash:{}:{}", tx_hash, vout)
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            LockResource::Wallet(_) => "wallet",
            LockResource::PaymentHash(_) => "paymenthash",
            LockResource::OnChainUtxo { .. } => "onchaintxhash",
        }
    }
}

struct SignalInner {
    expired: AtomicBool,
    reason: parking_lot::Mutex<Option<String>>,
}

/// Expiry notifier handed to the protected closure.
///
/// Checked before side effects that must not run twice; once expired it
/// never un-expires.
#[derive(Clone)]
pub struct LockSignal {
    inner: Arc<SignalInner>,
}

impl LockSignal {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                expired: AtomicBool::new(false),
                reason: parking_lot::Mutex::new(None),
            }),
        }
    }

    /// True once the lease backing this signal has been lost
    pub fn is_expired(&self) -> bool {
        self.inner.expired.load(Ordering::Acquire)
    }

    /// Why the lease was lost, when known
    pub fn error(&self) -> Option<String> {
        self.inner.reason.lock().clone()
    }

    fn expire(&self, reason: Option<String>) {
        *self.inner.reason.lock() = reason;
        self.inner.expired.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for LockSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockSignal")
            .field("expired", &self.is_expired())
            .finish()
    }
}

/// Distributed per-resource lock service
#[derive(Clone)]
pub struct LockService {
    backend: Arc<dyn LockBackend>,
    config: LockServiceConfig,
}

impl LockService {
    /// Create over a backend
    pub fn new(backend: Arc<dyn LockBackend>, config: LockServiceConfig) -> Self {
        Self { backend, config }
    }

    /// Run `f` while exclusively holding `resource`.
    ///
    /// Acquisition retries a bounded number of times with jittered backoff
    /// and then fails with [`Error::ResourceAttemptsExceeded`]; that error is
    /// transient and the whole operation may be retried later.
    pub async fn lock<F, Fut, T>(&self, resource: LockResource, f: F) -> Result<T>
    where
        F: FnOnce(LockSignal) -> Fut,
        Fut: Future<Output = T>,
    {
        self.lock_with_signal(resource, None, f).await
    }

    /// Like [`LockService::lock`], continuing under an already-held signal.
    ///
    /// When `signal` is `Some`, the resource is assumed to be held by an
    /// enclosing `lock` call: no second lease is taken and `f` runs under
    /// the existing signal. If that signal is already expired the call fails
    /// immediately, without running `f`.
    pub async fn lock_with_signal<F, Fut, T>(
        &self,
        resource: LockResource,
        signal: Option<LockSignal>,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(LockSignal) -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(signal) = signal {
            if signal.is_expired() {
                return Err(Error::ResourceExpired {
                    reason: signal.error(),
                });
            }
            return Ok(f(signal).await);
        }

        let path = resource.path();
        let kind = resource.kind();
        let token = Uuid::new_v4();

        self.acquire(&path, kind, token).await?;
        debug!(path = %path, "lock acquired");

        let signal = LockSignal::new();
        let extender = tokio::spawn(extend_loop(
            Arc::clone(&self.backend),
            path.clone(),
            kind,
            token,
            self.config.ttl(),
            self.config.extension_threshold(),
            signal.clone(),
        ));

        let held_from = Instant::now();
        let result = f(signal).await;

        extender.abort();
        if let Err(error) = self.backend.release(&path, token).await {
            warn!(path = %path, %error, "failed to release lock");
        }
        LOCK_HELD_DURATION
            .with_label_values(&[kind])
            .observe(held_from.elapsed().as_secs_f64());
        debug!(path = %path, "lock released");

        Ok(result)
    }

    /// Serialize on a wallet
    pub async fn lock_wallet_id<F, Fut, T>(&self, wallet_id: WalletId, f: F) -> Result<T>
    where
        F: FnOnce(LockSignal) -> Fut,
        Fut: Future<Output = T>,
    {
        self.lock(LockResource::Wallet(wallet_id), f).await
    }

    /// Serialize on a Lightning payment hash
    pub async fn lock_payment_hash<F, Fut, T>(&self, hash: PaymentHash, f: F) -> Result<T>
    where
        F: FnOnce(LockSignal) -> Fut,
        Fut: Future<Output = T>,
    {
        self.lock(LockResource::PaymentHash(hash), f).await
    }

    /// Serialize on an on-chain transaction output
    pub async fn lock_on_chain_utxo<F, Fut, T>(
        &self,
        tx_hash: OnChainTxHash,
        vout: OnChainTxVout,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(LockSignal) -> Fut,
        Fut: Future<Output = T>,
    {
        self.lock(LockResource::OnChainUtxo { tx_hash, vout }, f).await
    }

    async fn acquire(&self, path: &str, kind: &'static str, token: Uuid) -> Result<()> {
        let attempts = self.config.retry_count + 1;
        for attempt in 0..attempts {
            if self.backend.try_acquire(path, token, self.config.ttl()).await? {
                LOCK_ACQUIRE_TOTAL
                    .with_label_values(&[kind, "acquired"])
                    .inc();
                return Ok(());
            }
            if attempt + 1 < attempts {
                let jitter_ms = if self.config.retry_jitter_ms > 0 {
                    rand::thread_rng().gen_range(0..=self.config.retry_jitter_ms)
                } else {
                    0
                };
                tokio::time::sleep(self.config.retry_delay() + Duration::from_millis(jitter_ms))
                    .await;
            }
        }
        LOCK_ACQUIRE_TOTAL
            .with_label_values(&[kind, "attempts_exceeded"])
            .inc();
        Err(Error::ResourceAttemptsExceeded {
            resource: path.to_string(),
        })
    }
}

async fn extend_loop(
    backend: Arc<dyn LockBackend>,
    path: String,
    kind: &'static str,
    token: Uuid,
    ttl: Duration,
    threshold: Duration,
    signal: LockSignal,
) {
    let interval = std::cmp::max(ttl.saturating_sub(threshold), Duration::from_millis(1));
    loop {
        tokio::time::sleep(interval).await;
        match backend.extend(&path, token, ttl).await {
            Ok(true) => {
                debug!(path = %path, "lease extended");
            }
            Ok(false) => {
                LOCK_EXTENSION_FAILED_TOTAL.with_label_values(&[kind]).inc();
                warn!(path = %path, "lease lost, signalling holder");
                signal.expire(Some("lease lost before extension".to_string()));
                return;
            }
            Err(error) => {
                LOCK_EXTENSION_FAILED_TOTAL.with_label_values(&[kind]).inc();
                warn!(path = %path, %error, "lease extension failed");
                signal.expire(Some(error.to_string()));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryLockBackend;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    fn service() -> LockService {
        let config = LockServiceConfig {
            ttl_ms: 10_000,
            retry_count: 3,
            retry_delay_ms: 50,
            retry_jitter_ms: 0,
            extension_threshold_ms: 2_500,
        };
        LockService::new(Arc::new(MemoryLockBackend::new()), config)
    }

    #[tokio::test(start_paused = true)]
    async fn same_wallet_never_overlaps() {
        let service = service();
        let wallet = WalletId::new();
        let in_critical = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let service = service.clone();
            let in_critical = Arc::clone(&in_critical);
            let overlaps = Arc::clone(&overlaps);
            handles.push(tokio::spawn(async move {
                service
                    .lock_wallet_id(wallet, |_signal| async move {
                        if in_critical.swap(true, Ordering::SeqCst) {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        in_critical.store(false, Ordering::SeqCst);
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn different_wallets_run_concurrently() {
        let service = service();
        let concurrent = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let service = service.clone();
            let concurrent = Arc::clone(&concurrent);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                service
                    .lock_wallet_id(WalletId::new(), |_signal| async move {
                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        concurrent.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn contended_lock_fails_with_attempts_exceeded() {
        let service = service();
        let wallet = WalletId::new();

        let holder = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .lock_wallet_id(wallet, |_signal| async move {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    })
                    .await
                    .unwrap();
            })
        };
        // let the holder reach its critical section
        tokio::time::sleep(Duration::from_millis(1)).await;

        let err = service
            .lock_wallet_id(wallet, |_signal| async move {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResourceAttemptsExceeded { .. }));

        holder.await.unwrap();
    }

    #[tokio::test]
    async fn expired_signal_fails_without_acquisition() {
        let service = service();
        let signal = LockSignal::new();
        signal.expire(Some("ttl elapsed".to_string()));

        let ran = Arc::new(AtomicBool::new(false));
        let err = service
            .lock_with_signal(LockResource::Wallet(WalletId::new()), Some(signal), {
                let ran = Arc::clone(&ran);
                |_signal| async move {
                    ran.store(true, Ordering::SeqCst);
                }
            })
            .await
            .unwrap_err();

        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(
            err,
            Error::ResourceExpired {
                reason: Some("ttl elapsed".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn live_signal_reenters_without_reacquisition() {
        let service = service();
        let signal = LockSignal::new();

        let ran = service
            .lock_with_signal(
                LockResource::Wallet(WalletId::new()),
                Some(signal),
                |_signal| async move { 42 },
            )
            .await
            .unwrap();
        assert_eq!(ran, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn long_critical_section_keeps_lease_alive() {
        let backend = Arc::new(MemoryLockBackend::new());
        let config = LockServiceConfig {
            ttl_ms: 100,
            retry_count: 0,
            retry_delay_ms: 10,
            retry_jitter_ms: 0,
            extension_threshold_ms: 30,
        };
        let service = LockService::new(backend, config);

        let outcome = service
            .lock_wallet_id(WalletId::new(), |signal| async move {
                // five lease lifetimes
                tokio::time::sleep(Duration::from_millis(500)).await;
                signal.is_expired()
            })
            .await
            .unwrap();
        assert!(!outcome, "lease should have been extended while held");
    }

    struct LosingBackend;

    #[async_trait]
    impl LockBackend for LosingBackend {
        async fn try_acquire(&self, _path: &str, _token: Uuid, _ttl: Duration) -> Result<bool> {
            Ok(true)
        }

        async fn extend(&self, _path: &str, _token: Uuid, _ttl: Duration) -> Result<bool> {
            Ok(false)
        }

        async fn release(&self, _path: &str, _token: Uuid) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lost_lease_trips_the_signal() {
        let config = LockServiceConfig {
            ttl_ms: 100,
            retry_count: 0,
            retry_delay_ms: 10,
            retry_jitter_ms: 0,
            extension_threshold_ms: 30,
        };
        let service = LockService::new(Arc::new(LosingBackend), config);

        let expired = service
            .lock_wallet_id(WalletId::new(), |signal| async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                signal.is_expired()
            })
            .await
            .unwrap();
        assert!(expired);
    }
}
