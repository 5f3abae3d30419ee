//! Prometheus metrics for the lock service

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

lazy_static! {
    /// Lock acquisition outcomes
    pub static ref LOCK_ACQUIRE_TOTAL: CounterVec = register_counter_vec!(
        "lock_acquire_total",
        "Lock acquisition outcomes",
        &["resource_kind", "status"]
    )
    .unwrap();

    /// Time a lock was held
    pub static ref LOCK_HELD_DURATION: HistogramVec = register_histogram_vec!(
        "lock_held_duration_seconds",
        "Time a lock was held in seconds",
        &["resource_kind"]
    )
    .unwrap();

    /// Lease extensions that did not go through
    pub static ref LOCK_EXTENSION_FAILED_TOTAL: CounterVec = register_counter_vec!(
        "lock_extension_failed_total",
        "Lease extensions that did not go through",
        &["resource_kind"]
    )
    .unwrap();
}
