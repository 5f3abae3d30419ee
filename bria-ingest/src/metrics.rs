//! Prometheus metrics for the ingestion loop

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

lazy_static! {
    /// Events received from the stream
    pub static ref BRIA_EVENT_RECEIVE_TOTAL: CounterVec = register_counter_vec!(
        "bria_event_receive_total",
        "Events received from the Bria stream",
        &["payload_type", "status"]
    )
    .unwrap();

    /// Handler latency per payload type
    pub static ref BRIA_EVENT_HANDLE_DURATION: HistogramVec = register_histogram_vec!(
        "bria_event_handle_duration_seconds",
        "Event handler duration in seconds",
        &["payload_type"]
    )
    .unwrap();

    /// Stream rewinds caused by translation, handler, or persist failures
    pub static ref BRIA_STREAM_REWIND_TOTAL: CounterVec = register_counter_vec!(
        "bria_stream_rewind_total",
        "Stream cursor rewinds by failure stage",
        &["stage"]
    )
    .unwrap();
}
