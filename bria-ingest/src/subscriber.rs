//! Reconnecting consumer of the Bria event stream
//!
//! The loop resumes from the replay log's last committed sequence and runs
//! receive → translate → handle → persist for each event. Any failure stops
//! the current subscription and reconnects from the last committed cursor —
//! the failed event's sequence minus one — so nothing is ever skipped and
//! delivery is at-least-once. Handlers must therefore tolerate redelivery.

use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures::stream::Stream;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use bria_proto::SubscribeAllRequest;

use crate::event::BriaEvent;
use crate::metrics::{
    BRIA_EVENT_HANDLE_DURATION, BRIA_EVENT_RECEIVE_TOTAL, BRIA_STREAM_REWIND_TOTAL,
};
use crate::repository::BriaEventRepository;
use crate::translate::translate;
use crate::Result;

/// Stream of raw envelopes from one subscription
pub type EventStream =
    std::pin::Pin<Box<dyn Stream<Item = Result<bria_proto::BriaEvent>> + Send>>;

/// Transport producing event subscriptions
#[async_trait::async_trait]
pub trait BriaSubscriptionClient: Send + Sync {
    /// Open a subscription replaying strictly after `request.after_sequence`
    async fn subscribe_all(&self, request: SubscribeAllRequest) -> Result<EventStream>;
}

/// Business handler for translated events.
///
/// Invoked at least once per sequence; implementations must be idempotent —
/// by `(tx_id, vout)` for UTXO events and by payout id for payout events.
#[async_trait::async_trait]
pub trait BriaEventHandler: Send + Sync {
    /// Handle one event
    async fn handle(&self, event: &BriaEvent) -> Result<()>;
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// First reconnect delay
    pub initial_backoff: Duration,

    /// Reconnect delay ceiling; retries continue forever at this pace
    pub max_backoff: Duration,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Handle to a running subscription
pub struct SubscriptionHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Stop the loop and wait for it to wind down
    pub async fn cancel(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }

    /// True once the loop has exited
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Reconnecting consumer of the Bria stream
pub struct BriaSubscriber {
    client: Arc<dyn BriaSubscriptionClient>,
    repo: Arc<dyn BriaEventRepository>,
    config: SubscriberConfig,
}

impl BriaSubscriber {
    /// Create over a transport and replay log
    pub fn new(
        client: Arc<dyn BriaSubscriptionClient>,
        repo: Arc<dyn BriaEventRepository>,
        config: SubscriberConfig,
    ) -> Self {
        Self {
            client,
            repo,
            config,
        }
    }

    /// Spawn the ingestion loop, feeding every event to `handler`.
    ///
    /// Runs as a permanent background task until the returned handle is
    /// cancelled; transport failures reconnect with capped backoff, forever.
    pub fn subscribe_to_all(&self, handler: Arc<dyn BriaEventHandler>) -> SubscriptionHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let client = Arc::clone(&self.client);
        let repo = Arc::clone(&self.repo);
        let config = self.config.clone();

        let join = tokio::spawn(async move {
            let mut backoff = ExponentialBackoff {
                initial_interval: config.initial_backoff,
                max_interval: config.max_backoff,
                max_elapsed_time: None,
                ..ExponentialBackoff::default()
            };

            loop {
                if *shutdown_rx.borrow() {
                    return;
                }

                let after_sequence = match repo.latest_sequence().await {
                    Ok(sequence) => sequence.unwrap_or(0),
                    Err(error) => {
                        error!(%error, "could not read stream cursor");
                        if wait_or_shutdown(&mut shutdown_rx, next_delay(&mut backoff)).await {
                            return;
                        }
                        continue;
                    }
                };

                let mut stream = match client
                    .subscribe_all(SubscribeAllRequest {
                        after_sequence,
                        augment: true,
                    })
                    .await
                {
                    Ok(stream) => stream,
                    Err(error) => {
                        error!(%error, "could not subscribe to bria stream");
                        if wait_or_shutdown(&mut shutdown_rx, next_delay(&mut backoff)).await {
                            return;
                        }
                        continue;
                    }
                };
                info!(after_sequence, "subscribed to bria event stream");

                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                return;
                            }
                        }
                        next = stream.next() => match next {
                            Some(Ok(raw)) => {
                                match process_event(repo.as_ref(), handler.as_ref(), raw).await {
                                    Ok(()) => backoff.reset(),
                                    Err(()) => break,
                                }
                            }
                            Some(Err(error)) => {
                                error!(%error, "bria stream error");
                                break;
                            }
                            None => {
                                warn!("bria stream ended, reconnecting");
                                break;
                            }
                        }
                    }
                }

                if wait_or_shutdown(&mut shutdown_rx, next_delay(&mut backoff)).await {
                    return;
                }
            }
        });

        SubscriptionHandle { shutdown, join }
    }
}

fn next_delay(backoff: &mut ExponentialBackoff) -> Duration {
    backoff
        .next_backoff()
        .unwrap_or_else(|| backoff.max_interval)
}

/// Wait for `delay`, returning early (and `true`) on shutdown.
async fn wait_or_shutdown(shutdown_rx: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => *shutdown_rx.borrow(),
        _ = shutdown_rx.changed() => *shutdown_rx.borrow(),
    }
}

/// Translate, handle, and persist one envelope.
///
/// On any failure the committed cursor is left at the previous event, so the
/// reconnecting caller resumes at `sequence - 1` and this event is
/// redelivered.
async fn process_event(
    repo: &dyn BriaEventRepository,
    handler: &dyn BriaEventHandler,
    raw: bria_proto::BriaEvent,
) -> std::result::Result<(), ()> {
    let sequence = raw.sequence;

    let event = match translate(raw) {
        Ok(event) => event,
        Err(error) => {
            error!(sequence, %error, "bria event translation failed, rewinding");
            BRIA_EVENT_RECEIVE_TOTAL
                .with_label_values(&["unknown", "translate_error"])
                .inc();
            BRIA_STREAM_REWIND_TOTAL
                .with_label_values(&["translate"])
                .inc();
            return Err(());
        }
    };

    let payload_type = event.payload.payload_type().as_str();
    BRIA_EVENT_RECEIVE_TOTAL
        .with_label_values(&[payload_type, "received"])
        .inc();

    let started = Instant::now();
    if let Err(error) = handler.handle(&event).await {
        error!(sequence, %error, "bria event handler failed, rewinding");
        BRIA_STREAM_REWIND_TOTAL
            .with_label_values(&["handle"])
            .inc();
        return Err(());
    }
    BRIA_EVENT_HANDLE_DURATION
        .with_label_values(&[payload_type])
        .observe(started.elapsed().as_secs_f64());

    if let Err(error) = repo.persist_event(&event).await {
        error!(sequence, %error, "bria event persist failed, rewinding");
        BRIA_STREAM_REWIND_TOTAL
            .with_label_values(&["persist"])
            .inc();
        return Err(());
    }

    Ok(())
}
