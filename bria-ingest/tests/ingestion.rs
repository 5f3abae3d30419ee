//! Ingestion loop behavior against a scripted stream

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use bria_ingest::{
    BriaEvent, BriaEventHandler, BriaEventRepository, BriaSubscriber, BriaSubscriptionClient,
    Error, EventStream, MemoryBriaEventRepository, Result, SubscriberConfig,
};
use bria_proto::{bria_event::Payload, SubscribeAllRequest};

struct ScriptedClient {
    events: Vec<bria_proto::BriaEvent>,
    subscriptions: AtomicU32,
}

impl ScriptedClient {
    fn new(events: Vec<bria_proto::BriaEvent>) -> Self {
        Self {
            events,
            subscriptions: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl BriaSubscriptionClient for ScriptedClient {
    async fn subscribe_all(&self, request: SubscribeAllRequest) -> Result<EventStream> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let replay: Vec<Result<bria_proto::BriaEvent>> = self
            .events
            .iter()
            .filter(|event| event.sequence > request.after_sequence)
            .cloned()
            .map(Ok)
            .collect();
        Ok(Box::pin(futures::stream::iter(replay)))
    }
}

struct RecordingHandler {
    seen: Mutex<Vec<u64>>,
    fail_once_on: Option<u64>,
    failed: AtomicBool,
}

impl RecordingHandler {
    fn new(fail_once_on: Option<u64>) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            fail_once_on,
            failed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl BriaEventHandler for RecordingHandler {
    async fn handle(&self, event: &BriaEvent) -> Result<()> {
        self.seen.lock().push(event.sequence);
        if self.fail_once_on == Some(event.sequence) && !self.failed.swap(true, Ordering::SeqCst) {
            return Err(Error::Handler("induced failure".to_string()));
        }
        Ok(())
    }
}

fn payout_envelope(sequence: u64) -> bria_proto::BriaEvent {
    bria_proto::BriaEvent {
        sequence,
        augmentation: Some(bria_proto::EventAugmentation { address_info: None }),
        payload: Some(Payload::PayoutSubmitted(bria_proto::PayoutSubmitted {
            id: format!("payout-{sequence}"),
            satoshis: 10_000,
        })),
    }
}

fn poison_envelope(sequence: u64) -> bria_proto::BriaEvent {
    bria_proto::BriaEvent {
        sequence,
        augmentation: Some(bria_proto::EventAugmentation { address_info: None }),
        payload: None,
    }
}

fn fast_config() -> SubscriberConfig {
    SubscriberConfig {
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
    }
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn processes_a_stream_in_order() {
    let client = Arc::new(ScriptedClient::new(vec![
        payout_envelope(1),
        payout_envelope(2),
        payout_envelope(3),
    ]));
    let repo = Arc::new(MemoryBriaEventRepository::new());
    let handler = Arc::new(RecordingHandler::new(None));

    let subscriber = BriaSubscriber::new(client.clone(), repo.clone(), fast_config());
    let handle = subscriber.subscribe_to_all(handler.clone());

    wait_until(|| repo.len() == 3).await;
    handle.cancel().await;

    assert_eq!(&*handler.seen.lock(), &[1, 2, 3]);
    assert_eq!(repo.latest_sequence().await.unwrap(), Some(3));
}

#[tokio::test]
async fn handler_failure_rewinds_and_redelivers() {
    let client = Arc::new(ScriptedClient::new(vec![
        payout_envelope(1),
        payout_envelope(2),
        payout_envelope(3),
    ]));
    let repo = Arc::new(MemoryBriaEventRepository::new());
    let handler = Arc::new(RecordingHandler::new(Some(2)));

    let subscriber = BriaSubscriber::new(client.clone(), repo.clone(), fast_config());
    let handle = subscriber.subscribe_to_all(handler.clone());

    wait_until(|| repo.len() == 3).await;
    handle.cancel().await;

    // sequence 1 was committed before the failure, so the rewound
    // subscription resumes at 2; the failed event is delivered again
    assert_eq!(&*handler.seen.lock(), &[1, 2, 2, 3]);
    assert!(client.subscriptions.load(Ordering::SeqCst) >= 2);
    assert_eq!(repo.latest_sequence().await.unwrap(), Some(3));
}

#[tokio::test]
async fn untranslatable_event_is_never_skipped() {
    let client = Arc::new(ScriptedClient::new(vec![
        payout_envelope(1),
        poison_envelope(2),
        payout_envelope(3),
    ]));
    let repo = Arc::new(MemoryBriaEventRepository::new());
    let handler = Arc::new(RecordingHandler::new(None));

    let subscriber = BriaSubscriber::new(client.clone(), repo.clone(), fast_config());
    let handle = subscriber.subscribe_to_all(handler.clone());

    // the poison event pins the cursor at 1; the loop keeps retrying it
    // rather than advancing past an unprocessed event
    wait_until(|| client.subscriptions.load(Ordering::SeqCst) >= 3).await;
    handle.cancel().await;

    assert_eq!(repo.latest_sequence().await.unwrap(), Some(1));
    assert!(handler.seen.lock().iter().all(|&sequence| sequence == 1));
}

#[tokio::test]
async fn cancel_stops_the_loop() {
    let client = Arc::new(ScriptedClient::new(vec![payout_envelope(1)]));
    let repo = Arc::new(MemoryBriaEventRepository::new());
    let handler = Arc::new(RecordingHandler::new(None));

    let subscriber = BriaSubscriber::new(client, repo.clone(), fast_config());
    let handle = subscriber.subscribe_to_all(handler);

    wait_until(|| repo.len() == 1).await;
    handle.cancel().await;
}
