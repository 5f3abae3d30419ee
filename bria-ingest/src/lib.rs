//! SatBank Bria Ingestion
//!
//! Consumes the external payout-processor (Bria) event stream: decodes wire
//! envelopes into typed domain events, hands them to an idempotent business
//! handler, persists a replay log keyed by sequence, and on any failure
//! rewinds the cursor and reconnects so no event is ever skipped.
//!
//! Delivery is at-least-once; handlers are idempotent by `(tx_id, vout)` for
//! UTXO events and by payout id for payout events.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod event;
pub mod handler;
pub mod metrics;
pub mod repository;
pub mod subscriber;
pub mod translate;

pub use error::{Error, Result};
pub use event::{AddressInfo, BriaEvent, BriaEventAugmentation, BriaPayload, BriaPayloadType};
pub use handler::{PayoutEstimates, UsdConverter, WalletEventHandler, WalletRepository};
pub use repository::{BriaEventRepository, MemoryBriaEventRepository};
pub use subscriber::{
    BriaEventHandler, BriaSubscriber, BriaSubscriptionClient, EventStream, SubscriberConfig,
    SubscriptionHandle,
};
pub use translate::translate;
