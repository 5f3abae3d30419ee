//! Error types for Bria event ingestion

use thiserror::Error;

use crate::event::BriaPayloadType;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ingestion errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The envelope carried no augmentation block at all
    #[error("Event augmentation missing")]
    AugmentationMissing,

    /// A UTXO payload arrived without its address info augmentation
    #[error("Expected address info missing in event")]
    AddressInfoMissing,

    /// The declared case's sub-message was absent
    #[error("Expected {0} payload not found")]
    PayloadNotFound(BriaPayloadType),

    /// The envelope had no payload case set
    #[error("No payload found in event")]
    NoPayloadFound,

    /// The payload case is not one this consumer understands
    #[error("Unknown payload type received")]
    UnknownPayloadType,

    /// Underlying ledger error (amount validation, storage, balance checks)
    #[error(transparent)]
    Ledger(#[from] ledger_core::Error),

    /// Replay-log failure
    #[error("Event repository error: {0}")]
    Repository(String),

    /// Subscription transport failure
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Business handler failure
    #[error("Event handler error: {0}")]
    Handler(String),

    /// No wallet is registered for the event's address
    #[error("No wallet found for address {0}")]
    WalletNotFound(String),

    /// Lock serialization failure while handling the event
    #[error(transparent)]
    Lock(#[from] lock_service::Error),
}
