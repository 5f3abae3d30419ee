//! Wire types of the Bria payout-processor event stream
//!
//! Message definitions mirror the upstream protobuf schema: a streamed
//! envelope carrying a monotonic `sequence`, optional address augmentation,
//! and exactly one of six payload cases. They are hand-maintained prost
//! messages so the wire format is reproduced bit-for-bit without a codegen
//! step; field tags must never be renumbered.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

/// Subscription request: replay strictly after `after_sequence`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribeAllRequest {
    /// Last sequence the consumer has durably processed
    #[prost(uint64, tag = "1")]
    pub after_sequence: u64,
    /// Ask the server to attach address augmentation
    #[prost(bool, tag = "2")]
    pub augment: bool,
}

/// One streamed event envelope
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BriaEvent {
    /// Monotonically increasing stream cursor
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    /// Out-of-band metadata attached by the server
    #[prost(message, optional, tag = "2")]
    pub augmentation: ::core::option::Option<EventAugmentation>,
    /// Exactly one payload case per envelope
    #[prost(oneof = "bria_event::Payload", tags = "3, 4, 5, 6, 7, 8")]
    pub payload: ::core::option::Option<bria_event::Payload>,
}

/// Nested message and enum types in `BriaEvent`.
pub mod bria_event {
    /// Payload cases of the event envelope
    #[non_exhaustive]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        /// An incoming UTXO appeared in the mempool
        #[prost(message, tag = "3")]
        UtxoDetected(super::UtxoDetected),
        /// An incoming UTXO reached its settlement depth
        #[prost(message, tag = "4")]
        UtxoSettled(super::UtxoSettled),
        /// A payout was accepted into the queue
        #[prost(message, tag = "5")]
        PayoutSubmitted(super::PayoutSubmitted),
        /// A payout was committed to a batch
        #[prost(message, tag = "6")]
        PayoutCommitted(super::PayoutCommitted),
        /// A payout's batch was broadcast
        #[prost(message, tag = "7")]
        PayoutBroadcast(super::PayoutBroadcast),
        /// A payout's batch reached its settlement depth
        #[prost(message, tag = "8")]
        PayoutSettled(super::PayoutSettled),
    }
}

/// Out-of-band metadata attached to an envelope
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventAugmentation {
    /// Metadata for the address involved in UTXO payloads
    #[prost(message, optional, tag = "1")]
    pub address_info: ::core::option::Option<AddressAugmentation>,
}

/// Metadata for one registered address
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AddressAugmentation {
    /// The address itself
    #[prost(string, tag = "1")]
    pub address: ::prost::alloc::string::String,
    /// Identifier the wallet registered the address under
    #[prost(string, tag = "2")]
    pub external_id: ::prost::alloc::string::String,
}

/// An incoming UTXO appeared in the mempool
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UtxoDetected {
    /// Transaction id
    #[prost(string, tag = "1")]
    pub tx_id: ::prost::alloc::string::String,
    /// Output index
    #[prost(uint32, tag = "2")]
    pub vout: u32,
    /// Value of the output
    #[prost(uint64, tag = "3")]
    pub satoshis: u64,
    /// Receiving address
    #[prost(string, tag = "4")]
    pub address: ::prost::alloc::string::String,
}

/// An incoming UTXO reached its settlement depth
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UtxoSettled {
    /// Transaction id
    #[prost(string, tag = "1")]
    pub tx_id: ::prost::alloc::string::String,
    /// Output index
    #[prost(uint32, tag = "2")]
    pub vout: u32,
    /// Value of the output
    #[prost(uint64, tag = "3")]
    pub satoshis: u64,
    /// Receiving address
    #[prost(string, tag = "4")]
    pub address: ::prost::alloc::string::String,
    /// Height of the settling block
    #[prost(uint32, tag = "5")]
    pub block_height: u32,
}

/// A payout was accepted into the queue
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PayoutSubmitted {
    /// Payout id
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    /// Payout value
    #[prost(uint64, tag = "2")]
    pub satoshis: u64,
}

/// A payout was committed to a batch
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PayoutCommitted {
    /// Payout id
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    /// Payout value
    #[prost(uint64, tag = "2")]
    pub satoshis: u64,
}

/// A payout's batch was broadcast
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PayoutBroadcast {
    /// Payout id
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    /// Payout value
    #[prost(uint64, tag = "2")]
    pub satoshis: u64,
    /// This payout's share of the batch's mining fee
    #[prost(uint64, tag = "3")]
    pub proportional_fee_sats: u64,
    /// Batch transaction id
    #[prost(string, tag = "4")]
    pub tx_id: ::prost::alloc::string::String,
    /// Destination address
    #[prost(string, tag = "5")]
    pub onchain_address: ::prost::alloc::string::String,
}

/// A payout's batch reached its settlement depth
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PayoutSettled {
    /// Payout id
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    /// Payout value
    #[prost(uint64, tag = "2")]
    pub satoshis: u64,
    /// This payout's share of the batch's mining fee
    #[prost(uint64, tag = "3")]
    pub proportional_fee_sats: u64,
    /// Batch transaction id
    #[prost(string, tag = "4")]
    pub tx_id: ::prost::alloc::string::String,
    /// Destination address
    #[prost(string, tag = "5")]
    pub onchain_address: ::prost::alloc::string::String,
}
