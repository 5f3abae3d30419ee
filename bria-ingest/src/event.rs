//! Typed domain events of the Bria stream

use serde::{Deserialize, Serialize};
use std::fmt;

use ledger_core::{BtcPaymentAmount, OnChainAddress, OnChainTxHash, OnChainTxVout, PayoutId};

/// Discriminant of a [`BriaPayload`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BriaPayloadType {
    /// Incoming UTXO seen in the mempool
    UtxoDetected,
    /// Incoming UTXO settled
    UtxoSettled,
    /// Payout accepted into the queue
    PayoutSubmitted,
    /// Payout committed to a batch
    PayoutCommitted,
    /// Payout batch broadcast
    PayoutBroadcast,
    /// Payout batch settled
    PayoutSettled,
}

impl BriaPayloadType {
    /// Stable string form used in logs and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            BriaPayloadType::UtxoDetected => "utxo_detected",
            BriaPayloadType::UtxoSettled => "utxo_settled",
            BriaPayloadType::PayoutSubmitted => "payout_submitted",
            BriaPayloadType::PayoutCommitted => "payout_committed",
            BriaPayloadType::PayoutBroadcast => "payout_broadcast",
            BriaPayloadType::PayoutSettled => "payout_settled",
        }
    }
}

impl fmt::Display for BriaPayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Address metadata attached out-of-band to UTXO events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressInfo {
    /// The receiving address
    pub address: OnChainAddress,
    /// Identifier the wallet registered the address under
    pub external_id: String,
}

/// Augmentation block of one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BriaEventAugmentation {
    /// Address metadata, when the server attached it
    pub address_info: Option<AddressInfo>,
}

/// Typed payload of one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BriaPayload {
    /// An incoming UTXO appeared in the mempool
    UtxoDetected {
        /// Transaction id
        tx_id: OnChainTxHash,
        /// Output index
        vout: OnChainTxVout,
        /// Receiving address
        address: OnChainAddress,
        /// Value of the output
        satoshis: BtcPaymentAmount,
    },
    /// An incoming UTXO reached its settlement depth
    UtxoSettled {
        /// Transaction id
        tx_id: OnChainTxHash,
        /// Output index
        vout: OnChainTxVout,
        /// Receiving address
        address: OnChainAddress,
        /// Value of the output
        satoshis: BtcPaymentAmount,
        /// Height of the settling block
        block_number: u32,
    },
    /// A payout was accepted into the queue
    PayoutSubmitted {
        /// Payout id
        id: PayoutId,
        /// Payout value
        satoshis: BtcPaymentAmount,
    },
    /// A payout was committed to a batch
    PayoutCommitted {
        /// Payout id
        id: PayoutId,
        /// Payout value
        satoshis: BtcPaymentAmount,
    },
    /// A payout's batch was broadcast
    PayoutBroadcast {
        /// Payout id
        id: PayoutId,
        /// Payout value
        satoshis: BtcPaymentAmount,
        /// This payout's share of the batch's mining fee
        proportional_fee: BtcPaymentAmount,
        /// Batch transaction id
        tx_id: OnChainTxHash,
        /// Destination address
        address: OnChainAddress,
    },
    /// A payout's batch reached its settlement depth
    PayoutSettled {
        /// Payout id
        id: PayoutId,
        /// Payout value
        satoshis: BtcPaymentAmount,
        /// This payout's share of the batch's mining fee
        proportional_fee: BtcPaymentAmount,
        /// Batch transaction id
        tx_id: OnChainTxHash,
        /// Destination address
        address: OnChainAddress,
    },
}

impl BriaPayload {
    /// Discriminant of this payload
    pub fn payload_type(&self) -> BriaPayloadType {
        match self {
            BriaPayload::UtxoDetected { .. } => BriaPayloadType::UtxoDetected,
            BriaPayload::UtxoSettled { .. } => BriaPayloadType::UtxoSettled,
            BriaPayload::PayoutSubmitted { .. } => BriaPayloadType::PayoutSubmitted,
            BriaPayload::PayoutCommitted { .. } => BriaPayloadType::PayoutCommitted,
            BriaPayload::PayoutBroadcast { .. } => BriaPayloadType::PayoutBroadcast,
            BriaPayload::PayoutSettled { .. } => BriaPayloadType::PayoutSettled,
        }
    }
}

/// One translated event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BriaEvent {
    /// Typed payload
    pub payload: BriaPayload,
    /// Address augmentation, when attached
    pub augmentation: Option<BriaEventAugmentation>,
    /// Position in the stream
    pub sequence: u64,
}
