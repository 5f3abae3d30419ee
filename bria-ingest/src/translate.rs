//! Wire-to-domain translation of Bria events
//!
//! Every envelope must carry an augmentation block, UTXO cases must carry
//! address info inside it, and each declared case must carry a populated
//! sub-message. In proto3 a case declared with an unset body decodes to the
//! message's defaults, so a case whose required identifiers are empty is
//! treated as "payload not found" for that case.

use bria_proto::bria_event::Payload;

use ledger_core::{BtcPaymentAmount, OnChainAddress, OnChainTxHash, OnChainTxVout, PayoutId};

use crate::event::{
    AddressInfo, BriaEvent, BriaEventAugmentation, BriaPayload, BriaPayloadType,
};
use crate::{Error, Result};

/// Translate a raw envelope into a typed domain event.
pub fn translate(raw: bria_proto::BriaEvent) -> Result<BriaEvent> {
    let sequence = raw.sequence;

    let raw_augmentation = raw.augmentation.ok_or(Error::AugmentationMissing)?;
    let augmentation = raw_augmentation.address_info.map(|info| BriaEventAugmentation {
        address_info: Some(AddressInfo {
            address: OnChainAddress::new(info.address),
            external_id: info.external_id,
        }),
    });

    let payload = match raw.payload.ok_or(Error::NoPayloadFound)? {
        Payload::UtxoDetected(detected) => {
            if augmentation.is_none() {
                return Err(Error::AddressInfoMissing);
            }
            if detected.tx_id.is_empty() {
                return Err(Error::PayloadNotFound(BriaPayloadType::UtxoDetected));
            }
            BriaPayload::UtxoDetected {
                tx_id: OnChainTxHash::new(detected.tx_id),
                vout: OnChainTxVout(detected.vout),
                address: OnChainAddress::new(detected.address),
                satoshis: BtcPaymentAmount::new(detected.satoshis),
            }
        }
        Payload::UtxoSettled(settled) => {
            if augmentation.is_none() {
                return Err(Error::AddressInfoMissing);
            }
            if settled.tx_id.is_empty() {
                return Err(Error::PayloadNotFound(BriaPayloadType::UtxoSettled));
            }
            BriaPayload::UtxoSettled {
                tx_id: OnChainTxHash::new(settled.tx_id),
                vout: OnChainTxVout(settled.vout),
                address: OnChainAddress::new(settled.address),
                satoshis: BtcPaymentAmount::new(settled.satoshis),
                block_number: settled.block_height,
            }
        }
        Payload::PayoutSubmitted(submitted) => {
            if submitted.id.is_empty() {
                return Err(Error::PayloadNotFound(BriaPayloadType::PayoutSubmitted));
            }
            BriaPayload::PayoutSubmitted {
                id: PayoutId::new(submitted.id),
                satoshis: BtcPaymentAmount::new(submitted.satoshis),
            }
        }
        Payload::PayoutCommitted(committed) => {
            if committed.id.is_empty() {
                return Err(Error::PayloadNotFound(BriaPayloadType::PayoutCommitted));
            }
            BriaPayload::PayoutCommitted {
                id: PayoutId::new(committed.id),
                satoshis: BtcPaymentAmount::new(committed.satoshis),
            }
        }
        Payload::PayoutBroadcast(broadcast) => {
            if broadcast.id.is_empty() {
                return Err(Error::PayloadNotFound(BriaPayloadType::PayoutBroadcast));
            }
            BriaPayload::PayoutBroadcast {
                id: PayoutId::new(broadcast.id),
                satoshis: BtcPaymentAmount::new(broadcast.satoshis),
                proportional_fee: BtcPaymentAmount::checked(broadcast.proportional_fee_sats)?,
                tx_id: OnChainTxHash::new(broadcast.tx_id),
                address: OnChainAddress::new(broadcast.onchain_address),
            }
        }
        Payload::PayoutSettled(settled) => {
            if settled.id.is_empty() {
                return Err(Error::PayloadNotFound(BriaPayloadType::PayoutSettled));
            }
            BriaPayload::PayoutSettled {
                id: PayoutId::new(settled.id),
                satoshis: BtcPaymentAmount::new(settled.satoshis),
                proportional_fee: BtcPaymentAmount::checked(settled.proportional_fee_sats)?,
                tx_id: OnChainTxHash::new(settled.tx_id),
                address: OnChainAddress::new(settled.onchain_address),
            }
        }
        _ => return Err(Error::UnknownPayloadType),
    };

    Ok(BriaEvent {
        payload,
        augmentation,
        sequence,
    })
}
