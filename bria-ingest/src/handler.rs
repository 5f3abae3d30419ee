//! Business handling of translated Bria events
//!
//! Ties the lock service and the ledger facade together: a settled UTXO is
//! recorded under its `(tx, vout)` lock only if no entry exists for the tx
//! hash yet, so replays and concurrent deliveries cannot double-credit; a
//! settled payout reconciles its estimated fee against the actual
//! proportional fee. Detection and the in-between payout lifecycle states
//! are logged transitions with no ledger effect.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use ledger_core::storage::metadata_keys;
use ledger_core::{
    BtcPaymentAmount, Ledger, OnChainAddress, OnChainTxHash, OnChainTxVout, PaymentAmounts,
    PaymentRail, PayoutId, RecordFeeReconciliationArgs, RecordReceiveArgs, TxMetadata,
    UsdPaymentAmount, WalletDescriptor,
};
use lock_service::LockService;

use crate::event::{BriaEvent, BriaPayload};
use crate::subscriber::BriaEventHandler;
use crate::{Error, Result};

/// Wallet lookup by registered receive address
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Find the wallet a receive address belongs to
    async fn find_wallet_by_address(
        &self,
        address: &OnChainAddress,
    ) -> Result<Option<WalletDescriptor>>;
}

/// Conversion of satoshi amounts into their cents shadow at the current price
#[async_trait]
pub trait UsdConverter: Send + Sync {
    /// Cents equivalent of `amount` at the current mid price
    async fn usd_from_btc(&self, amount: BtcPaymentAmount) -> Result<UsdPaymentAmount>;
}

/// Lookup of the fee estimated when a payout was queued
#[async_trait]
pub trait PayoutEstimates: Send + Sync {
    /// Estimated on-chain fee for the payout, `None` if unknown
    async fn estimated_fee(&self, id: &PayoutId) -> Result<Option<BtcPaymentAmount>>;
}

/// Handler wiring Bria events into the ledger
pub struct WalletEventHandler {
    ledger: Ledger,
    locks: LockService,
    wallets: Arc<dyn WalletRepository>,
    converter: Arc<dyn UsdConverter>,
    payout_estimates: Arc<dyn PayoutEstimates>,
}

impl WalletEventHandler {
    /// Create a handler over the ledger, lock service, and lookups
    pub fn new(
        ledger: Ledger,
        locks: LockService,
        wallets: Arc<dyn WalletRepository>,
        converter: Arc<dyn UsdConverter>,
        payout_estimates: Arc<dyn PayoutEstimates>,
    ) -> Self {
        Self {
            ledger,
            locks,
            wallets,
            converter,
            payout_estimates,
        }
    }

    async fn record_settled_utxo(
        &self,
        tx_id: &OnChainTxHash,
        vout: OnChainTxVout,
        address: &OnChainAddress,
        satoshis: BtcPaymentAmount,
    ) -> Result<()> {
        self.locks
            .lock_on_chain_utxo(tx_id.clone(), vout, |_signal| async move {
                if self.ledger.find_by_hash(tx_id.as_str()).await?.is_some() {
                    info!(tx_id = %tx_id, vout = %vout, "utxo already recorded, skipping");
                    return Ok(());
                }

                let wallet = self
                    .wallets
                    .find_wallet_by_address(address)
                    .await?
                    .ok_or_else(|| Error::WalletNotFound(address.to_string()))?;
                let usd = self.converter.usd_from_btc(satoshis).await?;

                let mut metadata = TxMetadata::new();
                metadata.insert(metadata_keys::TX_TYPE.to_string(), "onchain_receipt".into());
                let mut internal = TxMetadata::new();
                internal.insert("vout".to_string(), vout.0.into());
                internal.insert("address".to_string(), address.as_str().into());

                self.ledger
                    .record_receive(RecordReceiveArgs {
                        description: "onchain receipt".to_string(),
                        rail: PaymentRail::OnChain,
                        recipient: wallet,
                        amount_to_credit: PaymentAmounts { btc: satoshis, usd },
                        bank_fee: None,
                        metadata,
                        additional_credit_metadata: TxMetadata::new(),
                        additional_internal_metadata: internal,
                        correlation_hash: Some(tx_id.as_str().to_string()),
                    })
                    .await?;

                info!(tx_id = %tx_id, vout = %vout, sats = satoshis.amount(), "settled utxo recorded");
                Ok(())
            })
            .await?
    }

    async fn reconcile_payout_fee(
        &self,
        id: &PayoutId,
        tx_id: &OnChainTxHash,
        actual_fee: BtcPaymentAmount,
    ) -> Result<()> {
        let Some(estimated_fee) = self.payout_estimates.estimated_fee(id).await? else {
            warn!(payout_id = %id, "no fee estimate on record, skipping reconciliation");
            return Ok(());
        };

        let mut metadata = TxMetadata::new();
        metadata.insert(metadata_keys::TX_TYPE.to_string(), "fee_reconciliation".into());
        metadata.insert("payout_id".to_string(), id.as_str().into());

        self.ledger
            .record_receive_fee_reconciliation(RecordFeeReconciliationArgs {
                estimated_fee,
                actual_fee,
                metadata,
                correlation_hash: Some(tx_id.as_str().to_string()),
            })
            .await?;

        info!(
            payout_id = %id,
            estimated = estimated_fee.amount(),
            actual = actual_fee.amount(),
            "payout fee reconciled"
        );
        Ok(())
    }
}

#[async_trait]
impl BriaEventHandler for WalletEventHandler {
    async fn handle(&self, event: &BriaEvent) -> Result<()> {
        match &event.payload {
            BriaPayload::UtxoDetected {
                tx_id,
                vout,
                satoshis,
                ..
            } => {
                // pending-balance bookkeeping and notification live outside
                // the ledger core; settlement is what gets recorded
                info!(tx_id = %tx_id, vout = %vout, sats = satoshis.amount(), "utxo detected");
                Ok(())
            }
            BriaPayload::UtxoSettled {
                tx_id,
                vout,
                address,
                satoshis,
                ..
            } => {
                self.record_settled_utxo(tx_id, *vout, address, *satoshis)
                    .await
            }
            BriaPayload::PayoutSubmitted { id, .. } => {
                debug!(payout_id = %id, "payout submitted");
                Ok(())
            }
            BriaPayload::PayoutCommitted { id, .. } => {
                debug!(payout_id = %id, "payout committed");
                Ok(())
            }
            BriaPayload::PayoutBroadcast { id, tx_id, .. } => {
                info!(payout_id = %id, tx_id = %tx_id, "payout broadcast");
                Ok(())
            }
            BriaPayload::PayoutSettled {
                id,
                tx_id,
                proportional_fee,
                ..
            } => {
                self.reconcile_payout_fee(id, tx_id, *proportional_fee)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{
        LedgerAccountId, MemoryLedgerStore, MemoryTransactionMetadataRepository,
        StaticAccountIds, WalletCurrency, WalletId, WalletPriceRatio,
    };
    use lock_service::{LockServiceConfig, MemoryLockBackend};
    use std::collections::HashMap;

    struct MapWallets(HashMap<String, WalletDescriptor>);

    #[async_trait]
    impl WalletRepository for MapWallets {
        async fn find_wallet_by_address(
            &self,
            address: &OnChainAddress,
        ) -> Result<Option<WalletDescriptor>> {
            Ok(self.0.get(address.as_str()).copied())
        }
    }

    struct RatioConverter(WalletPriceRatio);

    #[async_trait]
    impl UsdConverter for RatioConverter {
        async fn usd_from_btc(&self, amount: BtcPaymentAmount) -> Result<UsdPaymentAmount> {
            Ok(self.0.convert_from_btc(amount)?)
        }
    }

    struct MapEstimates(HashMap<String, BtcPaymentAmount>);

    #[async_trait]
    impl PayoutEstimates for MapEstimates {
        async fn estimated_fee(&self, id: &PayoutId) -> Result<Option<BtcPaymentAmount>> {
            Ok(self.0.get(id.as_str()).copied())
        }
    }

    fn static_accounts() -> StaticAccountIds {
        StaticAccountIds {
            bank_owner: LedgerAccountId::new(),
            dealer_btc: LedgerAccountId::new(),
            dealer_usd: LedgerAccountId::new(),
            lnd: LedgerAccountId::new(),
            on_chain: LedgerAccountId::new(),
            cold_storage: LedgerAccountId::new(),
        }
    }

    fn handler_with_wallet(address: &str) -> (WalletEventHandler, Ledger, WalletDescriptor) {
        let ledger = Ledger::new(
            Arc::new(MemoryLedgerStore::new()),
            Arc::new(MemoryTransactionMetadataRepository::new()),
            static_accounts(),
        );
        let wallet = WalletDescriptor {
            id: WalletId::new(),
            currency: WalletCurrency::Btc,
        };
        let mut wallets = HashMap::new();
        wallets.insert(address.to_string(), wallet);

        let ratio = WalletPriceRatio::new(
            UsdPaymentAmount::new(1),
            BtcPaymentAmount::new(20),
        )
        .unwrap();

        let mut estimates = HashMap::new();
        estimates.insert("payout-1".to_string(), BtcPaymentAmount::new(1_000));

        let handler = WalletEventHandler::new(
            ledger.clone(),
            LockService::new(
                Arc::new(MemoryLockBackend::new()),
                LockServiceConfig::default(),
            ),
            Arc::new(MapWallets(wallets)),
            Arc::new(RatioConverter(ratio)),
            Arc::new(MapEstimates(estimates)),
        );
        (handler, ledger, wallet)
    }

    fn settled_event(sequence: u64) -> BriaEvent {
        BriaEvent {
            payload: BriaPayload::UtxoSettled {
                tx_id: OnChainTxHash::new("txid-settled"),
                vout: OnChainTxVout(0),
                address: OnChainAddress::new("bcrt1qreceive"),
                satoshis: BtcPaymentAmount::new(50_000),
                block_number: 101,
            },
            augmentation: None,
            sequence,
        }
    }

    #[tokio::test]
    async fn settled_utxo_is_recorded_once() {
        let (handler, ledger, _wallet) = handler_with_wallet("bcrt1qreceive");

        handler.handle(&settled_event(1)).await.unwrap();
        let recorded = ledger.find_by_hash("txid-settled").await.unwrap();
        assert!(recorded.is_some());

        // replay of the same (tx, vout) must not create a second entry
        handler.handle(&settled_event(1)).await.unwrap();
        let again = ledger.find_by_hash("txid-settled").await.unwrap();
        assert_eq!(again, recorded);
    }

    #[tokio::test]
    async fn unknown_address_is_a_typed_error() {
        let (handler, _ledger, _wallet) = handler_with_wallet("bcrt1qother");

        let err = handler.handle(&settled_event(1)).await.unwrap_err();
        assert!(matches!(err, Error::WalletNotFound(_)));
    }

    fn payout_settled_event(fee: u64) -> BriaEvent {
        BriaEvent {
            payload: BriaPayload::PayoutSettled {
                id: PayoutId::new("payout-1"),
                satoshis: BtcPaymentAmount::new(200_000),
                proportional_fee: BtcPaymentAmount::new(fee),
                tx_id: OnChainTxHash::new("payout-txid"),
                address: OnChainAddress::new("bcrt1qdest"),
            },
            augmentation: None,
            sequence: 3,
        }
    }

    #[tokio::test]
    async fn payout_settlement_reconciles_fee() {
        let (handler, ledger, _wallet) = handler_with_wallet("bcrt1qreceive");

        handler.handle(&payout_settled_event(1_200)).await.unwrap();
        let recorded = ledger.find_by_hash("payout-txid").await.unwrap();
        assert!(recorded.is_some());
    }

    #[tokio::test]
    async fn payout_with_matching_estimate_books_nothing() {
        let (handler, ledger, _wallet) = handler_with_wallet("bcrt1qreceive");

        handler.handle(&payout_settled_event(1_000)).await.unwrap();
        assert!(ledger.find_by_hash("payout-txid").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_payout_estimate_is_skipped() {
        let (handler, ledger, _wallet) = handler_with_wallet("bcrt1qreceive");

        let event = BriaEvent {
            payload: BriaPayload::PayoutSettled {
                id: PayoutId::new("unknown-payout"),
                satoshis: BtcPaymentAmount::new(1),
                proportional_fee: BtcPaymentAmount::new(10),
                tx_id: OnChainTxHash::new("other-txid"),
                address: OnChainAddress::new("bcrt1qdest"),
            },
            augmentation: None,
            sequence: 4,
        };
        handler.handle(&event).await.unwrap();
        assert!(ledger.find_by_hash("other-txid").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lifecycle_events_have_no_ledger_effect() {
        let (handler, ledger, _wallet) = handler_with_wallet("bcrt1qreceive");

        for payload in [
            BriaPayload::PayoutSubmitted {
                id: PayoutId::new("p"),
                satoshis: BtcPaymentAmount::new(1),
            },
            BriaPayload::PayoutCommitted {
                id: PayoutId::new("p"),
                satoshis: BtcPaymentAmount::new(1),
            },
        ] {
            handler
                .handle(&BriaEvent {
                    payload,
                    augmentation: None,
                    sequence: 9,
                })
                .await
                .unwrap();
        }
        assert!(ledger.find_by_hash("txid-settled").await.unwrap().is_none());
    }
}
