//! Ledger facade
//!
//! Orchestrates fee arithmetic, entry building, atomic persistence, and the
//! off-ledger correlation metadata that lets later events for the same
//! payment hash or tx hash find the entry again.
//!
//! Either the whole operation commits (entry + metadata) or it reports a
//! typed error. Because the metadata write is replay-tolerant, a caller that
//! observed a failure after the entry persisted can safely retry.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::accounts::{StaticAccountIds, WalletDescriptor};
use crate::amount::AmountCalculator;
use crate::builder::{AmountsWithFees, BankFee, EntryBuilder, EntryBuilderConfig};
use crate::entry::{LedgerEntry, TxMetadata};
use crate::fee_builder::{FeeOnlyEntryBuilder, FeeOnlyEntryBuilderConfig};
use crate::storage::{
    metadata_keys, LedgerStore, LedgerTransaction, TransactionMetadataRecord,
    TransactionMetadataRepository,
};
use crate::types::{BtcPaymentAmount, PaymentAmounts};
use crate::Result;

/// Rail a payment settles over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRail {
    /// Lightning network
    Lightning,
    /// Bitcoin on-chain
    OnChain,
}

/// Arguments for [`Ledger::record_receive`]
#[derive(Debug)]
pub struct RecordReceiveArgs {
    /// Entry description
    pub description: String,
    /// Rail the funds arrived over
    pub rail: PaymentRail,
    /// Receiving wallet
    pub recipient: WalletDescriptor,
    /// Amount credited to the receiver, net of fees
    pub amount_to_credit: PaymentAmounts,
    /// Bank fee withheld from the receiver; zero when absent
    pub bank_fee: Option<PaymentAmounts>,
    /// Base metadata stamped on every posting
    pub metadata: TxMetadata,
    /// Extra metadata for the recipient's posting
    pub additional_credit_metadata: TxMetadata,
    /// Extra metadata for system-account postings
    pub additional_internal_metadata: TxMetadata,
    /// Payment hash or on-chain tx hash correlating later events
    pub correlation_hash: Option<String>,
}

/// Arguments for [`Ledger::record_send`]
#[derive(Debug)]
pub struct RecordSendArgs {
    /// Entry description
    pub description: String,
    /// Rail the funds leave over
    pub rail: PaymentRail,
    /// Sending wallet
    pub sender: WalletDescriptor,
    /// Principal, excluding fees
    pub amount: PaymentAmounts,
    /// Protocol (network) fee, paid out through the rail
    pub protocol_fee: PaymentAmounts,
    /// Bank fee retained by the platform; zero when absent
    pub bank_fee: Option<PaymentAmounts>,
    /// Base metadata stamped on every posting
    pub metadata: TxMetadata,
    /// Extra metadata for the sender's posting
    pub additional_debit_metadata: TxMetadata,
    /// Extra metadata for system-account postings
    pub additional_internal_metadata: TxMetadata,
    /// Payment hash or on-chain tx hash correlating later events
    pub correlation_hash: Option<String>,
}

/// Arguments for [`Ledger::record_intraledger`]
#[derive(Debug)]
pub struct RecordIntraledgerArgs {
    /// Entry description
    pub description: String,
    /// Sending wallet
    pub sender: WalletDescriptor,
    /// Receiving wallet
    pub recipient: WalletDescriptor,
    /// Amount moved; both legs when the wallets differ in currency
    pub amount: PaymentAmounts,
    /// Base metadata stamped on every posting
    pub metadata: TxMetadata,
    /// Extra metadata for the sender's posting
    pub additional_debit_metadata: TxMetadata,
    /// Extra metadata for the recipient's posting
    pub additional_credit_metadata: TxMetadata,
    /// Extra metadata for system-account postings
    pub additional_internal_metadata: TxMetadata,
    /// Correlation id for intraledger lookups
    pub correlation_hash: Option<String>,
}

/// Arguments for [`Ledger::record_receive_fee_reconciliation`]
#[derive(Debug)]
pub struct RecordFeeReconciliationArgs {
    /// Fee estimated when the payout was queued
    pub estimated_fee: BtcPaymentAmount,
    /// Fee actually charged on broadcast/settlement
    pub actual_fee: BtcPaymentAmount,
    /// Metadata stamped on both postings
    pub metadata: TxMetadata,
    /// On-chain tx hash of the reconciled payout
    pub correlation_hash: Option<String>,
}

/// The ledger facade
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    tx_metadata: Arc<dyn TransactionMetadataRepository>,
    static_account_ids: StaticAccountIds,
    calc: AmountCalculator,
}

impl Ledger {
    /// Create a facade over a store and metadata repository.
    ///
    /// `static_account_ids` must have been resolved (fail-closed) at startup.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        tx_metadata: Arc<dyn TransactionMetadataRepository>,
        static_account_ids: StaticAccountIds,
    ) -> Self {
        Self {
            store,
            tx_metadata,
            static_account_ids,
            calc: AmountCalculator::new(),
        }
    }

    /// Resolved static system accounts
    pub fn static_account_ids(&self) -> &StaticAccountIds {
        &self.static_account_ids
    }

    /// Record funds received over a rail into a wallet.
    pub async fn record_receive(
        &self,
        args: RecordReceiveArgs,
    ) -> Result<Vec<LedgerTransaction>> {
        let fee = args.bank_fee.unwrap_or(PaymentAmounts::ZERO);
        let amount_with_fees = AmountsWithFees {
            btc_with_fees: self.calc.add(args.amount_to_credit.btc, fee.btc)?,
            usd_with_fees: self.calc.add(args.amount_to_credit.usd, fee.usd)?,
        };

        let metadata = stamp_amounts(args.metadata, args.amount_to_credit, fee);
        let builder = EntryBuilder::new(EntryBuilderConfig {
            static_account_ids: self.static_account_ids,
            entry: LedgerEntry::new(args.description),
            metadata,
            additional_internal_metadata: args.additional_internal_metadata,
        })
        .with_total_amount(amount_with_fees)
        .with_bank_fee(BankFee {
            btc_bank_fee: fee.btc,
            usd_bank_fee: fee.usd,
        })?;

        let debited = match args.rail {
            PaymentRail::Lightning => builder.debit_lnd(),
            PaymentRail::OnChain => builder.debit_on_chain(),
        };
        let entry = debited.credit_account(
            args.recipient.to_ledger_account_descriptor(),
            args.additional_credit_metadata,
        );

        info!(
            recipient = %args.recipient.id,
            sats = args.amount_to_credit.btc.amount(),
            "recording receive"
        );
        self.persist(entry, args.correlation_hash).await
    }

    /// Record funds sent from a wallet out over a rail.
    pub async fn record_send(&self, args: RecordSendArgs) -> Result<Vec<LedgerTransaction>> {
        let bank_fee = args.bank_fee.unwrap_or(PaymentAmounts::ZERO);
        let with_protocol = PaymentAmounts {
            btc: self.calc.add(args.amount.btc, args.protocol_fee.btc)?,
            usd: self.calc.add(args.amount.usd, args.protocol_fee.usd)?,
        };
        let amount_with_fees = AmountsWithFees {
            btc_with_fees: self.calc.add(with_protocol.btc, bank_fee.btc)?,
            usd_with_fees: self.calc.add(with_protocol.usd, bank_fee.usd)?,
        };

        let metadata = stamp_amounts(args.metadata, args.amount, args.protocol_fee);
        let credited = EntryBuilder::new(EntryBuilderConfig {
            static_account_ids: self.static_account_ids,
            entry: LedgerEntry::new(args.description),
            metadata,
            additional_internal_metadata: args.additional_internal_metadata,
        })
        .with_total_amount(amount_with_fees)
        .with_bank_fee(BankFee {
            btc_bank_fee: bank_fee.btc,
            usd_bank_fee: bank_fee.usd,
        })?
        .debit_account(
            args.sender.to_ledger_account_descriptor(),
            args.additional_debit_metadata,
        );

        let entry = match args.rail {
            PaymentRail::Lightning => credited.credit_off_chain(),
            PaymentRail::OnChain => credited.credit_on_chain(),
        };

        info!(
            sender = %args.sender.id,
            sats = args.amount.btc.amount(),
            "recording send"
        );
        self.persist(entry, args.correlation_hash).await
    }

    /// Record a transfer between two wallets inside the ledger.
    pub async fn record_intraledger(
        &self,
        args: RecordIntraledgerArgs,
    ) -> Result<Vec<LedgerTransaction>> {
        let metadata = stamp_amounts(args.metadata, args.amount, PaymentAmounts::ZERO);
        let entry = EntryBuilder::new(EntryBuilderConfig {
            static_account_ids: self.static_account_ids,
            entry: LedgerEntry::new(args.description),
            metadata,
            additional_internal_metadata: args.additional_internal_metadata,
        })
        .with_total_amount(AmountsWithFees {
            btc_with_fees: args.amount.btc,
            usd_with_fees: args.amount.usd,
        })
        .with_bank_fee(BankFee::ZERO)?
        .debit_account(
            args.sender.to_ledger_account_descriptor(),
            args.additional_debit_metadata,
        )
        .credit_account(
            args.recipient.to_ledger_account_descriptor(),
            args.additional_credit_metadata,
        );

        info!(
            sender = %args.sender.id,
            recipient = %args.recipient.id,
            "recording intraledger transfer"
        );
        self.persist(entry, args.correlation_hash).await
    }

    /// Book the signed difference between an estimated and an actual on-chain
    /// fee. Equal fees book nothing.
    pub async fn record_receive_fee_reconciliation(
        &self,
        args: RecordFeeReconciliationArgs,
    ) -> Result<Vec<LedgerTransaction>> {
        let (estimated, actual) = (args.estimated_fee, args.actual_fee);
        if estimated == actual {
            return Ok(Vec::new());
        }

        let entry = if actual.amount() > estimated.amount() {
            let difference = self.calc.sub(actual, estimated)?;
            FeeOnlyEntryBuilder::new(FeeOnlyEntryBuilderConfig {
                static_account_ids: self.static_account_ids,
                entry: LedgerEntry::new(""),
                metadata: args.metadata,
                btc_fee: difference,
            })
            .debit_bank_owner()
            .credit_on_chain()
        } else {
            let difference = self.calc.sub(estimated, actual)?;
            FeeOnlyEntryBuilder::new(FeeOnlyEntryBuilderConfig {
                static_account_ids: self.static_account_ids,
                entry: LedgerEntry::new(""),
                metadata: args.metadata,
                btc_fee: difference,
            })
            .debit_on_chain()
            .credit_bank_owner()
        };

        info!(
            estimated = estimated.amount(),
            actual = actual.amount(),
            "recording fee reconciliation"
        );
        self.persist(entry, args.correlation_hash).await
    }

    /// Find the off-ledger metadata recorded for a correlation hash
    pub async fn find_by_hash(&self, hash: &str) -> Result<Option<TransactionMetadataRecord>> {
        self.tx_metadata.find_by_hash(hash).await
    }

    /// Fetch a persisted ledger row's metadata record by row id
    pub async fn find_metadata_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<TransactionMetadataRecord>> {
        self.tx_metadata.find_by_id(id).await
    }

    async fn persist(
        &self,
        entry: LedgerEntry,
        correlation_hash: Option<String>,
    ) -> Result<Vec<LedgerTransaction>> {
        let rows = self.store.persist_entry(entry).await?;

        let records = rows
            .iter()
            .map(|row| TransactionMetadataRecord {
                id: row.id,
                hash: correlation_hash.clone(),
            })
            .collect();
        self.tx_metadata.persist_all(records).await?;

        Ok(rows)
    }
}

fn stamp_amounts(
    mut metadata: TxMetadata,
    amount: PaymentAmounts,
    fee: PaymentAmounts,
) -> TxMetadata {
    metadata.insert(
        metadata_keys::SATS_AMOUNT.to_string(),
        amount.btc.amount().into(),
    );
    metadata.insert(
        metadata_keys::CENTS_AMOUNT.to_string(),
        amount.usd.amount().into(),
    );
    metadata.insert(metadata_keys::SATS_FEE.to_string(), fee.btc.amount().into());
    metadata.insert(
        metadata_keys::CENTS_FEE.to_string(),
        fee.usd.amount().into(),
    );
    metadata
}
