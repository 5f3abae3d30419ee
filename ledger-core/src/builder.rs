//! Staged builder for balanced ledger entries
//!
//! The builder walks a fixed stage sequence — total amount, bank fee, debit
//! side, credit side — and each stage is its own type exposing only the next
//! legal calls, so an out-of-order invocation is a compile error rather than
//! a runtime check. The terminal credit call returns the finished entry.
//!
//! Posting rules:
//! - the debit side is debited the gross (with-fees) amount in its currency
//! - a non-zero bank fee is credited to the bank owner in BTC
//! - the credit side receives the net amount in its currency
//! - cross-currency entries swap value through the dealer accounts, and a
//!   same-currency USD entry with a fee swaps just the fee, so every
//!   currency stays balanced

use crate::accounts::{LedgerAccountDescriptor, LedgerAccountId, StaticAccountIds};
use crate::entry::{merged_metadata, LedgerEntry, TxMetadata};
use crate::types::{BtcPaymentAmount, UsdPaymentAmount, WalletCurrency};
use crate::{Error, Result};

/// Gross amounts moved by the entry, in both currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountsWithFees {
    /// Satoshi leg, fees included
    pub btc_with_fees: BtcPaymentAmount,
    /// Cents leg, fees included
    pub usd_with_fees: UsdPaymentAmount,
}

/// Bank fee withheld from the credit side, in both currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankFee {
    /// Satoshi leg of the fee
    pub btc_bank_fee: BtcPaymentAmount,
    /// Cents leg of the fee
    pub usd_bank_fee: UsdPaymentAmount,
}

impl BankFee {
    /// No fee in either currency
    pub const ZERO: Self = Self {
        btc_bank_fee: BtcPaymentAmount::ZERO,
        usd_bank_fee: UsdPaymentAmount::ZERO,
    };
}

/// Inputs shared by every stage of the builder
#[derive(Debug)]
pub struct EntryBuilderConfig {
    /// Resolved static system accounts
    pub static_account_ids: StaticAccountIds,
    /// Entry scaffold the postings are added to
    pub entry: LedgerEntry,
    /// Base metadata stamped on every posting
    pub metadata: TxMetadata,
    /// Extra metadata stamped on system-account postings only
    pub additional_internal_metadata: TxMetadata,
}

struct BuilderState {
    accounts: StaticAccountIds,
    entry: LedgerEntry,
    metadata: TxMetadata,
    additional_internal_metadata: TxMetadata,
}

impl BuilderState {
    fn internal_metadata(&self) -> TxMetadata {
        merged_metadata(&self.metadata, &self.additional_internal_metadata)
    }

    fn account_metadata(&self, additional: &TxMetadata) -> TxMetadata {
        merged_metadata(&self.metadata, additional)
    }
}

/// Entry builder, configuration stage
pub struct EntryBuilder {
    state: BuilderState,
}

impl EntryBuilder {
    /// Start building an entry
    pub fn new(config: EntryBuilderConfig) -> Self {
        Self {
            state: BuilderState {
                accounts: config.static_account_ids,
                entry: config.entry,
                metadata: config.metadata,
                additional_internal_metadata: config.additional_internal_metadata,
            },
        }
    }

    /// Set the gross amounts the entry moves
    pub fn with_total_amount(self, amounts: AmountsWithFees) -> EntryBuilderFee {
        EntryBuilderFee {
            state: self.state,
            amounts,
        }
    }
}

/// Entry builder, bank-fee stage
pub struct EntryBuilderFee {
    state: BuilderState,
    amounts: AmountsWithFees,
}

impl EntryBuilderFee {
    /// Set the bank fee withheld from the credit side.
    ///
    /// Fails if the fee exceeds the gross amount in either currency.
    pub fn with_bank_fee(self, fee: BankFee) -> Result<EntryBuilderDebit> {
        if fee.btc_bank_fee.amount() > self.amounts.btc_with_fees.amount() {
            return Err(Error::FeeExceedsTotal {
                currency: WalletCurrency::Btc,
            });
        }
        if fee.usd_bank_fee.amount() > self.amounts.usd_with_fees.amount() {
            return Err(Error::FeeExceedsTotal {
                currency: WalletCurrency::Usd,
            });
        }
        Ok(EntryBuilderDebit {
            state: self.state,
            amounts: self.amounts,
            fee,
        })
    }
}

/// Entry builder, debit stage
pub struct EntryBuilderDebit {
    state: BuilderState,
    amounts: AmountsWithFees,
    fee: BankFee,
}

impl EntryBuilderDebit {
    /// Debit a customer account the gross amount in its own currency
    pub fn debit_account(
        mut self,
        descriptor: LedgerAccountDescriptor,
        additional_metadata: TxMetadata,
    ) -> EntryBuilderCredit {
        let metadata = self.state.account_metadata(&additional_metadata);
        let amount = match descriptor.currency {
            WalletCurrency::Btc => self.amounts.btc_with_fees.amount(),
            WalletCurrency::Usd => self.amounts.usd_with_fees.amount(),
        };
        self.state
            .entry
            .debit(descriptor.id, descriptor.currency, amount, metadata);
        self.into_credit(descriptor.currency)
    }

    /// Debit the Lightning node rail
    pub fn debit_lnd(self) -> EntryBuilderCredit {
        let account = self.state.accounts.lnd;
        self.debit_rail(account)
    }

    /// Debit the on-chain hot wallet rail
    pub fn debit_on_chain(self) -> EntryBuilderCredit {
        let account = self.state.accounts.on_chain;
        self.debit_rail(account)
    }

    /// Debit cold storage
    pub fn debit_cold_storage(self) -> EntryBuilderCredit {
        let account = self.state.accounts.cold_storage;
        self.debit_rail(account)
    }

    fn debit_rail(mut self, account: LedgerAccountId) -> EntryBuilderCredit {
        let metadata = self.state.internal_metadata();
        self.state.entry.debit(
            account,
            WalletCurrency::Btc,
            self.amounts.btc_with_fees.amount(),
            metadata,
        );
        self.into_credit(WalletCurrency::Btc)
    }

    fn into_credit(self, debit_currency: WalletCurrency) -> EntryBuilderCredit {
        EntryBuilderCredit {
            state: self.state,
            amounts: self.amounts,
            fee: self.fee,
            debit_currency,
        }
    }
}

/// Entry builder, credit stage
pub struct EntryBuilderCredit {
    state: BuilderState,
    amounts: AmountsWithFees,
    fee: BankFee,
    debit_currency: WalletCurrency,
}

impl EntryBuilderCredit {
    /// Credit a customer account the net amount in its own currency
    pub fn credit_account(
        self,
        descriptor: LedgerAccountDescriptor,
        additional_metadata: TxMetadata,
    ) -> LedgerEntry {
        self.build(descriptor.id, descriptor.currency, Some(additional_metadata))
    }

    /// Credit the Lightning node rail
    pub fn credit_off_chain(self) -> LedgerEntry {
        let account = self.state.accounts.lnd;
        self.build(account, WalletCurrency::Btc, None)
    }

    /// Credit the on-chain hot wallet rail
    pub fn credit_on_chain(self) -> LedgerEntry {
        let account = self.state.accounts.on_chain;
        self.build(account, WalletCurrency::Btc, None)
    }

    /// Credit cold storage
    pub fn credit_cold_storage(self) -> LedgerEntry {
        let account = self.state.accounts.cold_storage;
        self.build(account, WalletCurrency::Btc, None)
    }

    fn build(
        mut self,
        credit_account: LedgerAccountId,
        credit_currency: WalletCurrency,
        additional_metadata: Option<TxMetadata>,
    ) -> LedgerEntry {
        let internal = self.state.internal_metadata();
        let credit_metadata = match &additional_metadata {
            Some(additional) => self.state.account_metadata(additional),
            None => internal.clone(),
        };

        let btc_fee = self.fee.btc_bank_fee.amount();
        let usd_fee = self.fee.usd_bank_fee.amount();
        // fee <= gross was validated at the fee stage
        let btc_net = self.amounts.btc_with_fees.amount() - btc_fee;
        let usd_net = self.amounts.usd_with_fees.amount() - usd_fee;
        let btc_gross = self.amounts.btc_with_fees.amount();
        let usd_gross = self.amounts.usd_with_fees.amount();

        let accounts = self.state.accounts;
        let entry = &mut self.state.entry;

        if btc_fee > 0 {
            entry.credit(
                accounts.bank_owner,
                WalletCurrency::Btc,
                btc_fee,
                internal.clone(),
            );
        }

        match (self.debit_currency, credit_currency) {
            (WalletCurrency::Btc, WalletCurrency::Btc) => {
                entry.credit(credit_account, WalletCurrency::Btc, btc_net, credit_metadata);
            }
            (WalletCurrency::Btc, WalletCurrency::Usd) => {
                entry.credit(
                    accounts.dealer_btc,
                    WalletCurrency::Btc,
                    btc_net,
                    internal.clone(),
                );
                entry.debit(accounts.dealer_usd, WalletCurrency::Usd, usd_net, internal);
                entry.credit(credit_account, WalletCurrency::Usd, usd_net, credit_metadata);
            }
            (WalletCurrency::Usd, WalletCurrency::Btc) => {
                entry.credit(
                    accounts.dealer_usd,
                    WalletCurrency::Usd,
                    usd_gross,
                    internal.clone(),
                );
                entry.debit(accounts.dealer_btc, WalletCurrency::Btc, btc_gross, internal);
                entry.credit(credit_account, WalletCurrency::Btc, btc_net, credit_metadata);
            }
            (WalletCurrency::Usd, WalletCurrency::Usd) => {
                if btc_fee > 0 || usd_fee > 0 {
                    // the BTC fee credit needs a BTC debit; swap just the fee
                    entry.credit(
                        accounts.dealer_usd,
                        WalletCurrency::Usd,
                        usd_fee,
                        internal.clone(),
                    );
                    entry.debit(accounts.dealer_btc, WalletCurrency::Btc, btc_fee, internal);
                }
                entry.credit(credit_account, WalletCurrency::Usd, usd_net, credit_metadata);
            }
        }

        self.state.entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{LedgerAccountDescriptor, LedgerAccountId};
    use crate::entry::EntryDirection;

    fn accounts() -> StaticAccountIds {
        StaticAccountIds {
            bank_owner: LedgerAccountId::new(),
            dealer_btc: LedgerAccountId::new(),
            dealer_usd: LedgerAccountId::new(),
            lnd: LedgerAccountId::new(),
            on_chain: LedgerAccountId::new(),
            cold_storage: LedgerAccountId::new(),
        }
    }

    fn builder(accounts: StaticAccountIds) -> EntryBuilder {
        EntryBuilder::new(EntryBuilderConfig {
            static_account_ids: accounts,
            entry: LedgerEntry::new("test entry"),
            metadata: TxMetadata::new(),
            additional_internal_metadata: TxMetadata::new(),
        })
    }

    fn descriptor(currency: WalletCurrency) -> LedgerAccountDescriptor {
        LedgerAccountDescriptor {
            id: LedgerAccountId::new(),
            currency,
        }
    }

    fn amounts(btc: u64, usd: u64) -> AmountsWithFees {
        AmountsWithFees {
            btc_with_fees: BtcPaymentAmount::new(btc),
            usd_with_fees: UsdPaymentAmount::new(usd),
        }
    }

    fn fee(btc: u64, usd: u64) -> BankFee {
        BankFee {
            btc_bank_fee: BtcPaymentAmount::new(btc),
            usd_bank_fee: UsdPaymentAmount::new(usd),
        }
    }

    #[test]
    fn btc_receive_to_btc_wallet() {
        let accounts = accounts();
        let recipient = descriptor(WalletCurrency::Btc);

        let entry = builder(accounts)
            .with_total_amount(amounts(10_100, 500))
            .with_bank_fee(fee(100, 5))
            .unwrap()
            .debit_on_chain()
            .credit_account(recipient, TxMetadata::new());

        assert!(entry.is_balanced());
        let credit_to_recipient = entry
            .postings()
            .iter()
            .find(|p| p.account_id == recipient.id)
            .unwrap();
        assert_eq!(credit_to_recipient.amount, 10_000);
        assert_eq!(credit_to_recipient.direction, EntryDirection::Credit);

        let fee_posting = entry
            .postings()
            .iter()
            .find(|p| p.account_id == accounts.bank_owner)
            .unwrap();
        assert_eq!(fee_posting.amount, 100);
        assert_eq!(fee_posting.currency, WalletCurrency::Btc);
    }

    #[test]
    fn btc_receive_to_usd_wallet_swaps_through_dealer() {
        let accounts = accounts();
        let recipient = descriptor(WalletCurrency::Usd);

        let entry = builder(accounts)
            .with_total_amount(amounts(10_100, 505))
            .with_bank_fee(fee(100, 5))
            .unwrap()
            .debit_on_chain()
            .credit_account(recipient, TxMetadata::new());

        assert!(entry.is_balanced());
        let recipient_credit = entry
            .postings()
            .iter()
            .find(|p| p.account_id == recipient.id)
            .unwrap();
        assert_eq!(recipient_credit.amount, 500);
        assert_eq!(recipient_credit.currency, WalletCurrency::Usd);

        let dealer_btc_credit = entry
            .postings()
            .iter()
            .find(|p| p.account_id == accounts.dealer_btc)
            .unwrap();
        assert_eq!(dealer_btc_credit.amount, 10_000);
        assert_eq!(dealer_btc_credit.direction, EntryDirection::Credit);
    }

    #[test]
    fn usd_send_to_btc_rail_swaps_through_dealer() {
        let accounts = accounts();
        let sender = descriptor(WalletCurrency::Usd);

        let entry = builder(accounts)
            .with_total_amount(amounts(20_400, 1_020))
            .with_bank_fee(fee(400, 20))
            .unwrap()
            .debit_account(sender, TxMetadata::new())
            .credit_off_chain();

        assert!(entry.is_balanced());
        let sender_debit = entry
            .postings()
            .iter()
            .find(|p| p.account_id == sender.id)
            .unwrap();
        assert_eq!(sender_debit.amount, 1_020);
        assert_eq!(sender_debit.direction, EntryDirection::Debit);

        let rail_credit = entry
            .postings()
            .iter()
            .find(|p| p.account_id == accounts.lnd)
            .unwrap();
        assert_eq!(rail_credit.amount, 20_000);
    }

    #[test]
    fn usd_intraledger_with_fee_swaps_only_the_fee() {
        let accounts = accounts();
        let sender = descriptor(WalletCurrency::Usd);
        let recipient = descriptor(WalletCurrency::Usd);

        let entry = builder(accounts)
            .with_total_amount(amounts(2_020, 101))
            .with_bank_fee(fee(20, 1))
            .unwrap()
            .debit_account(sender, TxMetadata::new())
            .credit_account(recipient, TxMetadata::new());

        assert!(entry.is_balanced());
        let recipient_credit = entry
            .postings()
            .iter()
            .find(|p| p.account_id == recipient.id)
            .unwrap();
        assert_eq!(recipient_credit.amount, 100);
    }

    #[test]
    fn no_fee_entry_has_no_bank_owner_posting() {
        let accounts = accounts();
        let recipient = descriptor(WalletCurrency::Btc);

        let entry = builder(accounts)
            .with_total_amount(amounts(10_000, 500))
            .with_bank_fee(BankFee::ZERO)
            .unwrap()
            .debit_lnd()
            .credit_account(recipient, TxMetadata::new());

        assert!(entry.is_balanced());
        assert!(entry
            .postings()
            .iter()
            .all(|p| p.account_id != accounts.bank_owner));
    }

    #[test]
    fn fee_above_total_is_rejected() {
        let result = builder(accounts())
            .with_total_amount(amounts(100, 5))
            .with_bank_fee(fee(101, 0));
        assert!(matches!(
            result,
            Err(Error::FeeExceedsTotal {
                currency: WalletCurrency::Btc
            })
        ));
    }

    #[test]
    fn internal_metadata_only_lands_on_system_postings() {
        let accounts = accounts();
        let recipient = descriptor(WalletCurrency::Btc);

        let mut metadata = TxMetadata::new();
        metadata.insert("type".to_string(), "onchain_receipt".into());
        let mut internal = TxMetadata::new();
        internal.insert("display_currency".to_string(), "USD".into());
        let mut credit_extra = TxMetadata::new();
        credit_extra.insert("memo".to_string(), "hello".into());

        let entry = EntryBuilder::new(EntryBuilderConfig {
            static_account_ids: accounts,
            entry: LedgerEntry::new("metadata"),
            metadata,
            additional_internal_metadata: internal,
        })
        .with_total_amount(amounts(1_000, 50))
        .with_bank_fee(BankFee::ZERO)
        .unwrap()
        .debit_on_chain()
        .credit_account(recipient, credit_extra);

        let rail = entry
            .postings()
            .iter()
            .find(|p| p.account_id == accounts.on_chain)
            .unwrap();
        assert_eq!(rail.metadata["display_currency"], "USD");
        assert_eq!(rail.metadata["type"], "onchain_receipt");
        assert!(rail.metadata.get("memo").is_none());

        let credit = entry
            .postings()
            .iter()
            .find(|p| p.account_id == recipient.id)
            .unwrap();
        assert_eq!(credit.metadata["memo"], "hello");
        assert!(credit.metadata.get("display_currency").is_none());
    }

    proptest::proptest! {
        #[test]
        fn every_built_entry_is_balanced(
            btc_gross in 1u64..100_000_000,
            usd_gross in 1u64..5_000_000,
            btc_fee in 0u64..100_000,
            usd_fee in 0u64..5_000,
            debit_usd: bool,
            credit_usd: bool,
            debit_rail: bool,
            credit_rail: bool,
        ) {
            let btc_fee = btc_fee.min(btc_gross);
            let usd_fee = usd_fee.min(usd_gross);
            let accounts = accounts();

            let debit_stage = builder(accounts)
                .with_total_amount(amounts(btc_gross, usd_gross))
                .with_bank_fee(fee(btc_fee, usd_fee))
                .unwrap();

            let credit_stage = if debit_rail {
                debit_stage.debit_on_chain()
            } else {
                let currency = if debit_usd {
                    WalletCurrency::Usd
                } else {
                    WalletCurrency::Btc
                };
                debit_stage.debit_account(descriptor(currency), TxMetadata::new())
            };

            let entry = if credit_rail {
                credit_stage.credit_off_chain()
            } else {
                let currency = if credit_usd {
                    WalletCurrency::Usd
                } else {
                    WalletCurrency::Btc
                };
                credit_stage.credit_account(descriptor(currency), TxMetadata::new())
            };

            proptest::prop_assert!(entry.is_balanced(), "imbalance: {:?}", entry.first_imbalance());
        }
    }
}
