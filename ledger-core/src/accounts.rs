//! Ledger accounts and static system account resolution
//!
//! The platform owns a handful of fixed accounts (bank owner, dealers, the
//! Lightning and on-chain rails, cold storage). Their ids are resolved once
//! at startup through an [`AccountResolver`] and injected into the facade;
//! if any of them cannot be resolved the process must not come up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::{WalletCurrency, WalletId};
use crate::{Error, Result};

/// Opaque identifier of one ledger account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerAccountId(Uuid);

impl LedgerAccountId {
    /// Create a new random account id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LedgerAccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for LedgerAccountId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<WalletId> for LedgerAccountId {
    fn from(id: WalletId) -> Self {
        Self(*id.as_uuid())
    }
}

impl fmt::Display for LedgerAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A ledger account together with the currency it is denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccountDescriptor {
    /// Account id
    pub id: LedgerAccountId,
    /// Currency of every posting against this account
    pub currency: WalletCurrency,
}

/// A customer wallet as seen by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDescriptor {
    /// Wallet id; doubles as the wallet's ledger account id
    pub id: WalletId,
    /// Currency the wallet is denominated in
    pub currency: WalletCurrency,
}

impl WalletDescriptor {
    /// Ledger account descriptor backing this wallet
    pub fn to_ledger_account_descriptor(&self) -> LedgerAccountDescriptor {
        LedgerAccountDescriptor {
            id: LedgerAccountId::from(self.id),
            currency: self.currency,
        }
    }
}

/// Resolved ids of the static system accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticAccountIds {
    /// Bank owner account (collects bank fees)
    pub bank_owner: LedgerAccountId,
    /// BTC side of the dealer (absorbs cross-currency legs)
    pub dealer_btc: LedgerAccountId,
    /// USD side of the dealer
    pub dealer_usd: LedgerAccountId,
    /// Lightning node rail
    pub lnd: LedgerAccountId,
    /// On-chain hot wallet rail
    pub on_chain: LedgerAccountId,
    /// Cold storage
    pub cold_storage: LedgerAccountId,
}

/// Well-known names under which the static accounts are registered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticAccountNames {
    /// Bank owner account name
    pub bank_owner: String,
    /// BTC dealer account name
    pub dealer_btc: String,
    /// USD dealer account name
    pub dealer_usd: String,
    /// Lightning rail account name
    pub lnd: String,
    /// On-chain rail account name
    pub on_chain: String,
    /// Cold storage account name
    pub cold_storage: String,
}

impl Default for StaticAccountNames {
    fn default() -> Self {
        Self {
            bank_owner: "bank_owner".to_string(),
            dealer_btc: "dealer_btc".to_string(),
            dealer_usd: "dealer_usd".to_string(),
            lnd: "lnd".to_string(),
            on_chain: "on_chain".to_string(),
            cold_storage: "cold_storage".to_string(),
        }
    }
}

/// Lookup of a ledger account id by its registered name
#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// Resolve an account name, `None` if no such account exists
    async fn resolve(&self, name: &str) -> Result<Option<LedgerAccountId>>;
}

/// Resolve all static accounts, failing closed on any miss.
pub async fn resolve_static_account_ids(
    resolver: &dyn AccountResolver,
    names: &StaticAccountNames,
) -> Result<StaticAccountIds> {
    let resolve_one = |name: &str| {
        let name = name.to_string();
        async move {
            resolver
                .resolve(&name)
                .await?
                .ok_or_else(|| Error::StaticAccountResolution(name))
        }
    };

    Ok(StaticAccountIds {
        bank_owner: resolve_one(&names.bank_owner).await?,
        dealer_btc: resolve_one(&names.dealer_btc).await?,
        dealer_usd: resolve_one(&names.dealer_usd).await?,
        lnd: resolve_one(&names.lnd).await?,
        on_chain: resolve_one(&names.on_chain).await?,
        cold_storage: resolve_one(&names.cold_storage).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapResolver(HashMap<String, LedgerAccountId>);

    #[async_trait]
    impl AccountResolver for MapResolver {
        async fn resolve(&self, name: &str) -> Result<Option<LedgerAccountId>> {
            Ok(self.0.get(name).copied())
        }
    }

    fn full_resolver(names: &StaticAccountNames) -> MapResolver {
        let mut map = HashMap::new();
        for name in [
            &names.bank_owner,
            &names.dealer_btc,
            &names.dealer_usd,
            &names.lnd,
            &names.on_chain,
            &names.cold_storage,
        ] {
            map.insert(name.clone(), LedgerAccountId::new());
        }
        MapResolver(map)
    }

    #[tokio::test]
    async fn resolves_all_static_accounts() {
        let names = StaticAccountNames::default();
        let resolver = full_resolver(&names);

        let ids = resolve_static_account_ids(&resolver, &names).await.unwrap();
        assert_eq!(Some(&ids.bank_owner), resolver.0.get("bank_owner"));
        assert_eq!(Some(&ids.cold_storage), resolver.0.get("cold_storage"));
    }

    #[tokio::test]
    async fn fails_closed_on_missing_account() {
        let names = StaticAccountNames::default();
        let mut resolver = full_resolver(&names);
        resolver.0.remove("dealer_usd");

        let err = resolve_static_account_ids(&resolver, &names)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::StaticAccountResolution("dealer_usd".to_string())
        );
    }

    #[test]
    fn wallet_descriptor_maps_to_account_descriptor() {
        let wallet = WalletDescriptor {
            id: WalletId::new(),
            currency: WalletCurrency::Usd,
        };
        let descriptor = wallet.to_ledger_account_descriptor();
        assert_eq!(descriptor.id.as_uuid(), wallet.id.as_uuid());
        assert_eq!(descriptor.currency, WalletCurrency::Usd);
    }
}
