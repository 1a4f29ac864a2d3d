//! Custody of pooled funds.
//!
//! The ledger never moves value itself: claims and refunds ask a [`Treasury`]
//! to pay an account out of custody, and only commit their bookkeeping once
//! the transfer has succeeded.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{AccountId, Amount};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransferError {
    #[error("recipient {account} rejected the transfer: {reason}")]
    Rejected { account: AccountId, reason: String },

    #[error("treasury unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Treasury: Send + Sync {
    /// Pay `amount` out of custody to `to`.
    async fn transfer(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError>;
}

#[async_trait]
impl<T: Treasury + ?Sized> Treasury for Arc<T> {
    async fn transfer(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        (**self).transfer(to, amount).await
    }
}

#[derive(Debug, Default)]
struct Payouts {
    balances: BTreeMap<AccountId, Amount>,
    rejecting: BTreeSet<AccountId>,
    transfers: Vec<(AccountId, Amount)>,
}

/// In-process treasury that credits payouts to in-memory balances.
///
/// Accounts can be marked as rejecting to exercise failed transfers.
/// Clones share the same books.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTreasury {
    inner: Arc<Mutex<Payouts>>,
}

impl InMemoryTreasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future transfer to `account` fail.
    pub fn reject(&self, account: &AccountId) {
        if let Ok(mut payouts) = self.inner.lock() {
            payouts.rejecting.insert(account.clone());
        }
    }

    pub fn accept(&self, account: &AccountId) {
        if let Ok(mut payouts) = self.inner.lock() {
            payouts.rejecting.remove(account);
        }
    }

    /// Total paid out to `account` so far.
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.inner
            .lock()
            .ok()
            .and_then(|payouts| payouts.balances.get(account).copied())
            .unwrap_or_default()
    }

    /// Every successful transfer, in order.
    pub fn transfers(&self) -> Vec<(AccountId, Amount)> {
        self.inner
            .lock()
            .map(|payouts| payouts.transfers.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Treasury for InMemoryTreasury {
    async fn transfer(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let mut payouts = self
            .inner
            .lock()
            .map_err(|_| TransferError::Unavailable("treasury books poisoned".to_string()))?;

        if payouts.rejecting.contains(to) {
            return Err(TransferError::Rejected {
                account: to.clone(),
                reason: "recipient does not accept funds".to_string(),
            });
        }

        let balance = payouts.balances.entry(to.clone()).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected {
                account: to.clone(),
                reason: "recipient balance overflow".to_string(),
            })?;
        payouts.transfers.push((to.clone(), amount));
        Ok(())
    }
}
