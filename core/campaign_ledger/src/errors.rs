//! Ledger error types.
//!
//! Every variant is a rejected operation: nothing was mutated and no
//! notification was published.

use thiserror::Error;

use crate::treasury::TransferError;
use crate::types::{Amount, CampaignId};

/// Broad class of a [`LedgerError`], for callers that branch on category.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The caller supplied bad input.
    Validation,
    /// The caller is not allowed to perform the operation.
    Authorization,
    /// The operation is not allowed at the current time.
    Timing,
    /// The campaign is in the wrong lifecycle state.
    State,
    /// Moving funds out of custody failed.
    Transfer,
    /// No campaign with the given identifier exists.
    NotFound,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("campaign goal must be greater than zero")]
    InvalidGoal,

    #[error("campaign duration must be a positive number of days")]
    InvalidDuration,

    #[error("contribution amount must be greater than zero")]
    ZeroContribution,

    #[error("amount overflows the campaign ledger")]
    AmountOverflow,

    #[error("caller is not the campaign creator")]
    NotCreator,

    #[error("campaign deadline has passed")]
    CampaignEnded,

    #[error("campaign deadline has not passed yet")]
    CampaignNotEnded,

    #[error("campaign is no longer open")]
    CampaignCompleted,

    #[error("campaign goal has not been reached")]
    GoalNotReached,

    #[error("campaign goal was reached; refunds are closed")]
    GoalWasReached,

    #[error("campaign funds were already claimed")]
    AlreadyClaimed,

    #[error("campaign pool is empty")]
    NothingToClaim,

    #[error("caller has no outstanding contribution")]
    NoContribution,

    #[error("balance of {balance} exceeds the {pooled} held in the pool")]
    PoolShortfall { balance: Amount, pooled: Amount },

    #[error("campaign {0} not found")]
    CampaignNotFound(CampaignId),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidGoal
            | LedgerError::InvalidDuration
            | LedgerError::ZeroContribution
            | LedgerError::AmountOverflow
            | LedgerError::InvalidSnapshot(_) => ErrorKind::Validation,
            LedgerError::NotCreator => ErrorKind::Authorization,
            LedgerError::CampaignEnded | LedgerError::CampaignNotEnded => ErrorKind::Timing,
            LedgerError::CampaignCompleted
            | LedgerError::GoalNotReached
            | LedgerError::GoalWasReached
            | LedgerError::AlreadyClaimed
            | LedgerError::NothingToClaim
            | LedgerError::NoContribution
            | LedgerError::PoolShortfall { .. } => ErrorKind::State,
            LedgerError::Transfer(_) => ErrorKind::Transfer,
            LedgerError::CampaignNotFound(_) => ErrorKind::NotFound,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
