//! Structured events emitted by the escrow coordinator.
//!
//! Events are fire-and-forget notifications for external observers
//! (indexers, dashboards); the ledger never reads them back.

use serde::{Deserialize, Serialize};

use crate::types::AccountId;

/// Which lock operation produced a deposit event.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub enum LockChangeKind {
    /// New lock created.
    Create,
    /// Collateral added to an active lock by its owner.
    IncreaseAmount,
    /// Expiry pushed further out, amount unchanged.
    IncreaseTime,
    /// Collateral added to an active lock on behalf of its owner.
    DepositFor,
    /// Expired lock re-committed for a new duration.
    Relock,
}

/// A structured escrow event.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub enum EscrowEvent {
    /// Collateral entered or re-committed to the escrow.
    Deposit {
        who: AccountId,
        amount: u64,
        end: u64,
        kind: LockChangeKind,
        ts: u64,
    },
    /// Collateral left the escrow.
    Withdraw { who: AccountId, amount: u64, ts: u64 },
    /// Total locked collateral changed.
    SupplyChange { prev: u64, next: u64 },
}
