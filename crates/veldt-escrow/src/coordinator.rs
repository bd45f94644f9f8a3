//! Escrow operation coordinator.
//!
//! Every state-changing flow runs validate → external transfer →
//! infallible mutation: all fallible checks (argument validation, lock
//! state, ledger clock and catch-up budget) happen before the collateral
//! moves, and everything after the transfer is saturating/clamped
//! arithmetic that cannot fail. A rejected operation therefore leaves
//! locks, ledgers, schedule, and totals untouched.

use std::sync::Arc;

use tracing::debug;
use veldt_core::constants::{align_period, MAX_LOCK_SECS};
use veldt_core::error::{EscrowError, LedgerError, LockError, QueryError};
use veldt_core::events::{EscrowEvent, LockChangeKind};
use veldt_core::traits::{CollateralAsset, NotificationSink};
use veldt_core::types::{AccountId, Lock, LockState, Moment};
use veldt_ledger::{AdvanceOutcome, LedgerBook};

use crate::lock::LockStore;

/// The serializable escrow state: locks, curves, schedule, totals.
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct EscrowState {
    locks: LockStore,
    book: LedgerBook,
    total_locked: u64,
}

/// The escrow ledger: state plus injected collaborators.
pub struct EscrowLedger {
    state: EscrowState,
    collateral: Arc<dyn CollateralAsset>,
    events: Arc<dyn NotificationSink>,
}

impl EscrowLedger {
    /// A fresh escrow over the given collaborators.
    pub fn new(collateral: Arc<dyn CollateralAsset>, events: Arc<dyn NotificationSink>) -> Self {
        Self {
            state: EscrowState::default(),
            collateral,
            events,
        }
    }

    /// The account's current lock record.
    pub fn lock_of(&self, who: &AccountId) -> Lock {
        self.state.locks.get(who)
    }

    /// Total collateral currently deposited across all accounts.
    pub fn total_locked(&self) -> u64 {
        self.state.total_locked
    }

    /// Read access to the checkpoint book.
    pub fn book(&self) -> &LedgerBook {
        &self.state.book
    }

    /// Current voting power of `who` at `now`.
    pub fn balance_of(&self, who: &AccountId, now: u64) -> u64 {
        self.state.book.balance_of(who, now)
    }

    /// Voting power of `who` at a past block height.
    ///
    /// # Errors
    ///
    /// [`QueryError::BlockOutOfRange`] when the block exceeds `at.block`.
    pub fn balance_of_at(
        &self,
        who: &AccountId,
        block: u64,
        at: Moment,
    ) -> Result<u64, QueryError> {
        self.state.book.balance_of_at(who, block, at)
    }

    /// Current total voting power at `at.ts`.
    pub fn total_supply(&self, at: Moment) -> u64 {
        self.state.book.total_supply(at)
    }

    /// Total voting power at a past block height.
    ///
    /// # Errors
    ///
    /// [`QueryError::BlockOutOfRange`] when the block exceeds `at.block`.
    pub fn total_supply_at_block(&self, block: u64, at: Moment) -> Result<u64, QueryError> {
        self.state.book.total_supply_at_block(block, at)
    }

    /// Explicit global catch-up. Anyone may call this, any number of
    /// times; it only advances checkpoint bookkeeping.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ClockRegression`] on a non-monotonic reading.
    pub fn checkpoint(&mut self, at: Moment) -> Result<AdvanceOutcome, EscrowError> {
        Ok(self.state.book.checkpoint_global(at)?)
    }

    /// Create a new lock: deposit `amount` until `unlock_time` (aligned
    /// down to the period).
    ///
    /// # Errors
    ///
    /// - [`LockError::ZeroAmount`], [`LockError::LockExists`],
    ///   [`LockError::UnlockInPast`], [`LockError::UnlockTooFar`]
    /// - [`LedgerError`] when the clock regressed or the ledger needs an
    ///   explicit catch-up first
    /// - [`CollateralError`](veldt_core::error::CollateralError) from the
    ///   failed pull, with zero state mutation
    pub fn create_lock(
        &mut self,
        who: &AccountId,
        amount: u64,
        unlock_time: u64,
        at: Moment,
    ) -> Result<(), EscrowError> {
        if amount == 0 {
            return Err(LockError::ZeroAmount.into());
        }
        let old = self.state.locks.get(who);
        if old.amount > 0 {
            return Err(LockError::LockExists.into());
        }
        let end = align_period(unlock_time);
        if end <= at.ts {
            return Err(LockError::UnlockInPast { requested: end, now: at.ts }.into());
        }
        if end > at.ts + MAX_LOCK_SECS {
            return Err(LockError::UnlockTooFar { requested: end, max: at.ts + MAX_LOCK_SECS }.into());
        }
        let new_total = self
            .state
            .total_locked
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.state.book.ready_for(at)?;

        self.collateral.transfer_from(who, amount)?;

        let new = Lock { amount, end };
        self.state.book.apply_lock_change(who, old, new, at)?;
        self.state.locks.set(who, new);
        let prev_total = self.state.total_locked;
        self.state.total_locked = new_total;

        debug!(%who, amount, end, "created lock");
        self.events.notify(&EscrowEvent::Deposit {
            who: *who,
            amount,
            end,
            kind: LockChangeKind::Create,
            ts: at.ts,
        });
        self.events.notify(&EscrowEvent::SupplyChange { prev: prev_total, next: new_total });
        Ok(())
    }

    /// Add collateral to the caller's own active lock.
    ///
    /// # Errors
    ///
    /// As [`deposit_for`](Self::deposit_for) with the payer being `who`.
    pub fn increase_amount(
        &mut self,
        who: &AccountId,
        amount: u64,
        at: Moment,
    ) -> Result<(), EscrowError> {
        self.deposit_into_active(who, who, amount, LockChangeKind::IncreaseAmount, at)
    }

    /// Add collateral to `who`'s active lock, pulled from `payer`.
    ///
    /// # Errors
    ///
    /// - [`LockError::ZeroAmount`], [`LockError::NoLock`],
    ///   [`LockError::LockExpired`]
    /// - ledger and collateral errors as for
    ///   [`create_lock`](Self::create_lock)
    pub fn deposit_for(
        &mut self,
        payer: &AccountId,
        who: &AccountId,
        amount: u64,
        at: Moment,
    ) -> Result<(), EscrowError> {
        self.deposit_into_active(payer, who, amount, LockChangeKind::DepositFor, at)
    }

    fn deposit_into_active(
        &mut self,
        payer: &AccountId,
        who: &AccountId,
        amount: u64,
        kind: LockChangeKind,
        at: Moment,
    ) -> Result<(), EscrowError> {
        if amount == 0 {
            return Err(LockError::ZeroAmount.into());
        }
        let old = self.state.locks.get(who);
        match old.state(at.ts) {
            LockState::None => return Err(LockError::NoLock.into()),
            LockState::Expired => {
                return Err(LockError::LockExpired { end: old.end, now: at.ts }.into());
            }
            LockState::Active => {}
        }
        let new_amount = old
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let new_total = self
            .state
            .total_locked
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.state.book.ready_for(at)?;

        self.collateral.transfer_from(payer, amount)?;

        let new = Lock { amount: new_amount, end: old.end };
        self.state.book.apply_lock_change(who, old, new, at)?;
        self.state.locks.set(who, new);
        let prev_total = self.state.total_locked;
        self.state.total_locked = new_total;

        debug!(%who, %payer, amount, total = new_amount, "increased lock amount");
        self.events.notify(&EscrowEvent::Deposit {
            who: *who,
            amount,
            end: new.end,
            kind,
            ts: at.ts,
        });
        self.events.notify(&EscrowEvent::SupplyChange { prev: prev_total, next: new_total });
        Ok(())
    }

    /// Push an active lock's expiry further out; the amount is unchanged
    /// and no collateral moves.
    ///
    /// # Errors
    ///
    /// - [`LockError::NoLock`], [`LockError::LockExpired`]
    /// - [`LockError::UnlockNotExtended`] unless the aligned new end is
    ///   strictly beyond the current one
    /// - [`LockError::UnlockTooFar`] beyond the maximum duration
    pub fn increase_unlock_time(
        &mut self,
        who: &AccountId,
        unlock_time: u64,
        at: Moment,
    ) -> Result<(), EscrowError> {
        let old = self.state.locks.get(who);
        match old.state(at.ts) {
            LockState::None => return Err(LockError::NoLock.into()),
            LockState::Expired => {
                return Err(LockError::LockExpired { end: old.end, now: at.ts }.into());
            }
            LockState::Active => {}
        }
        let end = align_period(unlock_time);
        if end <= old.end {
            return Err(LockError::UnlockNotExtended { requested: end, current: old.end }.into());
        }
        if end > at.ts + MAX_LOCK_SECS {
            return Err(LockError::UnlockTooFar { requested: end, max: at.ts + MAX_LOCK_SECS }.into());
        }
        self.state.book.ready_for(at)?;

        let new = Lock { amount: old.amount, end };
        self.state.book.apply_lock_change(who, old, new, at)?;
        self.state.locks.set(who, new);

        debug!(%who, end, "extended lock");
        self.events.notify(&EscrowEvent::Deposit {
            who: *who,
            amount: 0,
            end,
            kind: LockChangeKind::IncreaseTime,
            ts: at.ts,
        });
        Ok(())
    }

    /// Re-commit an expired, unwithdrawn lock for a new duration,
    /// recomputing its curve from scratch.
    ///
    /// The recomputed voting power must cover the account's currently
    /// held balance; a shortfall is a hard rejection, never a silent
    /// clamp, since clamping would understate power against collateral
    /// already committed.
    ///
    /// # Errors
    ///
    /// - [`LockError::NoLock`], [`LockError::LockNotExpired`]
    /// - [`LockError::UnlockInPast`], [`LockError::UnlockTooFar`]
    /// - [`LockError::PowerShortfall`] on the guard above
    pub fn relock(
        &mut self,
        who: &AccountId,
        unlock_time: u64,
        at: Moment,
    ) -> Result<(), EscrowError> {
        let old = self.state.locks.get(who);
        match old.state(at.ts) {
            LockState::None => return Err(LockError::NoLock.into()),
            LockState::Active => {
                return Err(LockError::LockNotExpired { end: old.end, now: at.ts }.into());
            }
            LockState::Expired => {}
        }
        let end = align_period(unlock_time);
        if end <= at.ts {
            return Err(LockError::UnlockInPast { requested: end, now: at.ts }.into());
        }
        if end > at.ts + MAX_LOCK_SECS {
            return Err(LockError::UnlockTooFar { requested: end, max: at.ts + MAX_LOCK_SECS }.into());
        }
        let new = Lock { amount: old.amount, end };
        let recomputed = new.bias_at(at.ts).min(u64::MAX as i128) as u64;
        let held = self.state.book.balance_of(who, at.ts);
        if recomputed < held {
            return Err(LockError::PowerShortfall { held, recomputed }.into());
        }
        self.state.book.ready_for(at)?;

        self.state.book.apply_lock_change(who, old, new, at)?;
        self.state.locks.set(who, new);

        debug!(%who, amount = new.amount, end, "relocked expired lock");
        self.events.notify(&EscrowEvent::Deposit {
            who: *who,
            amount: new.amount,
            end,
            kind: LockChangeKind::Relock,
            ts: at.ts,
        });
        Ok(())
    }

    /// Withdraw the collateral of an expired lock. Returns the amount
    /// released.
    ///
    /// # Errors
    ///
    /// - [`LockError::NoLock`], [`LockError::LockNotExpired`]
    /// - ledger errors as for the other operations
    /// - [`CollateralError`](veldt_core::error::CollateralError) from the
    ///   failed release, with zero state mutation
    pub fn withdraw(&mut self, who: &AccountId, at: Moment) -> Result<u64, EscrowError> {
        let old = self.state.locks.get(who);
        if old.amount == 0 {
            return Err(LockError::NoLock.into());
        }
        if at.ts < old.end {
            return Err(LockError::LockNotExpired { end: old.end, now: at.ts }.into());
        }
        self.state.book.ready_for(at)?;

        self.collateral.transfer_to(who, old.amount)?;

        self.state.book.apply_lock_change(who, old, Lock::NONE, at)?;
        self.state.locks.clear(who);
        let prev_total = self.state.total_locked;
        self.state.total_locked = prev_total.saturating_sub(old.amount);

        debug!(%who, amount = old.amount, "withdrew collateral");
        self.events.notify(&EscrowEvent::Withdraw { who: *who, amount: old.amount, ts: at.ts });
        self.events.notify(&EscrowEvent::SupplyChange {
            prev: prev_total,
            next: self.state.total_locked,
        });
        Ok(old.amount)
    }

    /// Deterministic encoding of the full escrow state.
    ///
    /// # Errors
    ///
    /// [`LedgerError::SnapshotEncoding`] on encoder failure.
    pub fn snapshot(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::encode_to_vec(&self.state, bincode::config::standard())
            .map_err(|e| LedgerError::SnapshotEncoding(e.to_string()))
    }

    /// Rebuild an escrow from a snapshot and fresh collaborators.
    ///
    /// # Errors
    ///
    /// [`LedgerError::SnapshotEncoding`] on a malformed snapshot.
    pub fn restore(
        bytes: &[u8],
        collateral: Arc<dyn CollateralAsset>,
        events: Arc<dyn NotificationSink>,
    ) -> Result<Self, LedgerError> {
        let (state, _) = bincode::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| LedgerError::SnapshotEncoding(e.to_string()))?;
        Ok(Self { state, collateral, events })
    }
}
