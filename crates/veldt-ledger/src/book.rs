//! The ledger book: global and per-account decay curves.
//!
//! The global curve is advanced lazily, one aligned boundary at a time,
//! under a fixed per-call budget of [`MAX_CATCHUP_PERIODS`] boundaries.
//! A call that exhausts the budget leaves the book partially advanced;
//! the last appended checkpoint is the resume cursor and any subsequent
//! call continues from it. Checkpoints are immutable once appended.
//!
//! All bias/slope arithmetic is signed fixed-point with clamp-to-zero
//! after every update step; u128/i128 intermediates keep the block-rate
//! interpolation overflow-free.

use std::collections::HashMap;

use tracing::debug;
use veldt_core::constants::{
    align_period, BLOCK_RATE_PRECISION, MAX_CATCHUP_PERIODS, PERIOD_SECS,
};
use veldt_core::error::LedgerError;
use veldt_core::types::{AccountId, LedgerOwner, Lock, Moment, Point};

use crate::history::CheckpointList;
use crate::schedule::SlopeSchedule;

/// Outcome of one bounded advancement pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvanceOutcome {
    /// Boundary checkpoints appended by this pass.
    pub crossed: u32,
    /// Whether the curve reached the requested moment.
    pub caught_up: bool,
}

/// Global curve, per-account curves, and the slope schedule.
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct LedgerBook {
    pub(crate) global: CheckpointList,
    pub(crate) accounts: HashMap<AccountId, CheckpointList>,
    pub(crate) schedule: SlopeSchedule,
}

impl LedgerBook {
    /// An empty book: no checkpoints, no scheduled expiries.
    pub fn new() -> Self {
        Self::default()
    }

    /// The global checkpoint history.
    pub fn global(&self) -> &CheckpointList {
        &self.global
    }

    /// The slope schedule.
    pub fn schedule(&self) -> &SlopeSchedule {
        &self.schedule
    }

    /// One account's checkpoint history, if any operation touched it.
    pub fn account(&self, who: &AccountId) -> Option<&CheckpointList> {
        self.accounts.get(who)
    }

    /// Checkpoint history by owner. The global history always exists.
    pub fn ledger(&self, owner: LedgerOwner) -> Option<&CheckpointList> {
        match owner {
            LedgerOwner::Global => Some(&self.global),
            LedgerOwner::Account(id) => self.accounts.get(&id),
        }
    }

    /// Global epoch: number of global checkpoints.
    pub fn epoch(&self) -> u64 {
        self.global.epoch()
    }

    /// Per-account epoch: number of checkpoints for `who`.
    pub fn account_epoch(&self, who: &AccountId) -> u64 {
        self.accounts.get(who).map(CheckpointList::epoch).unwrap_or(0)
    }

    /// Aligned periods between the last global checkpoint and `at`.
    pub fn lag_periods(&self, at: Moment) -> u64 {
        match self.global.last() {
            None => 0,
            Some(p) => {
                align_period(at.ts).saturating_sub(align_period(p.ts)) / PERIOD_SECS
            }
        }
    }

    /// Verify that a single bounded pass can bring the curve to `at`,
    /// without mutating anything.
    ///
    /// Coordinators call this before any external side effect so that
    /// [`apply_lock_change`](Self::apply_lock_change) cannot fail
    /// afterwards.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ClockRegression`] or
    /// [`LedgerError::CatchUpRequired`], same as the write path.
    pub fn ready_for(&self, at: Moment) -> Result<(), LedgerError> {
        self.check_clock(at)?;
        let lag = self.lag_periods(at);
        // An unaligned target costs one extra iteration for the final
        // partial step.
        let budget = if at.ts == align_period(at.ts) {
            MAX_CATCHUP_PERIODS as u64
        } else {
            MAX_CATCHUP_PERIODS as u64 - 1
        };
        if lag > budget {
            return Err(LedgerError::CatchUpRequired { periods: lag });
        }
        Ok(())
    }

    /// Reject clock readings behind the last global checkpoint.
    fn check_clock(&self, at: Moment) -> Result<(), LedgerError> {
        if let Some(last) = self.global.last() {
            if at.ts < last.ts || at.block < last.block {
                return Err(LedgerError::ClockRegression {
                    last_ts: last.ts,
                    last_block: last.block,
                    ts: at.ts,
                    block: at.block,
                });
            }
        }
        Ok(())
    }

    /// Advance the global curve to `at` under the per-call budget.
    ///
    /// Appends one checkpoint per crossed boundary, subtracting that
    /// boundary's scheduled slope reduction and decaying the bias over
    /// the elapsed span, both clamped at zero. Boundary block heights are
    /// interpolated from the block/time rate between the last recorded
    /// checkpoint and the incoming reading. Returns the running point at
    /// `at` (not yet appended) together with the pass outcome; when the
    /// budget ran out the returned point is the last appended boundary.
    fn advance_global(&mut self, at: Moment) -> (Point, AdvanceOutcome) {
        let Some(last) = self.global.last().copied() else {
            // Genesis: synthesize the identity point at this moment.
            let outcome = AdvanceOutcome { crossed: 0, caught_up: true };
            return (Point::genesis(at), outcome);
        };

        let initial = last;
        let mut point = last;
        let block_rate: u128 = if at.ts > initial.ts {
            BLOCK_RATE_PRECISION * (at.block - initial.block) as u128
                / (at.ts - initial.ts) as u128
        } else {
            0
        };

        let mut crossed = 0u32;
        let mut caught_up = false;
        let mut t_i = align_period(point.ts);
        for _ in 0..MAX_CATCHUP_PERIODS {
            t_i += PERIOD_SECS;
            let mut expiring: i128 = 0;
            if t_i > at.ts {
                t_i = at.ts;
            } else {
                expiring = self.schedule.pending_at(t_i);
            }
            let dt = (t_i - point.ts) as i128;
            point.bias = point.bias.saturating_sub(point.slope.saturating_mul(dt)).max(0);
            point.slope = (point.slope - expiring).max(0);
            point.ts = t_i;
            point.block = initial.block
                + (block_rate.saturating_mul((t_i - initial.ts) as u128)
                    / BLOCK_RATE_PRECISION) as u64;
            if t_i == at.ts {
                point.block = at.block;
                caught_up = true;
                break;
            }
            crossed += 1;
            self.global.append(point);
        }

        (point, AdvanceOutcome { crossed, caught_up })
    }

    /// Explicit catch-up: advance the global curve and record a
    /// checkpoint at `at` when it is reached.
    ///
    /// Callable any number of times; repeated calls with no intervening
    /// lock changes only grow the checkpoint bookkeeping, never any
    /// balance or the supply.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ClockRegression`] if `at` is behind the last
    /// global checkpoint.
    pub fn checkpoint_global(&mut self, at: Moment) -> Result<AdvanceOutcome, LedgerError> {
        self.check_clock(at)?;
        let (point, outcome) = self.advance_global(at);
        if outcome.caught_up {
            self.global.append(point);
        } else {
            debug!(
                crossed = outcome.crossed,
                behind_ts = point.ts,
                target_ts = at.ts,
                "global curve still behind after bounded catch-up"
            );
        }
        Ok(outcome)
    }

    /// Record a lock mutation: schedule netting, global curve delta, and
    /// the account checkpoint, all at one moment.
    ///
    /// `old` and `new` are the lock images before and after the
    /// mutation; either may be [`Lock::NONE`].
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ClockRegression`] if `at` is behind the ledger.
    /// - [`LedgerError::CatchUpRequired`] if the idle gap exceeds the
    ///   per-call budget; boundary checkpoints appended by the attempt
    ///   remain valid, and `checkpoint_global` completes the catch-up.
    pub fn apply_lock_change(
        &mut self,
        who: &AccountId,
        old: Lock,
        new: Lock,
        at: Moment,
    ) -> Result<(), LedgerError> {
        self.check_clock(at)?;
        let (mut point, outcome) = self.advance_global(at);
        if !outcome.caught_up {
            let periods =
                align_period(at.ts).saturating_sub(align_period(point.ts)) / PERIOD_SECS;
            return Err(LedgerError::CatchUpRequired { periods });
        }

        let old_slope = old.slope_at(at.ts);
        let old_bias = old.bias_at(at.ts);
        let new_slope = new.slope_at(at.ts);
        let new_bias = new.bias_at(at.ts);

        // Net the old contribution out of its expiry bucket; record the
        // new one. Ends already crossed by the curve need no adjustment.
        if old.end > at.ts {
            self.schedule.cancel(old.end, old_slope);
            if new.end == old.end {
                self.schedule.record(new.end, new_slope);
            }
        }
        if new.end > at.ts && new.end > old.end {
            self.schedule.record(new.end, new_slope);
        }

        point.slope = (point.slope + new_slope - old_slope).max(0);
        point.bias = (point.bias + new_bias - old_bias).max(0);
        self.global.append(point);

        self.accounts.entry(*who).or_default().append(Point {
            bias: new_bias,
            slope: new_slope,
            ts: at.ts,
            block: at.block,
        });

        debug!(
            %who,
            crossed = outcome.crossed,
            epoch = self.global.epoch(),
            account_epoch = self.account_epoch(who),
            "applied lock change"
        );
        Ok(())
    }
}
