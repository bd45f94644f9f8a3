//! Protocol constants. Voting power is fixed-point with 10^9 units = 1.0.

/// Alignment quantum for lock expiries and curve boundaries: one week.
///
/// Every unlock time is rounded down to a multiple of this period, so all
/// locks expiring in the same week share one slope-schedule bucket.
pub const PERIOD_SECS: u64 = 604_800;

/// Maximum lock duration: four years of 365 days.
pub const MAX_LOCK_SECS: u64 = 126_144_000;

/// Number of whole periods in the maximum lock duration.
///
/// # Examples
///
/// ```
/// use veldt_core::constants::{MAX_LOCK_PERIODS, MAX_LOCK_SECS, PERIOD_SECS};
/// assert_eq!(MAX_LOCK_PERIODS, MAX_LOCK_SECS / PERIOD_SECS);
/// assert_eq!(MAX_LOCK_PERIODS, 208);
/// ```
pub const MAX_LOCK_PERIODS: u64 = MAX_LOCK_SECS / PERIOD_SECS;

/// Fixed-point scale for voting power: bias and slope are expressed in
/// units of 10^-9 voting power.
///
/// A lock's slope is `amount * POWER_PRECISION / MAX_LOCK_SECS` power
/// units per second, so a lock of the full duration starts at
/// `amount * POWER_PRECISION` bias (1.0 power per collateral unit).
pub const POWER_PRECISION: u64 = 1_000_000_000;

/// Maximum aligned boundaries the global curve advances in a single call.
///
/// Bounds the cost of catching up after a long idle gap; a partially
/// advanced ledger is resumed by any subsequent call.
pub const MAX_CATCHUP_PERIODS: u32 = 255;

/// Iteration bound for binary searches over checkpoint history.
///
/// 128 halvings cover any ledger length representable in an epoch index.
pub const MAX_SEARCH_STEPS: u32 = 128;

/// Fixed-point scale for the block/time rate used when interpolating the
/// block height of a past period boundary.
pub const BLOCK_RATE_PRECISION: u128 = 1_000_000_000;

/// Round a timestamp down to its period boundary.
///
/// # Examples
///
/// ```
/// use veldt_core::constants::{align_period, PERIOD_SECS};
/// assert_eq!(align_period(0), 0);
/// assert_eq!(align_period(PERIOD_SECS - 1), 0);
/// assert_eq!(align_period(PERIOD_SECS), PERIOD_SECS);
/// assert_eq!(align_period(10 * PERIOD_SECS + 7), 10 * PERIOD_SECS);
/// ```
pub const fn align_period(ts: u64) -> u64 {
    ts / PERIOD_SECS * PERIOD_SECS
}
