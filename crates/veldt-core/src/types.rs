//! Core ledger types: accounts, locks, checkpoints, clock readings.
//!
//! All collateral amounts are u64 units. Voting power is fixed-point with
//! [`POWER_PRECISION`](crate::constants::POWER_PRECISION) units = 1.0,
//! carried as signed i128 so intermediate deltas can go negative before
//! the clamp.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{MAX_LOCK_SECS, POWER_PRECISION};

/// A 32-byte account identifier.
///
/// Opaque to the ledger; external systems supply it. Helpers derive
/// stable ids from string labels via BLAKE3 for tests and tooling.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// The all-zero account id.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an AccountId from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a stable AccountId from a human-readable label.
    pub fn from_label(label: &str) -> Self {
        Self(blake3::hash(label.as_bytes()).into())
    }

    /// Parse an AccountId from a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Identity of a checkpoint ledger: the single global curve or one
/// account's curve. The same checkpoint-list abstraction backs both.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub enum LedgerOwner {
    /// The aggregate curve over all locks.
    Global,
    /// One account's curve.
    Account(AccountId),
}

impl fmt::Display for LedgerOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Account(id) => write!(f, "{id}"),
        }
    }
}

/// One externally supplied clock reading: wall-clock seconds and block
/// height. Threaded explicitly through every operation; the ledger never
/// reads an ambient clock.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Moment {
    /// Unix timestamp in seconds.
    pub ts: u64,
    /// Monotonically increasing block height.
    pub block: u64,
}

impl Moment {
    /// Construct a clock reading.
    pub fn new(ts: u64, block: u64) -> Self {
        Self { ts, block }
    }
}

/// Derived lifecycle state of a lock. Never stored; always recomputed
/// from the lock record and the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockState {
    /// No collateral deposited.
    None,
    /// Collateral deposited, expiry in the future.
    Active,
    /// Collateral deposited, expiry reached, not yet withdrawn.
    Expired,
}

/// A single account's lock: deposited collateral and aligned expiry.
///
/// `amount == 0` means no lock; `end` is meaningless in that case and
/// held at zero.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Lock {
    /// Deposited collateral in raw units.
    pub amount: u64,
    /// Aligned unlock timestamp. Zero when no lock exists.
    pub end: u64,
}

impl Lock {
    /// The empty lock.
    pub const NONE: Self = Self { amount: 0, end: 0 };

    /// Derived lifecycle state at `now`.
    pub fn state(&self, now: u64) -> LockState {
        if self.amount == 0 {
            LockState::None
        } else if self.end > now {
            LockState::Active
        } else {
            LockState::Expired
        }
    }

    /// Decay rate of this lock in power units per second.
    ///
    /// Zero for an empty or expired lock.
    pub fn slope_at(&self, now: u64) -> i128 {
        if self.state(now) != LockState::Active {
            return 0;
        }
        self.amount as i128 * POWER_PRECISION as i128 / MAX_LOCK_SECS as i128
    }

    /// Voting power of this lock at `now`, in power units.
    ///
    /// `slope * (end - now)` for an active lock, zero otherwise.
    pub fn bias_at(&self, now: u64) -> i128 {
        let slope = self.slope_at(now);
        if slope == 0 {
            return 0;
        }
        slope * (self.end - now) as i128
    }
}

/// An immutable checkpoint: the starting condition of one linear segment
/// of a decay curve.
///
/// Once appended to a ledger a Point is never mutated. Repeated
/// operations in the same moment append further Points with identical
/// `(ts, block)`; historical lookups resolve such ties to the most
/// recently appended Point.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Point {
    /// Curve value (voting power) at `ts`, in power units. Never negative
    /// after an update step.
    pub bias: i128,
    /// Decay rate in power units per second. Never negative.
    pub slope: i128,
    /// Wall-clock second this segment starts at.
    pub ts: u64,
    /// Block height recorded (or interpolated) for `ts`.
    pub block: u64,
}

impl Point {
    /// The identity point at a given moment: zero power, zero decay.
    pub fn genesis(at: Moment) -> Self {
        Self {
            bias: 0,
            slope: 0,
            ts: at.ts,
            block: at.block,
        }
    }

    /// Evaluate this segment at `ts`, clamped at zero.
    ///
    /// Timestamps before the point's own (possible from interpolation
    /// rounding) evaluate at the point itself.
    pub fn value_at(&self, ts: u64) -> u64 {
        let dt = ts.saturating_sub(self.ts) as i128;
        let v = self.bias.saturating_sub(self.slope.saturating_mul(dt));
        v.max(0).min(u64::MAX as i128) as u64
    }
}
