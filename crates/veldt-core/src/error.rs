//! Error types for the Veldt escrow ledger.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("amount must be positive")] ZeroAmount,
    #[error("lock already exists")] LockExists,
    #[error("no lock found")] NoLock,
    #[error("lock expired at {end}, now {now}")] LockExpired { end: u64, now: u64 },
    #[error("lock not expired until {end}, now {now}")] LockNotExpired { end: u64, now: u64 },
    #[error("unlock time {requested} not in the future (now {now})")] UnlockInPast { requested: u64, now: u64 },
    #[error("unlock time {requested} exceeds maximum {max}")] UnlockTooFar { requested: u64, max: u64 },
    #[error("unlock time {requested} not beyond current end {current}")] UnlockNotExtended { requested: u64, current: u64 },
    #[error("relocked power {recomputed} below held balance {held}")] PowerShortfall { held: u64, recomputed: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("clock regressed: last checkpoint at ts {last_ts} block {last_block}, got ts {ts} block {block}")]
    ClockRegression { last_ts: u64, last_block: u64, ts: u64, block: u64 },
    #[error("ledger {periods} periods behind; run checkpoint to catch up")] CatchUpRequired { periods: u64 },
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("snapshot encoding: {0}")] SnapshotEncoding(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("block {requested} beyond current height {current}")] BlockOutOfRange { requested: u64, current: u64 },
}

/// Failures reported by the external collateral asset. Any failure aborts
/// the surrounding operation before state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollateralError {
    #[error("insufficient collateral: have {have}, need {need}")] InsufficientFunds { have: u64, need: u64 },
    #[error("transfer rejected: {0}")] Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error(transparent)] Lock(#[from] LockError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Query(#[from] QueryError),
    #[error(transparent)] Collateral(#[from] CollateralError),
}
