//! Shared test helpers for E2E and adversarial tests.

use std::sync::Arc;

use veldt_core::constants::PERIOD_SECS;
use veldt_core::traits::NullSink;
use veldt_core::types::{AccountId, Moment};
use veldt_escrow::{EscrowLedger, MemoryVault};

/// One week, the alignment period.
pub const WEEK: u64 = PERIOD_SECS;

/// Aligned origin timestamp for test scenarios.
pub const ORIGIN_TS: u64 = 2_800 * PERIOD_SECS;

/// Block height at the origin. Nonzero so that pre-genesis block
/// queries (block 0) are meaningful.
pub const ORIGIN_BLOCK: u64 = 1_000;

/// Account id derived from a label.
pub fn acct(label: &str) -> AccountId {
    AccountId::from_label(label)
}

/// Moment `weeks` weeks and `extra_secs` seconds past the origin, with
/// one block per second so block/time interpolation is exact.
pub fn at(weeks: u64, extra_secs: u64) -> Moment {
    let ts = ORIGIN_TS + weeks * WEEK + extra_secs;
    Moment::new(ts, ORIGIN_BLOCK + (ts - ORIGIN_TS))
}

/// A fresh escrow over an in-memory vault, with `funding` credited to
/// each listed account.
pub fn escrow_with_accounts(funding: u64, labels: &[&str]) -> (EscrowLedger, Arc<MemoryVault>) {
    let vault = Arc::new(MemoryVault::new());
    for label in labels {
        vault.fund(&acct(label), funding);
    }
    let escrow = EscrowLedger::new(vault.clone(), Arc::new(NullSink));
    (escrow, vault)
}
