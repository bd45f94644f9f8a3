//! Thread-safe escrow wrapper: single writer, concurrent readers.
//!
//! Lock operations and catch-up serialize through the write lock;
//! queries against already-immutable checkpoints share the read lock.
//! This is the service shape for embedding the ledger in a concurrent
//! process; the inner [`EscrowLedger`] itself is strictly sequential.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::coordinator::EscrowLedger;

/// A [`parking_lot::RwLock`]-wrapped [`EscrowLedger`].
pub struct SharedEscrow {
    inner: RwLock<EscrowLedger>,
}

impl SharedEscrow {
    /// Wrap an escrow ledger.
    pub fn new(inner: EscrowLedger) -> Self {
        Self { inner: RwLock::new(inner) }
    }

    /// Shared read access for queries.
    pub fn read(&self) -> RwLockReadGuard<'_, EscrowLedger> {
        self.inner.read()
    }

    /// Exclusive write access for lock operations and catch-up.
    pub fn write(&self) -> RwLockWriteGuard<'_, EscrowLedger> {
        self.inner.write()
    }

    /// Unwrap back into the sequential ledger.
    pub fn into_inner(self) -> EscrowLedger {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use veldt_core::constants::PERIOD_SECS;
    use veldt_core::traits::NullSink;
    use veldt_core::types::{AccountId, Moment};

    use crate::vault::MemoryVault;

    #[test]
    fn concurrent_reads_agree() {
        let vault = Arc::new(MemoryVault::new());
        let who = AccountId([1; 32]);
        vault.fund(&who, 1_000);

        let mut escrow = EscrowLedger::new(vault, Arc::new(NullSink));
        let start = Moment::new(100 * PERIOD_SECS, 0);
        escrow
            .create_lock(&who, 1_000, start.ts + 4 * PERIOD_SECS, start)
            .unwrap();
        let expected = escrow.balance_of(&who, start.ts);

        let shared = Arc::new(SharedEscrow::new(escrow));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.read().balance_of(&who, start.ts))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn writer_advances_between_readers() {
        let vault = Arc::new(MemoryVault::new());
        let who = AccountId([1; 32]);
        vault.fund(&who, 1_000);

        let mut escrow = EscrowLedger::new(vault, Arc::new(NullSink));
        let start = Moment::new(100 * PERIOD_SECS, 0);
        escrow
            .create_lock(&who, 1_000, start.ts + 4 * PERIOD_SECS, start)
            .unwrap();

        let shared = SharedEscrow::new(escrow);
        let later = Moment::new(start.ts + PERIOD_SECS, PERIOD_SECS);
        let before = shared.read().total_supply(later);
        shared.write().checkpoint(later).unwrap();
        let after = shared.read().total_supply(later);
        assert_eq!(before, after);
    }
}
