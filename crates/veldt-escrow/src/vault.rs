//! In-memory collateral vault for tests and tooling.
//!
//! Tracks free balances per account and the total held in escrow
//! custody. Not suitable for production use; real deployments implement
//! [`CollateralAsset`] over an actual asset ledger.

use std::collections::HashMap;

use parking_lot::Mutex;
use veldt_core::error::CollateralError;
use veldt_core::traits::CollateralAsset;
use veldt_core::types::AccountId;

/// An in-memory [`CollateralAsset`].
#[derive(Debug, Default)]
pub struct MemoryVault {
    balances: Mutex<HashMap<AccountId, u64>>,
    held: Mutex<u64>,
}

impl MemoryVault {
    /// An empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account's free balance.
    pub fn fund(&self, who: &AccountId, amount: u64) {
        *self.balances.lock().entry(*who).or_insert(0) += amount;
    }

    /// An account's free (unlocked) balance.
    pub fn balance_of(&self, who: &AccountId) -> u64 {
        *self.balances.lock().get(who).unwrap_or(&0)
    }

    /// Total collateral currently in escrow custody.
    pub fn held(&self) -> u64 {
        *self.held.lock()
    }
}

impl CollateralAsset for MemoryVault {
    fn transfer_from(&self, from: &AccountId, amount: u64) -> Result<(), CollateralError> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(*from).or_insert(0);
        if *balance < amount {
            return Err(CollateralError::InsufficientFunds { have: *balance, need: amount });
        }
        *balance -= amount;
        *self.held.lock() += amount;
        Ok(())
    }

    fn transfer_to(&self, to: &AccountId, amount: u64) -> Result<(), CollateralError> {
        let mut held = self.held.lock();
        if *held < amount {
            return Err(CollateralError::Rejected(format!(
                "custody underflow: held {held}, releasing {amount}"
            )));
        }
        *held -= amount;
        *self.balances.lock().entry(*to).or_insert(0) += amount;
        Ok(())
    }
}
