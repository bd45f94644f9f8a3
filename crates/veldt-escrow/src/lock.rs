//! Lock storage: one lock record per account.
//!
//! The lifecycle `None → Active → Expired → None` (withdraw) or
//! `Expired → Active` (relock) is derived from the record and the
//! current time; nothing beyond the record itself is stored.

use std::collections::HashMap;

use veldt_core::types::{AccountId, Lock};

/// Current lock per account. Absent entries mean [`Lock::NONE`].
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct LockStore {
    locks: HashMap<AccountId, Lock>,
}

impl LockStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The account's lock; [`Lock::NONE`] when nothing is deposited.
    pub fn get(&self, who: &AccountId) -> Lock {
        self.locks.get(who).copied().unwrap_or(Lock::NONE)
    }

    /// Store the account's lock record.
    pub fn set(&mut self, who: &AccountId, lock: Lock) {
        debug_assert!(lock.amount > 0, "use clear() to remove a lock");
        self.locks.insert(*who, lock);
    }

    /// Remove the account's lock record (withdraw).
    pub fn clear(&mut self, who: &AccountId) {
        self.locks.remove(who);
    }

    /// Number of accounts with a stored lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no account has a lock.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
