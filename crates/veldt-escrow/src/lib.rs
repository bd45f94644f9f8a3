//! # veldt-escrow — Lock store and operation coordinator.
//!
//! Orchestrates the vote-escrow flows over the checkpoint engine:
//! create, increase, extend, relock, withdraw, and explicit catch-up.
//! Collateral custody, clock readings, and event delivery are injected
//! collaborators (see [`veldt_core::traits`]); every operation takes an
//! explicit [`Moment`](veldt_core::types::Moment) and runs validate →
//! transfer → infallible mutation, so rejected operations never touch
//! state.

pub mod coordinator;
pub mod lock;
pub mod shared;
pub mod vault;

pub use coordinator::{EscrowLedger, EscrowState};
pub use lock::LockStore;
pub use shared::SharedEscrow;
pub use vault::MemoryVault;
