//! Trait interfaces between the escrow core and its collaborators.
//!
//! These traits define the contracts at the system boundary:
//! - [`CollateralAsset`] — custody of the deposited asset (external)
//! - [`ClockSource`] — wall-clock time and block height (external)
//! - [`NotificationSink`] — outbound structured events (external)
//!
//! The ledger core never simulates any of these locally; implementations
//! are injected by the embedding application.

use crate::error::CollateralError;
use crate::events::EscrowEvent;
use crate::types::{AccountId, Moment};

/// Custody interface for the collateral asset.
///
/// A failed transfer must abort the surrounding escrow operation with
/// zero state mutation; the coordinator guarantees this by calling the
/// transfer before touching any internal state. Signature-based
/// pre-approvals are the asset's concern; the ledger only observes
/// whether the transfer succeeds.
pub trait CollateralAsset: Send + Sync {
    /// Pull `amount` from `from` into escrow custody.
    ///
    /// # Errors
    ///
    /// Any [`CollateralError`] aborts the surrounding operation.
    fn transfer_from(&self, from: &AccountId, amount: u64) -> Result<(), CollateralError>;

    /// Release `amount` from escrow custody back to `to`.
    ///
    /// # Errors
    ///
    /// Any [`CollateralError`] aborts the surrounding operation.
    fn transfer_to(&self, to: &AccountId, amount: u64) -> Result<(), CollateralError>;
}

/// Externally supplied clock: current wall-clock second and block height.
///
/// Both values must be monotonically non-decreasing across readings; the
/// ledger rejects regressions rather than repairing them.
pub trait ClockSource: Send + Sync {
    /// The current clock reading.
    fn moment(&self) -> Moment;
}

/// Outbound event sink. Purely observational; implementations must not
/// call back into the escrow.
pub trait NotificationSink: Send + Sync {
    /// Deliver one event. Delivery failures are the sink's problem.
    fn notify(&self, event: &EscrowEvent);
}

/// A sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _event: &EscrowEvent) {}
}
