//! Scripted escrow scenarios: a JSON description of lock operations and
//! probes, replayed against a fresh in-memory ledger.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use veldt_core::constants::{align_period, PERIOD_SECS, POWER_PRECISION};
use veldt_core::events::EscrowEvent;
use veldt_core::traits::NotificationSink;
use veldt_core::types::{AccountId, Moment};
use veldt_escrow::{EscrowLedger, MemoryVault};

/// A sink that logs every escrow event through `tracing`.
struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &EscrowEvent) {
        match event {
            EscrowEvent::Deposit { who, amount, end, kind, ts } => {
                info!(%who, amount, end, ?kind, ts, "deposit");
            }
            EscrowEvent::Withdraw { who, amount, ts } => {
                info!(%who, amount, ts, "withdraw");
            }
            EscrowEvent::SupplyChange { prev, next } => {
                info!(prev, next, "supply change");
            }
        }
    }
}

/// One scripted step. Times are seconds past the scenario origin; lock
/// ends are whole weeks past the origin.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Create { who: String, amount: u64, unlock_week: u64, at_secs: u64 },
    IncreaseAmount { who: String, amount: u64, at_secs: u64 },
    Extend { who: String, unlock_week: u64, at_secs: u64 },
    Relock { who: String, unlock_week: u64, at_secs: u64 },
    Withdraw { who: String, at_secs: u64 },
    Checkpoint { at_secs: u64 },
    Probe { at_secs: u64 },
}

impl Step {
    fn at_secs(&self) -> u64 {
        match self {
            Step::Create { at_secs, .. }
            | Step::IncreaseAmount { at_secs, .. }
            | Step::Extend { at_secs, .. }
            | Step::Relock { at_secs, .. }
            | Step::Withdraw { at_secs, .. }
            | Step::Checkpoint { at_secs }
            | Step::Probe { at_secs } => *at_secs,
        }
    }
}

/// A scripted scenario.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Scenario {
    /// Origin timestamp; rounded down to a period boundary.
    #[serde(default = "default_origin_ts")]
    pub origin_ts: u64,
    /// Block height at the origin.
    #[serde(default)]
    pub origin_block: u64,
    /// Seconds per block for the scripted clock.
    #[serde(default = "default_block_secs")]
    pub seconds_per_block: u64,
    pub steps: Vec<Step>,
}

fn default_origin_ts() -> u64 {
    // An arbitrary aligned origin.
    3_000 * PERIOD_SECS
}

fn default_block_secs() -> u64 {
    12
}

/// One probe's view of the ledger.
#[derive(Clone, Debug, Serialize)]
pub struct ProbeRow {
    pub ts: u64,
    pub block: u64,
    pub total_locked: u64,
    pub total_supply: u64,
    /// Per-account voting power in raw fixed-point units.
    pub balances: BTreeMap<String, u64>,
}

/// The scenario outcome: one row per probe step.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub rows: Vec<ProbeRow>,
}

/// Format a fixed-point power value with three decimals.
pub fn format_power(units: u64) -> String {
    let whole = units / POWER_PRECISION;
    let millis = units % POWER_PRECISION / (POWER_PRECISION / 1000);
    format!("{whole}.{millis:03}")
}

fn id_of(names: &mut BTreeMap<String, AccountId>, who: &str) -> AccountId {
    *names
        .entry(who.to_string())
        .or_insert_with(|| AccountId::from_label(who))
}

/// Replay a scenario and collect its probe rows.
pub fn run(scenario: &Scenario) -> Result<Report> {
    if scenario.seconds_per_block == 0 {
        bail!("seconds_per_block must be positive");
    }
    let origin_ts = align_period(scenario.origin_ts);
    let moment = |at_secs: u64| {
        Moment::new(
            origin_ts + at_secs,
            scenario.origin_block + at_secs / scenario.seconds_per_block,
        )
    };
    let end_of = |unlock_week: u64| origin_ts + unlock_week * PERIOD_SECS;

    let vault = Arc::new(MemoryVault::new());
    let mut escrow = EscrowLedger::new(vault.clone(), Arc::new(TracingSink));
    let mut names: BTreeMap<String, AccountId> = BTreeMap::new();
    let mut rows = Vec::new();

    let mut last_secs = 0u64;
    for (index, step) in scenario.steps.iter().enumerate() {
        if step.at_secs() < last_secs {
            bail!("step {index} goes back in time ({} < {last_secs})", step.at_secs());
        }
        last_secs = step.at_secs();
        let now = moment(step.at_secs());

        match step {
            Step::Create { who, amount, unlock_week, .. } => {
                let id = id_of(&mut names, who);
                vault.fund(&id, *amount);
                escrow
                    .create_lock(&id, *amount, end_of(*unlock_week), now)
                    .with_context(|| format!("step {index}: create for {who}"))?;
            }
            Step::IncreaseAmount { who, amount, .. } => {
                let id = id_of(&mut names, who);
                vault.fund(&id, *amount);
                escrow
                    .increase_amount(&id, *amount, now)
                    .with_context(|| format!("step {index}: increase for {who}"))?;
            }
            Step::Extend { who, unlock_week, .. } => {
                let id = id_of(&mut names, who);
                escrow
                    .increase_unlock_time(&id, end_of(*unlock_week), now)
                    .with_context(|| format!("step {index}: extend for {who}"))?;
            }
            Step::Relock { who, unlock_week, .. } => {
                let id = id_of(&mut names, who);
                escrow
                    .relock(&id, end_of(*unlock_week), now)
                    .with_context(|| format!("step {index}: relock for {who}"))?;
            }
            Step::Withdraw { who, .. } => {
                let id = id_of(&mut names, who);
                escrow
                    .withdraw(&id, now)
                    .with_context(|| format!("step {index}: withdraw for {who}"))?;
            }
            Step::Checkpoint { .. } => {
                escrow
                    .checkpoint(now)
                    .with_context(|| format!("step {index}: checkpoint"))?;
            }
            Step::Probe { .. } => {
                let balances = names
                    .iter()
                    .map(|(name, id)| (name.clone(), escrow.balance_of(id, now.ts)))
                    .collect();
                rows.push(ProbeRow {
                    ts: now.ts,
                    block: now.block,
                    total_locked: escrow.total_locked(),
                    total_supply: escrow.total_supply(now),
                    balances,
                });
            }
        }
    }

    Ok(Report { rows })
}
