//! Round Persistence Contract
//!
//! The engine records each crashed round (seed included, now safe to
//! reveal) and its bets through [`RoundStore`]. The write happens off the
//! timer path and a failure is logged, never retried inline: a stalled
//! round is worse than a settlement record that gets reconciled later.

pub mod memory;

pub use memory::MemoryRoundStore;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::game::round::UserId;

/// Persisted outcome of one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    /// Round number.
    pub round_id: u64,
    /// Hex-encoded seed, revealed for auditing.
    pub seed: String,
    /// Crash point in cents.
    pub crash_cents: u64,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

/// Persisted outcome of one bet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRecord {
    /// Round the bet belonged to.
    pub round_id: u64,
    /// Owner.
    pub user_id: UserId,
    /// Stake.
    pub amount: u64,
    /// Cash-out multiplier in cents; `None` for a loss.
    pub cash_out_cents: Option<u64>,
}

/// Persistence failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store rejected or lost the write.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage contract for round outcomes.
pub trait RoundStore: Send + Sync {
    /// Record a crashed round together with its settled bets.
    fn record_round(&self, round: &RoundRecord, bets: &[BetRecord]) -> Result<(), StoreError>;
}
