//! Round State Definitions
//!
//! One `Round` lives from seed generation to post-crash settlement. The
//! ledger maps each user to at most one bet and is owned exclusively by the
//! engine task; nothing here is shared with the broadcast side.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::fair::RoundSeed;
use crate::core::fixed::{cents_to_f64, from_cents, to_cents, Fixed, FIXED_ONE};

/// Unique player identifier.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Round phase.
///
/// Transitions are timer-driven only: WAITING -> RUNNING -> CRASHED -> (next
/// round). No external request can skip a phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Betting window open, multiplier parked at 1.00x.
    Waiting,
    /// Multiplier climbing, bets locked, cash-out allowed.
    Running,
    /// Terminal for the round; settlement and cooldown.
    Crashed,
}

/// A single bet in the active round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    /// Owner of the bet.
    pub user: UserId,
    /// Stake, already debited from the user's balance at placement.
    pub amount: u64,
    /// Multiplier (cents) locked in at cash-out; `None` until then.
    /// A bet still `None` when the round crashes is a loss.
    pub cash_out: Option<u64>,
}

impl Bet {
    /// Payout for this bet if it cashed out, floored to whole units.
    pub fn payout(&self) -> u64 {
        match self.cash_out {
            Some(cents) => self.amount * cents / 100,
            None => 0,
        }
    }
}

/// Per-round bet ledger: at most one bet per user, cleared on round start.
#[derive(Debug, Default)]
pub struct RoundLedger {
    bets: BTreeMap<UserId, Bet>,
}

impl RoundLedger {
    /// Drop all bets (new round).
    pub fn clear(&mut self) {
        self.bets.clear();
    }

    /// Whether the user already has a bet this round.
    pub fn contains(&self, user: UserId) -> bool {
        self.bets.contains_key(&user)
    }

    /// Record a bet. Returns `false` if the user already has one this round.
    pub fn place(&mut self, user: UserId, amount: u64) -> bool {
        if self.bets.contains_key(&user) {
            return false;
        }
        self.bets.insert(
            user,
            Bet {
                user,
                amount,
                cash_out: None,
            },
        );
        true
    }

    /// Fix a bet's cash-out multiplier.
    ///
    /// The presence check and the write are one step under the engine's
    /// single-writer discipline, so duplicate cash-outs resolve first-wins.
    /// Returns the settled bet, or `None` if the user has no open bet.
    pub fn cash_out(&mut self, user: UserId, cents: u64) -> Option<Bet> {
        match self.bets.get_mut(&user) {
            Some(bet) if bet.cash_out.is_none() => {
                bet.cash_out = Some(cents);
                Some(*bet)
            }
            _ => None,
        }
    }

    /// All bets placed this round, in user order.
    pub fn bets(&self) -> impl Iterator<Item = &Bet> {
        self.bets.values()
    }

    /// Number of bets placed this round.
    pub fn len(&self) -> usize {
        self.bets.len()
    }

    /// Whether no bets were placed this round.
    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }
}

/// The active round.
///
/// `crash_cents` is fixed at creation, before any bet is accepted, and never
/// recomputed; it leaves this struct only once the phase is [`Phase::Crashed`].
#[derive(Debug)]
pub struct Round {
    /// Monotonically increasing round number.
    pub id: u64,
    /// Seed behind this round's crash point; revealed post-crash.
    pub seed: RoundSeed,
    /// The derived crash point (cents). Never mutated after creation.
    pub crash_cents: u64,
    /// Current phase.
    pub phase: Phase,
    /// Live multiplier at internal precision.
    pub multiplier: Fixed,
    /// Bets for this round.
    pub ledger: RoundLedger,
}

impl Round {
    /// Create a fresh round in WAITING with an empty ledger.
    pub fn new(id: u64, seed: RoundSeed, crash_cents: u64) -> Self {
        Self {
            id,
            seed,
            crash_cents,
            phase: Phase::Waiting,
            multiplier: FIXED_ONE,
            ledger: RoundLedger::default(),
        }
    }

    /// Displayed multiplier in cents.
    pub fn multiplier_cents(&self) -> u64 {
        to_cents(self.multiplier)
    }

    /// Clamp the displayed multiplier to the crash point (crash moment).
    pub fn clamp_to_crash(&mut self) {
        self.multiplier = from_cents(self.crash_cents);
    }

    /// Snapshot for `getState` and the `STATE` event.
    ///
    /// The crash point appears only once the round has crashed.
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            phase: self.phase,
            multiplier: cents_to_f64(self.multiplier_cents()),
            round_id: self.id,
            crash_at: match self.phase {
                Phase::Crashed => Some(cents_to_f64(self.crash_cents)),
                _ => None,
            },
        }
    }
}

/// Public view of the active round.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Displayed multiplier, two decimals.
    pub multiplier: f64,
    /// Round number.
    pub round_id: u64,
    /// Crash point; present only while crashed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_at: Option<f64>,
}
