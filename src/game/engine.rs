//! Round Engine
//!
//! The timer-driven WAITING -> RUNNING -> CRASHED state machine. One spawned
//! task owns the active [`Round`]; bets, cash-outs and state reads arrive as
//! commands on its channel and are answered through oneshot replies. That
//! single-writer discipline is what makes the duplicate cash-out race
//! resolve first-wins: the presence check and the `cash_out` write happen
//! inside one command.
//!
//! Phase transitions are driven only by the engine's own timers. Each phase
//! owns exactly one pending timer (`sleep_until` or `interval`), dropped and
//! replaced when the phase advances.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::core::fair::{derive_crash_cents, SeedSource};
use crate::core::fixed::{
    cents_to_f64, fixed_mul, format_cents, Fixed, CENTS_ONE, FIXED_ONE, GROWTH_FACTOR,
};
use crate::game::events::RoundEvent;
use crate::game::round::{Phase, Round, RoundSnapshot, UserId};
use crate::network::hub::BroadcastHub;
use crate::store::{BetRecord, RoundRecord, RoundStore};
use crate::wallet::AccountStore;
use crate::{BETTING_WINDOW_SECS, COOLDOWN_SECS, TICK_INTERVAL_MS};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long the betting window stays open.
    pub betting_window: Duration,
    /// Multiplier update cadence while running.
    pub tick_interval: Duration,
    /// Pause between a crash and the next betting window.
    pub cooldown: Duration,
    /// Per-tick multiplier growth factor.
    pub growth_factor: Fixed,
    /// Smallest accepted stake.
    pub min_bet: u64,
    /// Largest accepted stake.
    pub max_bet: u64,
    /// Command channel depth.
    pub command_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            betting_window: Duration::from_secs(BETTING_WINDOW_SECS),
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            cooldown: Duration::from_secs(COOLDOWN_SECS),
            growth_factor: GROWTH_FACTOR,
            min_bet: 10,
            max_bet: 50_000,
            command_buffer: 64,
        }
    }
}

/// Rejection reasons surfaced to callers.
///
/// Validation failures never mutate engine state; the caller gets the reason
/// synchronously and the round carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The requested action is not allowed in the current phase.
    #[error("action not allowed in the current phase")]
    WrongPhase,

    /// Stake below the table minimum.
    #[error("bet below the table minimum")]
    BetTooLow,

    /// Stake above the table maximum.
    #[error("bet above the table maximum")]
    BetTooHigh,

    /// The user already has a bet in this round.
    #[error("bet already placed this round")]
    DuplicateBet,

    /// The user has no open bet to cash out.
    #[error("no active bet to cash out")]
    NoActiveBet,

    /// The balance check failed at placement.
    #[error("insufficient balance")]
    InsufficientFunds,

    /// The engine task is gone.
    #[error("engine unavailable")]
    Unavailable,
}

impl EngineError {
    /// Stable wire code for this rejection.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::WrongPhase => "wrong_phase",
            EngineError::BetTooLow => "bet_too_low",
            EngineError::BetTooHigh => "bet_too_high",
            EngineError::DuplicateBet => "duplicate_bet",
            EngineError::NoActiveBet => "no_active_bet",
            EngineError::InsufficientFunds => "insufficient_funds",
            EngineError::Unavailable => "engine_unavailable",
        }
    }
}

/// Acknowledgement for an accepted bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetReceipt {
    /// Round the bet belongs to.
    pub round_id: u64,
    /// Accepted stake.
    pub amount: u64,
}

/// Acknowledgement for an accepted cash-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashOutReceipt {
    /// Round the bet belonged to.
    pub round_id: u64,
    /// Multiplier observed by the engine when the request was accepted.
    pub multiplier: f64,
    /// Credited payout, floored to whole units.
    pub payout: u64,
}

enum Command {
    PlaceBet {
        user: UserId,
        amount: u64,
        reply: oneshot::Sender<Result<BetReceipt, EngineError>>,
    },
    CashOut {
        user: UserId,
        reply: oneshot::Sender<Result<CashOutReceipt, EngineError>>,
    },
    GetState {
        reply: oneshot::Sender<RoundSnapshot>,
    },
}

/// Cloneable handle to a spawned [`RoundEngine`].
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    /// Place a bet for `user`. Succeeds only during WAITING.
    pub async fn place_bet(&self, user: UserId, amount: u64) -> Result<BetReceipt, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::PlaceBet {
                user,
                amount,
                reply,
            })
            .await
            .map_err(|_| EngineError::Unavailable)?;
        rx.await.map_err(|_| EngineError::Unavailable)?
    }

    /// Cash out `user`'s open bet at the multiplier the engine observes now.
    pub async fn cash_out(&self, user: UserId) -> Result<CashOutReceipt, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::CashOut { user, reply })
            .await
            .map_err(|_| EngineError::Unavailable)?;
        rx.await.map_err(|_| EngineError::Unavailable)?
    }

    /// Snapshot of the active round.
    pub async fn state(&self) -> Result<RoundSnapshot, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::GetState { reply })
            .await
            .map_err(|_| EngineError::Unavailable)?;
        rx.await.map_err(|_| EngineError::Unavailable)
    }
}

/// The round engine actor.
pub struct RoundEngine {
    config: EngineConfig,
    hub: BroadcastHub,
    wallet: Arc<dyn AccountStore>,
    store: Arc<dyn RoundStore>,
    seeds: Box<dyn SeedSource>,
    round: Round,
    rx: mpsc::Receiver<Command>,
}

impl RoundEngine {
    /// Spawn the engine task and return a handle to it.
    ///
    /// The task runs rounds back to back until every handle is dropped.
    pub fn spawn(
        config: EngineConfig,
        hub: BroadcastHub,
        wallet: Arc<dyn AccountStore>,
        store: Arc<dyn RoundStore>,
        seeds: Box<dyn SeedSource>,
    ) -> EngineHandle {
        let (tx, rx) = mpsc::channel(config.command_buffer);
        let engine = Self {
            config,
            hub,
            wallet,
            store,
            seeds,
            // Placeholder; `run` opens round 1 before accepting anything.
            round: Round::new(0, Default::default(), CENTS_ONE),
            rx,
        };
        tokio::spawn(engine.run());
        EngineHandle { tx }
    }

    async fn run(mut self) {
        info!("round engine started");
        while self.run_round().await {}
        info!("round engine stopped");
    }

    /// Drive one full round. Returns `false` once all handles are gone.
    async fn run_round(&mut self) -> bool {
        let id = self.round.id + 1;
        let seed = self.seeds.next_seed();
        let crash_cents = derive_crash_cents(&seed);
        if crash_cents < CENTS_ONE {
            // Unreachable for a correct derivation; abandon this round only
            // and open a fresh one with a new seed.
            error!(round = id, crash_cents, "derived crash point below 1.00x");
            return true;
        }

        self.round = Round::new(id, seed, crash_cents);
        debug!(round = id, "betting window open");
        self.publish(RoundEvent::Waiting { round_id: id }).await;

        let betting_ends = Instant::now() + self.config.betting_window;
        if !self.pump_until(betting_ends).await {
            return false;
        }

        self.round.phase = Phase::Running;
        self.round.multiplier = FIXED_ONE;
        info!(round = id, bets = self.round.ledger.len(), "round started");
        self.publish(RoundEvent::RoundStart { round_id: id }).await;

        if !self.run_ticks().await {
            return false;
        }

        self.round.phase = Phase::Crashed;
        self.round.clamp_to_crash();
        info!(
            round = id,
            crash = %format_cents(crash_cents),
            seed = %hex::encode(seed),
            "round crashed"
        );
        self.publish(RoundEvent::crash(crash_cents)).await;
        self.settle();

        let cooldown_ends = Instant::now() + self.config.cooldown;
        self.pump_until(cooldown_ends).await
    }

    /// Advance the multiplier until it reaches the crash point.
    ///
    /// The tick that crosses the threshold is the crash: it is never emitted
    /// as a TICK.
    async fn run_ticks(&mut self) -> bool {
        let start = Instant::now() + self.config.tick_interval;
        let mut ticks = time::interval_at(start, self.config.tick_interval);
        loop {
            tokio::select! {
                _ = ticks.tick() => {
                    self.round.multiplier =
                        fixed_mul(self.round.multiplier, self.config.growth_factor);
                    let cents = self.round.multiplier_cents();
                    if cents >= self.round.crash_cents {
                        return true;
                    }
                    self.publish(RoundEvent::tick(cents)).await;
                }
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => return false,
                },
            }
        }
    }

    /// Answer commands until `deadline`.
    async fn pump_until(&mut self, deadline: Instant) -> bool {
        loop {
            tokio::select! {
                _ = time::sleep_until(deadline) => return true,
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => return false,
                },
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::PlaceBet {
                user,
                amount,
                reply,
            } => {
                let _ = reply.send(self.place_bet(user, amount));
            }
            Command::CashOut { user, reply } => {
                let _ = reply.send(self.cash_out(user));
            }
            Command::GetState { reply } => {
                let _ = reply.send(self.round.snapshot());
            }
        }
    }

    fn place_bet(&mut self, user: UserId, amount: u64) -> Result<BetReceipt, EngineError> {
        if self.round.phase != Phase::Waiting {
            return Err(EngineError::WrongPhase);
        }
        if amount < self.config.min_bet {
            return Err(EngineError::BetTooLow);
        }
        if amount > self.config.max_bet {
            return Err(EngineError::BetTooHigh);
        }
        if self.round.ledger.contains(user) {
            return Err(EngineError::DuplicateBet);
        }
        self.wallet
            .debit(user, amount)
            .map_err(|_| EngineError::InsufficientFunds)?;
        if !self.round.ledger.place(user, amount) {
            return Err(EngineError::DuplicateBet);
        }
        debug!(%user, amount, round = self.round.id, "bet placed");
        Ok(BetReceipt {
            round_id: self.round.id,
            amount,
        })
    }

    fn cash_out(&mut self, user: UserId) -> Result<CashOutReceipt, EngineError> {
        if self.round.phase != Phase::Running {
            return Err(EngineError::WrongPhase);
        }
        let cents = self.round.multiplier_cents();
        let bet = self
            .round
            .ledger
            .cash_out(user, cents)
            .ok_or(EngineError::NoActiveBet)?;
        let payout = bet.payout();
        if let Err(err) = self.wallet.credit(user, payout) {
            error!(%user, payout, %err, "payout credit failed");
        }
        debug!(%user, payout, multiplier = %format_cents(cents), "cashed out");
        Ok(CashOutReceipt {
            round_id: self.round.id,
            multiplier: cents_to_f64(cents),
            payout,
        })
    }

    /// Post-crash settlement: wager turnover for every stake, losses stand
    /// as placed, and the outcome goes to the store off the timer path.
    fn settle(&self) {
        let round_id = self.round.id;
        let mut losses = 0usize;
        for bet in self.round.ledger.bets() {
            if let Err(err) = self.wallet.apply_wager(bet.user, bet.amount) {
                warn!(user = %bet.user, %err, "wager settlement failed");
            }
            if bet.cash_out.is_none() {
                losses += 1;
            }
        }
        info!(
            round = round_id,
            bets = self.round.ledger.len(),
            losses,
            "round settled"
        );

        let record = RoundRecord {
            round_id,
            seed: hex::encode(self.round.seed),
            crash_cents: self.round.crash_cents,
            created_at: chrono::Utc::now(),
        };
        let bets: Vec<BetRecord> = self
            .round
            .ledger
            .bets()
            .map(|b| BetRecord {
                round_id,
                user_id: b.user,
                amount: b.amount,
                cash_out_cents: b.cash_out,
            })
            .collect();
        let store = Arc::clone(&self.store);
        // Fire-and-forget: a lost settlement record is reconciled later; a
        // stalled round timer is not.
        tokio::task::spawn_blocking(move || {
            if let Err(err) = store.record_round(&record, &bets) {
                error!(round = record.round_id, %err, "failed to persist round outcome");
            }
        });
    }

    async fn publish(&self, event: RoundEvent) {
        self.hub.publish(self.round.snapshot(), event).await;
    }
}
