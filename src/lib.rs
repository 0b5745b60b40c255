//! # Crashpoint Game Server
//!
//! Real-time "crash" betting round engine with a provably-fair crash point.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CRASHPOINT SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Decimal fixed-point multiplier math       │
//! │  └── fair.rs     - Seed -> crash-point derivation            │
//! │                                                              │
//! │  game/           - Round logic                               │
//! │  ├── round.rs    - Round, bet ledger, phase snapshots        │
//! │  ├── events.rs   - Wire events (WAITING/TICK/CRASH/...)      │
//! │  └── engine.rs   - Timer-driven round actor                  │
//! │                                                              │
//! │  network/        - Delivery (non-deterministic)              │
//! │  ├── hub.rs      - Broadcast fan-out, bounded per-subscriber │
//! │  └── server.rs   - WebSocket spectator endpoint              │
//! │                                                              │
//! │  wallet/         - Balances, bonuses, wagering requirements  │
//! │  store/          - Round/bet persistence contract            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fairness Guarantee
//!
//! Each round's crash point is a pure function of a 16-byte seed generated
//! before any bet is accepted and revealed once the round has crashed.
//! Anyone can recompute `derive_crash_cents(seed)` after the fact; the
//! engine never recomputes or mutates the crash point mid-round.
//!
//! Only the engine task mutates round state. Bets and cash-outs arrive as
//! commands on its channel, so validation and mutation are one serialized
//! step and duplicate cash-out races resolve first-wins.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod store;
pub mod wallet;

// Re-export commonly used types
pub use crate::core::fair::{derive_crash_cents, EntropySeedSource, RoundSeed, SeedSource};
pub use crate::core::fixed::{cents_to_f64, Fixed, FIXED_ONE};
pub use crate::game::engine::{EngineConfig, EngineError, EngineHandle, RoundEngine};
pub use crate::game::events::RoundEvent;
pub use crate::game::round::{Phase, RoundSnapshot, UserId};
pub use crate::network::hub::BroadcastHub;
pub use crate::wallet::{AccountStore, BonusGrant, BonusKind, MemoryWallet, WagerAccount};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Multiplier update interval while a round is running (milliseconds).
pub const TICK_INTERVAL_MS: u64 = 100;

/// Betting window before the multiplier starts moving (seconds).
pub const BETTING_WINDOW_SECS: u64 = 5;

/// Cooldown after a crash before the next round opens (seconds).
pub const COOLDOWN_SECS: u64 = 3;
