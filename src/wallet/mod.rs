//! Balances, bonuses, and wagering requirements.
//!
//! The engine consumes this module through the [`AccountStore`] contract;
//! [`MemoryWallet`] is the reference implementation.

pub mod account;
pub mod bonus;

pub use account::{AccountStore, MemoryWallet, WagerAccount, WalletError};
pub use bonus::{BonusGrant, BonusKind};
