//! Wager Accounts
//!
//! Per-user balance, bonus balance, and remaining wagering requirement.
//! `wager_left` only ever decreases (floored at zero), and the bonus balance
//! converts to real balance exactly once, in the same critical section that
//! brings `wager_left` to zero — no reader can observe `wager_left == 0`
//! with an unconverted bonus.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use serde::Serialize;

use crate::game::round::UserId;

use super::bonus::{BonusGrant, BonusKind};

/// Wallet operation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// Balance check failed at debit time.
    #[error("insufficient balance")]
    InsufficientFunds,

    /// Bonus type not in the catalog.
    #[error("unknown bonus type: {0}")]
    UnknownBonus(String),

    /// Non-repeatable bonus claimed twice.
    #[error("bonus already claimed")]
    AlreadyClaimed,
}

impl WalletError {
    /// Stable wire code for this rejection.
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::InsufficientFunds => "insufficient_funds",
            WalletError::UnknownBonus(_) => "unknown_bonus",
            WalletError::AlreadyClaimed => "bonus_already_claimed",
        }
    }
}

/// Point-in-time view of one user's account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WagerAccount {
    /// Withdrawable balance.
    pub balance: u64,
    /// Bonus funds locked behind the wagering requirement.
    pub bonus_balance: u64,
    /// Turnover remaining before the bonus converts.
    pub wager_left: u64,
}

/// Balance and wagering contract consumed by the round engine.
///
/// Every method must be atomic per user: concurrent calls for the same user
/// serialize, and no intermediate state is observable. Cross-user
/// concurrency is unconstrained.
pub trait AccountStore: Send + Sync {
    /// Subtract `amount` from the user's real balance, failing the whole
    /// operation if the balance does not cover it.
    fn debit(&self, user: UserId, amount: u64) -> Result<(), WalletError>;

    /// Add `amount` to the user's real balance, creating the account if it
    /// does not exist yet.
    fn credit(&self, user: UserId, amount: u64) -> Result<(), WalletError>;

    /// Apply wager turnover: decrease `wager_left` by `turnover` (floored at
    /// zero) and, if it reaches zero with a positive bonus balance, convert
    /// the entire bonus into real balance in the same atomic step.
    fn apply_wager(&self, user: UserId, turnover: u64) -> Result<(), WalletError>;

    /// Grant a bonus, rejecting duplicate claims of non-repeatable kinds.
    fn claim_bonus(&self, user: UserId, kind: BonusKind) -> Result<BonusGrant, WalletError>;

    /// Current view of the account, if it exists.
    fn account(&self, user: UserId) -> Option<WagerAccount>;
}

#[derive(Debug, Default)]
struct AccountEntry {
    balance: u64,
    bonus_balance: u64,
    wager_left: u64,
    claimed: BTreeSet<BonusKind>,
}

/// In-memory reference wallet.
///
/// One mutex guards the whole table, which gives the per-user atomicity the
/// contract demands; a database-backed implementation would use row locks or
/// single-statement updates instead.
#[derive(Debug, Default)]
pub struct MemoryWallet {
    accounts: Mutex<BTreeMap<UserId, AccountEntry>>,
}

impl MemoryWallet {
    /// Empty wallet.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<UserId, AccountEntry>> {
        // Lock poisoning only happens if a holder panicked; the table is
        // still consistent because every mutation is a single step.
        match self.accounts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl AccountStore for MemoryWallet {
    fn debit(&self, user: UserId, amount: u64) -> Result<(), WalletError> {
        let mut accounts = self.lock();
        let entry = accounts.get_mut(&user).ok_or(WalletError::InsufficientFunds)?;
        if entry.balance < amount {
            return Err(WalletError::InsufficientFunds);
        }
        entry.balance -= amount;
        Ok(())
    }

    fn credit(&self, user: UserId, amount: u64) -> Result<(), WalletError> {
        let mut accounts = self.lock();
        let entry = accounts.entry(user).or_default();
        entry.balance = entry.balance.saturating_add(amount);
        Ok(())
    }

    fn apply_wager(&self, user: UserId, turnover: u64) -> Result<(), WalletError> {
        let mut accounts = self.lock();
        let entry = accounts.entry(user).or_default();
        entry.wager_left = entry.wager_left.saturating_sub(turnover);
        if entry.wager_left == 0 && entry.bonus_balance > 0 {
            entry.balance = entry.balance.saturating_add(entry.bonus_balance);
            entry.bonus_balance = 0;
        }
        Ok(())
    }

    fn claim_bonus(&self, user: UserId, kind: BonusKind) -> Result<BonusGrant, WalletError> {
        let mut accounts = self.lock();
        let entry = accounts.entry(user).or_default();
        if !kind.repeatable() && entry.claimed.contains(&kind) {
            return Err(WalletError::AlreadyClaimed);
        }
        entry.claimed.insert(kind);
        entry.bonus_balance = entry.bonus_balance.saturating_add(kind.amount());
        entry.wager_left = entry.wager_left.saturating_add(kind.wager_requirement());
        Ok(BonusGrant::for_kind(kind))
    }

    fn account(&self, user: UserId) -> Option<WagerAccount> {
        let accounts = self.lock();
        accounts.get(&user).map(|entry| WagerAccount {
            balance: entry.balance,
            bonus_balance: entry.bonus_balance,
            wager_left: entry.wager_left,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const USER: UserId = UserId(42);

    #[test]
    fn test_debit_requires_funds() {
        let wallet = MemoryWallet::new();
        assert_eq!(wallet.debit(USER, 10), Err(WalletError::InsufficientFunds));

        wallet.credit(USER, 100).unwrap();
        assert!(wallet.debit(USER, 60).is_ok());
        assert_eq!(wallet.debit(USER, 60), Err(WalletError::InsufficientFunds));
        assert_eq!(wallet.account(USER).unwrap().balance, 40);
    }

    #[test]
    fn test_wager_floors_at_zero() {
        let wallet = MemoryWallet::new();
        wallet.claim_bonus(USER, BonusKind::Daily).unwrap();
        assert_eq!(wallet.account(USER).unwrap().wager_left, 100);

        wallet.apply_wager(USER, 250).unwrap();
        let account = wallet.account(USER).unwrap();
        assert_eq!(account.wager_left, 0);
        // Bonus converted in the same step.
        assert_eq!(account.bonus_balance, 0);
        assert_eq!(account.balance, 20);
    }

    #[test]
    fn test_conversion_happens_exactly_once() {
        let wallet = MemoryWallet::new();
        wallet.claim_bonus(USER, BonusKind::Daily).unwrap();
        wallet.apply_wager(USER, 100).unwrap();
        assert_eq!(wallet.account(USER).unwrap().balance, 20);

        // Further turnover must not mint anything.
        wallet.apply_wager(USER, 100).unwrap();
        let account = wallet.account(USER).unwrap();
        assert_eq!(account.balance, 20);
        assert_eq!(account.bonus_balance, 0);
        assert_eq!(account.wager_left, 0);
    }

    #[test]
    fn test_partial_wager_keeps_bonus_locked() {
        let wallet = MemoryWallet::new();
        wallet.claim_bonus(USER, BonusKind::Welcome).unwrap();
        wallet.apply_wager(USER, 999).unwrap();
        let account = wallet.account(USER).unwrap();
        assert_eq!(account.wager_left, 1);
        assert_eq!(account.bonus_balance, 100);
        assert_eq!(account.balance, 0);
    }

    #[test]
    fn test_duplicate_welcome_rejected() {
        let wallet = MemoryWallet::new();
        assert!(wallet.claim_bonus(USER, BonusKind::Welcome).is_ok());
        assert_eq!(
            wallet.claim_bonus(USER, BonusKind::Welcome),
            Err(WalletError::AlreadyClaimed)
        );
        // Daily stays claimable.
        assert!(wallet.claim_bonus(USER, BonusKind::Daily).is_ok());
        assert!(wallet.claim_bonus(USER, BonusKind::Daily).is_ok());
    }

    #[test]
    fn test_no_observable_half_converted_state() {
        // Hammer apply_wager from many threads; every observed snapshot must
        // satisfy the invariant (wager_left == 0) -> (bonus_balance == 0).
        let wallet = Arc::new(MemoryWallet::new());
        wallet.claim_bonus(USER, BonusKind::Welcome).unwrap();

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let wallet = Arc::clone(&wallet);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        wallet.apply_wager(USER, 1).unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..2000 {
            if let Some(account) = wallet.account(USER) {
                if account.wager_left == 0 {
                    assert_eq!(account.bonus_balance, 0);
                }
                assert!(account.bonus_balance == 0 || account.balance == 0);
            }
        }
        for handle in writers {
            handle.join().unwrap();
        }

        let account = wallet.account(USER).unwrap();
        assert_eq!(account.wager_left, 0);
        assert_eq!(account.balance, 100);
        assert_eq!(account.bonus_balance, 0);
    }
}
