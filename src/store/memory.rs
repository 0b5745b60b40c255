//! In-memory round store.
//!
//! Reference implementation of [`RoundStore`]; keeps a bounded history of
//! recent rounds, enough to feed a crash-history panel or tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{BetRecord, RoundRecord, RoundStore, StoreError};

/// How many settled rounds to retain.
pub const HISTORY_DEPTH: usize = 100;

/// One retained round with its bets.
#[derive(Clone, Debug)]
pub struct StoredRound {
    /// The round record.
    pub round: RoundRecord,
    /// Its settled bets.
    pub bets: Vec<BetRecord>,
}

/// Bounded in-memory round history.
#[derive(Debug, Default)]
pub struct MemoryRoundStore {
    rounds: Mutex<VecDeque<StoredRound>>,
}

impl MemoryRoundStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent rounds, newest first.
    pub fn recent(&self, limit: usize) -> Vec<StoredRound> {
        let rounds = self.lock();
        rounds.iter().rev().take(limit).cloned().collect()
    }

    /// Number of retained rounds.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no rounds were recorded yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<StoredRound>> {
        match self.rounds.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl RoundStore for MemoryRoundStore {
    fn record_round(&self, round: &RoundRecord, bets: &[BetRecord]) -> Result<(), StoreError> {
        let mut rounds = self.lock();
        if rounds.len() == HISTORY_DEPTH {
            rounds.pop_front();
        }
        rounds.push_back(StoredRound {
            round: round.clone(),
            bets: bets.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::game::round::UserId;

    fn record(id: u64) -> RoundRecord {
        RoundRecord {
            round_id: id,
            seed: "00".repeat(16),
            crash_cents: 150,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_recent_is_newest_first() {
        let store = MemoryRoundStore::new();
        for id in 1..=5 {
            store.record_round(&record(id), &[]).unwrap();
        }
        let recent = store.recent(3);
        let ids: Vec<u64> = recent.iter().map(|r| r.round.round_id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[test]
    fn test_history_is_bounded() {
        let store = MemoryRoundStore::new();
        for id in 1..=(HISTORY_DEPTH as u64 + 10) {
            store.record_round(&record(id), &[]).unwrap();
        }
        assert_eq!(store.len(), HISTORY_DEPTH);
        assert_eq!(store.recent(1)[0].round.round_id, HISTORY_DEPTH as u64 + 10);
    }

    #[test]
    fn test_bets_are_retained() {
        let store = MemoryRoundStore::new();
        let bets = vec![BetRecord {
            round_id: 1,
            user_id: UserId(7),
            amount: 50,
            cash_out_cents: Some(200),
        }];
        store.record_round(&record(1), &bets).unwrap();
        assert_eq!(store.recent(1)[0].bets, bets);
    }
}
