//! Bonus Catalog
//!
//! Each bonus kind carries a fixed grant and a wagering multiplier: claiming
//! adds `amount` to the bonus balance and `amount * multiplier` to the
//! remaining wagering requirement. Bonus funds convert to real balance only
//! once that requirement is worked off.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::account::WalletError;

/// Known bonus kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusKind {
    /// One-time signup bonus.
    Welcome,
    /// Daily login bonus.
    Daily,
}

impl BonusKind {
    /// Granted bonus amount.
    pub fn amount(self) -> u64 {
        match self {
            BonusKind::Welcome => 100,
            BonusKind::Daily => 20,
        }
    }

    /// Turnover multiplier applied to the grant.
    pub fn wager_multiplier(self) -> u64 {
        match self {
            BonusKind::Welcome => 10,
            BonusKind::Daily => 5,
        }
    }

    /// Total turnover required before the grant converts.
    pub fn wager_requirement(self) -> u64 {
        self.amount() * self.wager_multiplier()
    }

    /// Whether the bonus may be claimed more than once.
    pub fn repeatable(self) -> bool {
        match self {
            BonusKind::Welcome => false,
            BonusKind::Daily => true,
        }
    }
}

impl FromStr for BonusKind {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "welcome" => Ok(BonusKind::Welcome),
            "daily" => Ok(BonusKind::Daily),
            other => Err(WalletError::UnknownBonus(other.to_string())),
        }
    }
}

/// Result of a successful claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusGrant {
    /// What was claimed.
    pub kind: BonusKind,
    /// Amount credited to the bonus balance.
    pub amount: u64,
    /// Turnover added to the wagering requirement.
    pub wager_requirement: u64,
}

impl BonusGrant {
    /// Build the grant payload for a kind.
    pub fn for_kind(kind: BonusKind) -> Self {
        Self {
            kind,
            amount: kind.amount(),
            wager_requirement: kind.wager_requirement(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog() {
        assert_eq!(BonusKind::Welcome.wager_requirement(), 1000);
        assert_eq!(BonusKind::Daily.wager_requirement(), 100);
        assert!(!BonusKind::Welcome.repeatable());
        assert!(BonusKind::Daily.repeatable());
    }

    #[test]
    fn test_parse() {
        assert_eq!("welcome".parse::<BonusKind>().unwrap(), BonusKind::Welcome);
        assert_eq!("daily".parse::<BonusKind>().unwrap(), BonusKind::Daily);
        assert!(matches!(
            "cashback".parse::<BonusKind>(),
            Err(WalletError::UnknownBonus(_))
        ));
    }
}
