pub mod error;
pub mod simulation;
pub mod statistics;
pub mod strategy;

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

pub use error::{RuleError, ShoeError, SimulationError};
pub use simulation::aggregate::simulate_parallel;
pub use simulation::{Card, Outcome, Rank, RoundPhase, RoundResult, Simulator, Suit};
pub use statistics::{AggregateStatistics, DealerBustBucket, SideBetBucket};

/// Upcards tracked by the dealer-bust side bet, from 2 up to Ace (11).
pub const DEALER_UPCARDS: std::ops::RangeInclusive<u8> = 2..=11;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rule {
    pub number_of_decks: u8,
    /// The shoe is rebuilt before a draw once this many cards or fewer are left.
    pub reshuffle_threshold: usize,
    pub dealer_hit_on_soft17: bool,
    pub allow_das: bool,
    pub allow_resplit: bool,
    pub allow_hit_after_split_aces: bool,
    pub max_splits: u8,
    /// Doubling requires at least this hand value. 0 means any two cards.
    pub double_min_value: u8,
    pub allow_late_surrender: bool,

    pub payout_blackjack: f64,
    pub min_bet: f64,
    pub max_bet: f64,
    pub bet_size: f64,

    pub perfect_20: SideBet,
    pub dealer_bust: DealerBustBet,
}

/// A side bet with a single stake and a single payout ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SideBet {
    pub enabled: bool,
    pub stake: f64,
    pub payout: f64,
}

/// Pays when the dealer busts. The payout depends on the dealer's upcard.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DealerBustBet {
    pub enabled: bool,
    pub stake: f64,
    /// Payout ratios for upcards 2, 3, ..., 10, Ace.
    pub payouts: [f64; 10],
}

impl DealerBustBet {
    /// Returns the payout ratio for an upcard value in `2..=11`.
    pub fn payout(&self, up_card_value: u8) -> Option<f64> {
        if DEALER_UPCARDS.contains(&up_card_value) {
            Some(self.payouts[(up_card_value - 2) as usize])
        } else {
            None
        }
    }
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            number_of_decks: 8,
            reshuffle_threshold: 0,
            dealer_hit_on_soft17: true,
            allow_das: true,
            allow_resplit: false,
            allow_hit_after_split_aces: false,
            max_splits: 3,
            double_min_value: 0,
            allow_late_surrender: true,
            payout_blackjack: 1.5,
            min_bet: 10.0,
            max_bet: 400.0,
            bet_size: 10.0,
            perfect_20: SideBet {
                enabled: false,
                stake: 5.0,
                payout: 4.0,
            },
            dealer_bust: DealerBustBet {
                enabled: false,
                stake: 5.0,
                payouts: [1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.5, 3.0, 3.5, 4.0],
            },
        }
    }
}

impl Rule {
    /// Number of cards in a freshly built shoe.
    pub fn shoe_size(&self) -> usize {
        self.number_of_decks as usize * simulation::count::CARDS_PER_DECK
    }

    /// Checks the rule before a run. Nothing is simulated with an invalid rule.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.number_of_decks == 0 {
            return Err(RuleError::NoDecks);
        }
        if self.reshuffle_threshold >= self.shoe_size() {
            return Err(RuleError::ReshuffleThreshold {
                threshold: self.reshuffle_threshold,
                shoe_size: self.shoe_size(),
            });
        }
        check_positive("min_bet", self.min_bet)?;
        check_positive("max_bet", self.max_bet)?;
        check_positive("bet_size", self.bet_size)?;
        if self.max_bet < self.min_bet {
            return Err(RuleError::BetLimits {
                min_bet: self.min_bet,
                max_bet: self.max_bet,
            });
        }
        check_non_negative("payout_blackjack", self.payout_blackjack)?;
        check_non_negative("perfect_20.stake", self.perfect_20.stake)?;
        check_non_negative("perfect_20.payout", self.perfect_20.payout)?;
        check_non_negative("dealer_bust.stake", self.dealer_bust.stake)?;
        for payout in self.dealer_bust.payouts {
            check_non_negative("dealer_bust.payouts", payout)?;
        }
        Ok(())
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), RuleError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RuleError::InvalidAmount { field, value })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), RuleError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RuleError::Negative { field, value })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize_enum_str, Deserialize_enum_str)]
pub enum Decision {
    #[serde(rename = "H")]
    Hit,
    #[serde(rename = "S")]
    Stand,
    #[serde(rename = "D")]
    Double,
    #[serde(rename = "P")]
    Split,
    #[serde(rename = "R")]
    Surrender,
}

impl Decision {
    /// One-letter code used by strategy charts.
    pub fn code(&self) -> char {
        match self {
            Decision::Hit => 'H',
            Decision::Stand => 'S',
            Decision::Double => 'D',
            Decision::Split => 'P',
            Decision::Surrender => 'R',
        }
    }
}
