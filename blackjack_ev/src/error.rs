use thiserror::Error;

use crate::simulation::{Card, RoundPhase};
use crate::Decision;

/// Rejected rule configurations. A run never starts with one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("number_of_decks must be at least 1")]
    NoDecks,
    #[error("reshuffle_threshold ({threshold}) must be smaller than the shoe ({shoe_size} cards)")]
    ReshuffleThreshold { threshold: usize, shoe_size: usize },
    #[error("{field} must be a positive, finite amount, got {value}")]
    InvalidAmount { field: &'static str, value: f64 },
    #[error("max_bet ({max_bet}) cannot be less than min_bet ({min_bet})")]
    BetLimits { min_bet: f64, max_bet: f64 },
    #[error("{field} must be a finite, non-negative amount, got {value}")]
    Negative { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShoeError {
    #[error("card {card} is not left in the shoe")]
    CardUnavailable { card: Card },
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid rule: {0}")]
    InvalidRule(#[from] RuleError),
    #[error(transparent)]
    Shoe(#[from] ShoeError),
    #[error("{operation} is only allowed in {expected:?} phase, current phase is {actual:?}")]
    WrongPhase {
        operation: &'static str,
        expected: RoundPhase,
        actual: RoundPhase,
    },
    #[error("strategy chose {decision:?} for hand [{hand}], which is not legal there")]
    IllegalDecision { decision: Decision, hand: String },
    #[error("the shoe ran out of cards")]
    EmptyShoe,
    #[error("bet unit must be a positive, finite amount, got {0}")]
    InvalidBetUnit(f64),
    #[error("a simulation worker thread panicked")]
    WorkerPanicked,
}
