use crate::simulation::{hand::Hand, Card, Rank};
use crate::Decision;

/// Source of the player's decisions during a round.
pub trait Strategy {
    fn make_decision(
        &self,
        hand: &Hand,
        dealer_up_card: Card,
        can_split: bool,
        can_double: bool,
        can_surrender: bool,
    ) -> Decision;
}

/// Fixed basic strategy for a multi-deck H17 game with late surrender.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicStrategy;

impl Strategy for BasicStrategy {
    fn make_decision(
        &self,
        hand: &Hand,
        dealer_up_card: Card,
        can_split: bool,
        can_double: bool,
        can_surrender: bool,
    ) -> Decision {
        decide(hand, dealer_up_card, can_split, can_double, can_surrender)
    }
}

/// Looks up basic strategy. The checks run in a fixed order and the first match
/// wins: surrender, pair split, hard double, soft totals, then hard totals.
pub fn decide(
    hand: &Hand,
    dealer_up_card: Card,
    can_split: bool,
    can_double: bool,
    can_surrender: bool,
) -> Decision {
    let value = hand.value();
    let dealer = dealer_up_card.value();
    let soft = hand.is_soft();
    let two_cards = hand.len() == 2;

    if can_surrender && two_cards && !soft {
        if let Some(decision) = surrender(hand, value, dealer, can_split) {
            return decision;
        }
    }

    if can_split && hand.is_pair() {
        if let Some(decision) = split(hand.get_cards()[0].rank, dealer) {
            return decision;
        }
    }

    if !soft && can_double && two_cards && should_double_hard(value, dealer) {
        return Decision::Double;
    }

    let double_or_hit = if can_double {
        Decision::Double
    } else {
        Decision::Hit
    };

    if soft {
        return match value {
            19.. => Decision::Stand,
            18 => match dealer {
                9.. => Decision::Hit,
                3..=6 => double_or_hit,
                _ => Decision::Stand,
            },
            17 if (3..=6).contains(&dealer) => double_or_hit,
            15 | 16 if (4..=6).contains(&dealer) => double_or_hit,
            13 | 14 if (5..=6).contains(&dealer) => double_or_hit,
            _ => Decision::Hit,
        };
    }

    match value {
        17.. => Decision::Stand,
        13..=16 if dealer <= 6 => Decision::Stand,
        12 if (4..=6).contains(&dealer) => Decision::Stand,
        11 => double_or_hit,
        10 if dealer <= 9 => double_or_hit,
        9 if (3..=6).contains(&dealer) => double_or_hit,
        _ => Decision::Hit,
    }
}

fn surrender(hand: &Hand, value: u8, dealer: u8, can_split: bool) -> Option<Decision> {
    let eights = can_split && hand.get_cards()[0].rank == Rank::Eight;
    match value {
        16 if dealer >= 9 && !eights => Some(Decision::Surrender),
        15 if dealer == 10 => Some(Decision::Surrender),
        _ => None,
    }
}

/// None means the pair is played as a regular total.
fn split(rank: Rank, dealer: u8) -> Option<Decision> {
    let split = match rank {
        Rank::Ace | Rank::Eight => true,
        Rank::Five | Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => false,
        Rank::Two | Rank::Three | Rank::Seven => dealer <= 7,
        Rank::Four => (5..=6).contains(&dealer),
        Rank::Six => dealer <= 6,
        Rank::Nine => dealer <= 6 || dealer == 8 || dealer == 9,
    };
    split.then_some(Decision::Split)
}

fn should_double_hard(value: u8, dealer: u8) -> bool {
    match value {
        11 => true,
        10 => dealer <= 9,
        9 => (3..=6).contains(&dealer),
        _ => false,
    }
}
