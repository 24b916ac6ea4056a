use super::count::{HiLoCount, CARDS_PER_DECK};
use super::{Card, Rank, Suit};
use crate::{ShoeError, SimulationError};

use strum::IntoEnumIterator;
use tracing::debug;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Represents a shoe in the real world. Cards are dealt from the back of `cards`.
///
/// The shoe owns the Hi-Lo count of the cards dealt since the last rebuild.
#[derive(Debug, Clone)]
pub struct Shoe {
    number_of_decks: u8,
    reshuffle_threshold: usize,
    cards: Vec<Card>,
    count: HiLoCount,
    rng: StdRng,
}

impl Shoe {
    /// Creates a new shoe with ordered cards.
    pub fn new(number_of_decks: u8, reshuffle_threshold: usize, rng: StdRng) -> Shoe {
        Shoe {
            number_of_decks,
            reshuffle_threshold,
            cards: ordered_cards(number_of_decks),
            count: HiLoCount::new(),
            rng,
        }
    }

    /// Returns every card into the shoe, shuffles, and zeroes the count.
    pub fn shuffle(&mut self) {
        self.cards = ordered_cards(self.number_of_decks);
        self.cards.shuffle(&mut self.rng);
        self.count.reset();
    }

    /// Returns every card into the shoe and shuffles. This method makes sure the given
    /// cards are the next ones drawn, in the given order. Fails if one of them is not
    /// available in the shoe's composition.
    pub fn shuffle_with_firsts(&mut self, firsts: &[Card]) -> Result<(), ShoeError> {
        let mut counts = [self.number_of_decks; CARDS_PER_DECK];
        for &card in firsts {
            let card_integer = u8::from(card) as usize;
            if counts[card_integer] == 0 {
                return Err(ShoeError::CardUnavailable { card });
            }
            counts[card_integer] -= 1;
        }

        let mut rest = Vec::with_capacity(self.number_of_decks as usize * CARDS_PER_DECK);
        for card in ordered_cards(1) {
            for _ in 0..counts[u8::from(card) as usize] {
                rest.push(card);
            }
        }
        rest.shuffle(&mut self.rng);

        rest.extend(firsts.iter().rev());
        self.cards = rest;
        self.count.reset();
        Ok(())
    }

    /// Deals a card. The shoe is rebuilt first if the reshuffle threshold is reached;
    /// the card dealt right after a rebuild is not counted.
    pub fn draw(&mut self) -> Result<Card, SimulationError> {
        if self.cards.len() <= self.reshuffle_threshold {
            debug!(
                cards_remaining = self.cards.len(),
                running_count = self.count.running_count(),
                "rebuilding shoe"
            );
            self.shuffle();
            return self.cards.pop().ok_or(SimulationError::EmptyShoe);
        }

        let card = self.cards.pop().ok_or(SimulationError::EmptyShoe)?;
        self.count.observe(card, self.cards.len());
        Ok(card)
    }

    pub fn cards_remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn get_count(&self) -> &HiLoCount {
        &self.count
    }

    pub fn true_count(&self) -> f64 {
        self.count.true_count()
    }

    pub fn running_count(&self) -> i32 {
        self.count.running_count()
    }

    /// The next `number` cards to be dealt, next card first.
    pub fn preview_next_few_cards(&self, number: usize) -> Vec<Card> {
        self.cards.iter().rev().take(number).copied().collect()
    }
}

fn ordered_cards(number_of_decks: u8) -> Vec<Card> {
    let mut cards = Vec::with_capacity(number_of_decks as usize * CARDS_PER_DECK);
    for _ in 0..number_of_decks {
        for suit in Suit::iter() {
            for rank in Rank::iter() {
                cards.push(Card { rank, suit });
            }
        }
    }
    cards
}
