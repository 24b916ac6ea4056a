use super::Card;

pub const CARDS_PER_DECK: usize = 52;

/// Hi-Lo running count and true count of a shoe.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HiLoCount {
    running_count: i32,
    true_count: f64,
}

impl HiLoCount {
    pub fn new() -> Self {
        Default::default()
    }

    /// Counts a card that has just left a shoe with `cards_remaining` cards still in it.
    ///
    /// The true count is the running count per remaining deck, rounded to one decimal.
    /// It keeps its last value once the shoe is empty.
    pub fn observe(&mut self, card: Card, cards_remaining: usize) {
        self.running_count += card.hilo_weight();
        if cards_remaining > 0 {
            let decks_remaining = cards_remaining as f64 / CARDS_PER_DECK as f64;
            self.true_count = round_to_tenth(self.running_count as f64 / decks_remaining);
        }
    }

    pub fn reset(&mut self) {
        self.running_count = 0;
        self.true_count = 0.0;
    }

    pub fn running_count(&self) -> i32 {
        self.running_count
    }

    pub fn true_count(&self) -> f64 {
        self.true_count
    }
}

fn round_to_tenth(x: f64) -> f64 {
    (x * 10.0).round_ties_even() / 10.0
}
