use super::{Card, Rank};

/// The cards of one player or dealer hand, plus the money riding on it.
///
/// A split produces two new hands; the tree of split hands is handled by the round
/// engine, not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hand {
    cards: Vec<Card>,
    wager: f64,
}

impl Hand {
    pub fn new() -> Hand {
        Hand {
            cards: Vec::with_capacity(3),
            wager: 0.0,
        }
    }

    pub fn with_wager(wager: f64) -> Hand {
        Hand {
            wager,
            ..Hand::new()
        }
    }

    pub fn from_cards(cards: &[Card]) -> Hand {
        Hand {
            cards: cards.to_vec(),
            wager: 0.0,
        }
    }

    pub fn receive_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn get_cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get_wager(&self) -> f64 {
        self.wager
    }

    pub fn double_down(&mut self) {
        self.wager *= 2.0;
    }

    /// Splits a two-card hand into two hands of one card each, both carrying the
    /// original wager. Returns None unless the hand has exactly two cards.
    pub fn split(&self) -> Option<(Hand, Hand)> {
        match self.cards[..] {
            [first, second] => Some((
                Hand {
                    cards: vec![first],
                    wager: self.wager,
                },
                Hand {
                    cards: vec![second],
                    wager: self.wager,
                },
            )),
            _ => None,
        }
    }

    /// Total with every ace counted as 1.
    pub fn hard_total(&self) -> u8 {
        self.cards
            .iter()
            .map(|card| match card.rank {
                Rank::Ace => 1,
                rank => rank.value(),
            })
            .sum()
    }

    /// Best total: one ace counts as 11 whenever that does not bust the hand.
    pub fn value(&self) -> u8 {
        let hard = self.hard_total();
        if self.has_ace() && hard + 10 <= 21 {
            hard + 10
        } else {
            hard
        }
    }

    /// True if an ace is currently counted as 11.
    pub fn is_soft(&self) -> bool {
        self.has_ace() && self.hard_total() + 10 <= 21
    }

    pub fn is_blackjack(&self) -> bool {
        self.cards.len() == 2 && self.value() == 21
    }

    pub fn is_bust(&self) -> bool {
        self.value() > 21
    }

    /// Two cards of the same rank. A king and a queen are not a pair.
    pub fn is_pair(&self) -> bool {
        matches!(self.cards[..], [first, second] if first.rank == second.rank)
    }

    fn has_ace(&self) -> bool {
        self.cards.iter().any(|card| card.rank == Rank::Ace)
    }
}

impl std::fmt::Display for Hand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, card) in self.cards.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", card)?;
        }
        Ok(())
    }
}
