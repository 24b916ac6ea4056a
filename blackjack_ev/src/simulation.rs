pub mod aggregate;
pub mod count;
pub mod hand;
pub mod shoe;

use std::cmp::Ordering;

use crate::strategy::{BasicStrategy, Strategy};
use crate::{Decision, Rule, SimulationError};
use blackjack_ev_macros::allowed_phase;
use rand::rngs::StdRng;
use rand::SeedableRng;
use strum_macros::EnumIter;
use tracing::trace;

use self::{hand::Hand, shoe::Shoe};

/// The Perfect 20 side bet is only placed at or above this true count.
pub const PERFECT_20_MIN_TRUE_COUNT: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Suit {
    Diamond = 0,
    Club,
    Heart,
    Spade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum Rank {
    Two = 0,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    /// Blackjack value with the ace counted as 11.
    pub fn value(&self) -> u8 {
        match self {
            Rank::Ace => 11,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            other => *other as u8 + 2,
        }
    }

    pub fn hilo_weight(&self) -> i32 {
        match self {
            Rank::Two | Rank::Three | Rank::Four | Rank::Five | Rank::Six => 1,
            Rank::Seven | Rank::Eight | Rank::Nine => 0,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King | Rank::Ace => -1,
        }
    }
}

/// Represents a card in the real world with a suit and a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    pub fn value(&self) -> u8 {
        self.rank.value()
    }

    pub fn hilo_weight(&self) -> i32 {
        self.rank.hilo_weight()
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let suit = match self.suit {
            Suit::Diamond => 'D',
            Suit::Club => 'C',
            Suit::Heart => 'H',
            Suit::Spade => 'S',
        };
        let rank = match self.rank {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        };
        write!(f, "{}{}", suit, rank)
    }
}

impl From<Card> for u8 {
    fn from(card: Card) -> u8 {
        card.suit as u8 * 13 + card.rank as u8
    }
}

impl TryFrom<u8> for Card {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use strum::IntoEnumIterator;

        if value >= 52 {
            return Err(());
        }
        let suit = Suit::iter().nth((value / 13) as usize).ok_or(())?;
        let rank = Rank::iter().nth((value % 13) as usize).ok_or(())?;
        Ok(Card { rank, suit })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Betting,
    Deal,
    NaturalsCheck,
    PlayerResolution,
    DealerPlay,
    Settlement,
}

/// How a player hand ended before it is compared with the dealer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Bust,
    Surrender,
    Value(u8),
    Blackjack,
}

impl Outcome {
    fn of_finished(hand: &Hand) -> Outcome {
        if hand.is_bust() {
            Outcome::Bust
        } else {
            Outcome::Value(hand.value())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettledHand {
    pub hand: Hand,
    pub outcome: Outcome,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    /// Main hands plus side bet.
    pub profit: f64,
    pub bet: f64,
    pub side_bet_profit: f64,
    pub cards_used: u32,
    /// Sum of the Hi-Lo weights of every card dealt this round.
    pub count_delta: i32,
    pub player_blackjack: bool,
    pub dealer_cards: Vec<Card>,
    pub hands: Vec<SettledHand>,
}

/// A player hand waiting to be played.
#[derive(Debug)]
struct HandNode {
    hand: Hand,
    /// False for split hands unless resplitting is allowed.
    can_split: bool,
    from_split: bool,
    /// Split aces that receive exactly one more card.
    split_aces: bool,
}

enum HandProgress {
    Finished(Hand, Outcome),
    Split(HandNode, HandNode),
}

/// Simulates a Blackjack table with a single player seat.
pub struct Simulator {
    rule: Rule,

    // Table state
    current_phase: RoundPhase,
    shoe: Shoe,

    // Round state
    bet: f64,
    dealer_hand: Hand,
    player_hand: Hand,
    resolved: Vec<(Hand, Outcome)>,
    splits_made: u8,
    side_bet_profit: f64,
    player_blackjack: bool,
    cards_used: u32,
    count_delta: i32,
}

impl Simulator {
    /// Validates the rule and builds a freshly shuffled shoe seeded from the OS.
    pub fn new(rule: &Rule) -> Result<Self, SimulationError> {
        Self::with_rng(rule, StdRng::from_entropy())
    }

    /// Like `new`, with a fixed seed for reproducible runs.
    pub fn with_seed(rule: &Rule, seed: u64) -> Result<Self, SimulationError> {
        Self::with_rng(rule, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rule: &Rule, rng: StdRng) -> Result<Self, SimulationError> {
        rule.validate()?;
        let mut shoe = Shoe::new(rule.number_of_decks, rule.reshuffle_threshold, rng);
        shoe.shuffle();
        Ok(Self {
            rule: *rule,
            current_phase: RoundPhase::Betting,
            shoe,
            bet: 0.0,
            dealer_hand: Hand::new(),
            player_hand: Hand::new(),
            resolved: Vec::with_capacity(2),
            splits_made: 0,
            side_bet_profit: 0.0,
            player_blackjack: false,
            cards_used: 0,
            count_delta: 0,
        })
    }

    /// Plays a whole round with basic strategy.
    pub fn play_round(&mut self, bet_unit: f64) -> Result<RoundResult, SimulationError> {
        self.play_round_with(bet_unit, &BasicStrategy)
    }

    /// Plays a whole round, asking `strategy` at every decision point.
    pub fn play_round_with<T: Strategy>(
        &mut self,
        bet_unit: f64,
        strategy: &T,
    ) -> Result<RoundResult, SimulationError> {
        self.place_bet(bet_unit)?;
        self.deal_initial_cards()?;
        if !self.check_naturals()? {
            self.resolve_player_hands(strategy)?;
            self.dealer_plays()?;
        }
        self.settle()
    }

    /// Wager for the next round from the true count left by the previous one.
    pub fn bet_size(&self, bet_unit: f64) -> f64 {
        let multiplier = (self.shoe.true_count() + 1.0).max(1.0);
        (bet_unit * multiplier).clamp(self.rule.min_bet, self.rule.max_bet)
    }

    /// Can be called at Betting phase.
    /// Returns the wager of the round.
    #[allowed_phase(Betting)]
    pub fn place_bet(&mut self, bet_unit: f64) -> Result<f64, SimulationError> {
        if !(bet_unit.is_finite() && bet_unit > 0.0) {
            return Err(SimulationError::InvalidBetUnit(bet_unit));
        }
        self.new_round();
        self.bet = self.bet_size(bet_unit);
        self.player_hand = Hand::with_wager(self.bet);
        self.current_phase = RoundPhase::Deal;
        Ok(self.bet)
    }

    /// Can be called at Deal phase.
    /// Deals player, dealer, player, dealer, then settles the Perfect 20 side bet.
    #[allowed_phase(Deal)]
    pub fn deal_initial_cards(&mut self) -> Result<(), SimulationError> {
        for _ in 0..2 {
            let card = self.draw_card()?;
            self.player_hand.receive_card(card);
            let card = self.draw_card()?;
            self.dealer_hand.receive_card(card);
        }
        self.side_bet_profit = self.perfect_20_profit();
        self.current_phase = RoundPhase::NaturalsCheck;
        Ok(())
    }

    /// Can be called at NaturalsCheck phase.
    /// Returns true if a natural ended the round, in which case the next phase is
    /// Settlement.
    #[allowed_phase(NaturalsCheck)]
    pub fn check_naturals(&mut self) -> Result<bool, SimulationError> {
        let player = self.player_hand.is_blackjack();
        let dealer = self.dealer_hand.is_blackjack();
        if !player && !dealer {
            self.current_phase = RoundPhase::PlayerResolution;
            return Ok(false);
        }

        self.player_blackjack = player && !dealer;
        let hand = std::mem::take(&mut self.player_hand);
        let outcome = if self.player_blackjack {
            Outcome::Blackjack
        } else {
            // Compared with the dealer's untouched 21: a push or a loss.
            Outcome::Value(hand.value())
        };
        self.resolved.push((hand, outcome));
        self.current_phase = RoundPhase::Settlement;
        Ok(true)
    }

    /// Can be called at PlayerResolution phase.
    /// Plays the player's hand and every hand split from it, one at a time.
    #[allowed_phase(PlayerResolution)]
    pub fn resolve_player_hands<T: Strategy>(
        &mut self,
        strategy: &T,
    ) -> Result<(), SimulationError> {
        let dealer_up_card = self.dealer_hand.get_cards()[0];
        let mut pending = vec![HandNode {
            hand: std::mem::take(&mut self.player_hand),
            can_split: true,
            from_split: false,
            split_aces: false,
        }];

        while let Some(mut node) = pending.pop() {
            if node.hand.len() == 1 {
                let card = self.draw_card()?;
                node.hand.receive_card(card);
                if node.split_aces {
                    let outcome = Outcome::of_finished(&node.hand);
                    self.resolved.push((node.hand, outcome));
                    continue;
                }
            }

            match self.play_hand(node, dealer_up_card, strategy)? {
                HandProgress::Finished(hand, outcome) => self.resolved.push((hand, outcome)),
                HandProgress::Split(first, second) => {
                    pending.push(second);
                    pending.push(first);
                }
            }
        }

        self.current_phase = RoundPhase::DealerPlay;
        Ok(())
    }

    /// Can be called at DealerPlay phase.
    /// The dealer plays once, and only if some hand still needs comparing.
    #[allowed_phase(DealerPlay)]
    pub fn dealer_plays(&mut self) -> Result<(), SimulationError> {
        let needs_dealer = self
            .resolved
            .iter()
            .any(|(_, outcome)| matches!(outcome, Outcome::Value(_)));
        if needs_dealer {
            while dealer_must_hit(&self.dealer_hand, self.rule.dealer_hit_on_soft17) {
                let card = self.draw_card()?;
                self.dealer_hand.receive_card(card);
            }
        }
        self.current_phase = RoundPhase::Settlement;
        Ok(())
    }

    /// Can be called at Settlement phase.
    /// Settles every resolved hand against the dealer and closes the round.
    #[allowed_phase(Settlement)]
    pub fn settle(&mut self) -> Result<RoundResult, SimulationError> {
        let resolved = std::mem::take(&mut self.resolved);
        let mut hands = Vec::with_capacity(resolved.len());
        let mut main_profit = 0.0;
        for (hand, outcome) in resolved {
            let profit = settle_hand(
                outcome,
                hand.get_wager(),
                &self.dealer_hand,
                self.rule.payout_blackjack,
            );
            main_profit += profit;
            hands.push(SettledHand {
                hand,
                outcome,
                profit,
            });
        }

        let result = RoundResult {
            profit: main_profit + self.side_bet_profit,
            bet: self.bet,
            side_bet_profit: self.side_bet_profit,
            cards_used: self.cards_used,
            count_delta: self.count_delta,
            player_blackjack: self.player_blackjack,
            dealer_cards: self.dealer_hand.get_cards().to_vec(),
            hands,
        };
        trace!(
            profit = result.profit,
            bet = result.bet,
            hands = result.hands.len(),
            dealer = %self.dealer_hand,
            "round settled"
        );

        self.current_phase = RoundPhase::Betting;
        Ok(result)
    }

    /// Stacks the shoe so the given cards are dealt next, in order. Resets the count.
    pub fn stack_shoe(&mut self, firsts: &[Card]) -> Result<(), SimulationError> {
        self.shoe.shuffle_with_firsts(firsts)?;
        Ok(())
    }

    pub fn get_rule(&self) -> &Rule {
        &self.rule
    }

    pub fn get_shoe(&self) -> &Shoe {
        &self.shoe
    }

    pub fn get_current_phase(&self) -> RoundPhase {
        self.current_phase
    }

    pub fn true_count(&self) -> f64 {
        self.shoe.true_count()
    }

    pub fn running_count(&self) -> i32 {
        self.shoe.running_count()
    }

    fn draw_card(&mut self) -> Result<Card, SimulationError> {
        let card = self.shoe.draw()?;
        self.cards_used += 1;
        self.count_delta += card.hilo_weight();
        Ok(card)
    }

    fn perfect_20_profit(&self) -> f64 {
        let side_bet = &self.rule.perfect_20;
        if !side_bet.enabled || self.shoe.true_count() < PERFECT_20_MIN_TRUE_COUNT {
            return 0.0;
        }
        let mut profit = -side_bet.stake;
        if is_perfect_20(&self.player_hand) {
            profit += side_bet.stake * side_bet.payout;
        }
        profit
    }

    fn can_double(&self, node: &HandNode) -> bool {
        node.hand.len() == 2
            && (!node.from_split || self.rule.allow_das)
            && node.hand.value() >= self.rule.double_min_value
    }

    fn play_hand<T: Strategy>(
        &mut self,
        mut node: HandNode,
        dealer_up_card: Card,
        strategy: &T,
    ) -> Result<HandProgress, SimulationError> {
        loop {
            let can_split = node.can_split
                && node.hand.is_pair()
                && self.splits_made < self.rule.max_splits;
            let can_double = self.can_double(&node);
            let can_surrender = self.rule.allow_late_surrender && node.hand.len() == 2;
            let decision = strategy.make_decision(
                &node.hand,
                dealer_up_card,
                can_split,
                can_double,
                can_surrender,
            );

            let legal = match decision {
                Decision::Hit | Decision::Stand => true,
                Decision::Double => can_double,
                Decision::Surrender => can_surrender,
                Decision::Split => can_split,
            };
            if !legal {
                return Err(SimulationError::IllegalDecision {
                    decision,
                    hand: node.hand.to_string(),
                });
            }

            match decision {
                Decision::Stand => {
                    let outcome = Outcome::of_finished(&node.hand);
                    return Ok(HandProgress::Finished(node.hand, outcome));
                }
                Decision::Hit => {
                    let card = self.draw_card()?;
                    node.hand.receive_card(card);
                    if node.hand.is_bust() {
                        return Ok(HandProgress::Finished(node.hand, Outcome::Bust));
                    }
                }
                Decision::Double => {
                    let card = self.draw_card()?;
                    node.hand.receive_card(card);
                    node.hand.double_down();
                    let outcome = Outcome::of_finished(&node.hand);
                    return Ok(HandProgress::Finished(node.hand, outcome));
                }
                Decision::Surrender => {
                    return Ok(HandProgress::Finished(node.hand, Outcome::Surrender));
                }
                Decision::Split => return Ok(self.split(node)),
            }
        }
    }

    fn split(&mut self, node: HandNode) -> HandProgress {
        self.splits_made += 1;
        let aces = node.hand.get_cards()[0].rank == Rank::Ace;
        let child = |hand: Hand| HandNode {
            hand,
            can_split: self.rule.allow_resplit && !aces,
            from_split: true,
            split_aces: aces && !self.rule.allow_hit_after_split_aces,
        };
        match node.hand.split() {
            Some((first, second)) => HandProgress::Split(child(first), child(second)),
            // `can_split` guarantees a pair, so this arm only keeps the hand as is.
            None => {
                let outcome = Outcome::of_finished(&node.hand);
                HandProgress::Finished(node.hand, outcome)
            }
        }
    }

    fn new_round(&mut self) {
        self.bet = 0.0;
        self.dealer_hand = Hand::new();
        self.player_hand = Hand::new();
        self.resolved.clear();
        self.splits_made = 0;
        self.side_bet_profit = 0.0;
        self.player_blackjack = false;
        self.cards_used = 0;
        self.count_delta = 0;
    }
}

/// Dealer draws below 17, and on soft 17 when the table hits soft 17.
pub fn dealer_must_hit(dealer_hand: &Hand, hit_on_soft17: bool) -> bool {
    let value = dealer_hand.value();
    value < 17 || (value == 17 && dealer_hand.is_soft() && hit_on_soft17)
}

/// The two-card total the Perfect 20 side bet pays on.
pub fn is_perfect_20(hand: &Hand) -> bool {
    hand.len() == 2 && hand.value() == 20
}

fn settle_hand(outcome: Outcome, wager: f64, dealer_hand: &Hand, payout_blackjack: f64) -> f64 {
    match outcome {
        Outcome::Bust => -wager,
        Outcome::Surrender => -wager / 2.0,
        Outcome::Blackjack => wager * payout_blackjack,
        Outcome::Value(_) if dealer_hand.is_bust() => wager,
        Outcome::Value(value) => match value.cmp(&dealer_hand.value()) {
            Ordering::Greater => wager,
            Ordering::Less => -wager,
            Ordering::Equal => 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulationError;

    fn single_deck_rule() -> Rule {
        Rule {
            number_of_decks: 1,
            ..Default::default()
        }
    }

    fn c(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn stacked_simulator(rule: &Rule, firsts: &[Card]) -> Simulator {
        let mut simulator = Simulator::with_seed(rule, 1).unwrap();
        simulator.stack_shoe(firsts).unwrap();
        simulator
    }

    #[test]
    fn card_integer_round_trips() {
        let card = c(Rank::Queen, Suit::Heart);
        let integer: u8 = card.into();
        assert_eq!(integer, 2 * 13 + 10);
        assert_eq!(Card::try_from(integer), Ok(card));
        assert_eq!(Card::try_from(52), Err(()));
        assert_eq!(card.to_string(), "HQ");
    }

    #[test]
    fn test_allowed_phase() {
        let mut simulator = Simulator::with_seed(&single_deck_rule(), 3).unwrap();
        assert_eq!(simulator.get_current_phase(), RoundPhase::Betting);
        assert!(matches!(
            simulator.deal_initial_cards(),
            Err(SimulationError::WrongPhase {
                operation: "deal_initial_cards",
                expected: RoundPhase::Deal,
                actual: RoundPhase::Betting,
            })
        ));
        assert!(simulator.place_bet(10.0).is_ok());
        assert_eq!(simulator.get_current_phase(), RoundPhase::Deal);
        assert!(simulator.place_bet(10.0).is_err());
        assert!(simulator.settle().is_err());
    }

    #[test]
    fn invalid_rule_is_rejected_before_running() {
        let rule = Rule {
            min_bet: 100.0,
            max_bet: 10.0,
            ..Default::default()
        };
        assert!(matches!(
            Simulator::new(&rule),
            Err(SimulationError::InvalidRule(_))
        ));
    }

    #[test]
    fn player_natural_pays_blackjack() {
        let rule = single_deck_rule();
        let mut simulator = stacked_simulator(
            &rule,
            &[
                c(Rank::Ace, Suit::Spade),
                c(Rank::Nine, Suit::Heart),
                c(Rank::King, Suit::Club),
                c(Rank::Two, Suit::Diamond),
            ],
        );
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.bet, 10.0);
        assert_eq!(result.profit, 10.0 * rule.payout_blackjack);
        assert!(result.player_blackjack);
        assert_eq!(result.cards_used, 4);
        assert_eq!(result.count_delta, -1 + 0 - 1 + 1);
        assert_eq!(result.hands[0].outcome, Outcome::Blackjack);
        assert_eq!(result.dealer_cards.len(), 2);
    }

    #[test]
    fn naturals_on_both_sides_push() {
        let mut simulator = stacked_simulator(
            &single_deck_rule(),
            &[
                c(Rank::Ace, Suit::Spade),
                c(Rank::Ace, Suit::Heart),
                c(Rank::King, Suit::Club),
                c(Rank::Queen, Suit::Diamond),
            ],
        );
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.profit, 0.0);
        assert!(!result.player_blackjack);
    }

    #[test]
    fn dealer_natural_takes_the_bet() {
        let mut simulator = stacked_simulator(
            &single_deck_rule(),
            &[
                c(Rank::Ten, Suit::Spade),
                c(Rank::Ace, Suit::Heart),
                c(Rank::Nine, Suit::Club),
                c(Rank::Jack, Suit::Diamond),
            ],
        );
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.profit, -10.0);
        assert_eq!(result.cards_used, 4);
    }

    #[test]
    fn hard_16_against_ten_surrenders_for_half() {
        let mut simulator = stacked_simulator(
            &single_deck_rule(),
            &[
                c(Rank::Ten, Suit::Spade),
                c(Rank::Ten, Suit::Heart),
                c(Rank::Six, Suit::Club),
                c(Rank::Seven, Suit::Diamond),
            ],
        );
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.profit, -5.0);
        assert_eq!(result.hands[0].outcome, Outcome::Surrender);
        // No hand needed the dealer, so the dealer did not draw.
        assert_eq!(result.cards_used, 4);
    }

    #[test]
    fn eights_split_against_ten_and_dealer_plays_once() {
        let mut simulator = stacked_simulator(
            &single_deck_rule(),
            &[
                c(Rank::Eight, Suit::Spade),
                c(Rank::Ten, Suit::Heart),
                c(Rank::Eight, Suit::Club),
                c(Rank::Seven, Suit::Diamond),
                c(Rank::Ten, Suit::Club),
                c(Rank::Nine, Suit::Club),
            ],
        );
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.hands.len(), 2);
        assert_eq!(result.hands[0].outcome, Outcome::Value(18));
        assert_eq!(result.hands[0].profit, 10.0);
        assert_eq!(result.hands[1].outcome, Outcome::Value(17));
        assert_eq!(result.hands[1].profit, 0.0);
        assert_eq!(result.profit, 10.0);
        assert_eq!(result.dealer_cards.len(), 2);
        assert_eq!(result.cards_used, 6);
    }

    fn four_eights_against_ten() -> Vec<Card> {
        vec![
            c(Rank::Eight, Suit::Spade),
            c(Rank::Ten, Suit::Heart),
            c(Rank::Eight, Suit::Club),
            c(Rank::Seven, Suit::Diamond),
            c(Rank::Eight, Suit::Heart),
            c(Rank::Eight, Suit::Diamond),
            c(Rank::Ten, Suit::Club),
            c(Rank::Ten, Suit::Spade),
            c(Rank::Nine, Suit::Club),
            c(Rank::Nine, Suit::Spade),
        ]
    }

    #[test]
    fn resplit_eights_up_to_four_hands() {
        let rule = Rule {
            number_of_decks: 1,
            allow_resplit: true,
            max_splits: 3,
            ..Default::default()
        };
        let mut simulator = stacked_simulator(&rule, &four_eights_against_ten());
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.hands.len(), 4);
        let outcomes: Vec<Outcome> = result.hands.iter().map(|h| h.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Value(18),
                Outcome::Value(18),
                Outcome::Value(17),
                Outcome::Value(17)
            ]
        );
        for settled in &result.hands {
            assert_eq!(settled.hand.len(), 2);
            assert_eq!(settled.hand.get_wager(), 10.0);
        }
        assert_eq!(result.profit, 20.0);
        assert_eq!(result.cards_used, 10);
    }

    #[test]
    fn max_splits_caps_resplitting() {
        let rule = Rule {
            number_of_decks: 1,
            allow_resplit: true,
            max_splits: 1,
            ..Default::default()
        };
        let mut simulator = stacked_simulator(&rule, &four_eights_against_ten());
        let result = simulator.play_round(10.0).unwrap();
        // Both children catch another eight but the cap turns them into a plain 16.
        assert_eq!(result.hands.len(), 2);
        for settled in &result.hands {
            assert_eq!(settled.outcome, Outcome::Surrender);
        }
        assert_eq!(result.profit, -10.0);
        assert_eq!(result.dealer_cards.len(), 2);
    }

    #[test]
    fn no_resplit_by_default() {
        let mut simulator = stacked_simulator(&single_deck_rule(), &four_eights_against_ten());
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.hands.len(), 2);
    }

    fn eights_against_five(allow_das: bool) -> RoundResult {
        let rule = Rule {
            number_of_decks: 1,
            allow_das,
            ..Default::default()
        };
        let mut simulator = stacked_simulator(
            &rule,
            &[
                c(Rank::Eight, Suit::Spade),
                c(Rank::Five, Suit::Heart),
                c(Rank::Eight, Suit::Club),
                c(Rank::Ten, Suit::Diamond),
                c(Rank::Three, Suit::Club),
                c(Rank::Nine, Suit::Club),
                c(Rank::Ten, Suit::Club),
                c(Rank::Ten, Suit::Spade),
            ],
        );
        simulator.play_round(10.0).unwrap()
    }

    #[test]
    fn split_hand_doubles_only_with_das() {
        let with_das = eights_against_five(true);
        assert_eq!(with_das.hands[0].hand.get_wager(), 20.0);
        assert_eq!(with_das.hands[0].outcome, Outcome::Value(20));

        let without_das = eights_against_five(false);
        for settled in &without_das.hands {
            assert_eq!(settled.hand.get_wager(), 10.0);
        }
        // 8, 3 hits instead and draws to 20.
        assert_eq!(without_das.hands[0].hand.len(), 3);
        assert_eq!(without_das.hands[0].outcome, Outcome::Value(20));
        assert_eq!(without_das.hands[1].outcome, Outcome::Value(18));
        // Dealer 5, 10 draws a ten and busts.
        assert_eq!(without_das.dealer_cards.len(), 3);
        assert_eq!(without_das.profit, 20.0);
    }

    #[test]
    fn dealer_busting_pays_every_standing_hand() {
        let mut simulator = stacked_simulator(
            &single_deck_rule(),
            &[
                c(Rank::Ten, Suit::Spade),
                c(Rank::Six, Suit::Heart),
                c(Rank::Three, Suit::Club),
                c(Rank::Ten, Suit::Diamond),
                c(Rank::King, Suit::Club),
            ],
        );
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.hands[0].outcome, Outcome::Value(13));
        assert_eq!(result.dealer_cards.len(), 3);
        assert_eq!(result.profit, 10.0);
    }

    #[test]
    fn dealer_hits_soft_17_at_the_table() {
        let firsts = [
            c(Rank::Ten, Suit::Spade),
            c(Rank::Ace, Suit::Heart),
            c(Rank::Eight, Suit::Club),
            c(Rank::Six, Suit::Diamond),
            c(Rank::Two, Suit::Club),
        ];

        let h17 = single_deck_rule();
        let result = stacked_simulator(&h17, &firsts).play_round(10.0).unwrap();
        assert_eq!(result.dealer_cards.len(), 3);
        assert_eq!(result.profit, -10.0);

        let s17 = Rule {
            dealer_hit_on_soft17: false,
            ..single_deck_rule()
        };
        let result = stacked_simulator(&s17, &firsts).play_round(10.0).unwrap();
        assert_eq!(result.dealer_cards.len(), 2);
        assert_eq!(result.profit, 10.0);
    }

    #[test]
    fn split_aces_may_hit_when_allowed() {
        let rule = Rule {
            number_of_decks: 1,
            allow_hit_after_split_aces: true,
            ..Default::default()
        };
        let mut simulator = stacked_simulator(
            &rule,
            &[
                c(Rank::Ace, Suit::Spade),
                c(Rank::Ten, Suit::Heart),
                c(Rank::Ace, Suit::Club),
                c(Rank::Seven, Suit::Diamond),
                c(Rank::Two, Suit::Club),
                c(Rank::Seven, Suit::Club),
                c(Rank::Nine, Suit::Club),
            ],
        );
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.hands.len(), 2);
        assert_eq!(result.hands[0].hand.len(), 3);
        assert_eq!(result.hands[0].outcome, Outcome::Value(20));
        assert_eq!(result.hands[1].outcome, Outcome::Value(20));
        assert_eq!(result.profit, 20.0);
    }

    #[test]
    fn split_aces_get_exactly_one_card() {
        let rule = single_deck_rule();
        let mut simulator = stacked_simulator(
            &rule,
            &[
                c(Rank::Ace, Suit::Spade),
                c(Rank::Nine, Suit::Heart),
                c(Rank::Ace, Suit::Club),
                c(Rank::Seven, Suit::Diamond),
                c(Rank::Five, Suit::Club),
                c(Rank::Two, Suit::Club),
            ],
        );
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.hands.len(), 2);
        for settled in &result.hands {
            assert_eq!(settled.hand.len(), 2);
            assert_eq!(settled.hand.get_wager(), 10.0);
        }
        assert_eq!(result.hands[0].outcome, Outcome::Value(16));
        assert_eq!(result.hands[1].outcome, Outcome::Value(13));
    }

    #[test]
    fn split_twenty_one_is_not_a_blackjack() {
        let mut simulator = stacked_simulator(
            &single_deck_rule(),
            &[
                c(Rank::Ace, Suit::Spade),
                c(Rank::Ten, Suit::Heart),
                c(Rank::Ace, Suit::Club),
                c(Rank::Eight, Suit::Diamond),
                c(Rank::King, Suit::Club),
                c(Rank::Queen, Suit::Club),
            ],
        );
        let result = simulator.play_round(10.0).unwrap();
        assert!(!result.player_blackjack);
        assert_eq!(result.hands[0].outcome, Outcome::Value(21));
        assert_eq!(result.hands[1].outcome, Outcome::Value(21));
        assert_eq!(result.profit, 20.0);
    }

    #[test]
    fn double_on_eleven_doubles_the_wager() {
        let mut simulator = stacked_simulator(
            &single_deck_rule(),
            &[
                c(Rank::Six, Suit::Spade),
                c(Rank::Ten, Suit::Heart),
                c(Rank::Five, Suit::Club),
                c(Rank::Eight, Suit::Diamond),
                c(Rank::Nine, Suit::Club),
            ],
        );
        let result = simulator.play_round(10.0).unwrap();
        let settled = &result.hands[0];
        assert_eq!(settled.hand.len(), 3);
        assert_eq!(settled.hand.get_wager(), 20.0);
        assert_eq!(settled.outcome, Outcome::Value(20));
        assert_eq!(result.profit, 20.0);
    }

    #[test]
    fn bust_loses_without_dealer_drawing() {
        let mut simulator = stacked_simulator(
            &single_deck_rule(),
            &[
                c(Rank::Ten, Suit::Spade),
                c(Rank::Seven, Suit::Heart),
                c(Rank::Two, Suit::Club),
                c(Rank::Ten, Suit::Diamond),
                c(Rank::King, Suit::Club),
            ],
        );
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.hands[0].outcome, Outcome::Bust);
        assert_eq!(result.profit, -10.0);
        assert_eq!(result.dealer_cards.len(), 2);
    }

    #[test]
    fn dealer_hits_soft_17_only_when_told_to() {
        let soft_17 = Hand::from_cards(&[c(Rank::Ace, Suit::Spade), c(Rank::Six, Suit::Club)]);
        let hard_17 = Hand::from_cards(&[c(Rank::Ten, Suit::Spade), c(Rank::Seven, Suit::Club)]);
        assert!(dealer_must_hit(&soft_17, true));
        assert!(!dealer_must_hit(&soft_17, false));
        assert!(!dealer_must_hit(&hard_17, true));
    }

    #[test]
    fn perfect_20_needs_a_high_count() {
        let mut rule = single_deck_rule();
        rule.perfect_20.enabled = true;
        let firsts = [
            c(Rank::King, Suit::Spade),
            c(Rank::Seven, Suit::Heart),
            c(Rank::Queen, Suit::Club),
            c(Rank::Ten, Suit::Diamond),
        ];
        let mut simulator = stacked_simulator(&rule, &firsts);
        let result = simulator.play_round(10.0).unwrap();
        // True count is negative after the deal: no side bet, only the main win.
        assert_eq!(result.side_bet_profit, 0.0);
        assert_eq!(result.profit, 10.0);
    }

    #[test]
    fn side_bet_is_added_to_a_natural() {
        let mut rule = single_deck_rule();
        rule.perfect_20.enabled = true;
        let mut firsts = vec![
            c(Rank::Two, Suit::Spade),
            c(Rank::Two, Suit::Heart),
            c(Rank::Three, Suit::Spade),
            c(Rank::Three, Suit::Heart),
            c(Rank::Four, Suit::Spade),
            c(Rank::Four, Suit::Heart),
            c(Rank::Five, Suit::Spade),
            c(Rank::Five, Suit::Heart),
            c(Rank::Six, Suit::Spade),
            c(Rank::Six, Suit::Heart),
            c(Rank::Two, Suit::Club),
            c(Rank::Three, Suit::Club),
        ];
        firsts.extend([
            c(Rank::Ace, Suit::Spade),
            c(Rank::Nine, Suit::Heart),
            c(Rank::King, Suit::Club),
            c(Rank::Eight, Suit::Diamond),
        ]);
        let mut simulator = stacked_simulator(&rule, &firsts);
        for _ in 0..12 {
            simulator.shoe.draw().unwrap();
        }
        // Running count 12 with 40 cards left.
        assert!(simulator.true_count() > PERFECT_20_MIN_TRUE_COUNT);
        let bet = simulator.bet_size(10.0);
        let result = simulator.play_round(10.0).unwrap();
        assert_eq!(result.bet, bet);
        assert_eq!(result.side_bet_profit, -rule.perfect_20.stake);
        assert_eq!(
            result.profit,
            bet * rule.payout_blackjack - rule.perfect_20.stake
        );
    }

    #[test]
    fn bet_grows_with_true_count_and_respects_limits() {
        let rule = Rule {
            number_of_decks: 1,
            min_bet: 10.0,
            max_bet: 40.0,
            ..Default::default()
        };
        let mut simulator = Simulator::with_seed(&rule, 9).unwrap();
        simulator
            .stack_shoe(&[
                c(Rank::Two, Suit::Spade),
                c(Rank::Three, Suit::Spade),
                c(Rank::Four, Suit::Spade),
                c(Rank::Five, Suit::Spade),
                c(Rank::Six, Suit::Spade),
                c(Rank::Two, Suit::Heart),
            ])
            .unwrap();
        assert_eq!(simulator.bet_size(10.0), 10.0);
        assert_eq!(simulator.bet_size(1.0), 10.0);
        for _ in 0..6 {
            simulator.shoe.draw().unwrap();
        }
        // 6 / (46 / 52) = 6.8, so 10 * 7.8 is clamped to 40.
        assert_eq!(simulator.true_count(), 6.8);
        assert_eq!(simulator.bet_size(10.0), 40.0);
        assert_eq!(simulator.bet_size(2.0), 15.6);
    }

    #[test]
    fn invalid_bet_unit_is_rejected() {
        let mut simulator = Simulator::with_seed(&single_deck_rule(), 5).unwrap();
        assert!(matches!(
            simulator.play_round(f64::NAN),
            Err(SimulationError::InvalidBetUnit(_))
        ));
        assert_eq!(simulator.get_current_phase(), RoundPhase::Betting);
    }

    #[test]
    fn non_split_round_profit_is_bounded() {
        let rule = Rule::default();
        let mut simulator = Simulator::with_seed(&rule, 11).unwrap();
        for _ in 0..5000 {
            let result = simulator.play_round(10.0).unwrap();
            if result.hands.len() != 1 {
                continue;
            }
            let wager = result.hands[0].hand.get_wager();
            let bound = wager * rule.payout_blackjack.max(1.0)
                + rule.perfect_20.stake * rule.perfect_20.payout.max(1.0);
            assert!(result.profit.abs() <= bound);
        }
    }

    #[test]
    fn illegal_decision_aborts_the_round() {
        struct AlwaysDouble;
        impl Strategy for AlwaysDouble {
            fn make_decision(&self, _: &Hand, _: Card, _: bool, _: bool, _: bool) -> Decision {
                Decision::Double
            }
        }

        let rule = Rule {
            number_of_decks: 1,
            double_min_value: 20,
            ..Default::default()
        };
        let mut simulator = stacked_simulator(
            &rule,
            &[
                c(Rank::Five, Suit::Spade),
                c(Rank::Ten, Suit::Heart),
                c(Rank::Six, Suit::Club),
                c(Rank::Seven, Suit::Diamond),
            ],
        );
        assert!(matches!(
            simulator.play_round_with(10.0, &AlwaysDouble),
            Err(SimulationError::IllegalDecision {
                decision: Decision::Double,
                ..
            })
        ));
    }
}
