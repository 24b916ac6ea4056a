use blackjack_ev_macros::Accumulate;
use serde::Serialize;

use crate::simulation::RoundResult;
use crate::DEALER_UPCARDS;

/// Rounded true counts tracked by the shadow tables, 1 up to this value.
pub const MAX_TRACKED_COUNT: usize = 15;

/// Merges statistics gathered by independent runs.
pub trait Accumulate {
    fn accumulate(&mut self, other: &Self);
}

impl Accumulate for u64 {
    fn accumulate(&mut self, other: &Self) {
        *self += *other;
    }
}

impl Accumulate for f64 {
    fn accumulate(&mut self, other: &Self) {
        *self += *other;
    }
}

impl<T: Accumulate, const N: usize> Accumulate for [T; N] {
    fn accumulate(&mut self, other: &Self) {
        for (mine, theirs) in self.iter_mut().zip(other.iter()) {
            mine.accumulate(theirs);
        }
    }
}

/// Perfect 20 results had the side bet been placed at a count threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Accumulate)]
pub struct SideBetBucket {
    pub made: u64,
    pub won: u64,
    pub profit: f64,
}

impl SideBetBucket {
    pub fn ev_per_bet(&self) -> Option<f64> {
        ratio(self.profit, self.made)
    }

    pub fn win_rate(&self) -> Option<f64> {
        ratio(self.won as f64, self.made)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Accumulate)]
pub struct DealerBustBucket {
    pub hands: u64,
    pub busts: u64,
    pub bets: u64,
    pub profit: f64,
}

impl DealerBustBucket {
    pub fn bust_rate(&self) -> Option<f64> {
        ratio(self.busts as f64, self.hands)
    }

    pub fn ev_per_bet(&self) -> Option<f64> {
        ratio(self.profit, self.bets)
    }
}

/// Streaming mean and sum of squared deviations (Welford).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunningMoments {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningMoments {
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    pub fn sample_std_dev(&self) -> Option<f64> {
        (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).sqrt())
    }
}

impl Accumulate for RunningMoments {
    /// Chan et al. pairwise combination.
    fn accumulate(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.count as f64 / count as f64;
        let m2 = self.m2
            + other.m2
            + delta * delta * self.count as f64 * other.count as f64 / count as f64;
        *self = RunningMoments { count, mean, m2 };
    }
}

/// Everything a run reports. Snapshots from parallel runs merge with `accumulate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Accumulate)]
pub struct AggregateStatistics {
    pub hands_played: u64,
    pub wins: u64,
    pub losses: u64,
    pub pushes: u64,
    pub blackjacks: u64,
    pub total_profit: f64,
    pub total_wagered: f64,
    pub profit_moments: RunningMoments,
    #[accumulate(min)]
    pub min_bet: Option<f64>,
    #[accumulate(max)]
    pub max_bet: Option<f64>,

    /// Rounds seen at rounded true count 1, 2, ..., 15.
    pub count_frequencies: [u64; MAX_TRACKED_COUNT],
    /// Perfect 20 outcome had the bet been placed whenever the count reaches
    /// threshold 1, 2, ..., 15.
    pub perfect_20: [SideBetBucket; MAX_TRACKED_COUNT],
    /// Dealer bust side bet by dealer upcard 2, 3, ..., 10, Ace.
    pub dealer_bust_by_upcard: [DealerBustBucket; 10],
    /// Dealer bust side bet by rounded true count 1, 2, ..., 15.
    pub dealer_bust_by_count: [DealerBustBucket; MAX_TRACKED_COUNT],
}

impl AggregateStatistics {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records the wager of a round.
    pub fn record_bet(&mut self, bet: f64) {
        self.total_wagered += bet;
        self.min_bet = Some(self.min_bet.map_or(bet, |x| x.min(bet)));
        self.max_bet = Some(self.max_bet.map_or(bet, |x| x.max(bet)));
    }

    /// Classifies a finished round and folds its profit into the totals.
    pub fn record_round(&mut self, result: &RoundResult) {
        self.hands_played += 1;
        if result.player_blackjack {
            self.blackjacks += 1;
            self.wins += 1;
        } else if result.profit > 0.0 {
            self.wins += 1;
        } else if result.profit < 0.0 {
            self.losses += 1;
        } else {
            self.pushes += 1;
        }
        self.total_profit += result.profit;
        self.profit_moments.push(result.profit);
    }

    /// Bumps the frequency of a rounded true count. Counts outside 1..=15 are ignored.
    pub fn record_count(&mut self, true_count: i64) {
        if let Some(i) = count_index(true_count) {
            self.count_frequencies[i] += 1;
        }
    }

    /// Tallies a Perfect 20 bet for every threshold the count reaches.
    pub fn record_perfect_20(&mut self, true_count: i64, won: bool, stake: f64, payout: f64) {
        let Some(reached) = count_index(true_count) else {
            return;
        };
        for bucket in &mut self.perfect_20[..=reached] {
            bucket.made += 1;
            bucket.profit -= stake;
            if won {
                bucket.won += 1;
                bucket.profit += stake * payout;
            }
        }
    }

    /// Tallies a dealer bust bet by upcard value (2..=11) and by rounded true count.
    pub fn record_dealer_bust(
        &mut self,
        up_card_value: u8,
        true_count: i64,
        busted: bool,
        stake: f64,
        payout: f64,
    ) {
        let mut profit = -stake;
        if busted {
            profit += stake * payout;
        }
        let tally = |bucket: &mut DealerBustBucket| {
            bucket.hands += 1;
            bucket.bets += 1;
            bucket.profit += profit;
            if busted {
                bucket.busts += 1;
            }
        };
        if DEALER_UPCARDS.contains(&up_card_value) {
            tally(&mut self.dealer_bust_by_upcard[(up_card_value - 2) as usize]);
        }
        if let Some(i) = count_index(true_count) {
            tally(&mut self.dealer_bust_by_count[i]);
        }
    }

    pub fn win_rate(&self) -> Option<f64> {
        ratio(self.wins as f64, self.hands_played)
    }

    pub fn loss_rate(&self) -> Option<f64> {
        ratio(self.losses as f64, self.hands_played)
    }

    pub fn push_rate(&self) -> Option<f64> {
        ratio(self.pushes as f64, self.hands_played)
    }

    pub fn blackjack_rate(&self) -> Option<f64> {
        ratio(self.blackjacks as f64, self.hands_played)
    }

    /// Share of the total wager lost to the house.
    pub fn house_edge(&self) -> Option<f64> {
        (self.total_wagered > 0.0).then(|| -self.total_profit / self.total_wagered)
    }

    pub fn ev_per_hand(&self) -> Option<f64> {
        ratio(self.total_profit, self.hands_played)
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.profit_moments.sample_std_dev()
    }

    pub fn avg_bet(&self) -> Option<f64> {
        ratio(self.total_wagered, self.hands_played)
    }

    /// Perfect 20 bucket for a count threshold in 1..=15.
    pub fn perfect_20_at(&self, threshold: u8) -> Option<&SideBetBucket> {
        count_index(threshold as i64).map(|i| &self.perfect_20[i])
    }

    /// Dealer bust bucket for an upcard value in 2..=11.
    pub fn dealer_bust_at_upcard(&self, up_card_value: u8) -> Option<&DealerBustBucket> {
        DEALER_UPCARDS
            .contains(&up_card_value)
            .then(|| &self.dealer_bust_by_upcard[(up_card_value - 2) as usize])
    }

    /// Dealer bust bucket for a rounded true count in 1..=15.
    pub fn dealer_bust_at_count(&self, true_count: u8) -> Option<&DealerBustBucket> {
        count_index(true_count as i64).map(|i| &self.dealer_bust_by_count[i])
    }

    /// Rounds seen at a rounded true count in 1..=15.
    pub fn count_frequency(&self, true_count: u8) -> Option<u64> {
        count_index(true_count as i64).map(|i| self.count_frequencies[i])
    }
}

/// Whole true count used to key the count tables. Halves go to the even
/// neighbour, so 0.5 is 0 and 2.5 is 2.
pub fn rounded_true_count(true_count: f64) -> i64 {
    true_count.round_ties_even() as i64
}

fn count_index(true_count: i64) -> Option<usize> {
    if (1..=MAX_TRACKED_COUNT as i64).contains(&true_count) {
        Some((true_count - 1) as usize)
    } else {
        None
    }
}

fn ratio(numerator: f64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator / denominator as f64)
}
