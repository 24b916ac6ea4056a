use super::{dealer_must_hit, hand::Hand, is_perfect_20, Simulator};
use crate::statistics::{rounded_true_count, Accumulate, AggregateStatistics, MAX_TRACKED_COUNT};
use crate::{Rule, SimulationError};

use tracing::{debug, info};

impl Simulator {
    /// Plays `num_rounds` rounds with basic strategy and gathers their statistics.
    ///
    /// Before each round the count reached by a dry run of the initial deal is used
    /// to fill the side bet tables. The dry run works on a copy of the shoe, so the
    /// real round sees exactly the same cards.
    pub fn simulate(
        &mut self,
        num_rounds: u64,
        bet_unit: f64,
    ) -> Result<AggregateStatistics, SimulationError> {
        if !(bet_unit.is_finite() && bet_unit > 0.0) {
            return Err(SimulationError::InvalidBetUnit(bet_unit));
        }
        info!(
            num_rounds,
            bet_unit,
            number_of_decks = self.rule.number_of_decks,
            "simulation started"
        );

        let mut stats = AggregateStatistics::new();
        for _ in 0..num_rounds {
            self.record_shadow_statistics(&mut stats)?;
            let result = self.play_round(bet_unit)?;
            stats.record_bet(result.bet);
            stats.record_round(&result);
        }

        info!(
            hands_played = stats.hands_played,
            total_profit = stats.total_profit,
            ev_per_hand = ?stats.ev_per_hand(),
            house_edge = ?stats.house_edge(),
            "simulation finished"
        );
        Ok(stats)
    }

    fn record_shadow_statistics(
        &self,
        stats: &mut AggregateStatistics,
    ) -> Result<(), SimulationError> {
        let mut shoe = self.shoe.clone();
        let mut player_hand = Hand::new();
        let mut dealer_hand = Hand::new();
        for _ in 0..2 {
            player_hand.receive_card(shoe.draw()?);
            dealer_hand.receive_card(shoe.draw()?);
        }

        let true_count = rounded_true_count(shoe.true_count());
        if !(1..=MAX_TRACKED_COUNT as i64).contains(&true_count) {
            return Ok(());
        }
        stats.record_count(true_count);

        let perfect_20 = &self.rule.perfect_20;
        if perfect_20.enabled {
            stats.record_perfect_20(
                true_count,
                is_perfect_20(&player_hand),
                perfect_20.stake,
                perfect_20.payout,
            );
        }

        let up_card_value = dealer_hand.get_cards()[0].value();
        while dealer_must_hit(&dealer_hand, self.rule.dealer_hit_on_soft17) {
            dealer_hand.receive_card(shoe.draw()?);
        }
        let dealer_bust = &self.rule.dealer_bust;
        stats.record_dealer_bust(
            up_card_value,
            true_count,
            dealer_hand.is_bust(),
            dealer_bust.stake,
            dealer_bust.payout(up_card_value).unwrap_or(0.0),
        );
        Ok(())
    }
}

/// Runs `num_rounds` rounds split over independent simulators, one per thread, and
/// merges their statistics.
///
/// `number_of_threads == 0` uses all available cores. With a seed, thread `i` is
/// seeded with `seed + i`, so a run is reproducible for a fixed thread count.
pub fn simulate_parallel(
    rule: &Rule,
    num_rounds: u64,
    bet_unit: f64,
    number_of_threads: usize,
    seed: Option<u64>,
) -> Result<AggregateStatistics, SimulationError> {
    rule.validate()?;
    let number_of_threads = if number_of_threads == 0 {
        match std::thread::available_parallelism() {
            Ok(n) => n.get(),
            Err(_) => 1,
        }
    } else {
        number_of_threads
    };
    debug!(number_of_threads, num_rounds, "dispatching rounds");

    let threads = number_of_threads as u64;
    let rounds_of = |i: u64| num_rounds / threads + u64::from(i < num_rounds % threads);
    let simulator_of = |i: u64| match seed {
        Some(seed) => Simulator::with_seed(rule, seed.wrapping_add(i)),
        None => Simulator::new(rule),
    };

    std::thread::scope(|scope| -> Result<AggregateStatistics, SimulationError> {
        let mut handles = Vec::with_capacity(number_of_threads - 1);
        for i in 1..threads {
            let mut simulator = simulator_of(i)?;
            let rounds = rounds_of(i);
            handles.push(scope.spawn(move || simulator.simulate(rounds, bet_unit)));
        }

        let mut stats = simulator_of(0)?.simulate(rounds_of(0), bet_unit)?;
        for handle in handles {
            let partial = handle
                .join()
                .map_err(|_| SimulationError::WorkerPanicked)??;
            stats.accumulate(&partial);
        }
        Ok(stats)
    })
}
