use std::fmt::Write;

use blackjack_ev::simulation::hand::Hand;
use blackjack_ev::statistics::MAX_TRACKED_COUNT;
use blackjack_ev::strategy::decide;
use blackjack_ev::{AggregateStatistics, Card, Rank, Rule, Suit, DEALER_UPCARDS};
use blackjack_ev_drivers::ConfigRule;
use serde::Serialize;

const DEALER_COLUMNS: [Rank; 10] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Ace,
];

fn percent(x: Option<f64>) -> String {
    match x {
        Some(x) => format!("{:.1}%", x * 100.0),
        None => String::from("n/a"),
    }
}

fn money(x: Option<f64>) -> String {
    match x {
        Some(x) if x < 0.0 => format!("-${:.2}", -x),
        Some(x) => format!("${:.2}", x),
        None => String::from("n/a"),
    }
}

fn upcard_name(value: u8) -> String {
    if value == 11 {
        String::from("A")
    } else {
        value.to_string()
    }
}

fn describe_rule(rule: &Rule) -> String {
    let yes_no = |flag: bool, name: &str| {
        if flag {
            name.to_string()
        } else {
            format!("no {}", name)
        }
    };
    format!(
        "{} decks, {}, {}, {}, max {} splits, {}, blackjack pays {}:1",
        rule.number_of_decks,
        if rule.dealer_hit_on_soft17 { "H17" } else { "S17" },
        yes_no(rule.allow_das, "DAS"),
        yes_no(rule.allow_resplit, "resplit"),
        rule.max_splits,
        yes_no(rule.allow_late_surrender, "late surrender"),
        rule.payout_blackjack,
    )
}

struct Hourly {
    ev: f64,
    std_dev: f64,
}

fn hourly(stats: &AggregateStatistics, hands_per_hour: u32) -> Option<Hourly> {
    let ev = stats.ev_per_hand()? * hands_per_hour as f64;
    let std_dev = stats.std_dev()? * (hands_per_hour as f64).sqrt();
    Some(Hourly { ev, std_dev })
}

/// Plain text report in the layout of the classic simulator printout.
pub fn render_text(
    rule: &Rule,
    bet_unit: f64,
    hands_per_hour: u32,
    stats: &AggregateStatistics,
) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let hands = stats.hands_played;

    writeln!(out, "Blackjack Monte Carlo EV Simulator")?;
    writeln!(out, "Rules: {}", describe_rule(rule))?;
    writeln!(
        out,
        "Table limits: {} to {}",
        money(Some(rule.min_bet)),
        money(Some(rule.max_bet))
    )?;
    writeln!(out, "\nMain bet unit: {}", money(Some(bet_unit)))?;
    writeln!(
        out,
        "Perfect 20 side bet: {} (pays {}:1)",
        money(Some(rule.perfect_20.stake)),
        rule.perfect_20.payout
    )?;
    writeln!(
        out,
        "Dealer bust side bet: {} (varies by upcard)",
        money(Some(rule.dealer_bust.stake))
    )?;

    writeln!(out, "\nBlackjack Simulation Results:")?;
    writeln!(out, "Total Hands: {}", hands)?;
    writeln!(out, "Wins: {} ({})", stats.wins, percent(stats.win_rate()))?;
    writeln!(out, "Losses: {} ({})", stats.losses, percent(stats.loss_rate()))?;
    writeln!(out, "Pushes: {} ({})", stats.pushes, percent(stats.push_rate()))?;
    writeln!(
        out,
        "Blackjacks: {} ({})",
        stats.blackjacks,
        percent(stats.blackjack_rate())
    )?;

    writeln!(out, "\nBetting Statistics:")?;
    writeln!(out, "Minimum Bet: {}", money(stats.min_bet))?;
    writeln!(out, "Average Bet: {}", money(stats.avg_bet()))?;
    writeln!(out, "Maximum Bet: {}", money(stats.max_bet))?;
    writeln!(
        out,
        "\nHouse Edge: {}",
        match stats.house_edge() {
            Some(edge) => format!("{:.2}%", edge * 100.0),
            None => String::from("n/a"),
        }
    )?;
    writeln!(out, "EV per Hand: {}", money(stats.ev_per_hand()))?;
    writeln!(out, "Std Dev: {}", money(stats.std_dev()))?;

    if let Some(hourly) = hourly(stats, hands_per_hour) {
        writeln!(
            out,
            "\nHourly Statistics (at {} hands/hour):",
            hands_per_hour
        )?;
        writeln!(out, "Expected Value: {}/hour", money(Some(hourly.ev)))?;
        writeln!(
            out,
            "Standard Deviation: {}/hour",
            money(Some(hourly.std_dev))
        )?;
        writeln!(
            out,
            "68% of hours between: {} to {}",
            money(Some(hourly.ev - hourly.std_dev)),
            money(Some(hourly.ev + hourly.std_dev))
        )?;
        writeln!(
            out,
            "95% of hours between: {} to {}",
            money(Some(hourly.ev - 2.0 * hourly.std_dev)),
            money(Some(hourly.ev + 2.0 * hourly.std_dev))
        )?;
    }

    let per_hand = |profit: f64| (hands > 0).then(|| profit / hands as f64);
    let per_hour = |profit: f64| per_hand(profit).map(|ev| ev * hands_per_hour as f64);

    if rule.perfect_20.enabled {
        writeln!(out, "\nPerfect 20 Side Bet Analysis:")?;
        writeln!(out, "Count Frequencies:")?;
        for count in 1..=MAX_TRACKED_COUNT as u8 {
            let frequency = stats.count_frequency(count).unwrap_or(0);
            let share = (hands > 0).then(|| frequency as f64 / hands as f64);
            writeln!(
                out,
                "  Count {:+}: {:>6} hands ({:>6})",
                count,
                frequency,
                percent(share)
            )?;
        }

        writeln!(out, "\nPerfect 20 Strategy by Count Threshold:")?;
        writeln!(out, "Thresh  Bets Made   Win Rate    EV/Hand   Hourly EV*")?;
        writeln!(out, "{}", "-".repeat(50))?;
        for threshold in 1..=MAX_TRACKED_COUNT as u8 {
            let Some(bucket) = stats.perfect_20_at(threshold) else {
                continue;
            };
            if bucket.made == 0 {
                continue;
            }
            writeln!(
                out,
                "{:>4}   {:>8}   {:>8}   {:>8}  {:>10}",
                threshold,
                bucket.made,
                percent(bucket.win_rate()),
                money(per_hand(bucket.profit)),
                money(per_hour(bucket.profit))
            )?;
        }
        writeln!(
            out,
            "\n* Hourly EV assumes {} hands per hour",
            hands_per_hour
        )?;
    }

    if rule.dealer_bust.enabled {
        writeln!(out, "\nDealer Bust Side Bet Analysis:")?;
        writeln!(out, "By Dealer Upcard:")?;
        writeln!(out, "Card   Hands    Bust%    EV/Hand   Hourly EV*")?;
        writeln!(out, "{}", "-".repeat(45))?;
        for up_card_value in DEALER_UPCARDS {
            let Some(bucket) = stats.dealer_bust_at_upcard(up_card_value) else {
                continue;
            };
            if bucket.hands == 0 {
                continue;
            }
            writeln!(
                out,
                "{:<4}   {:>6}   {:>6}   {:>8}  {:>10}",
                upcard_name(up_card_value),
                bucket.hands,
                percent(bucket.bust_rate()),
                money(per_hand(bucket.profit)),
                money(per_hour(bucket.profit))
            )?;
        }

        writeln!(out, "\nBy Count:")?;
        writeln!(out, "Count  Hands    Bust%    EV/Hand   Hourly EV*")?;
        writeln!(out, "{}", "-".repeat(45))?;
        for count in 1..=MAX_TRACKED_COUNT as u8 {
            let Some(bucket) = stats.dealer_bust_at_count(count) else {
                continue;
            };
            if bucket.hands == 0 {
                continue;
            }
            writeln!(
                out,
                "{:>+4}   {:>6}   {:>6}   {:>8}  {:>10}",
                count,
                bucket.hands,
                percent(bucket.bust_rate()),
                money(per_hand(bucket.profit)),
                money(per_hour(bucket.profit))
            )?;
        }
    }

    Ok(out)
}

#[derive(Debug, Serialize)]
struct Summary {
    win_rate: Option<f64>,
    loss_rate: Option<f64>,
    push_rate: Option<f64>,
    blackjack_rate: Option<f64>,
    house_edge: Option<f64>,
    ev_per_hand: Option<f64>,
    std_dev: Option<f64>,
    avg_bet: Option<f64>,
    hourly_ev: Option<f64>,
    hourly_std_dev: Option<f64>,
}

#[derive(Debug, Serialize)]
struct YamlReport<'a> {
    rule: &'a ConfigRule,
    bet_unit: f64,
    hands_per_hour: u32,
    summary: Summary,
    statistics: &'a AggregateStatistics,
}

/// Machine readable report: the rule, the derived rates and the raw counters.
pub fn render_yaml(
    rule: &ConfigRule,
    bet_unit: f64,
    hands_per_hour: u32,
    stats: &AggregateStatistics,
) -> Result<String, serde_yaml::Error> {
    let hourly = hourly(stats, hands_per_hour);
    let report = YamlReport {
        rule,
        bet_unit,
        hands_per_hour,
        summary: Summary {
            win_rate: stats.win_rate(),
            loss_rate: stats.loss_rate(),
            push_rate: stats.push_rate(),
            blackjack_rate: stats.blackjack_rate(),
            house_edge: stats.house_edge(),
            ev_per_hand: stats.ev_per_hand(),
            std_dev: stats.std_dev(),
            avg_bet: stats.avg_bet(),
            hourly_ev: hourly.as_ref().map(|h| h.ev),
            hourly_std_dev: hourly.as_ref().map(|h| h.std_dev),
        },
        statistics: stats,
    };
    serde_yaml::to_string(&report)
}

fn chart_row(
    out: &mut String,
    label: &str,
    cards: [Card; 2],
    can_split: bool,
) -> std::fmt::Result {
    let hand = Hand::from_cards(&cards);
    write!(out, "{:<6}", label)?;
    for rank in DEALER_COLUMNS {
        let decision = decide(&hand, Card::new(rank, Suit::Heart), can_split, true, true);
        write!(out, "{:>3}", decision.code())?;
    }
    writeln!(out)
}

fn chart_header(out: &mut String, title: &str) -> std::fmt::Result {
    writeln!(out, "{}", title)?;
    write!(out, "{:<6}", "")?;
    for rank in DEALER_COLUMNS {
        write!(out, "{:>3}", upcard_name(rank.value()))?;
    }
    writeln!(out)
}

fn rank_of_value(value: u8) -> Rank {
    match value {
        2 => Rank::Two,
        3 => Rank::Three,
        4 => Rank::Four,
        5 => Rank::Five,
        6 => Rank::Six,
        7 => Rank::Seven,
        8 => Rank::Eight,
        9 => Rank::Nine,
        11 => Rank::Ace,
        _ => Rank::Ten,
    }
}

/// Basic strategy as three text tables: hard totals, soft totals and pairs against
/// every dealer upcard. H hit, S stand, D double, P split, R surrender.
pub fn render_strategy_chart() -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    chart_header(&mut out, "Hard Totals")?;
    for total in (8..=17).rev() {
        let cards = if total >= 12 {
            [Card::new(Rank::Ten, Suit::Spade), Card::new(rank_of_value(total - 10), Suit::Spade)]
        } else {
            [Card::new(Rank::Two, Suit::Spade), Card::new(rank_of_value(total - 2), Suit::Spade)]
        };
        chart_row(&mut out, &total.to_string(), cards, false)?;
    }

    writeln!(out)?;
    chart_header(&mut out, "Soft Totals")?;
    for other in (2..=9).rev() {
        let cards = [Card::new(Rank::Ace, Suit::Spade), Card::new(rank_of_value(other), Suit::Club)];
        chart_row(&mut out, &format!("A,{}", other), cards, false)?;
    }

    writeln!(out)?;
    chart_header(&mut out, "Pairs")?;
    for value in [11, 10, 9, 8, 7, 6, 5, 4, 3, 2] {
        let rank = rank_of_value(value);
        let name = upcard_name(value);
        let cards = [Card::new(rank, Suit::Spade), Card::new(rank, Suit::Club)];
        chart_row(&mut out, &format!("{},{}", name, name), cards, true)?;
    }

    Ok(out)
}
