mod report;

use std::path::PathBuf;

use anyhow::{bail, Context};
use blackjack_ev::{simulate_parallel, Rule};
use blackjack_ev_drivers::{
    default_config_path, init_logging, parse_config_from_file, Config, ReportFormat,
};
use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, about = "Blackjack Monte Carlo EV simulator", long_about = None)]
struct CommandLineArgs {
    /// The path of the config file [default: ~/.blackjack_ev.yml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of rounds to simulate
    #[arg(short, long)]
    rounds: Option<u64>,

    /// Table minimum. Also becomes the bet unit
    #[arg(long)]
    min_bet: Option<f64>,

    /// Table maximum
    #[arg(long)]
    max_bet: Option<f64>,

    /// Worker threads, 0 for all cores
    #[arg(short, long)]
    threads: Option<usize>,

    /// Seed for a reproducible run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Report format: text or yaml
    #[arg(short, long)]
    format: Option<String>,

    /// Print the basic strategy chart and exit
    #[arg(long)]
    strategy_chart: bool,
}

fn load_config(args: &CommandLineArgs) -> anyhow::Result<Config> {
    if let Some(path) = &args.config {
        return parse_config_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()));
    }

    let path = default_config_path()?;
    if path.is_dir() {
        bail!("{} should be a file rather than a directory", path.display());
    }
    if path.exists() {
        Ok(parse_config_from_file(&path)?)
    } else {
        Ok(Config::default())
    }
}

fn apply_overrides(config: &mut Config, args: &CommandLineArgs) -> anyhow::Result<()> {
    if let Some(min_bet) = args.min_bet {
        config.rule.min_bet = min_bet;
        config.rule.bet_size = min_bet;
        config.blackjack_simulator.bet_unit = Some(min_bet);
    }
    if let Some(max_bet) = args.max_bet {
        config.rule.max_bet = max_bet;
    }
    if let Some(rounds) = args.rounds {
        config.blackjack_simulator.rounds = rounds;
    }
    if let Some(threads) = args.threads {
        config.blackjack_simulator.number_of_threads = threads;
    }
    if args.seed.is_some() {
        config.blackjack_simulator.seed = args.seed;
    }
    if let Some(format) = &args.format {
        config.blackjack_simulator.report_format = ReportFormat::parse_name(format)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = CommandLineArgs::parse();

    if args.strategy_chart {
        print!("{}", report::render_strategy_chart()?);
        return Ok(());
    }

    let mut config = load_config(&args)?;
    apply_overrides(&mut config, &args)?;
    init_logging(&config.logging)?;

    let rule: Rule = config.rule.clone().try_into()?;
    let simulator_config = &config.blackjack_simulator;
    let bet_unit = simulator_config.bet_unit.unwrap_or(rule.bet_size);
    info!(
        rounds = simulator_config.rounds,
        threads = simulator_config.number_of_threads,
        seed = ?simulator_config.seed,
        "starting run"
    );

    let stats = simulate_parallel(
        &rule,
        simulator_config.rounds,
        bet_unit,
        simulator_config.number_of_threads,
        simulator_config.seed,
    )?;

    let output = match simulator_config.report_format {
        ReportFormat::Text => {
            report::render_text(&rule, bet_unit, simulator_config.hands_per_hour, &stats)?
        }
        ReportFormat::Yaml => {
            report::render_yaml(&config.rule, bet_unit, simulator_config.hands_per_hour, &stats)?
        }
    };
    print!("{}", output);
    Ok(())
}
