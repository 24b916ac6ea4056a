use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use blackjack_ev::{DealerBustBet, Rule, RuleError, SideBet, DEALER_UPCARDS};
use serde::{Deserialize, Serialize};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_CONFIG_FILE_NAME: &str = ".blackjack_ev.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error("dealer bust payout given for upcard {0}, expected 2 to 11")]
    UnknownUpcard(u8),
    #[error("unknown report format {0:?}, expected \"text\" or \"yaml\"")]
    UnknownReportFormat(String),
    #[error("invalid log filter {0:?}")]
    LogFilter(String),
    #[error("cannot find the home directory")]
    NoHomeDirectory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rule: ConfigRule,
    pub blackjack_simulator: ConfigBlackjackSimulator,
    pub logging: ConfigLogging,
}

/// Serde mirror of `Rule`. Missing keys take `Rule::default()` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigRule {
    pub number_of_decks: u8,
    pub reshuffle_threshold: usize,
    pub dealer_hit_on_soft17: bool,
    pub allow_das: bool,
    pub allow_resplit: bool,
    pub allow_hit_after_split_aces: bool,
    pub max_splits: u8,
    pub double_min_value: u8,
    pub allow_late_surrender: bool,

    pub payout_blackjack: f64,
    pub min_bet: f64,
    pub max_bet: f64,
    pub bet_size: f64,

    pub perfect_20: ConfigSideBet,
    pub dealer_bust: ConfigDealerBust,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSideBet {
    pub enabled: bool,
    pub stake: f64,
    pub payout: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDealerBust {
    pub enabled: bool,
    pub stake: f64,
    /// Payout ratio keyed by upcard value, 11 for the ace. Missing upcards keep
    /// their default payout.
    pub payouts: BTreeMap<u8, f64>,
}

impl Default for ConfigSideBet {
    fn default() -> Self {
        ConfigSideBet::from(&Rule::default().perfect_20)
    }
}

impl From<&SideBet> for ConfigSideBet {
    fn from(bet: &SideBet) -> Self {
        ConfigSideBet {
            enabled: bet.enabled,
            stake: bet.stake,
            payout: bet.payout,
        }
    }
}

impl Default for ConfigDealerBust {
    fn default() -> Self {
        ConfigDealerBust::from(&Rule::default().dealer_bust)
    }
}

impl From<&DealerBustBet> for ConfigDealerBust {
    fn from(bet: &DealerBustBet) -> Self {
        ConfigDealerBust {
            enabled: bet.enabled,
            stake: bet.stake,
            payouts: DEALER_UPCARDS.zip(bet.payouts).collect(),
        }
    }
}

impl Default for ConfigRule {
    fn default() -> Self {
        ConfigRule::from(&Rule::default())
    }
}

impl From<&Rule> for ConfigRule {
    fn from(rule: &Rule) -> Self {
        ConfigRule {
            number_of_decks: rule.number_of_decks,
            reshuffle_threshold: rule.reshuffle_threshold,
            dealer_hit_on_soft17: rule.dealer_hit_on_soft17,
            allow_das: rule.allow_das,
            allow_resplit: rule.allow_resplit,
            allow_hit_after_split_aces: rule.allow_hit_after_split_aces,
            max_splits: rule.max_splits,
            double_min_value: rule.double_min_value,
            allow_late_surrender: rule.allow_late_surrender,
            payout_blackjack: rule.payout_blackjack,
            min_bet: rule.min_bet,
            max_bet: rule.max_bet,
            bet_size: rule.bet_size,
            perfect_20: ConfigSideBet::from(&rule.perfect_20),
            dealer_bust: ConfigDealerBust::from(&rule.dealer_bust),
        }
    }
}

impl TryFrom<ConfigRule> for Rule {
    type Error = ConfigError;

    fn try_from(config: ConfigRule) -> Result<Self, Self::Error> {
        let mut payouts = Rule::default().dealer_bust.payouts;
        for (&up_card_value, &payout) in &config.dealer_bust.payouts {
            if !DEALER_UPCARDS.contains(&up_card_value) {
                return Err(ConfigError::UnknownUpcard(up_card_value));
            }
            payouts[(up_card_value - 2) as usize] = payout;
        }

        let rule = Rule {
            number_of_decks: config.number_of_decks,
            reshuffle_threshold: config.reshuffle_threshold,
            dealer_hit_on_soft17: config.dealer_hit_on_soft17,
            allow_das: config.allow_das,
            allow_resplit: config.allow_resplit,
            allow_hit_after_split_aces: config.allow_hit_after_split_aces,
            max_splits: config.max_splits,
            double_min_value: config.double_min_value,
            allow_late_surrender: config.allow_late_surrender,
            payout_blackjack: config.payout_blackjack,
            min_bet: config.min_bet,
            max_bet: config.max_bet,
            bet_size: config.bet_size,
            perfect_20: SideBet {
                enabled: config.perfect_20.enabled,
                stake: config.perfect_20.stake,
                payout: config.perfect_20.payout,
            },
            dealer_bust: DealerBustBet {
                enabled: config.dealer_bust.enabled,
                stake: config.dealer_bust.stake,
                payouts,
            },
        };
        rule.validate()?;
        Ok(rule)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
pub enum ReportFormat {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "yaml")]
    Yaml,
}

impl Default for ReportFormat {
    fn default() -> Self {
        ReportFormat::Text
    }
}

impl ReportFormat {
    pub fn parse_name(name: &str) -> Result<ReportFormat, ConfigError> {
        name.parse()
            .map_err(|_| ConfigError::UnknownReportFormat(name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigBlackjackSimulator {
    /// 0 means one thread per available core.
    pub number_of_threads: usize,
    pub rounds: u64,
    /// Defaults to the rule's bet size.
    pub bet_unit: Option<f64>,
    pub seed: Option<u64>,
    pub hands_per_hour: u32,
    pub report_format: ReportFormat,
}

impl Default for ConfigBlackjackSimulator {
    fn default() -> Self {
        ConfigBlackjackSimulator {
            number_of_threads: 0,
            rounds: 1_000_000,
            bet_unit: None,
            seed: None,
            hands_per_hour: 100,
            report_format: ReportFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLogging {
    /// Used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for ConfigLogging {
    fn default() -> Self {
        ConfigLogging {
            level: String::from("info"),
        }
    }
}

pub fn parse_config_from_str(content: &str) -> Result<Config, ConfigError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_from_str(&content)
}

/// `~/.blackjack_ev.yml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home_dir = home::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
    Ok(home_dir.join(DEFAULT_CONFIG_FILE_NAME))
}

/// Installs the global subscriber, writing to stderr. `RUST_LOG` wins over the
/// configured level.
pub fn init_logging(logging: &ConfigLogging) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .map_err(|_| ConfigError::LogFilter(logging.level.clone()))?,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // Already set when called twice, e.g. from tests.
    let _ = tracing::subscriber::set_global_default(subscriber);
    Ok(())
}
