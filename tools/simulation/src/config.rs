//! Simulation configuration
//!
//! A run is fully described by a [`SimulationConfig`]: the seed, the end
//! time, scheduler policies, the fundamental, the markets, and the agent
//! populations. Configurations are validated before anything is built.

use matching_engine::PricingRule;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use types::errors::{ConfigError, SimError};
use types::numeric::Price;
use types::time::TimeStamp;

use crate::bots::zi_trader::ZiConfig;
use crate::bots::market_maker::MarketMakerConfig;
use crate::bots::BotConfig;
use crate::engine::Simulation;
use crate::fundamental::{ConstantFundamental, Fundamental, MeanRevertingFundamental, ShockDistribution};
use crate::market::MarketKind;
use crate::scheduler::{ErrorPolicy, TieBreak};

const FUNDAMENTAL_STREAM: u64 = 1;
const AGENT_STREAM: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FundamentalConfig {
    Constant {
        value: Price,
    },
    MeanReverting {
        mean: Price,
        kappa: Decimal,
        shock: i64,
        /// Chance of a jump on each tick
        #[serde(default = "default_shock_probability")]
        shock_probability: Decimal,
        #[serde(default)]
        distribution: ShockDistribution,
    },
}

fn default_shock_probability() -> Decimal {
    Decimal::ONE
}

impl FundamentalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            FundamentalConfig::Constant { value } => {
                if *value < Price::ZERO || value.is_infinite() {
                    return Err(ConfigError::InvalidFundamental {
                        reason: format!("value must be a finite non-negative price, got {}", value),
                    });
                }
                Ok(())
            }
            FundamentalConfig::MeanReverting { mean, kappa, shock, shock_probability, .. } => {
                MeanRevertingFundamental::new(*mean, *kappa, *shock, 0)?.with_shock_probability(*shock_probability)?;
                Ok(())
            }
        }
    }

    /// Build the process; a mean-reverting one is sampled up to `horizon`
    pub fn build(&self, seed: u64, horizon: TimeStamp) -> Result<Box<dyn Fundamental>, ConfigError> {
        Ok(match self {
            FundamentalConfig::Constant { value } => Box::new(ConstantFundamental::new(*value)),
            FundamentalConfig::MeanReverting { mean, kappa, shock, shock_probability, distribution } => Box::new(
                MeanRevertingFundamental::new(*mean, *kappa, *shock, seed)?
                    .with_shock_probability(*shock_probability)?
                    .with_distribution(*distribution)
                    .with_horizon(horizon),
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketConfig {
    Continuous,
    Call {
        clear_interval: TimeStamp,
        #[serde(default = "default_pricing_ratio")]
        pricing_ratio: Decimal,
    },
}

fn default_pricing_ratio() -> Decimal {
    Decimal::new(5, 1)
}

impl MarketConfig {
    pub fn kind(&self) -> MarketKind {
        match self {
            MarketConfig::Continuous => MarketKind::Continuous,
            MarketConfig::Call { clear_interval, .. } => MarketKind::Call {
                clear_interval: *clear_interval,
            },
        }
    }

    pub fn rule(&self) -> Result<PricingRule, ConfigError> {
        match self {
            MarketConfig::Continuous => Ok(PricingRule::EarliestOrder),
            MarketConfig::Call { pricing_ratio, .. } => PricingRule::uniform(*pricing_ratio),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let MarketConfig::Call { clear_interval, .. } = self {
            if clear_interval.ticks() <= 0 {
                return Err(ConfigError::InvalidClearInterval(clear_interval.ticks()));
            }
        }
        self.rule().map(|_| ())
    }
}

/// A population of identical bots on one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub bot: BotConfig,
    pub count: usize,
    #[serde(default)]
    pub latency: TimeStamp,
    /// Index into `SimulationConfig::markets`
    #[serde(default)]
    pub market: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub end_time: TimeStamp,
    pub tie_break: TieBreak,
    pub error_policy: ErrorPolicy,
    pub fundamental: FundamentalConfig,
    pub markets: Vec<MarketConfig>,
    pub agents: Vec<AgentConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            end_time: TimeStamp::new(1_000),
            tie_break: TieBreak::Shuffled,
            error_policy: ErrorPolicy::Isolate,
            fundamental: FundamentalConfig::MeanReverting {
                mean: Price::new(1_000),
                kappa: Decimal::new(5, 2),
                shock: 10,
                shock_probability: Decimal::ONE,
                distribution: ShockDistribution::Uniform,
            },
            markets: vec![MarketConfig::Continuous],
            agents: vec![
                AgentConfig {
                    bot: BotConfig::Zi(ZiConfig::default()),
                    count: 10,
                    latency: TimeStamp::ZERO,
                    market: 0,
                },
                AgentConfig {
                    bot: BotConfig::MarketMaker(MarketMakerConfig::default()),
                    count: 1,
                    latency: TimeStamp::ZERO,
                    market: 0,
                },
            ],
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.end_time.ticks() < 0 {
            return Err(ConfigError::InvalidEndTime(self.end_time.ticks()));
        }
        self.fundamental.validate()?;
        for market in &self.markets {
            market.validate()?;
        }
        for agent in &self.agents {
            if !agent.latency.is_valid_delay() {
                return Err(ConfigError::InvalidLatency(agent.latency.ticks()));
            }
            if agent.market >= self.markets.len() {
                return Err(ConfigError::UnknownMarket { index: agent.market });
            }
            agent.bot.validate()?;
        }
        Ok(())
    }
}

/// Independent, reproducible seed for one consumer of randomness
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl Simulation {
    /// Build a ready-to-run simulation. Every agent is first woken at time 0.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        let fundamental = config
            .fundamental
            .build(derive_seed(config.seed, FUNDAMENTAL_STREAM), config.end_time)?;
        let mut sim = Simulation::new(config.tie_break, config.error_policy, config.seed, fundamental);

        let mut markets = Vec::with_capacity(config.markets.len());
        for market in &config.markets {
            markets.push(sim.add_market(market.kind(), market.rule()?)?);
        }

        let mut stream = AGENT_STREAM;
        for population in &config.agents {
            let market = *markets
                .get(population.market)
                .ok_or(ConfigError::UnknownMarket { index: population.market })?;
            for _ in 0..population.count {
                let seed = derive_seed(config.seed, stream);
                stream += 1;
                let (agent, _) = sim.spawn_agent(market, population.latency, |agent, view| {
                    population.bot.build(agent, view, seed)
                })?;
                sim.wake_at(agent, TimeStamp::ZERO)?;
            }
        }

        info!(
            seed = config.seed,
            end_time = %config.end_time,
            markets = markets.len(),
            agents = sim.agent_count(),
            "simulation built"
        );
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = SimulationConfig::default();
        let parsed = SimulationConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "seed": 7,
            "markets": [{"type": "call", "clear_interval": 10, "pricing_ratio": "0.25"}],
            "agents": [{"bot": {"kind": "zi", "max_position": 3}, "count": 4, "latency": 2}]
        }"#;
        let config = SimulationConfig::from_json(json).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.end_time, TimeStamp::new(1_000));
        assert_eq!(
            config.markets[0].rule().unwrap(),
            PricingRule::Uniform { ratio: Decimal::new(25, 2) }
        );
        match &config.agents[0].bot {
            BotConfig::Zi(zi) => {
                assert_eq!(zi.max_position, 3);
                assert_eq!(zi.shade_max, ZiConfig::default().shade_max);
            }
            other => panic!("unexpected bot {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_ratio() {
        let json = r#"{"markets": [{"type": "call", "clear_interval": 10, "pricing_ratio": "1.5"}], "agents": []}"#;
        assert!(matches!(
            SimulationConfig::from_json(json),
            Err(ConfigError::InvalidPricingRatio(_))
        ));
    }

    #[test]
    fn test_rejects_bad_interval_and_latency() {
        let mut config = SimulationConfig::default();
        config.markets = vec![MarketConfig::Call {
            clear_interval: TimeStamp::ZERO,
            pricing_ratio: Decimal::new(5, 1),
        }];
        assert_eq!(config.validate(), Err(ConfigError::InvalidClearInterval(0)));

        let mut config = SimulationConfig::default();
        config.agents[0].latency = TimeStamp::new(-3);
        assert_eq!(config.validate(), Err(ConfigError::InvalidLatency(-3)));
    }

    #[test]
    fn test_end_time_bounds() {
        let config = SimulationConfig { end_time: TimeStamp::ZERO, ..SimulationConfig::default() };
        assert!(config.validate().is_ok());
        let sim = crate::replay::run_to_end(&config).unwrap();
        assert_eq!(sim.current_time(), TimeStamp::ZERO);

        let config = SimulationConfig { end_time: TimeStamp::new(-1), ..SimulationConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::InvalidEndTime(-1)));
    }

    #[test]
    fn test_shock_probability() {
        let json = r#"{"fundamental": {"type": "mean_reverting", "mean": 500, "kappa": "0.1", "shock": 5}}"#;
        match SimulationConfig::from_json(json).unwrap().fundamental {
            FundamentalConfig::MeanReverting { shock_probability, .. } => {
                assert_eq!(shock_probability, Decimal::ONE)
            }
            other => panic!("unexpected fundamental {:?}", other),
        }

        let json = r#"{"fundamental": {"type": "mean_reverting", "mean": 500, "kappa": "0.1", "shock": 5, "shock_probability": "0.25", "distribution": "gaussian"}}"#;
        let config = SimulationConfig::from_json(json).unwrap();
        assert!(matches!(
            config.fundamental,
            FundamentalConfig::MeanReverting { distribution: ShockDistribution::Gaussian, .. }
        ));
        assert!(Simulation::from_config(&config).is_ok());

        let json = r#"{"fundamental": {"type": "mean_reverting", "mean": 500, "kappa": "0.1", "shock": 5, "shock_probability": "1.2"}}"#;
        assert!(matches!(
            SimulationConfig::from_json(json),
            Err(ConfigError::InvalidFundamental { .. })
        ));
    }

    #[test]
    fn test_fundamental_lookups_past_end_time() {
        let config = SimulationConfig { end_time: TimeStamp::new(50), ..SimulationConfig::default() };
        let mut sim = Simulation::from_config(&config).unwrap();
        let at_end = sim.fundamental_at(TimeStamp::new(50));
        assert!(at_end >= Price::ZERO);
        assert_eq!(sim.fundamental_at(TimeStamp::new(i64::MAX)), Price::new(1_000));
    }

    #[test]
    fn test_rejects_unknown_market() {
        let mut config = SimulationConfig::default();
        config.agents[1].market = 4;
        assert_eq!(config.validate(), Err(ConfigError::UnknownMarket { index: 4 }));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(SimulationConfig::from_json("{ not json"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_build_from_config() {
        let config = SimulationConfig::default();
        let sim = Simulation::from_config(&config).unwrap();
        assert_eq!(sim.markets().len(), 1);
        assert_eq!(sim.agent_count(), 11);
        assert_eq!(sim.views().len(), 11);
    }

    #[test]
    fn test_seeds_are_distinct() {
        let seeds: std::collections::HashSet<u64> = (0..100).map(|s| derive_seed(42, s)).collect();
        assert_eq!(seeds.len(), 100);
    }
}
