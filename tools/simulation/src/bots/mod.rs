//! Seeded trading bots

pub mod market_maker;
pub mod private_value;
pub mod zi_trader;

use serde::{Deserialize, Serialize};
use types::errors::ConfigError;
use types::ids::{AgentId, ViewId};

use crate::agent::Agent;
use market_maker::{MarketMaker, MarketMakerConfig};
use zi_trader::{ZiConfig, ZiTrader};

/// Which bot to build, with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BotConfig {
    Zi(ZiConfig),
    MarketMaker(MarketMakerConfig),
}

impl BotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            BotConfig::Zi(config) => config.validate(),
            BotConfig::MarketMaker(config) => config.validate(),
        }
    }

    pub fn build(&self, agent: AgentId, view: ViewId, seed: u64) -> Box<dyn Agent> {
        match self {
            BotConfig::Zi(config) => Box::new(ZiTrader::new(agent, view, config.clone(), seed)),
            BotConfig::MarketMaker(config) => Box::new(MarketMaker::new(agent, view, config.clone())),
        }
    }
}
